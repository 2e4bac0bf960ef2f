use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

/// Number of centiseconds in one minute.
const CENTIS_PER_MINUTE: u64 = 6_000;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d*)?").expect("number pattern is valid"));

/// A position on the time axis of a video, as `hours:minutes:seconds`.
///
/// Values are always normalized: `minutes < 60` and `seconds < 60`. Seconds
/// are held at a resolution of one hundredth of a second, which is the
/// precision of the text format. Two values that round to the same hundredth
/// are the same point, so equality, ordering and hashing agree and the type can
/// be used as a sorted-map key.
///
/// For a looser match (neighbouring hundredths within the same minute) see
/// [`TimePoint::approx_eq`].
///
/// # Examples
///
/// ```
/// use outline::TimePoint;
///
/// let time: TimePoint = "0:1:90".parse().unwrap();
/// assert_eq!(time.to_string(), "0:2:30");
///
/// let fractional = TimePoint::from_fractional(1.5, 0.0, 0.0).unwrap();
/// assert_eq!(fractional, TimePoint::new(1, 30, 0.0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePoint {
    // field order drives the derived ordering
    hours: u64,
    minutes: u64,
    centis: u64,
}

/// Errors raised when a time value cannot be constructed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidTimeValue {
    /// A component was below zero.
    #[error("invalid time value: {component} must not be negative (got {value})")]
    Negative {
        /// Which component was negative.
        component: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Hours or minutes were given with a fractional part where only whole
    /// numbers are accepted.
    #[error("invalid time value: {component} must be a whole number (got {value})")]
    NonIntegral {
        /// Which component was fractional.
        component: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A component was NaN or infinite.
    #[error("invalid time value: {component} is not a finite number")]
    NotFinite {
        /// Which component was not finite.
        component: &'static str,
    },

    /// The input string did not contain hours, minutes and seconds.
    #[error("invalid time value: expected 'h:m:s' but found fewer than three numbers in '{0}'")]
    TooFewNumbers(String),

    /// The value does not fit in the supported range.
    #[error("invalid time value: too large")]
    Overflow,
}

/// The result of parsing a time string.
///
/// Numbers beyond the third are not an error, but they are reported back so
/// the caller can surface a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    /// The parsed time.
    pub time: TimePoint,
    /// Numeric tokens that followed the seconds and were ignored.
    pub ignored: Vec<String>,
}

impl TimePoint {
    /// The start of the time axis.
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        centis: 0,
    };

    /// Creates a time from whole hours and minutes and (possibly fractional)
    /// seconds.
    ///
    /// Overflowing seconds and minutes are carried into the next unit, so
    /// `new(0, 0, 90.0)` is `0:1:30`.
    ///
    /// # Errors
    ///
    /// Returns an error if `seconds` is negative or not finite, or if the
    /// carried value overflows.
    pub fn new(hours: u64, minutes: u64, seconds: f64) -> Result<Self, InvalidTimeValue> {
        let centis = seconds_to_centis(seconds)?;
        Self::from_parts(hours, minutes, centis)
    }

    /// Creates a time from fractional components.
    ///
    /// A fractional hour is carried down into minutes and a fractional minute
    /// into seconds before overflow is resolved, so `1.5` hours is `1:30:0`.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is negative or not finite.
    pub fn from_fractional(hours: f64, minutes: f64, seconds: f64) -> Result<Self, InvalidTimeValue> {
        check_component("hours", hours)?;
        check_component("minutes", minutes)?;
        check_component("seconds", seconds)?;

        let minutes = minutes + hours.fract() * 60.0;
        let seconds = seconds + minutes.fract() * 60.0;

        Self::from_parts(
            whole(hours.trunc())?,
            whole(minutes.trunc())?,
            seconds_to_centis(seconds)?,
        )
    }

    /// Parses a time string, returning any surplus numeric tokens.
    ///
    /// The first three numbers found in `input` are taken as hours, minutes
    /// and seconds in that order; the separators between them are not
    /// inspected. Hours and minutes must be whole numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three numbers are found, if a number is
    /// negative, or if hours or minutes are fractional.
    pub fn parse(input: &str) -> Result<Parsed, InvalidTimeValue> {
        let mut tokens = Vec::new();
        for number in NUMBER.find_iter(input) {
            // only hours, minutes and seconds are checked; surplus tokens are ignored
            if tokens.len() < 3 && is_negated(input, number.start()) {
                let value = number.as_str().parse::<f64>().unwrap_or_default();
                return Err(InvalidTimeValue::Negative {
                    component: component_name(tokens.len()),
                    value: -value,
                });
            }
            tokens.push(number.as_str());
        }

        let [hours, minutes, seconds, rest @ ..] = tokens.as_slice() else {
            return Err(InvalidTimeValue::TooFewNumbers(input.to_string()));
        };

        let hours = parse_whole("hours", hours)?;
        let minutes = parse_whole("minutes", minutes)?;
        let seconds = seconds
            .parse::<f64>()
            .map_err(|_| InvalidTimeValue::TooFewNumbers(input.to_string()))?;

        Ok(Parsed {
            time: Self::new(hours, minutes, seconds)?,
            ignored: rest.iter().map(ToString::to_string).collect(),
        })
    }

    fn from_parts(hours: u64, minutes: u64, centis: u64) -> Result<Self, InvalidTimeValue> {
        let minutes = minutes
            .checked_add(centis / CENTIS_PER_MINUTE)
            .ok_or(InvalidTimeValue::Overflow)?;
        let hours = hours
            .checked_add(minutes / 60)
            .ok_or(InvalidTimeValue::Overflow)?;

        Ok(Self {
            hours,
            minutes: minutes % 60,
            centis: centis % CENTIS_PER_MINUTE,
        })
    }

    /// Whole hours.
    #[must_use]
    pub const fn hours(&self) -> u64 {
        self.hours
    }

    /// Whole minutes, always below 60.
    #[must_use]
    pub const fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Seconds, always below 60, at a resolution of 0.01.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds(&self) -> f64 {
        self.centis as f64 / 100.0
    }

    /// The offset from [`TimePoint::ZERO`] in hundredths of a second.
    #[must_use]
    pub const fn total_centis(&self) -> u128 {
        (self.hours as u128 * 60 + self.minutes as u128) * CENTIS_PER_MINUTE as u128
            + self.centis as u128
    }

    /// Compares two times, treating neighbouring hundredths as equal.
    ///
    /// This is the comparison used for range checks and routing: a time within
    /// 0.01 s of a bound (in the same minute) counts as on the bound. Unlike
    /// [`Ord`] it is not transitive, so it must not be used for sorting.
    #[must_use]
    pub const fn compare(&self, other: &Self) -> Ordering {
        if self.approx_eq(other) {
            return Ordering::Equal;
        }
        let (lhs, rhs) = (self.total_centis(), other.total_centis());
        if lhs < rhs {
            Ordering::Less
        } else if lhs > rhs {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Loose equality: same hours and minutes, seconds at most 0.01 apart.
    ///
    /// This is not transitive and is only used to resolve lookups of a single
    /// annotation; [`PartialEq`] is the strict form.
    #[must_use]
    pub const fn approx_eq(&self, other: &Self) -> bool {
        self.hours == other.hours
            && self.minutes == other.minutes
            && self.centis.abs_diff(other.centis) <= 1
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let whole = self.centis / 100;
        let fraction = self.centis % 100;
        match fraction {
            0 => write!(f, "{}:{}:{whole}", self.hours, self.minutes),
            n if n % 10 == 0 => write!(f, "{}:{}:{whole}.{}", self.hours, self.minutes, n / 10),
            n => write!(f, "{}:{}:{whole}.{n:02}", self.hours, self.minutes),
        }
    }
}

impl FromStr for TimePoint {
    type Err = InvalidTimeValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Parsed { time, ignored } = Self::parse(s)?;
        if !ignored.is_empty() {
            tracing::warn!(
                "Found more than three numbers in time string '{s}'; ignoring {}",
                ignored.join(", ")
            );
        }
        Ok(time)
    }
}

impl TryFrom<&str> for TimePoint {
    type Error = InvalidTimeValue;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl TryFrom<(f64, f64, f64)> for TimePoint {
    type Error = InvalidTimeValue;

    /// Builds a time from an `(hours, minutes, seconds)` tuple. Hours and
    /// minutes must be whole numbers.
    fn try_from((hours, minutes, seconds): (f64, f64, f64)) -> Result<Self, Self::Error> {
        check_component("hours", hours)?;
        check_component("minutes", minutes)?;
        Self::new(
            integral("hours", hours)?,
            integral("minutes", minutes)?,
            seconds,
        )
    }
}

const fn component_name(index: usize) -> &'static str {
    match index {
        0 => "hours",
        1 => "minutes",
        _ => "seconds",
    }
}

/// A number is negative when it is directly preceded by a `-` which is not
/// itself a separator between two numbers (`0-1-30`).
fn is_negated(input: &str, start: usize) -> bool {
    let before = &input[..start];
    let Some(prefix) = before.strip_suffix('-') else {
        return false;
    };
    !prefix.ends_with(|c: char| c.is_ascii_digit() || c == '.')
}

fn check_component(component: &'static str, value: f64) -> Result<(), InvalidTimeValue> {
    if !value.is_finite() {
        return Err(InvalidTimeValue::NotFinite { component });
    }
    if value < 0.0 {
        return Err(InvalidTimeValue::Negative { component, value });
    }
    Ok(())
}

fn parse_whole(component: &'static str, token: &str) -> Result<u64, InvalidTimeValue> {
    if !token.contains('.') {
        return token.parse().map_err(|_| InvalidTimeValue::Overflow);
    }
    let value = token
        .parse::<f64>()
        .map_err(|_| InvalidTimeValue::Overflow)?;
    integral(component, value)
}

fn integral(component: &'static str, value: f64) -> Result<u64, InvalidTimeValue> {
    if value.fract() != 0.0 {
        return Err(InvalidTimeValue::NonIntegral { component, value });
    }
    whole(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: f64) -> Result<u64, InvalidTimeValue> {
    if value >= u64::MAX as f64 {
        return Err(InvalidTimeValue::Overflow);
    }
    Ok(value as u64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_to_centis(seconds: f64) -> Result<u64, InvalidTimeValue> {
    check_component("seconds", seconds)?;
    let centis = (seconds * 100.0).round();
    if centis >= u64::MAX as f64 {
        return Err(InvalidTimeValue::Overflow);
    }
    Ok(centis as u64)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn t(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    #[test_case("0:1:30", 0, 1, 30.0; "plain")]
    #[test_case("0:0:90", 0, 1, 30.0; "seconds overflow")]
    #[test_case("0:75:0", 1, 15, 0.0; "minutes overflow")]
    #[test_case("1:59:59.999", 2, 0, 0.0; "rounding cascades")]
    #[test_case("00:02:03.25", 0, 2, 3.25; "padded")]
    #[test_case("1h 2m 3.5s", 1, 2, 3.5; "arbitrary separators")]
    #[test_case("0-1-30", 0, 1, 30.0; "dash separators")]
    fn parses(input: &str, hours: u64, minutes: u64, seconds: f64) {
        let time = t(input);
        assert_eq!(time.hours(), hours);
        assert_eq!(time.minutes(), minutes);
        assert!((time.seconds() - seconds).abs() < f64::EPSILON);
    }

    #[test]
    fn fractional_hours_carry_into_minutes() {
        let time = TimePoint::from_fractional(1.5, 0.0, 0.0).unwrap();
        assert_eq!(time, TimePoint::new(1, 30, 0.0).unwrap());
    }

    #[test]
    fn fractional_minutes_carry_into_seconds() {
        let time = TimePoint::from_fractional(0.0, 2.25, 0.0).unwrap();
        assert_eq!(time.to_string(), "0:2:15");
    }

    #[test]
    fn fractional_carry_then_overflow() {
        let time = TimePoint::from_fractional(0.5, 29.5, 45.0).unwrap();
        assert_eq!(time.to_string(), "1:0:15");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["0:0:0", "0:0:59.99", "3:59:59.5", "0:123:456.78", "10:0:0.01"] {
            let once = t(input);
            let twice = t(&once.to_string());
            assert_eq!(once, twice, "{input}");
            assert_eq!(once.to_string(), twice.to_string());
        }
    }

    #[test_case("-1:0:0"; "negative hours")]
    #[test_case("0:-5:0"; "negative minutes")]
    #[test_case("0:0:-1.5"; "negative seconds")]
    fn negative_components_fail(input: &str) {
        assert!(matches!(
            TimePoint::from_str(input),
            Err(InvalidTimeValue::Negative { .. })
        ));
    }

    #[test_case("1.5:0:0"; "fractional hours")]
    #[test_case("0:2.5:0"; "fractional minutes")]
    fn fractional_hours_or_minutes_in_strings_fail(input: &str) {
        assert!(matches!(
            TimePoint::from_str(input),
            Err(InvalidTimeValue::NonIntegral { .. })
        ));
    }

    #[test_case(""; "empty")]
    #[test_case("12:30"; "two numbers")]
    #[test_case("noon"; "no numbers")]
    fn too_few_numbers_fail(input: &str) {
        assert_eq!(
            TimePoint::from_str(input),
            Err(InvalidTimeValue::TooFewNumbers(input.to_string()))
        );
    }

    #[test]
    fn extra_numbers_are_reported_not_fatal() {
        let parsed = TimePoint::parse("0:1:2:3:4").unwrap();
        assert_eq!(parsed.time, TimePoint::new(0, 1, 2.0).unwrap());
        assert_eq!(parsed.ignored, vec!["3".to_string(), "4".to_string()]);
        assert_eq!(t("0:1:2:3"), parsed.time);
    }

    #[test_case("0:1:30 -2", &["2"]; "negative surplus")]
    #[test_case("0:1:30-2", &["2"]; "dash before surplus")]
    #[test_case("0:1:30 4 -5", &["4", "5"]; "several surplus")]
    fn surplus_numbers_are_never_validated(input: &str, ignored: &[&str]) {
        let parsed = TimePoint::parse(input).unwrap();
        assert_eq!(parsed.time, TimePoint::new(0, 1, 30.0).unwrap());
        assert_eq!(parsed.ignored, ignored);
    }

    #[test]
    fn whole_hours_keep_full_integer_precision() {
        let time = t("9007199254740993:0:0");
        assert_eq!(time.hours(), 9_007_199_254_740_993);
        assert_eq!(t("2.0:3:0").hours(), 2);
    }

    #[test]
    fn oversized_hours_overflow() {
        assert_eq!(
            TimePoint::from_str("99999999999999999999:0:0"),
            Err(InvalidTimeValue::Overflow)
        );
    }

    #[test]
    fn tuple_requires_whole_hours_and_minutes() {
        assert_eq!(
            TimePoint::try_from((0.0, 1.0, 30.5)).unwrap(),
            TimePoint::new(0, 1, 30.5).unwrap()
        );
        assert!(matches!(
            TimePoint::try_from((0.5, 0.0, 0.0)),
            Err(InvalidTimeValue::NonIntegral { .. })
        ));
        assert!(matches!(
            TimePoint::try_from((0.0, -1.0, 0.0)),
            Err(InvalidTimeValue::Negative { .. })
        ));
    }

    #[test]
    fn non_finite_seconds_fail() {
        assert!(matches!(
            TimePoint::new(0, 0, f64::NAN),
            Err(InvalidTimeValue::NotFinite { .. })
        ));
    }

    #[test]
    fn ordering_compares_hours_then_minutes_then_seconds() {
        assert!(t("0:59:59") < t("1:0:0"));
        assert!(t("1:0:0") < t("1:1:0"));
        assert!(t("1:1:0") < t("1:1:0.5"));
        assert!(t("2:0:0") > t("1:59:59.99"));
    }

    #[test]
    fn near_equal_seconds_collapse() {
        assert_eq!(t("0:0:1.004"), t("0:0:1"));
        assert_eq!(t("0:0:1"), t("0:0:1.004"));
        assert_eq!(
            t("0:0:1.004").cmp(&t("0:0:0.996")),
            std::cmp::Ordering::Equal
        );
    }

    #[test_case("0:0:1.00", "0:0:1.01", Ordering::Equal; "one hundredth above")]
    #[test_case("0:0:1.01", "0:0:1.00", Ordering::Equal; "one hundredth below")]
    #[test_case("0:0:1.00", "0:0:1.02", Ordering::Less; "two hundredths")]
    #[test_case("0:10:0.01", "0:10:0", Ordering::Equal; "just past a bound")]
    #[test_case("0:0:59.99", "0:1:0", Ordering::Less; "across a minute")]
    #[test_case("1:0:0", "0:59:59", Ordering::Greater; "hours dominate")]
    fn compare_tolerates_one_hundredth(lhs: &str, rhs: &str, expected: Ordering) {
        assert_eq!(t(lhs).compare(&t(rhs)), expected);
    }

    #[test]
    fn approx_eq_spans_one_hundredth() {
        assert!(t("0:0:1.00").approx_eq(&t("0:0:1.01")));
        assert!(t("0:0:1.01").approx_eq(&t("0:0:1.00")));
        assert!(!t("0:0:1.00").approx_eq(&t("0:0:1.02")));
        assert!(!t("0:0:59.99").approx_eq(&t("0:1:0")));
    }

    #[test_case("0:1:30", "0:1:30"; "whole seconds")]
    #[test_case("0:1:30.5", "0:1:30.5"; "tenths")]
    #[test_case("0:1:30.05", "0:1:30.05"; "hundredths")]
    #[test_case("0:1:30.50", "0:1:30.5"; "trailing zero dropped")]
    #[test_case("5:07:09", "5:7:9"; "padding dropped")]
    fn display(input: &str, expected: &str) {
        assert_eq!(t(input).to_string(), expected);
    }

    #[test]
    fn total_centis() {
        assert_eq!(t("1:1:1.01").total_centis(), 366_101);
    }
}
