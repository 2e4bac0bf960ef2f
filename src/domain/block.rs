//! A single named span of an outline and the annotations within it.

use std::{collections::BTreeMap, fmt::Write as _};

use crate::domain::{Topic, time_point::TimePoint};

/// The separator between time and content in the text format.
pub(crate) const FIELD_SEPARATOR: char = '|';

/// Stand-in for [`FIELD_SEPARATOR`] inside annotation content (U+FF5C).
pub(crate) const SEPARATOR_SUBSTITUTE: char = '｜';

/// A named, inclusive time range holding timestamped annotations.
///
/// Annotations are kept sorted by time. Every stored annotation lies within
/// `[begin, end]` at the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineBlock {
    topic: Topic,
    begin: TimePoint,
    end: TimePoint,
    annotations: BTreeMap<TimePoint, String>,
}

/// Errors raised by operations on a single block.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The time lies outside the block's range.
    #[error("time {time} is outside the range {begin}~{end} of block '{topic}'")]
    OutOfRange {
        /// The block that rejected the time.
        topic: Topic,
        /// The rejected time.
        time: TimePoint,
        /// Start of the block's range.
        begin: TimePoint,
        /// End of the block's range.
        end: TimePoint,
    },

    /// No annotation is stored at the given time.
    #[error("no annotation at {time} in block '{topic}'")]
    NotFound {
        /// The block that was searched.
        topic: Topic,
        /// The time that was looked up.
        time: TimePoint,
    },

    /// The range ends before it begins.
    #[error("invalid range {begin}~{end}: begin is after end")]
    InvalidRange {
        /// Requested start.
        begin: TimePoint,
        /// Requested end.
        end: TimePoint,
    },
}

impl OutlineBlock {
    /// Creates an empty block covering `[begin, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `begin` is after `end`.
    pub fn new(topic: Topic, begin: TimePoint, end: TimePoint) -> Result<Self, Error> {
        check_range(begin, end)?;
        Ok(Self {
            topic,
            begin,
            end,
            annotations: BTreeMap::new(),
        })
    }

    /// Builds a block from already-validated parts without range checks.
    ///
    /// Used when reading files, which may have been edited by hand.
    pub(crate) const fn from_parts(
        topic: Topic,
        begin: TimePoint,
        end: TimePoint,
        annotations: BTreeMap<TimePoint, String>,
    ) -> Self {
        Self {
            topic,
            begin,
            end,
            annotations,
        }
    }

    /// The block's topic.
    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Start of the range (inclusive).
    #[must_use]
    pub const fn begin(&self) -> TimePoint {
        self.begin
    }

    /// End of the range (inclusive).
    #[must_use]
    pub const fn end(&self) -> TimePoint {
        self.end
    }

    /// Whether `time` lies within `[begin, end]`.
    ///
    /// Bounds are compared with [`TimePoint::compare`], so a time within one
    /// hundredth of a second of either bound is inside.
    #[must_use]
    pub fn contains(&self, time: TimePoint) -> bool {
        self.begin.compare(&time).is_le() && time.compare(&self.end).is_le()
    }

    /// Iterates annotations in ascending time order.
    pub fn annotations(&self) -> impl Iterator<Item = (TimePoint, &str)> {
        self.annotations
            .iter()
            .map(|(time, content)| (*time, content.as_str()))
    }

    /// The number of annotations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Whether the block holds no annotations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The annotation stored at `time`, if any.
    #[must_use]
    pub fn get(&self, time: TimePoint) -> Option<&str> {
        self.find(time)
            .and_then(|key| self.annotations.get(&key))
            .map(String::as_str)
    }

    /// Writes an annotation, replacing any existing one at the same time.
    ///
    /// The content is sanitized before storage (see [`sanitize`]). Returns the
    /// previous annotation at that time, if there was one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `time` is outside `[begin, end]`.
    pub fn write(&mut self, time: TimePoint, content: &str) -> Result<Option<String>, Error> {
        if !self.contains(time) {
            return Err(Error::OutOfRange {
                topic: self.topic.clone(),
                time,
                begin: self.begin,
                end: self.end,
            });
        }
        Ok(self.annotations.insert(time, sanitize(content)))
    }

    /// Removes the annotation at `time`, returning its content.
    ///
    /// An exact match is preferred; failing that, an annotation within one
    /// hundredth of a second of `time` (see [`TimePoint::approx_eq`]) is
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no annotation is stored at `time`.
    pub fn remove(&mut self, time: TimePoint) -> Result<String, Error> {
        self.find(time)
            .and_then(|key| self.annotations.remove(&key))
            .ok_or_else(|| Error::NotFound {
                topic: self.topic.clone(),
                time,
            })
    }

    fn find(&self, time: TimePoint) -> Option<TimePoint> {
        if self.annotations.contains_key(&time) {
            return Some(time);
        }
        // the nearest key on either side is the only possible loose match
        let below = self.annotations.range(..time).next_back().map(|(k, _)| *k);
        let above = self.annotations.range(time..).next().map(|(k, _)| *k);
        [below, above]
            .into_iter()
            .flatten()
            .find(|key| key.approx_eq(&time))
    }

    /// Times of stored annotations which fall outside `[begin, end]`.
    #[must_use]
    pub fn outside(&self, begin: TimePoint, end: TimePoint) -> Vec<TimePoint> {
        self.annotations
            .keys()
            .filter(|time| time.compare(&begin).is_lt() || time.compare(&end).is_gt())
            .copied()
            .collect()
    }

    /// Moves the block to a new range. Stored annotations are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `begin` is after `end`.
    pub fn set_range(&mut self, begin: TimePoint, end: TimePoint) -> Result<(), Error> {
        check_range(begin, end)?;
        self.begin = begin;
        self.end = end;
        Ok(())
    }

    /// A human-readable table of the block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("\n{}({}~{})\n", self.topic, self.begin, self.end);
        out.push_str("|Time|Content|\n|---|---|\n");
        for (time, content) in &self.annotations {
            let _ = writeln!(out, "|{time}|{content}|");
        }
        out
    }
}

/// Makes annotation content safe to store on a single line of the text
/// format.
///
/// Every `|` is replaced with the full-width `｜`, line breaks become spaces and
/// surrounding whitespace is trimmed.
#[must_use]
pub fn sanitize(content: &str) -> String {
    content
        .trim()
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR => SEPARATOR_SUBSTITUTE,
            '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}

const fn check_range(begin: TimePoint, end: TimePoint) -> Result<(), Error> {
    if begin.compare(&end).is_gt() {
        return Err(Error::InvalidRange { begin, end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn intro() -> OutlineBlock {
        OutlineBlock::new(Topic::new("Intro").unwrap(), t("0:0:0"), t("0:10:0")).unwrap()
    }

    #[test]
    fn write_keeps_annotations_sorted() {
        let mut block = intro();
        block.write(t("0:5:0"), "second").unwrap();
        block.write(t("0:1:30"), "first").unwrap();
        block.write(t("0:9:59.5"), "third").unwrap();

        let contents: Vec<_> = block.annotations().map(|(_, c)| c).collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn write_overwrites_same_time() {
        let mut block = intro();
        assert_eq!(block.write(t("0:1:0"), "a").unwrap(), None);
        assert_eq!(block.write(t("0:1:0.001"), "b").unwrap(), Some("a".to_string()));
        assert_eq!(block.len(), 1);
        assert_eq!(block.get(t("0:1:0")), Some("b"));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut block = intro();
        block.write(t("0:0:0"), "start").unwrap();
        block.write(t("0:10:0"), "end").unwrap();
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn bounds_tolerate_one_hundredth() {
        let mut block = intro();
        block.write(t("0:10:0.01"), "just after the end").unwrap();
        assert!(block.contains(t("0:10:0.01")));
        assert!(block.outside(t("0:0:0"), t("0:10:0")).is_empty());

        let late =
            OutlineBlock::new(Topic::new("Late").unwrap(), t("0:5:0.01"), t("0:6:0")).unwrap();
        assert!(late.contains(t("0:5:0")));
    }

    #[test]
    fn write_outside_range_fails() {
        let mut block = intro();
        let error = block.write(t("0:10:0.02"), "late").unwrap_err();
        assert!(matches!(error, Error::OutOfRange { .. }));
        assert!(block.is_empty());
    }

    #[test]
    fn write_sanitizes_separator() {
        let mut block = intro();
        block.write(t("0:2:0"), "a |test| b").unwrap();
        assert_eq!(block.get(t("0:2:0")), Some("a ｜test｜ b"));
    }

    #[test]
    fn sanitize_flattens_lines() {
        assert_eq!(sanitize("  one\ntwo\r\nthree  "), "one two  three");
    }

    #[test]
    fn remove_exact() {
        let mut block = intro();
        block.write(t("0:1:0"), "a").unwrap();
        block.write(t("0:2:0"), "b").unwrap();

        assert_eq!(block.remove(t("0:1:0")).unwrap(), "a");
        assert_eq!(block.get(t("0:1:0")), None);
        assert_eq!(block.get(t("0:2:0")), Some("b"));
    }

    #[test]
    fn remove_within_tolerance() {
        let mut block = intro();
        block.write(t("0:1:0.25"), "a").unwrap();
        assert_eq!(block.remove(t("0:1:0.26")).unwrap(), "a");
        assert!(block.is_empty());
    }

    #[test]
    fn remove_missing_fails() {
        let mut block = intro();
        block.write(t("0:1:0"), "a").unwrap();
        let error = block.remove(t("0:1:0.02")).unwrap_err();
        assert!(matches!(error, Error::NotFound { .. }));
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = OutlineBlock::new(Topic::new("X").unwrap(), t("0:2:0"), t("0:1:0"));
        assert!(matches!(result, Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn set_range_reports_outside_annotations() {
        let mut block = intro();
        block.write(t("0:1:0"), "a").unwrap();
        block.write(t("0:8:0"), "b").unwrap();

        assert_eq!(block.outside(t("0:0:0"), t("0:5:0")), vec![t("0:8:0")]);
        block.set_range(t("0:0:0"), t("0:5:0")).unwrap();
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn render_lists_annotations() {
        let mut block = intro();
        block.write(t("0:1:30"), "note A").unwrap();

        assert_eq!(
            block.render(),
            "\nIntro(0:0:0~0:10:0)\n|Time|Content|\n|---|---|\n|0:1:30|note A|\n"
        );
    }
}
