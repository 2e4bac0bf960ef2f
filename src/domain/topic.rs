use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;

/// Lines beginning with this marker inside a block carry block metadata.
pub(crate) const HEADER_PREFIX: char = '@';

/// The line which terminates a block in the text format.
pub(crate) const END_MARKER: &str = "*****";

/// The name of an outline block.
///
/// A topic is the unique key of a block within an outline. It occupies a whole
/// line in the text format, so it must be a single non-blank line, must not
/// begin with the header marker `@` and must not be the end-of-block marker.
/// Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Topic(NonEmptyString);

impl Topic {
    /// Creates a new `Topic` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTopic` if the trimmed string is empty, spans more than
    /// one line, starts with `@`, or is the end-of-block marker.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidTopic> {
        let s = s.into();
        let trimmed = s.trim();

        if trimmed.contains(['\n', '\r'])
            || trimmed.starts_with(HEADER_PREFIX)
            || trimmed == END_MARKER
        {
            return Err(InvalidTopic(s));
        }

        let non_empty = NonEmptyString::new(trimmed.to_string()).map_err(|_| InvalidTopic(s))?;
        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Topic {
    type Error = InvalidTopic;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Topic {
    type Error = InvalidTopic;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Topic {
    type Err = InvalidTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Topic {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl PartialEq<str> for Topic {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Topic {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string cannot be used as a block topic.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Invalid topic '{0}': must be a single non-blank line, not starting with '@' or equal to '*****'")]
pub struct InvalidTopic(String);

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn topic_is_trimmed() {
        let topic = Topic::new("  Intro \t").unwrap();
        assert_eq!(topic.as_str(), "Intro");
        assert_eq!(topic, "Intro");
    }

    #[test]
    fn unicode_topics_are_accepted() {
        assert_eq!(Topic::new("第一部分").unwrap().as_str(), "第一部分");
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    #[test_case("two\nlines"; "multi line")]
    #[test_case("@range"; "header marker")]
    #[test_case("*****"; "end marker")]
    fn invalid_topics(input: &str) {
        assert_eq!(Topic::new(input), Err(InvalidTopic(input.to_string())));
    }
}
