//! The line-oriented outline text format.
//!
//! ```text
//!
//! Intro
//! @range 0:0:0~0:10:0
//! 0:1:30|note A
//! *****
//!
//! Body
//! @range 0:10:0~0:20:0
//! 0:12:0|note B
//! *****
//! ```
//!
//! Each block is a topic line, an optional range header, one `time|content`
//! line per annotation and a closing `*****` line. Files written without range
//! headers are still read: the range is then taken from the first and last
//! annotation.

use std::{collections::BTreeMap, fmt::Write as _};

use crate::domain::{
    END_MARKER, HEADER_PREFIX, InvalidTimeValue, InvalidTopic, OutlineBlock, Topic,
    block::FIELD_SEPARATOR, time_point::TimePoint,
};

/// The header keyword which introduces a block's range.
const RANGE_HEADER: &str = "range";

/// The separator between the start and end of a range header.
const RANGE_SEPARATOR: char = '~';

/// Options controlling how outline text is read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Write a range header for every block.
    pub persist_ranges: bool,
    /// Skip annotation lines with unreadable times instead of failing.
    pub skip_malformed: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            persist_ranges: true,
            skip_malformed: false,
        }
    }
}

impl From<&crate::domain::Config> for Options {
    fn from(config: &crate::domain::Config) -> Self {
        Self {
            persist_ranges: config.persist_ranges,
            skip_malformed: config.skip_malformed,
        }
    }
}

/// Errors that can occur when decoding outline text.
///
/// Line numbers are 1-based and relative to the decoded text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// An annotation or range header had an unreadable time.
    #[error("line {line}: {source}")]
    Time {
        /// The offending line.
        line: usize,
        /// Why the time could not be read.
        source: InvalidTimeValue,
    },

    /// The topic line is not a valid topic.
    #[error("line {line}: {source}")]
    Topic {
        /// The offending line.
        line: usize,
        /// Why the topic was rejected.
        source: InvalidTopic,
    },

    /// A range header was malformed or inverted.
    #[error("line {line}: malformed range header '{text}'")]
    Range {
        /// The offending line.
        line: usize,
        /// The header as written.
        text: String,
    },
}

/// Encodes one block, including its closing marker and trailing newline.
#[must_use]
pub fn encode_block(block: &OutlineBlock, options: Options) -> String {
    let mut out = format!("\n{}\n", block.topic());
    if options.persist_ranges {
        let _ = writeln!(
            out,
            "{HEADER_PREFIX}{RANGE_HEADER} {}{RANGE_SEPARATOR}{}",
            block.begin(),
            block.end()
        );
    }
    for (time, content) in block.annotations() {
        let _ = writeln!(out, "{time}{FIELD_SEPARATOR}{content}");
    }
    out.push_str(END_MARKER);
    out.push('\n');
    out
}

/// Encodes blocks in the given order.
pub fn encode<'a>(blocks: impl IntoIterator<Item = &'a OutlineBlock>, options: Options) -> String {
    blocks
        .into_iter()
        .map(|block| encode_block(block, options))
        .collect()
}

/// Decodes the text of a single block.
///
/// Returns `None` if the text holds no block: it is blank, or it has neither a
/// range header nor any annotation line.
///
/// # Errors
///
/// Returns an error if the topic, a range header or an annotation time cannot
/// be read (unless [`Options::skip_malformed`] is set, in which case bad
/// annotation lines are skipped).
pub fn decode_block(text: &str, options: Options) -> Result<Option<OutlineBlock>, DecodeError> {
    decode_lines(text.lines().enumerate().map(|(i, l)| (i + 1, l)), options)
}

/// Decodes a whole document into blocks, in file order.
///
/// Blocks are separated by lines consisting of `*****`. Segments holding no
/// block are dropped.
///
/// # Errors
///
/// Returns the first error from [`decode_block`].
pub fn decode(text: &str, options: Options) -> Result<Vec<OutlineBlock>, DecodeError> {
    let mut blocks = Vec::new();
    let mut segment = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim() == END_MARKER {
            blocks.extend(decode_lines(segment.drain(..), options)?);
        } else {
            segment.push((index + 1, line));
        }
    }
    // a final block without its marker is still a block
    blocks.extend(decode_lines(segment.drain(..), options)?);

    Ok(blocks)
}

fn decode_lines<'a>(
    lines: impl Iterator<Item = (usize, &'a str)>,
    options: Options,
) -> Result<Option<OutlineBlock>, DecodeError> {
    let mut lines = lines.filter(|(_, line)| !line.trim().is_empty()).peekable();

    let Some((topic_line, topic)) = lines.next() else {
        return Ok(None);
    };
    if topic.trim() == END_MARKER {
        return Ok(None);
    }

    let range = match lines.peek() {
        Some(&(line, text)) if is_range_header(text) => {
            lines.next();
            Some(parse_range(line, text)?)
        }
        _ => None,
    };

    let mut annotations = BTreeMap::new();
    for (line, text) in lines {
        let text = text.trim();
        if text == END_MARKER {
            break;
        }
        let Some((time, content)) = text.split_once(FIELD_SEPARATOR) else {
            tracing::warn!("line {line}: ignoring '{text}', which is not an annotation");
            continue;
        };
        match time.parse::<TimePoint>() {
            Ok(time) => {
                annotations.insert(time, content.trim().to_string());
            }
            Err(source) if options.skip_malformed => {
                tracing::warn!("line {line}: skipping annotation: {source}");
            }
            Err(source) => return Err(DecodeError::Time { line, source }),
        }
    }

    let (begin, end) = match range {
        Some(range) => range,
        None => {
            let (Some(first), Some(last)) = (annotations.keys().next(), annotations.keys().next_back())
            else {
                tracing::debug!("line {topic_line}: dropping '{topic}', which has no annotations");
                return Ok(None);
            };
            (*first, *last)
        }
    };

    let topic = Topic::new(topic).map_err(|source| DecodeError::Topic {
        line: topic_line,
        source,
    })?;

    let block = OutlineBlock::from_parts(topic, begin, end, annotations);
    let outside = block.outside(begin, end);
    if !outside.is_empty() {
        tracing::warn!(
            "Block '{}' has {} annotation(s) outside its range {begin}~{end}",
            block.topic(),
            outside.len()
        );
    }
    Ok(Some(block))
}

fn is_range_header(text: &str) -> bool {
    text.trim()
        .strip_prefix(HEADER_PREFIX)
        .is_some_and(|rest| rest.starts_with(RANGE_HEADER))
}

fn parse_range(line: usize, text: &str) -> Result<(TimePoint, TimePoint), DecodeError> {
    let malformed = || DecodeError::Range {
        line,
        text: text.trim().to_string(),
    };

    let body = text
        .trim()
        .strip_prefix(HEADER_PREFIX)
        .and_then(|rest| rest.strip_prefix(RANGE_HEADER))
        .ok_or_else(malformed)?;
    let (begin, end) = body.split_once(RANGE_SEPARATOR).ok_or_else(malformed)?;

    let begin = begin
        .parse::<TimePoint>()
        .map_err(|source| DecodeError::Time { line, source })?;
    let end = end
        .parse::<TimePoint>()
        .map_err(|source| DecodeError::Time { line, source })?;

    if begin.compare(&end).is_gt() {
        return Err(malformed());
    }
    Ok((begin, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn sample() -> OutlineBlock {
        let mut block =
            OutlineBlock::new(Topic::new("Intro").unwrap(), t("0:0:0"), t("0:10:0")).unwrap();
        block.write(t("0:5:0"), "later").unwrap();
        block.write(t("0:1:30.5"), "note |A|").unwrap();
        block
    }

    #[test]
    fn encodes_in_time_order() {
        assert_eq!(
            encode_block(&sample(), Options::default()),
            "\nIntro\n@range 0:0:0~0:10:0\n0:1:30.5|note ｜A｜\n0:5:0|later\n*****\n"
        );
    }

    #[test]
    fn encodes_without_range_header() {
        let options = Options {
            persist_ranges: false,
            ..Options::default()
        };
        assert_eq!(
            encode_block(&sample(), options),
            "\nIntro\n0:1:30.5|note ｜A｜\n0:5:0|later\n*****\n"
        );
    }

    #[test]
    fn block_round_trip() {
        let block = sample();
        let decoded = decode_block(&encode_block(&block, Options::default()), Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn legacy_block_infers_range_from_annotations() {
        let text = "\nIntro\n0:1:0|a\n0:4:0|b\n*****";
        let block = decode_block(text, Options::default()).unwrap().unwrap();
        assert_eq!(block.begin(), t("0:1:0"));
        assert_eq!(block.end(), t("0:4:0"));
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn empty_block_survives_with_range_header() {
        let block =
            OutlineBlock::new(Topic::new("Outro").unwrap(), t("0:20:0"), t("0:30:0")).unwrap();
        let text = encode_block(&block, Options::default());
        assert_eq!(decode_block(&text, Options::default()).unwrap(), Some(block));
    }

    #[test]
    fn segments_without_annotations_or_header_are_dropped() {
        assert_eq!(decode_block("\n\n  \n", Options::default()).unwrap(), None);
        assert_eq!(decode_block("\njust a title\n", Options::default()).unwrap(), None);
    }

    #[test]
    fn content_splits_on_first_separator_only() {
        let block = decode_block("T\n0:0:1|a|b\n", Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(block.get(t("0:0:1")), Some("a|b"));
    }

    #[test]
    fn stray_lines_are_ignored() {
        let block = decode_block("T\nsome commentary\n0:0:1|a\n", Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn bad_time_fails_with_line_number() {
        let error = decode("\nT\n0:0:1|a\nnoon|b\n*****\n", Options::default()).unwrap_err();
        assert!(matches!(error, DecodeError::Time { line: 4, .. }));
    }

    #[test]
    fn bad_time_can_be_skipped() {
        let options = Options {
            skip_malformed: true,
            ..Options::default()
        };
        let blocks = decode("\nT\n0:0:1|a\nnoon|b\n*****\n", options).unwrap();
        assert_eq!(blocks[0].len(), 1);
    }

    #[test]
    fn inverted_range_header_fails() {
        let error = decode_block("T\n@range 0:2:0~0:1:0\n", Options::default()).unwrap_err();
        assert!(matches!(error, DecodeError::Range { line: 2, .. }));
    }

    #[test]
    fn range_header_without_separator_fails() {
        let error = decode_block("T\n@range 0:2:0\n", Options::default()).unwrap_err();
        assert!(matches!(error, DecodeError::Range { .. }));
    }

    #[test]
    fn decodes_documents_in_file_order() {
        let text = "\nB\n@range 0:10:0~0:20:0\n0:12:0|two\n*****\n\
                    \nnoise without separators\n*****\n\
                    \nA\n0:1:0|one\n*****\n";
        let blocks = decode(text, Options::default()).unwrap();
        let topics: Vec<_> = blocks.iter().map(|b| b.topic().as_str()).collect();
        assert_eq!(topics, ["B", "A"]);
    }

    #[test]
    fn marker_inside_content_does_not_split() {
        let text = "\nA\n0:1:0|stars ***** here\n*****\n";
        let blocks = decode(text, Options::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get(t("0:1:0")), Some("stars ***** here"));
    }
}
