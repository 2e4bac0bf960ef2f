//! In-memory outline: a collection of blocks and time-based routing.
//!
//! The [`Outline`] knows nothing about the filesystem or the text format.
//! Blocks are kept in insertion order for display; routing sorts them by their
//! start time on demand.

use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    Topic,
    block::{self, OutlineBlock},
    time_point::TimePoint,
};

/// An ordered collection of uniquely named blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    blocks: Vec<OutlineBlock>,
    strict_ranges: bool,
}

impl Default for Outline {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            strict_ranges: true,
        }
    }
}

/// Errors raised by outline-level operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No block starts at or before the time.
    #[error("time {0} is out of range of the outline")]
    OutOfRange(TimePoint),

    /// No block has the given topic.
    #[error("block '{0}' does not exist in the outline")]
    TopicNotFound(String),

    /// Redefining the block would leave annotations outside its range.
    #[error(
        "cannot move block '{topic}' to {begin}~{end}: annotations at {} would fall outside it",
        list(.times)
    )]
    OrphanedAnnotations {
        /// The block being redefined.
        topic: Topic,
        /// Requested start.
        begin: TimePoint,
        /// Requested end.
        end: TimePoint,
        /// Times of the annotations that would be orphaned.
        times: Vec<TimePoint>,
    },

    /// The owning block rejected the operation.
    #[error(transparent)]
    Block(#[from] block::Error),
}

fn list(times: &[TimePoint]) -> String {
    times
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What [`Outline::define_block`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// A new, empty block was added.
    Created,
    /// An existing block's range was changed.
    Updated {
        /// Annotations now outside the block's range. Always empty when
        /// strict ranges are enforced.
        orphaned: Vec<TimePoint>,
    },
}

impl Outline {
    /// Creates an empty outline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether redefining a block may leave annotations outside its
    /// range (see [`Outline::define_block`]).
    #[must_use]
    pub const fn with_strict_ranges(mut self, strict: bool) -> Self {
        self.strict_ranges = strict;
        self
    }

    /// Builds an outline from decoded blocks.
    ///
    /// A later block with the same topic as an earlier one replaces it in
    /// place.
    pub fn from_blocks(blocks: impl IntoIterator<Item = OutlineBlock>) -> Self {
        let mut outline = Self::new();
        for block in blocks {
            outline.insert(block);
        }
        outline
    }

    /// Inserts a block, replacing any block with the same topic.
    ///
    /// Returns the replaced block.
    pub fn insert(&mut self, block: OutlineBlock) -> Option<OutlineBlock> {
        if let Some(index) = self.position(block.topic()) {
            tracing::warn!("Duplicate block '{}' replaces the earlier one", block.topic());
            return Some(std::mem::replace(&mut self.blocks[index], block));
        }
        self.blocks.push(block);
        None
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = &OutlineBlock> {
        self.blocks.iter()
    }

    /// The number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the outline has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Looks up a block by topic.
    #[must_use]
    pub fn block(&self, topic: &str) -> Option<&OutlineBlock> {
        self.position(topic).map(|index| &self.blocks[index])
    }

    fn position(&self, topic: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.topic() == topic)
    }

    /// Defines a new block or changes the range of an existing one.
    ///
    /// Annotations of an existing block are never moved or dropped. When
    /// strict ranges are enforced (the default) a redefinition which would
    /// leave any of them outside the new range is refused; otherwise it is
    /// applied and the orphaned times are reported back.
    ///
    /// # Errors
    ///
    /// - [`block::Error::InvalidRange`] if `begin` is after `end`
    /// - [`Error::OrphanedAnnotations`] under strict ranges, as above
    #[instrument(level = "debug", skip(self))]
    pub fn define_block(
        &mut self,
        topic: Topic,
        begin: TimePoint,
        end: TimePoint,
    ) -> Result<Definition, Error> {
        if begin.compare(&end).is_gt() {
            return Err(block::Error::InvalidRange { begin, end }.into());
        }
        let Some(index) = self.position(&topic) else {
            self.blocks.push(OutlineBlock::new(topic, begin, end)?);
            return Ok(Definition::Created);
        };

        let block = &mut self.blocks[index];
        let orphaned = block.outside(begin, end);
        if !orphaned.is_empty() {
            if self.strict_ranges {
                return Err(Error::OrphanedAnnotations {
                    topic,
                    begin,
                    end,
                    times: orphaned,
                });
            }
            tracing::warn!(
                "Block '{topic}' now has annotations outside {begin}~{end}: {}",
                list(&orphaned)
            );
        }
        block.set_range(begin, end)?;
        Ok(Definition::Updated { orphaned })
    }

    /// Removes a block and all of its annotations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TopicNotFound`] if no block has that topic.
    pub fn remove_block(&mut self, topic: &str) -> Result<OutlineBlock, Error> {
        let index = self
            .position(topic)
            .ok_or_else(|| Error::TopicNotFound(topic.to_string()))?;
        Ok(self.blocks.remove(index))
    }

    /// Finds the block responsible for `time`.
    ///
    /// Blocks are sorted by start time and the last one starting at or before
    /// `time` (see [`TimePoint::compare`]) is chosen. Its end is *not* checked here: in a gapless partition
    /// that block is always the owner, and a time falling in a gap or past the
    /// last block is rejected by the block itself. A time shared by the end of
    /// one block and the start of the next belongs to the later block.
    ///
    /// Blocks with equal start times keep their insertion order, so the one
    /// added last wins.
    fn route(&self, time: TimePoint) -> Result<usize, Error> {
        let mut order: Vec<usize> = (0..self.blocks.len()).collect();
        order.sort_by_key(|&index| self.blocks[index].begin());

        let candidates =
            order.partition_point(|&index| self.blocks[index].begin().compare(&time).is_le());
        let index = candidates
            .checked_sub(1)
            .map(|slot| order[slot])
            .ok_or(Error::OutOfRange(time))?;

        tracing::debug!("Routed {time} to block '{}'", self.blocks[index].topic());
        Ok(index)
    }

    /// The block responsible for `time`, if its own range accepts it.
    #[must_use]
    pub fn owner_of(&self, time: TimePoint) -> Option<&OutlineBlock> {
        self.route(time)
            .ok()
            .map(|index| &self.blocks[index])
            .filter(|block| block.contains(time))
    }

    /// Routes an annotation to its block and writes it there.
    ///
    /// Returns the topic of the block written to.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `time` precedes every block
    /// - [`block::Error::OutOfRange`] if the chosen block does not cover `time`
    pub fn add_annotation(&mut self, time: TimePoint, content: &str) -> Result<Topic, Error> {
        let index = self.route(time)?;
        let block = &mut self.blocks[index];
        block.write(time, content)?;
        Ok(block.topic().clone())
    }

    /// Routes a removal to the block responsible for `time`.
    ///
    /// Returns the topic of the block and the removed content.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `time` precedes every block
    /// - [`block::Error::NotFound`] if the chosen block has no annotation at
    ///   `time`
    pub fn remove_annotation(&mut self, time: TimePoint) -> Result<(Topic, String), Error> {
        let index = self.route(time)?;
        let block = &mut self.blocks[index];
        let content = block.remove(time)?;
        Ok((block.topic().clone(), content))
    }

    /// Renders every block as a table, separated by dividers.
    #[must_use]
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(|block| format!("\n{}-----\n", block.render()))
            .collect()
    }
}
