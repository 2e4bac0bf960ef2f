//! A file-backed outline.
//!
//! The [`OutlineDocument`] pairs the filesystem-agnostic [`Outline`] with the
//! file it is read from and written to. Its editing methods take raw strings,
//! as received from a user or a tool call, and parse them before delegating.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::instrument;

use crate::{
    domain::{
        Config, Definition, InvalidTimeValue, InvalidTopic, Outline, OutlineBlock, TimePoint,
        Topic, block, outline,
    },
    storage::text::{self, DecodeError, Options},
};

/// An outline together with the file that stores it.
#[derive(Debug, Clone)]
pub struct OutlineDocument {
    path: PathBuf,
    config: Config,
    outline: Outline,
}

/// Errors that can occur when loading a document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file exists but could not be read.
    #[error("failed to read outline {}", .path.display())]
    Io {
        /// The outline file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file could not be decoded.
    #[error("failed to decode outline {}", .path.display())]
    Decode {
        /// The outline file.
        path: PathBuf,
        /// The underlying error.
        source: DecodeError,
    },

    /// The root's configuration file could not be loaded.
    #[error("{0}")]
    Config(String),
}

/// Errors that can occur when saving a document.
#[derive(Debug, thiserror::Error)]
#[error("failed to write outline {}", .path.display())]
pub struct SaveError {
    path: PathBuf,
    source: io::Error,
}

/// Errors raised by editing a document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// A time argument could not be parsed.
    #[error(transparent)]
    Time(#[from] InvalidTimeValue),

    /// A topic argument was not a valid topic.
    #[error(transparent)]
    Topic(#[from] InvalidTopic),

    /// The outline rejected the edit.
    #[error(transparent)]
    Outline(#[from] outline::Error),
}

/// Broad category of an [`EditError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or negative time input.
    InvalidTimeValue,
    /// Malformed topic input.
    InvalidTopic,
    /// A block range which ends before it begins.
    InvalidRange,
    /// A time outside every block, or outside the block it was routed to.
    OutOfRange,
    /// A topic or annotation which does not exist.
    NotFound,
    /// A range change refused because it would strand annotations.
    OrphanedAnnotations,
}

impl EditError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Time(_) => ErrorKind::InvalidTimeValue,
            Self::Topic(_) => ErrorKind::InvalidTopic,
            Self::Outline(error) => match error {
                outline::Error::OutOfRange(_)
                | outline::Error::Block(block::Error::OutOfRange { .. }) => ErrorKind::OutOfRange,
                outline::Error::TopicNotFound(_)
                | outline::Error::Block(block::Error::NotFound { .. }) => ErrorKind::NotFound,
                outline::Error::Block(block::Error::InvalidRange { .. }) => ErrorKind::InvalidRange,
                outline::Error::OrphanedAnnotations { .. } => ErrorKind::OrphanedAnnotations,
            },
        }
    }
}

impl OutlineDocument {
    /// Creates an empty document which will be saved to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        let outline = Outline::new().with_strict_ranges(config.strict_ranges);
        Self {
            path: path.into(),
            config,
            outline,
        }
    }

    /// Loads the document stored at `path`.
    ///
    /// A missing file is not an error: it yields an empty document which will
    /// be created on the first save.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    #[instrument(level = "debug", skip_all)]
    pub fn load(path: impl Into<PathBuf>, config: Config) -> Result<Self, LoadError> {
        let mut document = Self::new(path, config);
        document.reload()?;
        Ok(document)
    }

    /// Opens the document configured for an outline root.
    ///
    /// The configuration is read from `<root>/.outline/config.toml` when
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the outline file cannot be
    /// loaded.
    pub fn open(root: &Path) -> Result<Self, LoadError> {
        let config = Config::load_from_root(root).map_err(LoadError::Config)?;
        let path = root.join(config.file());
        Self::load(path, config)
    }

    /// Replaces the in-memory outline with the current file contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded. The
    /// in-memory outline is unchanged on error.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} not found; starting empty", self.path.display());
                String::new()
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let blocks =
            text::decode(&content, self.options()).map_err(|source| LoadError::Decode {
                path: self.path.clone(),
                source,
            })?;
        self.outline =
            Outline::from_blocks(blocks).with_strict_ranges(self.config.strict_ranges);
        tracing::debug!(
            "Loaded {} block(s) from {}",
            self.outline.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Writes the whole document to its file, replacing previous contents.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn save(&self) -> Result<(), SaveError> {
        self.write_file().map_err(|source| SaveError {
            path: self.path.clone(),
            source,
        })
    }

    fn write_file(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(self.encode().as_bytes())?;
        writer.flush()
    }

    /// The document in the text format, as [`OutlineDocument::save`] writes
    /// it.
    #[must_use]
    pub fn encode(&self) -> String {
        text::encode(self.outline.blocks(), self.options())
    }

    fn options(&self) -> Options {
        Options::from(&self.config)
    }

    /// The file backing this document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The in-memory outline.
    #[must_use]
    pub const fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Looks up a block by topic.
    #[must_use]
    pub fn block(&self, topic: &str) -> Option<&OutlineBlock> {
        self.outline.block(topic)
    }

    /// Defines a block, or changes the range of an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be parsed or the outline refuses
    /// the range (see [`Outline::define_block`]).
    pub fn define_block(
        &mut self,
        topic: &str,
        begin: &str,
        end: &str,
    ) -> Result<Definition, EditError> {
        let topic = Topic::new(topic)?;
        let begin: TimePoint = begin.parse()?;
        let end: TimePoint = end.parse()?;
        Ok(self.outline.define_block(topic, begin, end)?)
    }

    /// Removes a block and its annotations.
    ///
    /// # Errors
    ///
    /// Returns an error if no block has that topic.
    pub fn remove_block(&mut self, topic: &str) -> Result<OutlineBlock, EditError> {
        Ok(self.outline.remove_block(topic.trim())?)
    }

    /// Adds an annotation to the block responsible for `time`.
    ///
    /// Returns the topic of that block.
    ///
    /// # Errors
    ///
    /// Returns an error if `time` cannot be parsed or no block covers it.
    pub fn add_annotation(&mut self, time: &str, content: &str) -> Result<Topic, EditError> {
        let time: TimePoint = time.parse()?;
        Ok(self.outline.add_annotation(time, content)?)
    }

    /// Removes the annotation at `time`.
    ///
    /// Returns the topic of the block it was removed from and its content.
    ///
    /// # Errors
    ///
    /// Returns an error if `time` cannot be parsed, no block covers it, or no
    /// annotation is stored there.
    pub fn remove_annotation(&mut self, time: &str) -> Result<(Topic, String), EditError> {
        let time: TimePoint = time.parse()?;
        Ok(self.outline.remove_annotation(time)?)
    }

    /// Renders the document as human-readable tables.
    #[must_use]
    pub fn render(&self) -> String {
        self.outline.render()
    }
}
