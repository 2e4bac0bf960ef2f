use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The directory, relative to an outline root, holding configuration.
pub const CONFIG_DIR: &str = ".outline";

/// The configuration file name within [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Configuration for an outline root.
///
/// This struct holds settings that control where the outline is stored and
/// how strictly it is read and edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The outline file, relative to the root.
    file: PathBuf,

    /// Whether redefining a block may leave existing annotations outside its
    /// new range.
    ///
    /// When `true` (default) such a redefinition is refused.
    pub strict_ranges: bool,

    /// Whether annotation lines with unreadable times are skipped on load.
    ///
    /// When `false` (default) loading fails on the first such line.
    pub skip_malformed: bool,

    /// Whether each block's range is written as a header line.
    ///
    /// Without it, ranges are inferred from the first and last annotation on
    /// the next load, and empty blocks are lost.
    pub persist_ranges: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: default_file(),
            strict_ranges: true,
            skip_malformed: false,
            persist_ranges: true,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration for an outline root, falling back to the
    /// defaults when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be read or
    /// parsed.
    pub fn load_from_root(root: &Path) -> Result<Self, String> {
        let path = Self::path_in(root);
        if !path.exists() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The configuration file location for an outline root.
    #[must_use]
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// The outline file, relative to the root.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Sets the outline file, relative to the root.
    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.file = file.into();
    }
}

fn default_file() -> PathBuf {
    PathBuf::from("outline.txt")
}

const fn default_true() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_file")]
        file: PathBuf,

        #[serde(default = "default_true")]
        strict_ranges: bool,

        #[serde(default)]
        skip_malformed: bool,

        #[serde(default = "default_true")]
        persist_ranges: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                file,
                strict_ranges,
                skip_malformed,
                persist_ranges,
            } => Self {
                file,
                strict_ranges,
                skip_malformed,
                persist_ranges,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            file: config.file,
            strict_ranges: config.strict_ranges,
            skip_malformed: config.skip_malformed,
            persist_ranges: config.persist_ranges,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nfile = \"lecture.txt\"\nstrict_ranges = false\nskip_malformed = true\npersist_ranges = false\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.file(), Path::new("lecture.txt"));
        assert!(!config.strict_ranges);
        assert!(config.skip_malformed);
        assert!(!config.persist_ranges);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nstrict_ranges = \"yes\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn root_without_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from_root(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn save_then_load_from_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(CONFIG_DIR)).unwrap();

        let mut config = Config::default();
        config.set_file("talk.txt");
        config.skip_malformed = true;
        config.save(&Config::path_in(tmp.path())).unwrap();

        assert_eq!(Config::load_from_root(tmp.path()).unwrap(), config);
    }
}
