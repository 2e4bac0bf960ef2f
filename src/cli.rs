use std::path::{Path, PathBuf};

mod call;
mod show;
mod terminal;

use call::{Call, Tools};
use clap::ArgAction;
use outline::{Config, Definition, OutlineDocument};
use show::Show;
use terminal::Colorize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory holding the outline and its `.outline` configuration
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Outline file to use instead of the configured one (relative to the
    /// root)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let location = Location {
            root: self.root,
            file: self.file,
        };
        self.command
            .unwrap_or_else(|| Command::Show(Show::default()))
            .run(&location)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Where the outline lives.
#[derive(Debug)]
struct Location {
    root: PathBuf,
    file: Option<PathBuf>,
}

impl Location {
    /// Loads the outline, honouring a `--file` override.
    fn open(&self) -> anyhow::Result<OutlineDocument> {
        let document = match &self.file {
            Some(file) => {
                let config = Config::load_from_root(&self.root).map_err(anyhow::Error::msg)?;
                OutlineDocument::load(self.root.join(file), config)?
            }
            None => OutlineDocument::open(&self.root)?,
        };
        tracing::debug!("Using outline {}", document.path().display());
        Ok(document)
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show the outline (default)
    Show(Show),

    /// Write a default configuration
    Init,

    /// Create a block, or change the range of an existing one
    Block(Block),

    /// Delete a block and all of its annotations
    RemoveBlock(RemoveBlock),

    /// Add an annotation; the block whose range contains the time receives it
    Add(Add),

    /// Delete the annotation at a time
    Remove(Remove),

    /// Run a tool call as an agent would and print its result
    Call(Call),

    /// Print the tool definitions as JSON
    Tools(Tools),
}

impl Command {
    fn run(self, location: &Location) -> anyhow::Result<()> {
        match self {
            Self::Show(command) => command.run(location)?,
            Self::Init => Init::run(&location.root)?,
            Self::Block(command) => command.run(location)?,
            Self::RemoveBlock(command) => command.run(location)?,
            Self::Add(command) => command.run(location)?,
            Self::Remove(command) => command.run(location)?,
            Self::Call(command) => command.run(location)?,
            Self::Tools(command) => command.run(),
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Init;

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        let config_path = Config::path_in(root);
        if config_path.exists() {
            anyhow::bail!(
                "Outline already initialized (found {})",
                config_path.display()
            );
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create {}: {e}", parent.display())
            })?;
        }

        let config = Config::default();
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        println!("Initialized outline in {}", root.display());
        println!("  Created: {}", config_path.display());
        println!("  Outline: {}", root.join(config.file()).display());
        println!();
        println!("Next steps:");
        println!("  outline block \"Introduction\" 0:0:0 0:10:0");
        println!("  outline add 0:1:30 \"Opening remarks\"");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Block {
    /// The block's topic
    topic: String,

    /// Start of the range, as h:m:s
    begin: String,

    /// End of the range, as h:m:s
    end: String,
}

impl Block {
    #[instrument(skip(location))]
    fn run(self, location: &Location) -> anyhow::Result<()> {
        let mut document = location.open()?;
        let definition = document.define_block(&self.topic, &self.begin, &self.end)?;
        document.save()?;

        let block = document
            .block(self.topic.trim())
            .ok_or_else(|| anyhow::anyhow!("block '{}' vanished after saving", self.topic))?;
        let range = format!("{}~{}", block.begin(), block.end());
        match definition {
            Definition::Created => {
                println!("{}", format!("Created block '{}' ({range})", block.topic()).success());
            }
            Definition::Updated { orphaned } => {
                println!("{}", format!("Updated block '{}' ({range})", block.topic()).success());
                if !orphaned.is_empty() {
                    let times: Vec<_> = orphaned.iter().map(ToString::to_string).collect();
                    println!(
                        "{}",
                        format!("  annotations now outside the range: {}", times.join(", "))
                            .warning()
                    );
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct RemoveBlock {
    /// The block's topic
    topic: String,

    /// Skip confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl RemoveBlock {
    #[instrument(skip(location))]
    fn run(self, location: &Location) -> anyhow::Result<()> {
        let mut document = location.open()?;
        let topic = self.topic.trim();

        let Some(block) = document.block(topic) else {
            anyhow::bail!("Block '{topic}' does not exist");
        };

        if !self.yes && !block.is_empty() {
            let prompt = format!(
                "Delete block '{topic}' and its {} annotation(s)?",
                block.len()
            );
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Cancelled".dim());
                return Ok(());
            }
        }

        let removed = document.remove_block(topic)?;
        document.save()?;
        println!(
            "{}",
            format!(
                "Removed block '{}' ({} annotation(s))",
                removed.topic(),
                removed.len()
            )
            .success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// When the annotation applies, as h:m:s
    time: String,

    /// The annotation text
    content: String,
}

impl Add {
    #[instrument(skip(location))]
    fn run(self, location: &Location) -> anyhow::Result<()> {
        let mut document = location.open()?;
        let topic = document.add_annotation(&self.time, &self.content)?;
        document.save()?;
        println!(
            "{}",
            format!("Added annotation at {} to '{topic}'", self.time.trim()).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Remove {
    /// The annotation's time, as h:m:s
    time: String,
}

impl Remove {
    #[instrument(skip(location))]
    fn run(self, location: &Location) -> anyhow::Result<()> {
        let mut document = location.open()?;
        let (topic, content) = document.remove_annotation(&self.time)?;
        document.save()?;
        println!(
            "{}",
            format!("Removed annotation at {} from '{topic}'", self.time.trim()).success()
        );
        println!("  {}", content.dim());
        Ok(())
    }
}
