use clap::Parser;
use tracing::instrument;

use super::{Location, terminal::paint_outline};

#[derive(Debug, Default, Parser)]
#[command(about = "Display the outline")]
pub struct Show {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    /// Tables, as an agent would see them
    #[default]
    Pretty,
    /// The stored file format
    Text,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, location: &Location) -> anyhow::Result<()> {
        let document = location.open()?;

        match self.output {
            OutputFormat::Pretty => print!("{}", paint_outline(&document.render())),
            OutputFormat::Text => print!("{}", document.encode()),
            OutputFormat::Json => {
                use serde_json::json;

                let blocks: Vec<_> = document
                    .outline()
                    .blocks()
                    .map(|block| {
                        let annotations: Vec<_> = block
                            .annotations()
                            .map(|(time, content)| {
                                json!({ "time": time.to_string(), "content": content })
                            })
                            .collect();
                        json!({
                            "topic": block.topic().to_string(),
                            "begin": block.begin().to_string(),
                            "end": block.end().to_string(),
                            "annotations": annotations,
                        })
                    })
                    .collect();
                let output = json!({
                    "file": document.path().display().to_string(),
                    "blocks": blocks,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }

        Ok(())
    }
}
