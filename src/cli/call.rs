use clap::Parser;
use outline::Operation;
use tracing::instrument;

use super::{Location, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Call {
    /// The tool to call, e.g. `add_annotation`
    name: String,

    /// Arguments as a JSON object
    #[arg(default_value = "{}")]
    arguments: String,
}

impl Call {
    /// Dispatches the call and prints the message an agent would receive.
    ///
    /// The outline is saved only when a mutating call succeeds.
    #[instrument(skip(location))]
    pub fn run(self, location: &Location) -> anyhow::Result<()> {
        let mut document = location.open()?;

        let operation = match Operation::from_call(&self.name, &self.arguments) {
            Ok(operation) => operation,
            Err(error) => {
                let message = format!("Error calling function {}: {error}", self.name.trim());
                println!("{}", message.warning());
                return Ok(());
            }
        };

        match operation.apply(&mut document) {
            Ok(message) => {
                if operation.is_mutation() {
                    document.save()?;
                }
                println!("{message}");
            }
            Err(error) => {
                let message = format!("Error calling function {}: {error}", operation.name());
                println!("{}", message.warning());
            }
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Tools {}

impl Tools {
    pub fn run(self) {
        let definitions = Operation::definitions();
        match serde_json::to_string_pretty(&definitions) {
            Ok(text) => println!("{text}"),
            Err(error) => tracing::error!("Failed to serialize tool definitions: {error}"),
        }
    }
}
