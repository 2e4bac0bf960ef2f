//! The operations an agent may perform on an outline.
//!
//! Tool calls arrive as a function name and a JSON object of string
//! arguments. [`Operation::from_call`] turns them into a typed [`Operation`],
//! [`Operation::apply`] runs it against a document, and
//! [`Operation::dispatch`] does the same but reports every outcome, including
//! failures, as text for the model to read.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    domain::Definition,
    storage::{EditError, OutlineDocument},
};

/// A single edit or query of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Write an annotation at a time; the owning block is found by routing.
    AddAnnotation {
        /// Time as `h:m:s`.
        time: String,
        /// Annotation text.
        content: String,
    },

    /// Delete the annotation at a time.
    RemoveAnnotation {
        /// Time as `h:m:s`.
        time: String,
    },

    /// Create a block, or change an existing block's range.
    DefineBlock {
        /// Block topic.
        topic: String,
        /// Range start as `h:m:s`.
        begin: String,
        /// Range end as `h:m:s`.
        end: String,
    },

    /// Delete a block and its annotations.
    RemoveBlock {
        /// Block topic.
        topic: String,
    },

    /// Show the outline.
    RenderOutline,
}

/// Errors that can occur when reading a tool call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// No operation has that name.
    #[error("Function {0} not found.")]
    UnknownTool(String),

    /// The arguments were not valid JSON or did not match the operation.
    #[error("invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),
}

const ADD_ANNOTATION: &str = "add_annotation";
const REMOVE_ANNOTATION: &str = "remove_annotation";
const DEFINE_BLOCK: &str = "define_block";
const REMOVE_BLOCK: &str = "remove_block";
const RENDER_OUTLINE: &str = "render_outline";

/// Every tool name, in definition order.
pub const TOOL_NAMES: [&str; 5] = [
    ADD_ANNOTATION,
    REMOVE_ANNOTATION,
    DEFINE_BLOCK,
    REMOVE_BLOCK,
    RENDER_OUTLINE,
];

const TIME_FORMAT: &str = "Time as h:m:s; seconds may have up to two decimal places";

impl Operation {
    /// Reads a tool call.
    ///
    /// `arguments` is a JSON object; an empty string is treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a known tool or the arguments do not
    /// fit it.
    pub fn from_call(name: &str, arguments: &str) -> Result<Self, CallError> {
        let name = name.trim();
        if !TOOL_NAMES.contains(&name) {
            return Err(CallError::UnknownTool(name.to_string()));
        }
        if name == RENDER_OUTLINE {
            return Ok(Self::RenderOutline);
        }

        let arguments: Value = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(arguments)?
        };
        let mut call = serde_json::Map::new();
        call.insert(name.to_string(), arguments);
        Ok(serde_json::from_value(Value::Object(call))?)
    }

    /// The tool name of this operation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddAnnotation { .. } => ADD_ANNOTATION,
            Self::RemoveAnnotation { .. } => REMOVE_ANNOTATION,
            Self::DefineBlock { .. } => DEFINE_BLOCK,
            Self::RemoveBlock { .. } => REMOVE_BLOCK,
            Self::RenderOutline => RENDER_OUTLINE,
        }
    }

    /// Whether the operation changes the outline.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::RenderOutline)
    }

    /// Runs the operation and describes what happened.
    ///
    /// The document is not saved.
    ///
    /// # Errors
    ///
    /// Returns the document's error if the operation is refused.
    pub fn apply(&self, document: &mut OutlineDocument) -> Result<String, EditError> {
        let message = match self {
            Self::AddAnnotation { time, content } => {
                let topic = document.add_annotation(time, content)?;
                format!("Added annotation at {} to block '{topic}'.", time.trim())
            }
            Self::RemoveAnnotation { time } => {
                let (topic, content) = document.remove_annotation(time)?;
                format!(
                    "Removed annotation at {} from block '{topic}': {content}",
                    time.trim()
                )
            }
            Self::DefineBlock { topic, begin, end } => {
                match document.define_block(topic, begin, end)? {
                    Definition::Created => format!("Created block '{}'.", topic.trim()),
                    Definition::Updated { orphaned } if orphaned.is_empty() => {
                        format!("Updated the range of block '{}'.", topic.trim())
                    }
                    Definition::Updated { orphaned } => format!(
                        "Updated the range of block '{}'; {} annotation(s) now lie outside it.",
                        topic.trim(),
                        orphaned.len()
                    ),
                }
            }
            Self::RemoveBlock { topic } => {
                let block = document.remove_block(topic)?;
                format!(
                    "Removed block '{}' and its {} annotation(s).",
                    block.topic(),
                    block.len()
                )
            }
            Self::RenderOutline if document.outline().is_empty() => {
                "The outline is empty.".to_string()
            }
            Self::RenderOutline => document.render(),
        };
        tracing::info!("{}: {message}", self.name());
        Ok(message)
    }

    /// Runs the operation, turning any error into a message.
    ///
    /// This never fails; callers hand the returned text straight back to the
    /// model.
    pub fn dispatch(&self, document: &mut OutlineDocument) -> String {
        self.apply(document).unwrap_or_else(|error| {
            tracing::warn!("{} failed: {error}", self.name());
            format!("Error calling function {}: {error}", self.name())
        })
    }

    /// Tool definitions for a function-calling chat API.
    #[must_use]
    pub fn definitions() -> Value {
        let time = json!({ "type": "string", "description": TIME_FORMAT });
        let topic = json!({ "type": "string", "description": "Topic of the outline block" });

        json!([
            tool(
                ADD_ANNOTATION,
                "Add content to the outline at a point in time. The block whose range \
                 contains the time receives it.",
                &[
                    ("time", time.clone()),
                    ("content", json!({ "type": "string", "description": "The content to add" })),
                ],
            ),
            tool(
                REMOVE_ANNOTATION,
                "Delete the content stored at a point in time.",
                &[("time", time)],
            ),
            tool(
                DEFINE_BLOCK,
                "Set the time range of an outline block, creating the block if it does not exist.",
                &[
                    ("topic", topic.clone()),
                    ("begin", json!({ "type": "string", "description": format!("Start of the block. {TIME_FORMAT}") })),
                    ("end", json!({ "type": "string", "description": format!("End of the block. {TIME_FORMAT}") })),
                ],
            ),
            tool(
                REMOVE_BLOCK,
                "Delete an outline block and all of its content.",
                &[("topic", topic)],
            ),
            tool(RENDER_OUTLINE, "Show the whole outline.", &[]),
        ])
    }
}

fn tool(name: &str, description: &str, parameters: &[(&str, Value)]) -> Value {
    let properties: serde_json::Map<String, Value> = parameters
        .iter()
        .map(|(key, schema)| ((*key).to_string(), schema.clone()))
        .collect();
    let required: Vec<&str> = parameters.iter().map(|(key, _)| *key).collect();

    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            },
            "strict": true,
        }
    })
}

/// Reads and runs a tool call, returning text for the model.
///
/// Unknown tools and bad arguments are reported in the returned text, as are
/// refused operations. Successful edits are not saved.
pub fn call(document: &mut OutlineDocument, name: &str, arguments: &str) -> String {
    match Operation::from_call(name, arguments) {
        Ok(operation) => operation.dispatch(document),
        Err(error) => format!("Error calling function {}: {error}", name.trim()),
    }
}
