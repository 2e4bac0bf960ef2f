/// File-backed outline documents.
pub mod document;
/// The outline text format.
pub mod text;

pub use document::{EditError, ErrorKind, LoadError, OutlineDocument, SaveError};
pub use text::{DecodeError, Options};
