//! Reading, editing and writing `select.def` rosters.
//!
//! Lines outside `[Characters]` and `[ExtraStages]` survive a round trip
//! byte for byte; structured lines are re-serialized from the model.

pub mod backup;
pub mod config;
pub mod core_api;
pub mod defs;
pub mod document;
pub mod grid;
pub mod params;
pub mod parser;
pub mod scan;
pub mod serializer;
pub mod slot;

pub use document::{Document, EditError, LineEnding, Section, StageEntry};
pub use params::ParamString;
pub use parser::{Diagnostic, DiagnosticKind};
pub use slot::{GroupMember, Slot};
