//! Schema input records and the shared type vocabulary.

pub mod raw;
pub mod types;

pub use raw::{LoadError, RawObject, RawSchema};
pub use types::{Cardinality, ObjectKind, SemanticType, SuperclassKind};
