//! # objmeta
//!
//! A schema-driven metadata compiler for persistent object types.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            Schema manifest (JSON / TOML)                 │
//! │  (objects, attributes, relationships, indices, ...)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [model::raw]
//! ┌─────────────────────────────────────────────────────────┐
//! │            ResolutionContext (object arena)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validation - ten passes]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Attributes, indices, relationships (dsl), interfaces,  │
//! │   foreign keys; errors aggregated per object             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolved::freeze]
//! ┌─────────────────────────────────────────────────────────┐
//! │  ResolvedModel: null-bit / off-heap layouts, physical    │
//! │  indices, accessors, join predicates                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod compile;
pub mod config;
pub mod dsl;
pub mod model;
pub mod resolved;
pub mod semantic;
pub mod validation;

pub use compile::{compile_file, compile_schema, CompileError, CompileOptions};
pub use resolved::{ResolvedModel, ResolvedObject};
