//! Semantic layer - objects, attributes, indices and relationships.
//!
//! Raw schema records are loaded into a [`ResolutionContext`] and then
//! resolved pass by pass (see [`crate::validation`]). Each pass lives in
//! its own module:
//!
//! 1. **NameCheck** - [`names`]
//! 2. **AttributeResolve** - [`attribute`]
//! 3. **EmbeddedValueResolve** - [`embedded`]
//! 4. **EnumerationResolve** - [`enumeration`]
//! 5. **SuperclassResolve** - [`superclass`]
//! 6. **IndexResolve** - [`index`]
//! 7. **RelationshipCheck** - [`relationship`]
//! 8. **InterfaceResolve** - [`interface`]
//! 9. **ForeignKeyDerive** - [`foreign_keys`]
//! 10. **PostValidate** - [`post_validate`]
//!
//! Passes never stop at the first problem. Errors are collected per object
//! (relationship errors under their relationship name) into an
//! [`ErrorReport`] and reported together.

pub mod attribute;
pub mod context;
pub mod embedded;
pub mod enumeration;
pub mod error;
pub mod foreign_keys;
pub mod index;
pub mod interface;
pub mod layout;
pub mod names;
pub mod naming;
pub mod object;
pub mod post_validate;
pub mod relationship;
pub mod superclass;

pub use attribute::{AsOfAttribute, Attribute, AttributeKind};
pub use context::{ObjectId, ResolutionContext};
pub use error::{ErrorReport, ObjectErrors, Warning};
pub use foreign_keys::ForeignKey;
pub use index::{Index, PhysicalIndex};
pub use object::ObjectType;
pub use relationship::{IndexResolution, JoinAnalysis, Relationship};
