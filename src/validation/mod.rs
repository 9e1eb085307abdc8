//! Cross-object validation.
//!
//! Runs every resolution pass over every object in ascending (hierarchy
//! depth, name) order, so a superclass is always complete before its
//! subclasses are looked at. No pass stops at the first problem: errors
//! are collected per object into an [`ErrorReport`] and the caller fails
//! the compilation once, after every pass has run.
//!
//! An object whose attributes fail their checks stays in the later passes
//! with every attribute that could be built, so its other problems are
//! still reported and objects joining to it bind normally.

use std::fmt;

use crate::semantic::attribute::collect_attributes;
use crate::semantic::context::{ObjectId, ResolutionContext};
use crate::semantic::embedded::resolve_embedded_values;
use crate::semantic::enumeration::resolve_enumerations;
use crate::semantic::error::{ErrorReport, Warning};
use crate::semantic::foreign_keys::derive_foreign_keys;
use crate::semantic::index::resolve_indices;
use crate::semantic::interface::resolve_interfaces;
use crate::semantic::names::check_names;
use crate::semantic::post_validate::post_validate;
use crate::semantic::relationship::{check_relationships, finish_relationships};
use crate::semantic::superclass::resolve_superclass;

// ============================================================================
// Passes
// ============================================================================

/// A resolution pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    NameCheck,
    AttributeResolve,
    EmbeddedValueResolve,
    EnumerationResolve,
    SuperclassResolve,
    IndexResolve,
    RelationshipCheck,
    InterfaceResolve,
    ForeignKeyDerive,
    PostValidate,
}

impl Pass {
    pub const ALL: [Pass; 10] = [
        Pass::NameCheck,
        Pass::AttributeResolve,
        Pass::EmbeddedValueResolve,
        Pass::EnumerationResolve,
        Pass::SuperclassResolve,
        Pass::IndexResolve,
        Pass::RelationshipCheck,
        Pass::InterfaceResolve,
        Pass::ForeignKeyDerive,
        Pass::PostValidate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pass::NameCheck => "NameCheck",
            Pass::AttributeResolve => "AttributeResolve",
            Pass::EmbeddedValueResolve => "EmbeddedValueResolve",
            Pass::EnumerationResolve => "EnumerationResolve",
            Pass::SuperclassResolve => "SuperclassResolve",
            Pass::IndexResolve => "IndexResolve",
            Pass::RelationshipCheck => "RelationshipCheck",
            Pass::InterfaceResolve => "InterfaceResolve",
            Pass::ForeignKeyDerive => "ForeignKeyDerive",
            Pass::PostValidate => "PostValidate",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Result of a validation run.
#[derive(Debug, Default)]
pub struct Validation {
    pub report: ErrorReport,
    pub warnings: Vec<Warning>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.report.is_empty()
    }
}

/// Drives the passes over a [`ResolutionContext`].
pub struct Validator<'a> {
    ctx: &'a mut ResolutionContext,
    order: Vec<ObjectId>,
    report: ErrorReport,
}

impl<'a> Validator<'a> {
    pub fn new(ctx: &'a mut ResolutionContext) -> Self {
        let order = ctx.processing_order();
        Self {
            ctx,
            order,
            report: ErrorReport::new(),
        }
    }

    /// Run every pass and return the collected errors and warnings.
    pub fn run(mut self) -> Validation {
        for pass in Pass::ALL {
            self.run_pass(pass);
        }

        for errors in self.report.iter() {
            tracing::error!(object = %errors.object, count = errors.count(), "\n{}", errors);
        }
        let warnings = self.ctx.take_warnings();
        tracing::info!(
            objects = self.order.len(),
            failed = self.report.object_count(),
            errors = self.report.error_count(),
            warnings = warnings.len(),
            "validation finished"
        );
        Validation {
            report: self.report,
            warnings,
        }
    }

    /// Run one pass over every object.
    pub fn run_pass(&mut self, pass: Pass) {
        let before = self.report.error_count();
        for id in self.order.clone() {
            self.run_object(pass, id);
        }
        if pass == Pass::RelationshipCheck {
            finish_relationships(self.ctx, &mut self.report);
        }
        tracing::debug!(
            pass = %pass,
            errors = self.report.error_count() - before,
            "pass complete"
        );
    }

    fn run_object(&mut self, pass: Pass, id: ObjectId) {
        let name = self.ctx.object(id).name.clone();
        let errors = match pass {
            Pass::NameCheck => check_names(self.ctx, id),
            Pass::AttributeResolve => {
                let (resolved, errors) = collect_attributes(&self.ctx.object(id).raw);
                let object = self.ctx.object_mut(id);
                object.attributes = resolved.attributes;
                object.as_of_attributes = resolved.as_of_attributes;
                errors
            }
            Pass::EmbeddedValueResolve => resolve_embedded_values(self.ctx, id),
            Pass::EnumerationResolve => resolve_enumerations(self.ctx, id),
            Pass::SuperclassResolve => resolve_superclass(self.ctx, id),
            Pass::IndexResolve => resolve_indices(self.ctx, id),
            Pass::RelationshipCheck => {
                let errors = check_relationships(self.ctx, id);
                self.report.merge(errors);
                return;
            }
            Pass::InterfaceResolve => resolve_interfaces(self.ctx, id),
            Pass::ForeignKeyDerive => {
                derive_foreign_keys(self.ctx, id);
                Vec::new()
            }
            Pass::PostValidate => post_validate(self.ctx, id),
        };
        self.report.add_all(&name, errors);
    }
}

/// Run every pass over `ctx`.
pub fn validate(ctx: &mut ResolutionContext) -> Validation {
    Validator::new(ctx).run()
}
