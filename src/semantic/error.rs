//! Error and warning collection for the resolution passes.
//!
//! Passes never stop at the first problem. Each pass returns plain
//! messages for the object it is looking at; the validator files them
//! here, keyed by object (and by relationship for relationship errors),
//! and decides at the end whether the run failed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Errors collected for one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectErrors {
    pub object: String,
    pub errors: Vec<String>,
    /// Relationship errors keyed by relationship name.
    pub relationship_errors: BTreeMap<String, Vec<String>>,
}

impl ObjectErrors {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.relationship_errors.values().all(|v| v.is_empty())
    }

    pub fn count(&self) -> usize {
        self.errors.len() + self.relationship_errors.values().map(Vec::len).sum::<usize>()
    }

    pub fn add_relationship(&mut self, relationship: &str, message: impl Into<String>) {
        self.relationship_errors
            .entry(relationship.to_string())
            .or_default()
            .push(message.into());
    }
}

impl fmt::Display for ObjectErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Errors in {}:", self.object)?;
        for error in &self.errors {
            writeln!(f, "  - {}", error)?;
        }
        for (relationship, errors) in &self.relationship_errors {
            for error in errors {
                writeln!(f, "  - relationship {}: {}", relationship, error)?;
            }
        }
        Ok(())
    }
}

/// All errors of a run, grouped by object name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorReport {
    objects: BTreeMap<String, ObjectErrors>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, object: &str) -> &mut ObjectErrors {
        self.objects
            .entry(object.to_string())
            .or_insert_with(|| ObjectErrors::new(object))
    }

    pub fn add(&mut self, object: &str, message: impl Into<String>) {
        self.entry(object).errors.push(message.into());
    }

    pub fn add_all(&mut self, object: &str, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        self.entry(object).errors.extend(messages);
    }

    pub fn add_relationship(&mut self, object: &str, relationship: &str, message: impl Into<String>) {
        self.entry(object)
            .relationship_errors
            .entry(relationship.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fold one object's errors into the report.
    pub fn merge(&mut self, errors: ObjectErrors) {
        if errors.is_empty() {
            return;
        }
        let entry = self.entry(&errors.object);
        entry.errors.extend(errors.errors);
        for (relationship, messages) in errors.relationship_errors {
            entry
                .relationship_errors
                .entry(relationship)
                .or_default()
                .extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.values().all(ObjectErrors::is_empty)
    }

    /// Number of objects with at least one error.
    pub fn object_count(&self) -> usize {
        self.objects.values().filter(|o| !o.is_empty()).count()
    }

    pub fn error_count(&self) -> usize {
        self.objects.values().map(ObjectErrors::count).sum()
    }

    pub fn get(&self, object: &str) -> Option<&ObjectErrors> {
        self.objects.get(object)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectErrors> {
        self.objects.values().filter(|o| !o.is_empty())
    }

    /// Every message, flattened, in object order.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        for object in self.iter() {
            out.extend(object.errors.iter().cloned());
            for errors in object.relationship_errors.values() {
                out.extend(errors.iter().cloned());
            }
        }
        out
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for object in self.iter() {
            write!(f, "{}", object)?;
        }
        Ok(())
    }
}

/// A non-fatal design problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub object: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.object, self.message)
    }
}
