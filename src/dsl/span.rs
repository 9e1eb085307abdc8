//! Source locations for relationship query text.

use serde::Serialize;
use std::ops::{Deref, Range};

/// Byte range into the query text.
pub type Span = Range<usize>;

/// A value together with the span it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    /// Wrap a value that has no source location (synthesized nodes).
    pub fn detached(value: T) -> Self {
        Self { value, span: 0..0 }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }

    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned {
            value: &self.value,
            span: self.span.clone(),
        }
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
