//! Diagnostics for the Sable compiler.
//!
//! Every stage error converts into a [`Diagnostic`] carrying a primary
//! source location and optional secondary labels ("previously declared
//! here" and the like). Rendering is a collaborator concern: the CLI
//! turns spans into line/column positions and formats the output.

use alloc::string::String;
use alloc::vec::Vec;

use crate::span::Span;

/// A labeled span used inside diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: Option<String>,
}

/// A single error report produced by the compiler.
///
/// A diagnostic has a main message, a primary label indicating the
/// main source location, and zero or more secondary labels for
/// related locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    pub primary: Label,
    pub secondary: Vec<Label>,
}

impl Diagnostic {
    /// Create a new diagnostic with a primary span.
    pub fn error(message: impl Into<String>, primary_span: Span) -> Diagnostic {
        Diagnostic {
            code: None,
            message: message.into(),
            primary: Label {
                span: primary_span,
                message: None,
            },
            secondary: Vec::new(),
        }
    }

    /// Attach an error code (for example, "E0001") to this diagnostic.
    pub fn with_code(mut self, code: &'static str) -> Diagnostic {
        self.code = Some(code);
        self
    }

    /// Add a secondary label with its own span and optional message.
    pub fn with_secondary_label(
        mut self,
        span: Span,
        message: impl Into<Option<String>>,
    ) -> Diagnostic {
        self.secondary.push(Label {
            span,
            message: message.into(),
        });
        self
    }
}
