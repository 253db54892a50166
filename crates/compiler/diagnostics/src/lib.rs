//! # Diagnostics
//!
//! Structured error records for semantic analysis. The analyzer appends
//! [`Diagnostic`]s to a [`DiagnosticCollection`] in order of discovery and
//! never removes them; analysis success is defined as the collection holding
//! nothing but warnings.

pub mod diagnostics;
pub mod reporting;

pub use diagnostics::{Diagnostic, DiagnosticCollection, DiagnosticKind};
