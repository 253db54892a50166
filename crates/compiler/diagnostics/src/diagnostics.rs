//! Diagnostic records and their append-only collection.

use std::fmt;

use covenant_compiler_ast::SourceLocation;

/// A single diagnostic produced during semantic analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Primary source location.
    pub location: SourceLocation,
    /// Additional locations with context messages, e.g. the earlier of two
    /// conflicting declarations.
    pub secondary: Vec<(SourceLocation, String)>,
}

/// The kind of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    /// Scoping, visibility, duplication and collision problems.
    DeclarationError,
    /// Operator/operand mismatches, conversion failures, arity mismatches,
    /// override incompatibilities and similar.
    TypeError,
    /// Structural defects detected during semantic analysis, such as
    /// recursive struct definitions.
    ParserError,
    /// Non-fatal lints.
    Warning,
}

impl DiagnosticKind {
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::Warning)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclarationError => write!(f, "declaration error"),
            Self::TypeError => write!(f, "type error"),
            Self::ParserError => write!(f, "parser error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
            secondary: Vec::new(),
        }
    }

    pub fn declaration_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(DiagnosticKind::DeclarationError, message, location)
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(DiagnosticKind::TypeError, message, location)
    }

    pub fn parser_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(DiagnosticKind::ParserError, message, location)
    }

    pub fn warning(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(DiagnosticKind::Warning, message, location)
    }

    /// Attaches a secondary location with a context message.
    pub fn with_secondary(
        mut self,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        self.secondary.push((location, message.into()));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (at {})", self.kind, self.message, self.location)?;
        for (location, message) in &self.secondary {
            write!(f, "\n  note: {message} (at {location})")?;
        }
        Ok(())
    }
}

/// Append-only sequence of diagnostics, in order of discovery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// True when no record of a kind other than `Warning` is present.
    pub fn success(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn summary(&self) -> String {
        let errors = self.errors().count();
        let warnings = self.warnings().count();
        if self.diagnostics.is_empty() {
            "no issues found".to_string()
        } else {
            format!("{errors} errors, {warnings} warnings")
        }
    }
}

impl From<Vec<Diagnostic>> for DiagnosticCollection {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl IntoIterator for DiagnosticCollection {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_means_warnings_only() {
        let mut collection = DiagnosticCollection::new();
        assert!(collection.success());

        collection.push(Diagnostic::warning(
            "uninitialized storage pointer",
            SourceLocation::new(0, 4),
        ));
        assert!(collection.success());

        collection.push(Diagnostic::type_error(
            "Expression has to be an lvalue.",
            SourceLocation::new(5, 9),
        ));
        assert!(!collection.success());
        assert_eq!(collection.errors().count(), 1);
        assert_eq!(collection.warnings().count(), 1);
    }

    #[test]
    fn secondary_locations_render_as_notes() {
        let diagnostic = Diagnostic::declaration_error(
            "Identifier already declared.",
            SourceLocation::new(20, 30),
        )
        .with_secondary(
            SourceLocation::new(0, 10),
            "The previous declaration is here:",
        );

        let rendered = diagnostic.to_string();
        assert!(rendered.contains("Identifier already declared."));
        assert!(rendered.contains("note: The previous declaration is here:"));
        assert!(rendered.contains("20:30"));
    }

    #[test]
    fn order_of_discovery_is_preserved() {
        let mut collection = DiagnosticCollection::new();
        collection.push(Diagnostic::type_error("first", SourceLocation::new(0, 1)));
        collection.push(Diagnostic::type_error("second", SourceLocation::new(1, 2)));
        let messages: Vec<_> = collection.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
