//! Terminal rendering of diagnostics.
//!
//! The analyzer's contract is the structured records themselves; this module
//! only pretty-prints them for humans driving the compiler from a terminal.

use ariadne::{Config, IndexType, Label, Report, ReportKind};

use crate::{Diagnostic, DiagnosticKind};

impl From<DiagnosticKind> for ReportKind<'static> {
    fn from(kind: DiagnosticKind) -> Self {
        match kind {
            DiagnosticKind::Warning => ReportKind::Warning,
            _ => ReportKind::Error,
        }
    }
}

/// Renders one diagnostic against its source text.
pub fn build_diagnostic_message(
    source_name: &str,
    source_content: &str,
    diagnostic: &Diagnostic,
    with_color: bool,
) -> String {
    let mut buffer = Vec::new();
    let file_id = source_name.to_string();
    let span = (file_id.clone(), diagnostic.location.start..diagnostic.location.end);

    let mut report = Report::build(diagnostic.kind.into(), span.clone())
        .with_config(
            Config::new()
                .with_index_type(IndexType::Byte)
                .with_color(with_color),
        )
        .with_message(&diagnostic.message)
        .with_label(Label::new(span).with_message(diagnostic.kind.to_string()));

    for (location, note) in &diagnostic.secondary {
        report = report
            .with_label(Label::new((file_id.clone(), location.start..location.end)).with_message(note));
    }

    let cache = ariadne::sources(vec![(file_id, source_content.to_string())]);
    report
        .finish()
        .write(cache, &mut buffer)
        .expect("writing to an in-memory buffer cannot fail");
    String::from_utf8_lossy(&buffer).to_string()
}

#[cfg(test)]
mod tests {
    use covenant_compiler_ast::SourceLocation;

    use super::*;

    #[test]
    fn renders_message_and_notes() {
        let source = "contract C { function f() {} function f() {} }";
        let diagnostic = Diagnostic::declaration_error(
            "Identifier already declared.",
            SourceLocation::new(29, 42),
        )
        .with_secondary(SourceLocation::new(13, 27), "The previous declaration is here:");

        let rendered = build_diagnostic_message("c.cov", source, &diagnostic, false);
        assert!(rendered.contains("Identifier already declared."));
        assert!(rendered.contains("The previous declaration is here:"));
    }
}
