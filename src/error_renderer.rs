//! Error rendering using ariadne
//!
//! Compilation and runtime errors are rendered with the fragment's source,
//! the offending span underlined and the diagnostic's help text as notes.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<fragment>";

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use jeval::{ClassPath, CompileContext, Engine, EngineOptions, render_error};
///
/// let engine = Engine::new(ClassPath::with_builtins(), EngineOptions::default());
/// if let Err(e) = engine.compile("1 + true", &CompileContext::new()) {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for debugger consoles)
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostics, src } => {
            render_diagnostics(src, diagnostics, writer, use_color)
        }
        Error::Runtime { diagnostic, src } => {
            render_diagnostics(src, std::slice::from_ref(diagnostic), writer, use_color)
        }
        Error::Exception {
            exception,
            span,
            src,
        } => {
            let message = format!("exception {} thrown", exception.runtime_type);
            Report::build(ReportKind::Error, (SOURCE_ID, span.0.clone()))
                .with_message(&message)
                .with_config(ariadne::Config::default().with_color(use_color))
                .with_label(
                    Label::new((SOURCE_ID, span.0.clone()))
                        .with_message(format!("{} thrown here", exception)),
                )
                .finish()
                .write((SOURCE_ID, Source::from(src.as_str())), &mut *writer)
        }
        Error::ResourceExceeded(msg) => {
            writeln!(writer, "Resource limit exceeded: {}", msg)
        }
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let mut report = Report::build(kind, (SOURCE_ID, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        let color = colors.next();
        report = report.with_label(
            Label::new((SOURCE_ID, diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((SOURCE_ID, related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}
