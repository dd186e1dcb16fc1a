//! Error types for loading manifests

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::construct::ConstructError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {}", .0.message())]
    Parse(#[from] toml::de::Error),

    /// A name that does not match any entry of the given kind
    #[error("unknown {kind} '{name}'")]
    UnknownReference {
        kind: &'static str,
        name: String,
        span: Option<Span>,
        suggestions: Vec<String>,
    },

    #[error("invalid manifest: {message}")]
    Invalid { message: String, span: Option<Span> },

    #[error(transparent)]
    Construct(#[from] ConstructError),
}

impl ManifestError {
    /// Create an unknown reference error with suggestions
    pub fn unknown(
        kind: &'static str,
        name: impl Into<String>,
        span: Option<Span>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::UnknownReference {
            kind,
            name: name.into(),
            span,
            suggestions,
        }
    }

    pub fn invalid(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::Invalid {
            message: message.into(),
            span,
        }
    }

    /// Get the source span if available
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parse(err) => err.span(),
            Self::UnknownReference { span, .. } | Self::Invalid { span, .. } => span.clone(),
            _ => None,
        }
    }

    /// Names the user may have meant
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::UnknownReference { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Errors without a span are formatted as a plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Some(span) = self.span() else {
            return format!("Error: {}", self);
        };

        let label = match self {
            Self::Parse(err) => err.message().to_string(),
            Self::UnknownReference { kind, .. } => format!("no {} with this name", kind),
            Self::Invalid { message, .. } => message.clone(),
            _ => self.to_string(),
        };

        let mut report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(label)
                    .with_color(Color::Red),
            );
        if !self.suggestions().is_empty() {
            report = report.with_help(format!(
                "did you mean {}?",
                self.suggestions()
                    .iter()
                    .map(|s| format!("'{}'", s))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let mut buf = Vec::new();
        if report
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .is_err()
        {
            return format!("Error: {}", self);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
