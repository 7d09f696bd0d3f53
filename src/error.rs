//! Error types for annotation resolution and data-expr parsing

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in expression source text
pub type Span = std::ops::Range<usize>;

/// Which part of an annotation an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Enclosure,
    Text,
    Connector,
    /// Errors raised while rendering or compiling the chart itself
    Scene,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationKind::Enclosure => "enclosure",
            AnnotationKind::Text => "text",
            AnnotationKind::Connector => "connector",
            AnnotationKind::Scene => "scene",
        })
    }
}

/// Coarse classification of [`AnnotationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    TargetResolution,
    GeometryParse,
    Render,
}

/// Errors that abort the resolution of a single annotation
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// A required field is absent
    #[error("{kind} annotation is missing required field `{field}`")]
    MissingField {
        kind: AnnotationKind,
        field: &'static str,
    },

    /// A field is present but unusable
    #[error("invalid {kind} configuration: {reason}")]
    InvalidConfig { kind: AnnotationKind, reason: String },

    /// The target could not be turned into concrete geometry
    #[error("cannot resolve {kind} target: {reason}")]
    TargetResolution { kind: AnnotationKind, reason: String },

    /// An emitted path string could not be read back into coordinates
    #[error("cannot parse path '{path}': {reason}")]
    GeometryParse { path: String, reason: String },

    /// The external compiler or renderer failed
    #[error("render failed: {reason}")]
    Render { reason: String },
}

impl AnnotationError {
    /// Create a missing field error
    pub fn missing(kind: AnnotationKind, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// Create an invalid configuration error
    pub fn invalid(kind: AnnotationKind, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a target resolution error
    pub fn unresolved(kind: AnnotationKind, reason: impl Into<String>) -> Self {
        Self::TargetResolution {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a geometry parse error
    pub fn geometry(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GeometryParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a render error
    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render {
            reason: reason.into(),
        }
    }

    /// The error category this error belongs to
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } | Self::InvalidConfig { .. } => ErrorKind::Config,
            Self::TargetResolution { .. } => ErrorKind::TargetResolution,
            Self::GeometryParse { .. } => ErrorKind::GeometryParse,
            Self::Render { .. } => ErrorKind::Render,
        }
    }

    /// The annotation kind the error was raised for, if any
    pub fn annotation_kind(&self) -> Option<AnnotationKind> {
        match self {
            Self::MissingField { kind, .. }
            | Self::InvalidConfig { kind, .. }
            | Self::TargetResolution { kind, .. } => Some(*kind),
            Self::GeometryParse { .. } => Some(AnnotationKind::Connector),
            Self::Render { .. } => Some(AnnotationKind::Scene),
        }
    }
}

/// Errors raised by the data-expr predicate language
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("expression error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("cannot evaluate expression: {message}")]
    Eval { message: String },
}

impl ExprError {
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str) -> String {
        const NAME: &str = "data-expr";
        match self {
            ExprError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let mut buf = Vec::new();
                let written = Report::build(ReportKind::Error, NAME, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((NAME, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((NAME, Source::from(source)), &mut buf);
                match written {
                    Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
                    Err(_) => self.to_string(),
                }
            }
            ExprError::Eval { .. } => self.to_string(),
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::expr::lexer::Token>> for ExprError {
    fn from(err: chumsky::error::Rich<'a, crate::expr::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ExprError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::expr::lexer::Token) -> String {
    use crate::expr::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::Error => "unrecognized character".to_string(),
        other => format!("'{}'", other.symbol()),
    }
}
