use std::error::Error as StdError;
use std::fmt;

use arrow_schema::ArrowError;

/// A position within an artifact, such as a JSON token or a delimited record.
///
/// All indices are 1-based where possible to align with human expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Column number in the source (1-based)
    pub column: Option<u64>,
    /// Logical record number reported by the parser
    pub record: Option<u64>,
}

impl SourcePosition {
    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.column.is_none() && self.record.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(column) = self.column {
            parts.push(format!("column {column}"));
        }
        if let Some(record) = self.record {
            parts.push(format!("record {record}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors that can occur when parsing a dataset artifact into Arrow.
#[derive(Debug)]
pub enum FormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Parsing failed for the input source.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Schema inference failed, or the content has no tabular shape.
    SchemaInference {
        /// Human readable description of the failure.
        message: String,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Other error type not classified above.
    Other {
        /// Human readable description of the failure.
        message: String,
    },
}

impl FormatReadError {
    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position
            .filter(|pos| !pos.is_empty())
            .map(|pos| format!(" at {pos}"))
            .unwrap_or_default()
    }

    /// Shorthand for a [`FormatReadError::SchemaInference`] without context.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        FormatReadError::SchemaInference {
            message: message.into(),
            context: None,
        }
    }

    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            FormatReadError::Io {
                context: existing, ..
            }
            | FormatReadError::Parse {
                context: existing, ..
            }
            | FormatReadError::SchemaInference {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            FormatReadError::Other { message } => {
                message.push_str(" (");
                message.push_str(&context);
                message.push(')');
            },
        }
        self
    }
}

impl fmt::Display for FormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            FormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            FormatReadError::SchemaInference { message, context } => write!(
                f,
                "Schema inference error{}: {message}",
                Self::fmt_context(context.as_deref())
            ),
            FormatReadError::Other { message } => f.write_str(message),
        }
    }
}

impl StdError for FormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FormatReadError::Io { source, .. } => Some(source),
            FormatReadError::Parse { .. }
            | FormatReadError::SchemaInference { .. }
            | FormatReadError::Other { .. } => None,
        }
    }
}

impl From<std::io::Error> for FormatReadError {
    fn from(source: std::io::Error) -> Self {
        FormatReadError::Io {
            source,
            context: None,
        }
    }
}

impl From<ArrowError> for FormatReadError {
    fn from(err: ArrowError) -> Self {
        match err {
            ArrowError::IoError(_, source) => FormatReadError::Io {
                source,
                context: None,
            },
            ArrowError::CsvError(message)
            | ArrowError::JsonError(message)
            | ArrowError::ParseError(message)
            | ArrowError::CastError(message)
            | ArrowError::IpcError(message)
            | ArrowError::ParquetError(message) => FormatReadError::Parse {
                message,
                position: None,
                context: None,
            },
            ArrowError::SchemaError(message) => FormatReadError::SchemaInference {
                message,
                context: None,
            },
            other => FormatReadError::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias that uses [`FormatReadError`].
pub type FormatResult<T> = Result<T, FormatReadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_source_position() {
        let pos = SourcePosition {
            line: Some(10),
            column: Some(3),
            ..SourcePosition::default()
        };

        assert_eq!(pos.to_string(), "line 10, column 3");
    }

    #[test]
    fn display_parse_error_with_context() {
        let error = FormatReadError::Parse {
            message: "expected value".to_string(),
            position: Some(SourcePosition {
                line: Some(5),
                column: Some(7),
                ..Default::default()
            }),
            context: Some("cars.json".to_string()),
        };

        assert_eq!(
            error.to_string(),
            "Parse error while reading cars.json at line 5, column 7: expected value"
        );
    }

    #[test]
    fn additional_context_is_appended() {
        let error = FormatReadError::schema("not an array of records")
            .with_additional_context("miserables.json")
            .with_additional_context("arrow");

        assert_eq!(
            error.to_string(),
            "Schema inference error while reading miserables.json; arrow: not an array of records"
        );
    }

    #[test]
    fn arrow_errors_are_classified() {
        let parse = FormatReadError::from(ArrowError::CsvError("bad row".to_string()));
        assert!(matches!(parse, FormatReadError::Parse { .. }));

        let schema = FormatReadError::from(ArrowError::SchemaError("no fields".to_string()));
        assert!(matches!(schema, FormatReadError::SchemaInference { .. }));
    }
}
