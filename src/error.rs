use colored::{ColoredString, Colorize};
use std::{io, path::Path, path::PathBuf};
use thiserror::Error;

/// Errors that can occur while constructing a loader or loading configuration
#[derive(Debug, Error)]
pub enum LoadError {
    /// The loader was constructed without any env file
    #[error("env files not specified")]
    EmptySourceList,

    /// An env file does not exist and missing files are not skipped
    #[error("error loading env file {}: file not found", highlight_path(.path))]
    SourceNotFound { path: PathBuf },

    /// An env file exists but could not be read
    #[error("error loading env file {}: {source}", highlight_path(.path))]
    SourceAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An env file contains a line that is not a valid assignment
    #[error(
        "error parsing env file {}{}: {message}",
        highlight_path(.path),
        line_suffix(.line)
    )]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// A required field has no value in the environment and no default
    #[error("{}: Is missing from environment and is required (field `{field}`)", .key.magenta().bold())]
    MissingRequiredField { field: String, key: String },

    /// A value is present but cannot be converted to the field's type
    #[error(
        "{}: Invalid value {} for field `{field}` of type `{type_name}`: {reason}",
        .key.magenta().bold(),
        quoted_value(.value)
    )]
    TypeConversion {
        field: String,
        key: String,
        value: String,
        type_name: String,
        reason: String,
    },
}

fn highlight_path(path: &Path) -> ColoredString {
    path.display().to_string().magenta().bold()
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

fn quoted_value(value: &str) -> ColoredString {
    format!("'{}'", value).red()
}

impl LoadError {
    /// Whether this error is the skippable "file not found" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::SourceNotFound { .. })
    }

    /// The env file this error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            LoadError::SourceNotFound { path }
            | LoadError::SourceAccess { path, .. }
            | LoadError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The environment key this error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            LoadError::MissingRequiredField { key, .. } | LoadError::TypeConversion { key, .. } => {
                Some(key)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_list_message() {
        assert_eq!(LoadError::EmptySourceList.to_string(), "env files not specified");
    }

    #[test]
    fn test_source_not_found_names_path() {
        colored::control::set_override(false);

        let error = LoadError::SourceNotFound {
            path: PathBuf::from("a.env"),
        };

        let output = error.to_string();
        assert!(output.contains("error loading env file a.env"));
        assert!(error.is_not_found());
        assert_eq!(error.path(), Some(Path::new("a.env")));
    }

    #[test]
    fn test_source_access_keeps_io_source() {
        colored::control::set_override(false);

        let error = LoadError::SourceAccess {
            path: PathBuf::from("/etc/secret.env"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };

        assert!(!error.is_not_found());
        assert!(error.to_string().contains("permission denied"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_parse_error_with_line() {
        colored::control::set_override(false);

        let error = LoadError::Parse {
            path: PathBuf::from("bad.env"),
            line: Some(3),
            message: "unexpected character".to_string(),
        };

        let output = error.to_string();
        assert!(output.contains("bad.env at line 3"));
        assert!(output.contains("unexpected character"));
    }

    #[test]
    fn test_parse_error_without_line() {
        colored::control::set_override(false);

        let error = LoadError::Parse {
            path: PathBuf::from("bad.env"),
            line: None,
            message: "unexpected character".to_string(),
        };

        assert!(!error.to_string().contains("at line"));
    }

    #[test]
    fn test_missing_required_field() {
        colored::control::set_override(false);

        let error = LoadError::MissingRequiredField {
            field: "database.url".to_string(),
            key: "DATABASE_URL".to_string(),
        };

        let output = error.to_string();
        assert!(output.contains("DATABASE_URL: Is missing from environment and is required"));
        assert!(output.contains("`database.url`"));
        assert_eq!(error.key(), Some("DATABASE_URL"));
        assert_eq!(error.path(), None);
    }

    #[test]
    fn test_type_conversion() {
        colored::control::set_override(false);

        let error = LoadError::TypeConversion {
            field: "port".to_string(),
            key: "PORT".to_string(),
            value: "not-a-number".to_string(),
            type_name: "u16".to_string(),
            reason: "invalid digit found in string".to_string(),
        };

        let output = error.to_string();
        assert!(output.contains("PORT"));
        assert!(output.contains("Invalid value 'not-a-number'"));
        assert!(output.contains("field `port` of type `u16`"));
        assert!(output.contains("invalid digit"));
    }

    #[test]
    fn test_debug_format() {
        let error = LoadError::TypeConversion {
            field: "env".to_string(),
            key: "ENV".to_string(),
            value: "test".to_string(),
            type_name: "bool".to_string(),
            reason: "invalid syntax".to_string(),
        };

        let debug_output = format!("{:?}", error);
        assert!(debug_output.contains("TypeConversion"));
        assert!(debug_output.contains("ENV"));
    }
}
