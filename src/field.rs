/// Separator used for `Vec` and map fields when none is declared
pub const DEFAULT_DELIMITER: &str = ",";

/// Separator between key and value of a map entry when none is declared
pub const DEFAULT_KEY_VALUE_SEPARATOR: &str = ":";

/// Static description of one bindable field, generated by `#[derive(FromEnv)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Rust field name
    pub name: &'static str,
    /// Environment variable key, before any prefix is applied
    pub key: Option<&'static str>,
    /// Default used when the key is absent, converted like a real value
    pub default: Option<&'static str>,
    /// Whether an absent key without default is an error
    pub required: bool,
    /// Separator between elements of sequence and map fields
    pub delimiter: Option<&'static str>,
    /// Separator between key and value of map entries
    pub key_value_separator: Option<&'static str>,
    /// Human-readable description, from `doc = "..."` or the doc comment
    pub description: &'static str,
}

impl FieldSpec {
    /// A field bound to `key` with no default, not required
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key: Some(key),
            default: None,
            required: false,
            delimiter: None,
            key_value_separator: None,
            description: "",
        }
    }

    /// A field without an explicit key, bound by name only when the binder
    /// is asked to
    pub const fn unkeyed(name: &'static str) -> Self {
        Self {
            name,
            key: None,
            default: None,
            required: false,
            delimiter: None,
            key_value_separator: None,
            description: "",
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn with_delimiter(mut self, delimiter: &'static str) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub const fn with_key_value_separator(mut self, separator: &'static str) -> Self {
        self.key_value_separator = Some(separator);
        self
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Element separator; an empty one falls back to [`DEFAULT_DELIMITER`]
    pub fn delimiter(&self) -> &'static str {
        self.delimiter
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DELIMITER)
    }

    /// Entry separator; an empty one falls back to [`DEFAULT_KEY_VALUE_SEPARATOR`]
    pub fn key_value_separator(&self) -> &'static str {
        self.key_value_separator
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_KEY_VALUE_SEPARATOR)
    }
}

/// Resolved metadata about a configuration field, used for documentation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldInfo {
    /// Full environment variable key, prefixes included
    pub key: String,
    /// Dotted path of the field inside the configuration type
    pub field: String,
    /// Rust type the value is converted to
    pub type_name: String,
    /// Default value as declared
    pub default: Option<String>,
    /// Whether the field must be present
    pub required: bool,
    /// Human-readable description
    pub description: String,
}
