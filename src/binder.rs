use crate::{
    error::LoadError,
    field::{FieldInfo, FieldSpec},
    value::{EnvValue, parse_from_str},
};
use std::{collections::HashMap, env, ffi::OsString, str::FromStr};
use tracing::trace;

/// Options forwarded to the binding step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindOptions {
    /// Prepended to every resolved key
    pub prefix: String,
    /// Treat every field without a default as required
    pub required_if_no_default: bool,
    /// Bind fields without an explicit `env` key to their upper-cased name
    pub use_field_name_by_default: bool,
    /// Read values from this map instead of the process environment
    pub environment: Option<HashMap<String, String>>,
}

/// A value found for a field, either in the environment or as its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub key: String,
    pub raw: String,
}

/// `std::any::type_name` with module paths stripped, e.g. `Vec<u16>`
pub(crate) fn type_label<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut label = String::with_capacity(full.len());
    let mut path = String::new();

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            path.push(c);
        } else {
            label.push_str(last_segment(&path));
            path.clear();
            label.push(c);
        }
    }
    label.push_str(last_segment(&path));
    label
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Walks a configuration type, resolving keys against the environment
///
/// A binder carries the key prefix and field path of the struct currently
/// being bound; `nested` derives the binder for a child struct.
#[derive(Debug, Clone)]
pub struct Binder<'a> {
    options: &'a BindOptions,
    prefix: String,
    path: String,
}

impl<'a> Binder<'a> {
    pub fn new(options: &'a BindOptions) -> Self {
        Self {
            options,
            prefix: options.prefix.clone(),
            path: String::new(),
        }
    }

    /// Binder for the fields of a struct declaring `#[config(prefix = ...)]`
    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            options: self.options,
            prefix: format!("{}{}", self.prefix, prefix),
            path: self.path.clone(),
        }
    }

    /// Binder for a `#[field(nested)]` child struct
    pub fn nested(&self, field: &str, prefix: Option<&str>) -> Self {
        Self {
            options: self.options,
            prefix: format!("{}{}", self.prefix, prefix.unwrap_or_default()),
            path: self.field_path(field),
        }
    }

    /// Dotted path of `field` relative to the root configuration type
    pub fn field_path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    /// Full environment key for `spec`, or `None` if the field is not bound
    pub fn key_for(&self, spec: &FieldSpec) -> Option<String> {
        let key = match spec.key {
            Some(key) => key.to_string(),
            None if self.options.use_field_name_by_default => spec.name.to_uppercase(),
            None => return None,
        };
        Some(format!("{}{}", self.prefix, key))
    }

    fn is_required(&self, spec: &FieldSpec) -> bool {
        spec.required || (self.options.required_if_no_default && spec.default.is_none())
    }

    fn read(&self, spec: &FieldSpec, key: &str) -> Result<Option<String>, LoadError> {
        if let Some(environment) = &self.options.environment {
            return Ok(environment.get(key).cloned());
        }

        match env::var_os(key) {
            None => Ok(None),
            Some(value) => value.into_string().map(Some).map_err(|raw: OsString| {
                LoadError::TypeConversion {
                    field: self.field_path(spec.name),
                    key: key.to_string(),
                    value: raw.to_string_lossy().into_owned(),
                    type_name: "String".to_string(),
                    reason: "value is not valid unicode".to_string(),
                }
            }),
        }
    }

    /// Find the raw value for `spec`, falling back to its default
    ///
    /// An empty value is replaced by the default when one is declared and is
    /// kept as-is otherwise. Returns `Ok(None)` when the field is unbound or
    /// absent and optional.
    pub fn lookup(&self, spec: &FieldSpec) -> Result<Option<Lookup>, LoadError> {
        let Some(key) = self.key_for(spec) else {
            return Ok(None);
        };

        let raw = self.read(spec, &key)?;

        match (raw, spec.default) {
            (Some(raw), default) if !raw.is_empty() || default.is_none() => {
                trace!(field = %self.field_path(spec.name), key = %key, "found value in environment");
                return Ok(Some(Lookup { key, raw }));
            }
            (_, Some(default)) => {
                trace!(field = %self.field_path(spec.name), key = %key, "using default value");
                return Ok(Some(Lookup {
                    key,
                    raw: default.to_string(),
                }));
            }
            (_, None) => {}
        }

        if self.is_required(spec) {
            return Err(LoadError::MissingRequiredField {
                field: self.field_path(spec.name),
                key,
            });
        }

        Ok(None)
    }

    fn convert<T>(
        &self,
        spec: &FieldSpec,
        lookup: Lookup,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<T, LoadError> {
        parse(&lookup.raw).map_err(|reason| LoadError::TypeConversion {
            field: self.field_path(spec.name),
            key: lookup.key,
            value: lookup.raw,
            type_name: type_label::<T>(),
            reason,
        })
    }

    /// Bind a field that may be absent
    pub fn optional<T: EnvValue>(&self, spec: &FieldSpec) -> Result<Option<T>, LoadError> {
        self.optional_with(spec, |raw| T::from_env_value(raw, spec))
    }

    /// Bind a field that always has a value, either because it is required
    /// or because it declares a default
    pub fn present<T: EnvValue>(&self, spec: &FieldSpec) -> Result<T, LoadError> {
        self.present_with(spec, |raw| T::from_env_value(raw, spec))
    }

    /// `optional` for a `#[field(from_str)]` field
    pub fn optional_from_str<T>(&self, spec: &FieldSpec) -> Result<Option<T>, LoadError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional_with(spec, parse_from_str::<T>)
    }

    /// `present` for a `#[field(from_str)]` field
    pub fn present_from_str<T>(&self, spec: &FieldSpec) -> Result<T, LoadError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.present_with(spec, parse_from_str::<T>)
    }

    pub fn optional_with<T>(
        &self,
        spec: &FieldSpec,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<Option<T>, LoadError> {
        match self.lookup(spec)? {
            Some(lookup) => self.convert(spec, lookup, parse).map(Some),
            None => Ok(None),
        }
    }

    pub fn present_with<T>(
        &self,
        spec: &FieldSpec,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<T, LoadError> {
        match self.lookup(spec)? {
            Some(lookup) => self.convert(spec, lookup, parse),
            None => Err(LoadError::MissingRequiredField {
                field: self.field_path(spec.name),
                key: self
                    .key_for(spec)
                    .unwrap_or_else(|| spec.name.to_uppercase()),
            }),
        }
    }

    /// Documentation entry for `spec`, if it resolves to a key
    pub fn describe<T>(&self, spec: &FieldSpec) -> Option<FieldInfo> {
        let key = self.key_for(spec)?;
        Some(FieldInfo {
            key,
            field: self.field_path(spec.name),
            type_name: type_label::<T>(),
            default: spec.default.map(str::to_string),
            required: self.is_required(spec),
            description: spec.description.to_string(),
        })
    }
}

/// A configuration type that can be populated from environment variables
///
/// Usually derived with `#[derive(FromEnv)]`.
pub trait FromEnv: Sized {
    /// Bind every declared field, stopping at the first failure
    fn bind(binder: &Binder<'_>) -> Result<Self, LoadError>;

    /// Append a description of every bound field to `fields`
    fn describe(binder: &Binder<'_>, fields: &mut Vec<FieldInfo>);

    /// Bind from the process environment with default options
    fn from_env() -> Result<Self, LoadError> {
        Self::from_env_with(&BindOptions::default())
    }

    fn from_env_with(options: &BindOptions) -> Result<Self, LoadError> {
        Self::bind(&Binder::new(options))
    }

    /// All environment variables this type reads, in declaration order
    fn fields(options: &BindOptions) -> Vec<FieldInfo> {
        let mut fields = Vec::new();
        Self::describe(&Binder::new(options), &mut fields);
        fields
    }
}
