use crate::{
    ConfigLoader,
    binder::{BindOptions, FromEnv, type_label},
    error::LoadError,
    source,
};
use std::{
    fmt,
    marker::PhantomData,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Options controlling how an [`EnvLoader`] treats its files and binds values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Do not fail on env files that were specified but do not exist
    pub skip_missing_files: bool,
    /// Forwarded unchanged to the binding step
    pub bind: BindOptions,
}

/// Loads a configuration type from env files and the process environment
///
/// Files are applied in order, first listed wins: a key set by an earlier
/// file, or already present in the environment, is never overwritten. Every
/// call to [`EnvLoader::load`] re-reads the files and the environment.
///
/// # Example
/// ```no_run
/// use env_loadr::{EnvLoader, FromEnv};
///
/// #[derive(Debug, FromEnv)]
/// struct Config {
///     #[field(env = "APP_NAME", default = "my-app")]
///     app_name: String,
///     #[field(env = "PORT", required)]
///     port: u16,
/// }
///
/// let loader = EnvLoader::<Config>::builder()
///     .source(".env.local")
///     .source(".env")
///     .skip_missing_files()
///     .build()
///     .unwrap();
/// let config = loader.load().unwrap();
/// ```
pub struct EnvLoader<T> {
    sources: Vec<PathBuf>,
    options: LoaderOptions,
    _config: PhantomData<fn() -> T>,
}

impl<T> EnvLoader<T> {
    /// Create a loader for `sources`, in priority order
    ///
    /// Fails with [`LoadError::EmptySourceList`] when `sources` is empty. No
    /// file is touched until [`EnvLoader::load`] is called.
    pub fn new<I, P>(sources: I, options: LoaderOptions) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let sources: Vec<PathBuf> = sources.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(LoadError::EmptySourceList);
        }

        Ok(Self {
            sources,
            options,
            _config: PhantomData,
        })
    }

    pub fn builder() -> LoaderBuilder<T> {
        LoaderBuilder::new()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Apply every env file to the process environment without binding
    pub fn apply_sources(&self) -> Result<(), LoadError> {
        for path in &self.sources {
            source::apply_file(path, self.options.skip_missing_files)?;
        }
        Ok(())
    }
}

impl<T: FromEnv> EnvLoader<T> {
    /// Apply the env files, then bind `T` from the resulting environment
    pub fn load(&self) -> Result<T, LoadError> {
        self.apply_sources()?;

        let config = T::from_env_with(&self.options.bind)?;
        debug!(
            sources = self.sources.len(),
            config = %type_label::<T>(),
            "configuration loaded"
        );
        Ok(config)
    }
}

impl<T: FromEnv> ConfigLoader<T> for EnvLoader<T> {
    type Error = LoadError;

    fn load(&self) -> Result<T, LoadError> {
        EnvLoader::load(self)
    }
}

impl<T> Clone for EnvLoader<T> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            options: self.options.clone(),
            _config: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EnvLoader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLoader")
            .field("sources", &self.sources)
            .field("options", &self.options)
            .finish()
    }
}

/// Builder for [`EnvLoader`]
///
/// Options are applied in call order; a later call overrides an earlier one.
pub struct LoaderBuilder<T> {
    sources: Vec<PathBuf>,
    options: LoaderOptions,
    _config: PhantomData<fn() -> T>,
}

impl<T> LoaderBuilder<T> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            options: LoaderOptions::default(),
            _config: PhantomData,
        }
    }

    /// Add an env file after the ones already added
    pub fn source(mut self, path: impl AsRef<Path>) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    pub fn sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Do not fail on env files that were specified but were not found
    pub fn skip_missing_files(self) -> Self {
        self.with(|options| options.skip_missing_files = true)
    }

    /// Replace the options forwarded to the binding step
    pub fn bind_options(self, bind: BindOptions) -> Self {
        self.with(|options| options.bind = bind)
    }

    /// Prefix prepended to every environment key
    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.with(|options| options.bind.prefix = prefix)
    }

    /// Treat every field without a default as required
    pub fn required_if_no_default(self) -> Self {
        self.with(|options| options.bind.required_if_no_default = true)
    }

    /// Bind fields without an explicit key to their upper-cased name
    pub fn use_field_name_by_default(self) -> Self {
        self.with(|options| options.bind.use_field_name_by_default = true)
    }

    /// Apply an arbitrary mutation to the options
    pub fn with(mut self, option: impl FnOnce(&mut LoaderOptions)) -> Self {
        option(&mut self.options);
        self
    }

    pub fn build(self) -> Result<EnvLoader<T>, LoadError> {
        EnvLoader::new(self.sources, self.options)
    }
}

impl<T> Default for LoaderBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binder::Binder, field::FieldInfo};

    #[derive(Debug, PartialEq)]
    struct Unit;

    impl FromEnv for Unit {
        fn bind(_binder: &Binder<'_>) -> Result<Self, LoadError> {
            Ok(Unit)
        }

        fn describe(_binder: &Binder<'_>, _fields: &mut Vec<FieldInfo>) {}
    }

    #[test]
    fn test_new_rejects_empty_sources() {
        let result = EnvLoader::<Unit>::new(Vec::<PathBuf>::new(), LoaderOptions::default());
        assert!(matches!(result, Err(LoadError::EmptySourceList)));
    }

    #[test]
    fn test_builder_rejects_empty_sources() {
        let result = EnvLoader::<Unit>::builder().skip_missing_files().build();
        assert!(matches!(result, Err(LoadError::EmptySourceList)));
    }

    #[test]
    fn test_new_does_no_io() {
        let loader =
            EnvLoader::<Unit>::new(["/nonexistent/a.env"], LoaderOptions::default()).unwrap();
        assert_eq!(loader.sources(), &[PathBuf::from("/nonexistent/a.env")]);
    }

    #[test]
    fn test_builder_keeps_source_order() {
        let loader = EnvLoader::<Unit>::builder()
            .source("first.env")
            .sources(["second.env", "third.env"])
            .build()
            .unwrap();

        assert_eq!(
            loader.sources(),
            &[
                PathBuf::from("first.env"),
                PathBuf::from("second.env"),
                PathBuf::from("third.env"),
            ]
        );
    }

    #[test]
    fn test_builder_last_option_wins() {
        let loader = EnvLoader::<Unit>::builder()
            .source("a.env")
            .prefix("FIRST_")
            .required_if_no_default()
            .bind_options(BindOptions {
                prefix: "SECOND_".to_string(),
                ..Default::default()
            })
            .with(|options| options.skip_missing_files = false)
            .skip_missing_files()
            .build()
            .unwrap();

        assert!(loader.options().skip_missing_files);
        assert_eq!(loader.options().bind.prefix, "SECOND_");
        assert!(!loader.options().bind.required_if_no_default);
    }

    #[test]
    fn test_missing_file_fails_load() {
        let loader =
            EnvLoader::<Unit>::new(["/nonexistent/a.env"], LoaderOptions::default()).unwrap();
        let err = loader.load().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.path(), Some(Path::new("/nonexistent/a.env")));
    }

    #[test]
    fn test_missing_file_skipped() {
        let loader = EnvLoader::<Unit>::builder()
            .source("/nonexistent/a.env")
            .skip_missing_files()
            .build()
            .unwrap();
        assert_eq!(loader.load().unwrap(), Unit);
    }
}
