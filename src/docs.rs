use crate::{
    binder::{BindOptions, FromEnv},
    field::FieldInfo,
};
use std::{fs, path::Path};

/// Render a markdown summary table of `fields`
pub fn render_markdown(fields: &[FieldInfo]) -> String {
    let mut md = String::new();

    md.push_str("## Environment Variables Summary\n\n");
    md.push_str("| Variable | Required | Description | Default |\n");
    md.push_str("|----------|----------|-------------|---------|\n");
    for field in fields {
        let required_str = if field.required { "Yes" } else { "No" };
        let default_display = field.default.as_deref().unwrap_or("-");
        let description = if field.description.is_empty() {
            "-"
        } else {
            field.description.as_str()
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            field.key,
            required_str,
            description.replace('|', "\\|"),
            default_display.replace('|', "\\|")
        ));
    }

    md
}

/// Markdown documentation of every environment variable `T` reads
pub fn markdown_for<T: FromEnv>(options: &BindOptions) -> String {
    render_markdown(&T::fields(options))
}

/// Write the markdown documentation of `T` to `path`
///
/// # Example
/// ```no_run
/// use env_loadr::{BindOptions, FromEnv, docs};
///
/// #[derive(FromEnv)]
/// struct Config {
///     /// Server port
///     #[field(env = "PORT", default = "8080")]
///     port: u16,
/// }
///
/// docs::write_docs::<Config>("CONFIG.md", &BindOptions::default()).unwrap();
/// ```
pub fn write_docs<T: FromEnv>(path: impl AsRef<Path>, options: &BindOptions) -> std::io::Result<()> {
    fs::write(path, markdown_for::<T>(options))
}
