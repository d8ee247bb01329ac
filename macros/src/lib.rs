use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Lit, LitStr, Meta, Token, parse_macro_input,
};

/// Helper enum for parsed attribute values
enum MetaValue {
    Str(LitStr),
    Flag,
}

/// Keys accepted inside `#[field(...)]` that take a string value
const STRING_KEYS: &[&str] = &[
    "env",
    "default",
    "doc",
    "delimiter",
    "key_value_separator",
    "prefix",
];

/// Keys accepted inside `#[field(...)]` as bare flags
const FLAG_KEYS: &[&str] = &["required", "nested", "from_str", "skip"];

/// Derive `env_loadr::FromEnv` for a struct with named fields
///
/// Field attributes: `#[field(env = "KEY", default = "value", required,
/// delimiter = ",", key_value_separator = ":", from_str, doc = "...")]`,
/// `#[field(nested, prefix = "DB_")]` and `#[field(skip)]`. Struct attribute:
/// `#[config(prefix = "APP_", by_name)]`.
///
/// Fields without `#[field]` are left at `Default::default()`, unless the
/// struct declares `by_name`, which binds them to their upper-cased name.
#[proc_macro_derive(FromEnv, attributes(field, config))]
pub fn derive_from_env(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_from_env(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_from_env(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let struct_config = parse_struct_config(&input.attrs)?;

    // Extract fields from the struct
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "FromEnv only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "FromEnv only supports structs",
            ));
        }
    };

    let mut bind_fields = Vec::new();
    let mut describe_fields = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_type = &field.ty;
        let name_str = field_name.to_string();

        let mode = match parse_field_config(&field.attrs)? {
            Some(mode) => mode,
            None if struct_config.by_name => {
                FieldMode::Value(ValueConfig::by_name(field_name, &field.attrs))
            }
            None => FieldMode::Skip,
        };

        match mode {
            FieldMode::Skip => {
                bind_fields.push(quote! {
                    #field_name: ::core::default::Default::default()
                });
            }
            FieldMode::Nested { prefix } => {
                let prefix = option_tokens(prefix.as_ref());
                bind_fields.push(quote! {
                    #field_name: <#field_type as ::env_loadr::FromEnv>::bind(
                        &binder.nested(#name_str, #prefix),
                    )?
                });
                describe_fields.push(quote! {
                    <#field_type as ::env_loadr::FromEnv>::describe(
                        &binder.nested(#name_str, #prefix),
                        fields,
                    );
                });
            }
            FieldMode::Value(ref value) => {
                let spec = field_spec_tokens(&name_str, value);
                let always_present = value.required || value.default.is_some();

                let bind_expr = match (value.from_str, always_present) {
                    (false, true) => quote! { binder.present::<#field_type>(&#spec)? },
                    (true, true) => quote! { binder.present_from_str::<#field_type>(&#spec)? },
                    (false, false) => quote! {
                        binder.optional::<#field_type>(&#spec)?.unwrap_or_default()
                    },
                    (true, false) => quote! {
                        binder.optional_from_str::<#field_type>(&#spec)?.unwrap_or_default()
                    },
                };

                bind_fields.push(quote! { #field_name: #bind_expr });
                describe_fields.push(quote! {
                    if let ::core::option::Option::Some(info) = binder.describe::<#field_type>(&#spec) {
                        fields.push(info);
                    }
                });
            }
        }
    }

    let prefix_stmt = match &struct_config.prefix {
        Some(prefix) => quote! { let binder = &binder.with_prefix(#prefix); },
        None => quote! {},
    };

    Ok(quote! {
        impl #impl_generics ::env_loadr::FromEnv for #struct_name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn bind(
                binder: &::env_loadr::Binder<'_>,
            ) -> ::core::result::Result<Self, ::env_loadr::LoadError> {
                #prefix_stmt
                ::core::result::Result::Ok(Self {
                    #(#bind_fields),*
                })
            }

            #[allow(unused_variables)]
            fn describe(
                binder: &::env_loadr::Binder<'_>,
                fields: &mut ::std::vec::Vec<::env_loadr::FieldInfo>,
            ) {
                #prefix_stmt
                #(#describe_fields)*
            }
        }
    })
}

#[derive(Debug)]
struct ValueConfig {
    env: Option<LitStr>,
    default: Option<LitStr>,
    required: bool,
    delimiter: Option<LitStr>,
    key_value_separator: Option<LitStr>,
    from_str: bool,
    description: String,
}

impl ValueConfig {
    /// Config of an undeclared field in a `#[config(by_name)]` struct
    fn by_name(ident: &syn::Ident, attrs: &[Attribute]) -> Self {
        let key = ident.to_string().trim_start_matches("r#").to_uppercase();
        Self {
            env: Some(LitStr::new(&key, ident.span())),
            default: None,
            required: false,
            delimiter: None,
            key_value_separator: None,
            from_str: false,
            description: doc_comment(attrs),
        }
    }
}

#[derive(Debug)]
enum FieldMode {
    Value(ValueConfig),
    Nested { prefix: Option<LitStr> },
    Skip,
}

fn option_tokens(value: Option<&LitStr>) -> proc_macro2::TokenStream {
    match value {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    }
}

fn field_spec_tokens(name: &str, value: &ValueConfig) -> proc_macro2::TokenStream {
    let mut spec = match &value.env {
        Some(key) => quote! { ::env_loadr::FieldSpec::new(#name, #key) },
        None => quote! { ::env_loadr::FieldSpec::unkeyed(#name) },
    };

    if let Some(default) = &value.default {
        spec = quote! { #spec.with_default(#default) };
    }
    if value.required {
        spec = quote! { #spec.required() };
    }
    if let Some(delimiter) = &value.delimiter {
        spec = quote! { #spec.with_delimiter(#delimiter) };
    }
    if let Some(separator) = &value.key_value_separator {
        spec = quote! { #spec.with_key_value_separator(#separator) };
    }
    if !value.description.is_empty() {
        let description = &value.description;
        spec = quote! { #spec.with_description(#description) };
    }

    spec
}

#[derive(Debug, Default)]
struct StructConfig {
    prefix: Option<LitStr>,
    by_name: bool,
}

/// Parse `#[config(prefix = "APP_", by_name)]` on the struct
fn parse_struct_config(attrs: &[Attribute]) -> syn::Result<StructConfig> {
    let mut config = StructConfig::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("config")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("prefix") {
                config.prefix = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else if meta.path.is_ident("by_name") {
                config.by_name = true;
                Ok(())
            } else {
                Err(meta.error(
                    "unsupported config attribute, expected prefix = \"...\" or by_name",
                ))
            }
        })?;
    }

    Ok(config)
}

/// Parse #[field(env = "X", default = "Y", required)] syntax
fn parse_field_list(attr: &Attribute) -> syn::Result<HashMap<String, MetaValue>> {
    let mut values = HashMap::new();

    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected identifier"))?
            .to_string();

        if meta.input.peek(Token![=]) {
            if !STRING_KEYS.contains(&key.as_str()) {
                return Err(meta.error(format!("unsupported field attribute `{key} = ...`")));
            }
            let value: LitStr = meta.value()?.parse()?;
            values.insert(key, MetaValue::Str(value));
        } else {
            if !FLAG_KEYS.contains(&key.as_str()) {
                return Err(meta.error(format!("unsupported field attribute `{key}`")));
            }
            values.insert(key, MetaValue::Flag);
        }

        Ok(())
    })?;

    Ok(values)
}

/// Collect `///` doc comments into a single description line
fn doc_comment(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the `#[field(...)]` attribute; `None` if the field has none
fn parse_field_config(attrs: &[Attribute]) -> syn::Result<Option<FieldMode>> {
    let Some(field_attr) = attrs.iter().find(|attr| attr.path().is_ident("field")) else {
        return Ok(None);
    };

    if !matches!(field_attr.meta, Meta::List(_)) {
        return Err(syn::Error::new_spanned(
            field_attr,
            "field attribute must be a list: #[field(env = \"...\", ...)]",
        ));
    }
    let parsed = parse_field_list(field_attr)?;

    let string = |key: &str| match parsed.get(key) {
        Some(MetaValue::Str(s)) => Some(s.clone()),
        _ => None,
    };
    let flag = |key: &str| parsed.contains_key(key);

    if flag("skip") {
        if parsed.len() > 1 {
            return Err(syn::Error::new_spanned(
                field_attr,
                "skip cannot be combined with other field attributes",
            ));
        }
        return Ok(Some(FieldMode::Skip));
    }

    if flag("nested") {
        let allowed = ["nested", "prefix", "doc"];
        if parsed.keys().any(|key| !allowed.contains(&key.as_str())) {
            return Err(syn::Error::new_spanned(
                field_attr,
                "nested fields only accept prefix = \"...\"",
            ));
        }
        return Ok(Some(FieldMode::Nested {
            prefix: string("prefix"),
        }));
    }

    if flag("prefix") {
        return Err(syn::Error::new_spanned(
            field_attr,
            "prefix is only valid on nested fields",
        ));
    }

    let required = flag("required");
    let default = string("default");
    if required && default.is_some() {
        return Err(syn::Error::new_spanned(
            field_attr,
            "a field cannot be both required and have a default",
        ));
    }

    for key in ["delimiter", "key_value_separator"] {
        if let Some(lit) = string(key) {
            if lit.value().is_empty() {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!("{key} must not be empty"),
                ));
            }
        }
    }

    let description = match string("doc") {
        Some(doc) => doc.value().trim().to_string(),
        None => doc_comment(attrs),
    };

    Ok(Some(FieldMode::Value(ValueConfig {
        env: string("env"),
        default,
        required,
        delimiter: string("delimiter"),
        key_value_separator: string("key_value_separator"),
        from_str: flag("from_str"),
        description,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{ItemStruct, parse_quote};

    fn field_attrs(item: &ItemStruct) -> &[Attribute] {
        &item.fields.iter().next().unwrap().attrs
    }

    fn error_message(item: ItemStruct) -> String {
        match parse_field_config(field_attrs(&item)) {
            Err(err) => err.to_string(),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_undeclared_field_has_no_config() {
        let item: ItemStruct = parse_quote! {
            struct Config { handle: std::sync::Arc<Handle> }
        };
        assert!(parse_field_config(field_attrs(&item)).unwrap().is_none());
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let item: ItemStruct = parse_quote! {
            struct Config { #[field(env = "HOSTS", delimiter = "")] hosts: Vec<String> }
        };
        assert_eq!(error_message(item), "delimiter must not be empty");
    }

    #[test]
    fn test_empty_key_value_separator_rejected() {
        let item: ItemStruct = parse_quote! {
            struct Config {
                #[field(env = "LABELS", key_value_separator = "")]
                labels: std::collections::HashMap<String, String>
            }
        };
        assert_eq!(error_message(item), "key_value_separator must not be empty");
    }

    #[test]
    fn test_required_with_default_rejected() {
        let item: ItemStruct = parse_quote! {
            struct Config { #[field(env = "PORT", required, default = "80")] port: u16 }
        };
        assert!(error_message(item).contains("cannot be both required"));
    }

    #[test]
    fn test_struct_config() {
        let item: ItemStruct = parse_quote! {
            #[config(prefix = "APP_", by_name)]
            struct Config { port: u16 }
        };
        let config = parse_struct_config(&item.attrs).unwrap();

        assert_eq!(config.prefix.map(|p| p.value()).as_deref(), Some("APP_"));
        assert!(config.by_name);
    }

    #[test]
    fn test_spec_tokens_use_builder() {
        let item: ItemStruct = parse_quote! {
            struct Config { #[field(env = "HOSTS", delimiter = ";", required)] hosts: Vec<String> }
        };
        let Some(FieldMode::Value(value)) = parse_field_config(field_attrs(&item)).unwrap() else {
            panic!("expected a value field");
        };
        let tokens = field_spec_tokens("hosts", &value).to_string();

        assert!(tokens.contains("FieldSpec :: new (\"hosts\" , \"HOSTS\")"));
        assert!(tokens.contains(". required ()"));
        assert!(tokens.contains(". with_delimiter (\";\")"));
    }
}
