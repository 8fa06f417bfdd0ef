//! `#[derive(Model)]` implementation.
//!
//! Builds a `ModelDescriptor` from a struct with named fields. The
//! descriptor is built once per type and cached in a `OnceLock`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Lit, LitStr, Meta, MetaNameValue,
    parse_macro_input,
};

/// Container attributes.
#[derive(Default)]
struct ModelAttrs {
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

/// Field attributes.
#[derive(Default)]
struct FieldAttrs {
    alias: Option<String>,
    title: Option<String>,
    description: Option<String>,
    deprecated: bool,
    skip: bool,
    default: Option<Expr>,
    examples: Vec<Expr>,
    gt: Option<Expr>,
    ge: Option<Expr>,
    lt: Option<Expr>,
    le: Option<Expr>,
    multiple_of: Option<Expr>,
    min_length: Option<Expr>,
    max_length: Option<Expr>,
    pattern: Option<LitStr>,
}

fn parse_model_attrs(attrs: &[Attribute]) -> syn::Result<ModelAttrs> {
    let mut result = ModelAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            let value = || -> syn::Result<String> { Ok(meta.value()?.parse::<LitStr>()?.value()) };
            if meta.path.is_ident("name") {
                result.name = Some(value()?);
            } else if meta.path.is_ident("title") {
                result.title = Some(value()?);
            } else if meta.path.is_ident("description") {
                result.description = Some(value()?);
            } else {
                return Err(meta.error("unknown model attribute; expected `name`, `title` or `description`"));
            }
            Ok(())
        })?;
    }
    if result.description.is_none() {
        result.description = extract_doc_comment(attrs);
    }
    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("skip") {
                result.skip = true;
            } else if path.is_ident("deprecated") {
                result.deprecated = true;
            } else if path.is_ident("alias") {
                result.alias = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("title") {
                result.title = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("description") {
                result.description = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("pattern") {
                let pattern = meta.value()?.parse::<LitStr>()?;
                if let Err(err) = regex::Regex::new(&pattern.value()) {
                    return Err(syn::Error::new(pattern.span(), format!("invalid pattern: {err}")));
                }
                result.pattern = Some(pattern);
            } else if path.is_ident("default") {
                result.default = Some(meta.value()?.parse()?);
            } else if path.is_ident("example") {
                result.examples.push(meta.value()?.parse()?);
            } else {
                let slot = if path.is_ident("gt") {
                    &mut result.gt
                } else if path.is_ident("ge") {
                    &mut result.ge
                } else if path.is_ident("lt") {
                    &mut result.lt
                } else if path.is_ident("le") {
                    &mut result.le
                } else if path.is_ident("multiple_of") {
                    &mut result.multiple_of
                } else if path.is_ident("min_length") {
                    &mut result.min_length
                } else if path.is_ident("max_length") {
                    &mut result.max_length
                } else {
                    return Err(meta.error("unknown model field attribute"));
                };
                *slot = Some(meta.value()?.parse()?);
            }
            Ok(())
        })?;
    }
    if result.description.is_none() {
        result.description = extract_doc_comment(attrs);
    }
    Ok(result)
}

/// Extract doc comments from attributes.
fn extract_doc_comment(attrs: &[Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            match &attr.meta {
                Meta::NameValue(MetaNameValue {
                    value:
                        Expr::Lit(ExprLit {
                            lit: Lit::Str(s), ..
                        }),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            }
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

fn field_tokens(ident: &syn::Ident, ty: &syn::Type, attrs: &FieldAttrs) -> TokenStream2 {
    let name = ident.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name);

    let mut calls = Vec::new();
    if let Some(alias) = &attrs.alias {
        calls.push(quote! { .alias(#alias) });
    }
    if let Some(title) = &attrs.title {
        calls.push(quote! { .title(#title) });
    }
    if let Some(description) = &attrs.description {
        calls.push(quote! { .description(#description) });
    }
    if attrs.deprecated {
        calls.push(quote! { .deprecated(true) });
    }
    if let Some(default) = &attrs.default {
        calls.push(quote! { .default(sugar_core::__private::serde_json::json!(#default)) });
    }
    for example in &attrs.examples {
        calls.push(quote! { .example(sugar_core::__private::serde_json::json!(#example)) });
    }
    for (method, bound) in [
        ("gt", &attrs.gt),
        ("ge", &attrs.ge),
        ("lt", &attrs.lt),
        ("le", &attrs.le),
        ("multiple_of", &attrs.multiple_of),
    ] {
        if let Some(bound) = bound {
            let method = syn::Ident::new(method, proc_macro2::Span::call_site());
            calls.push(quote! { .#method((#bound) as f64) });
        }
    }
    if let Some(len) = &attrs.min_length {
        calls.push(quote! { .min_length((#len) as usize) });
    }
    if let Some(len) = &attrs.max_length {
        calls.push(quote! { .max_length((#len) as usize) });
    }

    let field = quote! {
        sugar_core::ModelField::typed::<#ty>(#name) #(#calls)*
    };
    match &attrs.pattern {
        Some(pattern) => quote! {
            {
                let field = #field;
                match sugar_core::Pattern::new(#pattern) {
                    Ok(pattern) => field.pattern(pattern),
                    Err(_) => field,
                }
            }
        },
        None => field,
    }
}

pub fn derive_model_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Model can only be derived for structs",
            ));
        }
    };

    let model_attrs = parse_model_attrs(&input.attrs)?;
    let model_name = model_attrs.name.unwrap_or_else(|| ident.to_string());
    let mut model = quote! { sugar_core::ModelDescriptor::new(#model_name) };
    if let Some(title) = &model_attrs.title {
        model = quote! { #model.title(#title) };
    }
    if let Some(description) = &model_attrs.description {
        model = quote! { #model.description(#description) };
    }

    let mut field_exprs = Vec::new();
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(field_ident) = &field.ident else {
            continue;
        };
        field_exprs.push(field_tokens(field_ident, &field.ty, &attrs));
    }

    Ok(quote! {
        impl sugar_core::Model for #ident {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::unnecessary_cast
            )]
            fn model() -> ::std::sync::Arc<sugar_core::ModelDescriptor> {
                static MODEL: ::std::sync::OnceLock<::std::sync::Arc<sugar_core::ModelDescriptor>> =
                    ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(MODEL.get_or_init(|| {
                    #model
                        #(.field(#field_exprs))*
                        .build()
                }))
            }
        }

        impl sugar_core::Described for #ident {
            fn descriptor() -> sugar_core::TypeDescriptor {
                sugar_core::TypeDescriptor::model(<Self as sugar_core::Model>::model())
            }
        }
    })
}
