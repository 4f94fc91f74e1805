//! Procedural macros for the docattach project.
//!
//! This crate provides `#[derive(HostModel)]`, which implements
//! `docattach::model::HostModel` for a host-framework model struct.
//!
//! ```ignore
//! use docattach::prelude::*;
//!
//! #[derive(HostModel)]
//! #[host_model(app_label = "app", model_name = "widgets")]
//! pub struct Widget {
//!     #[host_model(primary_key)]
//!     pub pk: Option<i64>,
//!     pub name: String,
//! }
//! ```
//!
//! Without attributes the model name is the lowercased type name, the app label is the
//! name of the crate the model is defined in, and the primary key is the field named
//! `id`. An `Option` primary key reports `None` for unsaved instances.

#[allow(unused_extern_crates)]
extern crate self as docattach_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Fields, Index, Result, Type, parse_macro_input};

#[proc_macro_derive(HostModel, attributes(host_model))]
pub fn derive_host_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Configuration from the struct-level `#[host_model(...)]` attribute
#[derive(Debug, Default)]
struct ModelAttr {
    app_label: Option<String>,
    model_name: Option<String>,
}

impl ModelAttr {
    fn from_attrs(attrs: &[syn::Attribute]) -> Result<Self> {
        let mut config = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("host_model") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("app_label") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    config.app_label = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("model_name") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    config.model_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported host_model attribute"))
                }
            })?;
        }

        Ok(config)
    }
}

fn is_primary_key(field: &syn::Field) -> Result<bool> {
    let mut marked = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("host_model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unsupported host_model field attribute"))
            }
        })?;
    }

    Ok(marked)
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

/// The primary-key field accessor and whether it is an `Option`.
fn primary_key(input: &DeriveInput) -> Result<(TokenStream2, bool)> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "HostModel can only be derived for structs",
        ));
    };

    let mut marked = None;
    let mut named_id = None;

    match &data.fields {
        Fields::Named(fields) => {
            for field in &fields.named {
                let accessor = field.ident.to_token_stream();

                if is_primary_key(field)? {
                    if marked.is_some() {
                        return Err(syn::Error::new_spanned(field, "only one field can be the primary key"));
                    }
                    marked = Some((accessor, is_option(&field.ty)));
                } else if field.ident.as_ref().is_some_and(|ident| ident == "id") {
                    named_id = Some((accessor, is_option(&field.ty)));
                }
            }
        },
        Fields::Unnamed(fields) => {
            for (position, field) in fields.unnamed.iter().enumerate() {
                if is_primary_key(field)? {
                    if marked.is_some() {
                        return Err(syn::Error::new_spanned(field, "only one field can be the primary key"));
                    }
                    marked = Some((Index::from(position).to_token_stream(), is_option(&field.ty)));
                }
            }
        },
        Fields::Unit => {},
    }

    marked.or(named_id).ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "HostModel needs a field named `id` or one marked #[host_model(primary_key)]",
        )
    })
}

fn derive_impl(input: DeriveInput) -> Result<TokenStream2> {
    let config = ModelAttr::from_attrs(&input.attrs)?;
    let (field, optional) = primary_key(&input)?;

    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let app_label = match &config.app_label {
        Some(label) => quote! { #label },
        None => quote! { ::core::env!("CARGO_CRATE_NAME") },
    };
    let model_name = config
        .model_name
        .unwrap_or_else(|| struct_name.to_string().to_lowercase());

    let primary_key = if optional {
        quote! {
            ::core::clone::Clone::clone(&self.#field).map(::core::convert::Into::into)
        }
    } else {
        quote! {
            ::core::option::Option::Some(::core::convert::Into::into(::core::clone::Clone::clone(&self.#field)))
        }
    };

    Ok(quote! {
        impl #impl_generics ::docattach::model::HostModel for #struct_name #ty_generics #where_clause {
            fn app_label() -> &'static str {
                #app_label
            }

            fn model_name() -> &'static str {
                #model_name
            }

            fn primary_key(&self) -> ::core::option::Option<::docattach::bson::Bson> {
                #primary_key
            }
        }
    })
}
