//! FieldRegistry derive macro implementation

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{parse_registry, RegistryArgs};

/// Reserved by the ghost-selection naming convention
const GHOST_PREFIX: &str = "ghost_";
const GHOST_SUFFIX: &str = "_with_ghosts";

/// Generate the FieldRegistry implementation
pub fn derive_field_registry(input: DeriveInput) -> TokenStream {
    match parse_registry(&input).and_then(validate) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

/// Reject names that could never be looked up unambiguously
fn validate(args: RegistryArgs) -> darling::Result<RegistryArgs> {
    let mut errors = darling::Error::accumulator();
    let mut seen = HashSet::new();

    for entry in &args.fields {
        if entry.name.is_empty() {
            errors.push(darling::Error::custom("field name must not be empty").with_span(&entry.array));
        } else if entry.name.starts_with(GHOST_PREFIX) || entry.name.ends_with(GHOST_SUFFIX) {
            errors.push(
                darling::Error::custom(format!(
                    "field name `{}` collides with the `{GHOST_PREFIX}` / `{GHOST_SUFFIX}` convention",
                    entry.name
                ))
                .with_span(&entry.array),
            );
        }

        if !seen.insert(entry.name.as_str()) {
            errors.push(
                darling::Error::custom(format!(
                    "field `{}` is registered twice for {}",
                    entry.name, args.entity
                ))
                .with_span(&entry.array),
            );
        }
    }

    errors.finish_with(args)
}

fn generate_impl(args: RegistryArgs) -> TokenStream {
    let ident = &args.ident;
    let entity = &args.entity;
    let key = &args.key;

    let entries = args.fields.iter().map(|entry| {
        let name = &entry.name;
        let array = &entry.array;
        quote! { (#name, #key::#array) }
    });

    quote! {
        impl ::snapview_core::access::FieldRegistry for #ident {
            type Key = #key;

            const ENTITY: &'static str = #entity;

            const FIELDS: &'static [(&'static str, Self::Key)] = &[
                #(#entries),*
            ];
        }
    }
}
