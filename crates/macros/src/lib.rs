//! snapview proc macros
//!
//! - `#[derive(FieldRegistry)]` - Declare the semantic array names an entity
//!   kind exposes to local access
//!
//! # Example
//!
//! ```ignore
//! use snapview_core::FieldRegistry;
//! use snapview_sdk::BondArray;
//!
//! #[derive(FieldRegistry)]
//! #[registry(
//!     entity = "bonds",
//!     key = "BondArray",
//!     field(name = "typeid", array = "TypeId"),
//!     field(name = "group", array = "Members"),
//! )]
//! pub struct BondFields;
//!
//! // BondFields::lookup("group") == Some(BondArray::Members)
//! ```
//!
//! # Attributes
//!
//! - `entity = "..."` - **Required.** Entity kind name used in errors.
//! - `key = "..."` - **Required.** Path of the array layout enum.
//! - `field(name = "...", array = "...")` - One per exposed array. Names must
//!   be unique and must not start with `ghost_` or end with `_with_ghosts`.

mod parse;
mod registry;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for field-name registries
///
/// Generates a `FieldRegistry` implementation mapping each `field(...)`
/// name to a variant of the `key` enum. Only unit structs are supported.
#[proc_macro_derive(FieldRegistry, attributes(registry))]
pub fn derive_field_registry(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    registry::derive_field_registry(input).into()
}
