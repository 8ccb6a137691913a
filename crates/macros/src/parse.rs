//! Attribute parsing for the FieldRegistry derive macro

use darling::{FromDeriveInput, FromMeta};
use syn::{DeriveInput, Ident, Path};

/// Parsed #[registry(...)] attribute on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(registry), supports(struct_unit))]
pub struct RegistryArgs {
    /// Struct identifier
    pub ident: Ident,

    /// Entity kind name (e.g., "particles")
    pub entity: String,

    /// Array layout enum the names map to (e.g., "ParticleArray")
    pub key: Path,

    /// One `field(name = "...", array = "...")` entry per exposed array
    #[darling(multiple, rename = "field")]
    pub fields: Vec<FieldEntry>,
}

/// A single `field(...)` entry
#[derive(Debug, FromMeta)]
pub struct FieldEntry {
    /// Semantic base name used by scripts (e.g., "position")
    pub name: String,

    /// Variant of the key enum (e.g., "Position")
    pub array: Ident,
}

/// Parse a DeriveInput into RegistryArgs
pub fn parse_registry(input: &DeriveInput) -> darling::Result<RegistryArgs> {
    RegistryArgs::from_derive_input(input)
}
