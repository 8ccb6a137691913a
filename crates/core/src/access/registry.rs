//! Field-name registries
//!
//! A registry is the fixed mapping from the semantic names callers use
//! (`position`, `tag`, ...) to the engine array for one entity kind. It is
//! normally generated with `#[derive(FieldRegistry)]`.

use snapview_sdk::ArrayLayout;

/// Compile-time mapping from field names to engine arrays
pub trait FieldRegistry: 'static {
    /// Engine array identifier
    type Key: ArrayLayout;

    /// Entity kind name, used in errors
    const ENTITY: &'static str;

    /// Registered `(name, array)` pairs
    const FIELDS: &'static [(&'static str, Self::Key)];

    /// Engine array registered under `name`
    fn lookup(name: &str) -> Option<Self::Key> {
        Self::FIELDS
            .iter()
            .find(|(field, _)| *field == name)
            .map(|&(_, key)| key)
    }

    fn contains(name: &str) -> bool {
        Self::lookup(name).is_some()
    }

    /// Registered names in declaration order
    fn names() -> impl Iterator<Item = &'static str> {
        Self::FIELDS.iter().map(|&(name, _)| name)
    }
}
