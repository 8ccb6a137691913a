//! Access-mode resolution
//!
//! The addressing mode is encoded in the requested name:
//!
//! | Request                 | Mode         | Rows                  |
//! |-------------------------|--------------|-----------------------|
//! | `position`              | `Local`      | local                 |
//! | `ghost_position`        | `GhostOnly`  | ghosts                |
//! | `position_with_ghosts`  | `WithGhosts` | local, then ghosts    |
//!
//! The prefix is checked first, so `ghost_position_with_ghosts` asks for
//! the ghost rows of a field called `position_with_ghosts`.

use snapview_sdk::GhostFlags;

use super::error::{AccessError, AccessResult};
use super::registry::FieldRegistry;

/// Prefix selecting ghost rows only
pub const GHOST_PREFIX: &str = "ghost_";

/// Suffix selecting local rows followed by ghost rows
pub const WITH_GHOSTS_SUFFIX: &str = "_with_ghosts";

/// Which rows of a field a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Local,
    GhostOnly,
    WithGhosts,
}

impl AccessMode {
    pub const ALL: [AccessMode; 3] = [Self::Local, Self::GhostOnly, Self::WithGhosts];

    /// Flags passed to the engine fetch
    pub const fn flags(self) -> GhostFlags {
        match self {
            Self::Local => GhostFlags::LOCAL,
            Self::GhostOnly => GhostFlags::GHOST_ONLY,
            Self::WithGhosts => GhostFlags::WITH_GHOSTS,
        }
    }

    /// Request name for `base` in this mode
    pub fn request_name(self, base: &str) -> String {
        match self {
            Self::Local => base.to_string(),
            Self::GhostOnly => format!("{GHOST_PREFIX}{base}"),
            Self::WithGhosts => format!("{base}{WITH_GHOSTS_SUFFIX}"),
        }
    }
}

/// A request name split into base field name and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRequest<'a> {
    pub base: &'a str,
    pub mode: AccessMode,
}

impl<'a> FieldRequest<'a> {
    pub fn parse(name: &'a str) -> Self {
        if let Some(base) = name.strip_prefix(GHOST_PREFIX) {
            Self {
                base,
                mode: AccessMode::GhostOnly,
            }
        } else if let Some(base) = name.strip_suffix(WITH_GHOSTS_SUFFIX) {
            Self {
                base,
                mode: AccessMode::WithGhosts,
            }
        } else {
            Self {
                base: name,
                mode: AccessMode::Local,
            }
        }
    }

    /// Look the base name up in `R`
    pub fn resolve<R: FieldRegistry>(self) -> Option<R::Key> {
        R::lookup(self.base)
    }
}

/// Resolve a request name to an engine array and addressing mode
pub fn resolve<R: FieldRegistry>(name: &str) -> AccessResult<(R::Key, AccessMode)> {
    let request = FieldRequest::parse(name);
    request
        .resolve::<R>()
        .map(|key| (key, request.mode))
        .ok_or_else(|| AccessError::FieldNotFound {
            entity: R::ENTITY,
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ParticleFields;
    use snapview_sdk::ParticleArray;

    #[test]
    fn test_parse_modes() {
        assert_eq!(
            FieldRequest::parse("velocity"),
            FieldRequest {
                base: "velocity",
                mode: AccessMode::Local
            }
        );
        assert_eq!(FieldRequest::parse("ghost_velocity").mode, AccessMode::GhostOnly);
        assert_eq!(FieldRequest::parse("velocity_with_ghosts").base, "velocity");
    }

    #[test]
    fn test_prefix_wins_over_suffix() {
        let request = FieldRequest::parse("ghost_mass_with_ghosts");
        assert_eq!(request.base, "mass_with_ghosts");
        assert_eq!(request.mode, AccessMode::GhostOnly);
        assert!(matches!(
            resolve::<ParticleFields>("ghost_mass_with_ghosts"),
            Err(AccessError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_bare_affixes_are_not_fields() {
        for name in ["ghost_", "_with_ghosts", ""] {
            assert!(resolve::<ParticleFields>(name).is_err(), "{name:?} resolved");
        }
    }

    #[test]
    fn test_request_name_round_trips() {
        for mode in AccessMode::ALL {
            let name = mode.request_name("net_force");
            assert_eq!(
                resolve::<ParticleFields>(&name).unwrap(),
                (ParticleArray::NetForce, mode)
            );
        }
    }

    #[test]
    fn test_field_not_found_reports_full_name() {
        let err = resolve::<ParticleFields>("ghost_spin").unwrap_err();
        assert_eq!(
            err,
            AccessError::FieldNotFound {
                entity: "particles",
                name: "ghost_spin".to_string()
            }
        );
    }
}
