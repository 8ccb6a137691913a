//! Engine array identifiers
//!
//! Each entity kind has a closed set of arrays the engine can hand out.
//! These enums are the engine-side accessor identifiers; the semantic names
//! callers use (`position`, `ghost_velocity`, ...) are mapped onto them by
//! field registries in the core crate.

use std::fmt;
use std::hash::Hash;

use crate::dtype::DType;

/// Static description of an engine array family
pub trait ArrayLayout: Copy + Eq + Hash + fmt::Debug + 'static {
    /// Every array of this entity kind, in storage order
    const ALL: &'static [Self];

    /// Storage index (position in [`ArrayLayout::ALL`])
    fn index(self) -> usize;

    /// Engine accessor name, used in diagnostics
    fn accessor_name(self) -> &'static str;

    /// Element type
    fn dtype(self) -> DType;

    /// Elements per row
    fn width(self) -> usize;

    /// Whether the engine forbids writes through local access
    fn read_only(self) -> bool;
}

/// Per-particle arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleArray {
    Position,
    Type,
    Velocity,
    Mass,
    Acceleration,
    Orientation,
    AngularMomentum,
    MomentOfInertia,
    Charge,
    Diameter,
    Image,
    Tag,
    RTag,
    Body,
    NetForce,
    NetTorque,
    NetVirial,
}

impl ArrayLayout for ParticleArray {
    const ALL: &'static [Self] = &[
        ParticleArray::Position,
        ParticleArray::Type,
        ParticleArray::Velocity,
        ParticleArray::Mass,
        ParticleArray::Acceleration,
        ParticleArray::Orientation,
        ParticleArray::AngularMomentum,
        ParticleArray::MomentOfInertia,
        ParticleArray::Charge,
        ParticleArray::Diameter,
        ParticleArray::Image,
        ParticleArray::Tag,
        ParticleArray::RTag,
        ParticleArray::Body,
        ParticleArray::NetForce,
        ParticleArray::NetTorque,
        ParticleArray::NetVirial,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn accessor_name(self) -> &'static str {
        match self {
            ParticleArray::Position => "getPosition",
            ParticleArray::Type => "getTypes",
            ParticleArray::Velocity => "getVelocities",
            ParticleArray::Mass => "getMasses",
            ParticleArray::Acceleration => "getAcceleration",
            ParticleArray::Orientation => "getOrientation",
            ParticleArray::AngularMomentum => "getAngularMomentum",
            ParticleArray::MomentOfInertia => "getMomentsOfInertia",
            ParticleArray::Charge => "getCharge",
            ParticleArray::Diameter => "getDiameter",
            ParticleArray::Image => "getImages",
            ParticleArray::Tag => "getTags",
            ParticleArray::RTag => "getRTags",
            ParticleArray::Body => "getBodies",
            ParticleArray::NetForce => "getNetForce",
            ParticleArray::NetTorque => "getNetTorque",
            ParticleArray::NetVirial => "getNetVirial",
        }
    }

    fn dtype(self) -> DType {
        match self {
            ParticleArray::Type | ParticleArray::Tag | ParticleArray::RTag => DType::U32,
            ParticleArray::Image | ParticleArray::Body => DType::I32,
            _ => DType::F64,
        }
    }

    fn width(self) -> usize {
        match self {
            ParticleArray::Position
            | ParticleArray::Velocity
            | ParticleArray::Acceleration
            | ParticleArray::MomentOfInertia
            | ParticleArray::Image
            | ParticleArray::NetForce
            | ParticleArray::NetTorque => 3,
            ParticleArray::Orientation | ParticleArray::AngularMomentum => 4,
            ParticleArray::NetVirial => 6,
            _ => 1,
        }
    }

    fn read_only(self) -> bool {
        matches!(
            self,
            ParticleArray::Tag
                | ParticleArray::RTag
                | ParticleArray::NetForce
                | ParticleArray::NetTorque
                | ParticleArray::NetVirial
        )
    }
}

/// Per-bond arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondArray {
    TypeId,
    Members,
    Tag,
    RTag,
}

impl ArrayLayout for BondArray {
    const ALL: &'static [Self] = &[
        BondArray::TypeId,
        BondArray::Members,
        BondArray::Tag,
        BondArray::RTag,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn accessor_name(self) -> &'static str {
        match self {
            BondArray::TypeId => "getTypeVal",
            BondArray::Members => "getMembers",
            BondArray::Tag => "getTags",
            BondArray::RTag => "getRTags",
        }
    }

    fn dtype(self) -> DType {
        DType::U32
    }

    fn width(self) -> usize {
        match self {
            BondArray::Members => 2,
            _ => 1,
        }
    }

    fn read_only(self) -> bool {
        matches!(self, BondArray::Tag | BondArray::RTag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_indices_match_storage_order() {
        for (i, array) in ParticleArray::ALL.iter().enumerate() {
            assert_eq!(array.index(), i);
        }
        for (i, array) in BondArray::ALL.iter().enumerate() {
            assert_eq!(array.index(), i);
        }
    }

    #[test]
    fn test_particle_layouts() {
        assert_eq!(ParticleArray::Position.width(), 3);
        assert_eq!(ParticleArray::Position.dtype(), DType::F64);
        assert_eq!(ParticleArray::Orientation.width(), 4);
        assert_eq!(ParticleArray::NetVirial.width(), 6);
        assert_eq!(ParticleArray::Type.dtype(), DType::U32);
        assert_eq!(ParticleArray::Image.dtype(), DType::I32);
    }

    #[test]
    fn test_read_only_arrays() {
        let read_only: Vec<_> = ParticleArray::ALL
            .iter()
            .filter(|a| a.read_only())
            .copied()
            .collect();
        assert_eq!(
            read_only,
            vec![
                ParticleArray::Tag,
                ParticleArray::RTag,
                ParticleArray::NetForce,
                ParticleArray::NetTorque,
                ParticleArray::NetVirial,
            ]
        );
        assert!(!BondArray::Members.read_only());
        assert!(BondArray::Tag.read_only());
    }
}
