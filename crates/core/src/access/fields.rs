//! Field registries for the built-in entity kinds

use snapview_sdk::{BondArray, ParticleArray};

use crate::FieldRegistry;

/// Names exposed by particle local access
#[derive(Debug, Clone, Copy, FieldRegistry)]
#[registry(
    entity = "particles",
    key = "ParticleArray",
    field(name = "position", array = "Position"),
    field(name = "type", array = "Type"),
    field(name = "velocity", array = "Velocity"),
    field(name = "mass", array = "Mass"),
    field(name = "acceleration", array = "Acceleration"),
    field(name = "orientation", array = "Orientation"),
    field(name = "angular_momentum", array = "AngularMomentum"),
    field(name = "moment_of_inertia", array = "MomentOfInertia"),
    field(name = "charge", array = "Charge"),
    field(name = "diameter", array = "Diameter"),
    field(name = "image", array = "Image"),
    field(name = "tag", array = "Tag"),
    field(name = "rtag", array = "RTag"),
    field(name = "rigid_body_id", array = "Body"),
    field(name = "net_force", array = "NetForce"),
    field(name = "net_torque", array = "NetTorque"),
    field(name = "net_virial", array = "NetVirial"),
)]
pub struct ParticleFields;

/// Names exposed by bond local access
#[derive(Debug, Clone, Copy, FieldRegistry)]
#[registry(
    entity = "bonds",
    key = "BondArray",
    field(name = "typeid", array = "TypeId"),
    field(name = "group", array = "Members"),
    field(name = "tag", array = "Tag"),
    field(name = "rtag", array = "RTag"),
)]
pub struct BondFields;
