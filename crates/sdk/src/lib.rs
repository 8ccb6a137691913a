//! snapview SDK - Engine Buffer Type Definitions
//!
//! This crate contains the plain types shared between the native engine and
//! the scoped access layer. It has no dependencies and compiles quickly,
//! allowing parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`dtype`] - Element types of engine arrays
//! - [`buffer`] - Raw buffer handles, memory locations and ghost addressing flags
//! - [`arrays`] - Engine array identifiers and layouts per entity kind

pub mod arrays;
pub mod buffer;
pub mod dtype;

pub use arrays::{ArrayLayout, BondArray, ParticleArray};
pub use buffer::{BufferHandle, GhostFlags, MemoryLocation};
pub use dtype::DType;
