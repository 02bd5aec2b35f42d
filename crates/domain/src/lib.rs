//! Domain layer for the geocoding workspace
//!
//! Contains the location value objects shared by the geocoding client and its
//! callers: validated coordinates, structured addresses and their display
//! formatting. This layer performs no I/O.

pub mod value_objects;

pub use value_objects::*;
