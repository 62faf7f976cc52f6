//! Types shared between the table engine and anything that displays or
//! transports its state.

pub mod config;
pub mod protocol;
pub mod vec3;
