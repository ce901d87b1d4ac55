//! # Keystone Core
//!
//! Core types, traits, and error definitions for Keystone.
//! Every other crate in the workspace reports failures through
//! [`KeystoneError`] and wires its components through `shaku`.

pub mod error;
pub mod result;
pub mod telemetry;
pub mod traits;

pub use error::*;
pub use result::*;
pub use traits::*;

// Re-export shaku for dependency injection
pub use shaku::{module, HasComponent, Interface};
