//! # Keystone Server Library
//!
//! Dependency wiring and startup helpers for the Keystone binary.

pub mod di;
pub mod startup;
