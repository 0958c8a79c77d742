//! Util Module - Shared Utilities
//!
//! Utilities and helper functions used throughout FRC.

pub mod alignment;
pub mod debug;

pub use alignment::Alignment;
