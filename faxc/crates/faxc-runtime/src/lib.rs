//! Fax Runtime Library
//!
//! Provides runtime support for Fax programs including:
//! - Reference-counted object allocation (via FRC)
//! - Retain / release entry points for generated code
//! - String and list helpers

mod rc;

pub use rc::*;
