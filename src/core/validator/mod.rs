#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Note acceptance: shape, format, nonce-prefix, clock-skew, gateway, units,
//! and signature checks, in the fixed order a rejection is meaningful.

pub mod note;

pub use note::{validate_note, ValidatorError};
