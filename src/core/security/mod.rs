#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! HUB signing key lifecycle: load-or-create, at-rest encryption, audit trail.

pub mod keystore;
