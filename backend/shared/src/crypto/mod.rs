//! Cryptographic helpers shared by the function binaries

pub mod hashing;

pub use hashing::*;
