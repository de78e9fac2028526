//! Futures domain — contract chains per underlying product.
//!
//! An underlying is the exchange product symbol (`"AU"`, `"RB"`, `"IF"`); the
//! provider resolves it to concrete contract codes.

pub mod client;
pub mod wire;
