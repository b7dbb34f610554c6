//! Bit-parallel verification of filter hits

pub mod myers;
pub mod verifier;

pub use myers::MyersPattern;
pub use verifier::{verify_window, Match, Verification, Verifier, VerifyCounters};
