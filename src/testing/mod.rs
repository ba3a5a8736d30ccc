//! Deterministic signal sources for diagnostics harnesses and tests.

pub mod synth;

pub use synth::{to_i16, SyntheticPattern, SyntheticSpec};
