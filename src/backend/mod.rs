//! Backend module - Code generation

pub mod cpp;
pub mod ts;

// Per-function synthesis
pub mod synth;
pub mod trampoline;

// Whole files
pub mod declarations;
pub mod assembler;

pub use assembler::{Assembler, OutputSet};
pub use synth::Synthesizer;
