//! K-mer alphabets, equivalence classes and counting
//!
//! Sequences are reduced to per-class counts here; everything downstream
//! only sees base feature ids.

mod alphabet;
mod counter;

pub use alphabet::Alphabet;
pub use counter::{KmerClass, KmerClassId, KmerConfig, KmerCounter, KmerCounts};
