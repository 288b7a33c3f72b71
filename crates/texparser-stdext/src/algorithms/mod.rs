//! Algorithms.

pub mod spellcheck;
pub mod substringsearch;
