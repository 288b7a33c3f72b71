//! Data structures and algorithms that are not specific to TeX
//! but that the texparser crates need.

pub mod algorithms;
pub mod collections;
pub mod color;
