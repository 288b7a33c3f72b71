//! Collection types.

pub mod interner;
pub mod scopedmap;
