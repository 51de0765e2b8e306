//! Shared display primitives: colors and tables.

pub mod colors;
pub mod table;

pub use colors::*;
pub use table::*;
