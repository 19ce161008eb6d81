pub mod core;
pub mod detector;
pub mod language;
pub mod probability;
pub mod table;

pub use crate::core::*;
pub use detector::*;
pub use language::*;
pub use table::*;
