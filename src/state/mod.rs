pub mod breakpoints;
pub mod memory;
pub mod registers;
pub mod types;

pub use breakpoints::*;
pub use memory::*;
pub use registers::*;
pub use types::*;
