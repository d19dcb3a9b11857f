#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod config;
pub mod console;
pub mod cpu;
pub mod disassembler;
pub mod error;
pub mod events;
pub mod parser;
pub mod session;
pub mod state;
pub mod step;
pub mod sut;
pub mod utils;
