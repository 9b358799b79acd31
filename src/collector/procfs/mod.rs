//! Readers for the Linux `/proc` filesystem.

pub mod memory;
pub mod parser;

pub use memory::ProcfsMemory;
pub use parser::{MemInfo, ParseError, parse_meminfo};
