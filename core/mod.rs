// Core module: transport type definitions (NO I/O dependencies)
pub mod types;

pub use types::*;
