// # Client Store Implementations
//
// This module provides implementations of the ClientStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileClientStore;
pub use memory::MemoryClientStore;
