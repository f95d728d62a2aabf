//! Backend Layer
//!
//! The storage/transport contract and an in-memory implementation.

mod memory;
mod traits;

#[cfg(test)]
mod tests;

pub use memory::{MemoryBackend, TypedText, TypedVia};
pub use traits::{Backend, BackendResult};
