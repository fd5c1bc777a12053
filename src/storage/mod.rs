//! Profile lookup backends

pub mod memory;
pub mod traits;

pub use memory::MemoryProfileStore;
pub use traits::{ProfileStore, SharedProfileStore};
