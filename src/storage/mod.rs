//! Storage for Lexis.
//!
//! Vocabulary content and progression behind injectable traits, with
//! in-memory and file-based implementations.

pub mod file;
pub mod jsonl;
pub mod memory;
pub mod traits;

pub use file::{FileItemStore, FileProgressionStore};
pub use jsonl::JsonlLog;
pub use memory::{MemoryItemStore, MemoryProgressionStore};
pub use traits::{ItemStore, ProgressionStore, TableFilter};
