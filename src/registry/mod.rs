pub mod manager;
pub mod store;
pub mod types;

pub use manager::Registry;
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use types::*;
