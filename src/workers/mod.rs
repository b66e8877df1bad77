pub mod manager;
pub mod types;

pub use manager::WorkerManager;
pub use types::*;
