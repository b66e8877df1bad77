pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod registry;
pub mod session;
pub mod setup;
pub mod terminal;
pub mod workers;


pub use config::SquadConfig;
pub use error::{Result, SquadError};
pub use registry::{WorkerRecord, WorkerStatus};
pub use workers::{SpawnRequest, WorkerManager};
