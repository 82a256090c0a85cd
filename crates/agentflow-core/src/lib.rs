pub mod config;
pub mod error;
pub mod io;
pub mod message;
pub mod orchestrator;
pub mod paths;
pub mod phase;
pub mod store;
pub mod todo;
pub mod types;
pub mod vcs;

pub use error::{FlowError, Result};
