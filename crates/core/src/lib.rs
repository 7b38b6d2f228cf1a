pub mod error;
pub mod logging;

pub mod context;
pub mod dispatch;
pub mod engine;
pub mod envelope;
pub mod events;
pub mod registry;
pub mod resource;

pub use error::{Result, SwitchboardError};
