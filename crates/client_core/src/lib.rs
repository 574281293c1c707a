//! Client-side controller for one event aggregate (event, sessions,
//! attendees) served by a remote Event API.

pub mod cache;
pub mod config;
mod controller;
pub mod error;
pub mod transport;
pub mod views;

pub use cache::SnapshotCache;
pub use config::{ApiConfig, ConfigError};
pub use controller::{ControllerEvent, ControllerPhase, ControllerState, EventStateController};
pub use error::ControllerError;
pub use transport::{EventApi, HttpEventApi};
