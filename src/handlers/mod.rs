//! Built-in command handlers
//!
//! A deliberately small set that exercises every pipeline stage, the
//! prompt correlator, and the store contract. Deployments register their
//! own catalog through the same traits at startup.

mod ping;
mod points;

pub use ping::PingCommand;
pub use points::{PointsSetCommand, MANAGE_POINTS};
