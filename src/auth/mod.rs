//! Authorization for Warden
//!
//! Provides:
//! - Native platform permission bit checks
//! - Custom guild-scoped permission grants
//! - The developer override escape hatch
//! - The `authorize` decision function the dispatcher consults

pub mod gate;
pub mod native;

pub use gate::{authorize, Decision};
