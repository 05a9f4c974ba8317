//! In-process doubles for the three outbound seams, plus fixture helpers.
//! Used by this crate's tests and by bots that want to exercise their own
//! commands without a live gateway.

pub mod doubles;
pub mod helpers;

pub use doubles::{InMemoryRemoteApi, ManualPushChannel, RecordingGateway};
pub use helpers::{sample_identity, test_settings, write_unit};
