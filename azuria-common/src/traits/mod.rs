pub mod api;

pub use api::{GatewayApi, PushChannel, RemoteApi};

#[cfg(feature = "mocks")]
pub use api::{MockGatewayApi, MockPushChannel, MockRemoteApi};
