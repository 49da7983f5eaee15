mod error;
mod gateway;
pub mod lightsail;
pub mod memory;

pub use error::GatewayError;
pub use gateway::{SnapshotGateway, SnapshotPage};
pub use lightsail::{LightsailConfig, LightsailGateway};
pub use memory::InMemoryGateway;
