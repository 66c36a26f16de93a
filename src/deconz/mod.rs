pub mod client;
pub mod types;

pub use client::DeconzClient;
pub use types::{Gateway, SensorMap};
