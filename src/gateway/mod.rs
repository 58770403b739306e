// Gateway module for the backend API - follows the Train Station Pattern
// All remote access must go through this gateway

mod http;
mod traits;
mod wire;

pub use http::HttpGateway;
#[cfg(test)]
pub use traits::MockSessionGateway;
pub use traits::{GatewayResult, SessionGateway};
