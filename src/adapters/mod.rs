//! Backend adapters
//!
//! - Gateway: the `CommandGateway` trait every backend implements
//! - HTTP: remote backend reached over HTTP

pub mod gateway;
pub mod http_gateway;

pub use gateway::{args, Command, CommandGateway, GatewayError};
pub use http_gateway::HttpGateway;
