pub mod config;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod quota;
pub mod server;
pub mod signature_cache;
pub mod translate;
pub mod upstream;
pub mod utils;

pub use error::GatewayError;
pub use server::router::{GatewayState, gateway_router};
