//! Declarative model of a relaygate gateway: route definitions, predicate and filter specs,
//! and the gateway-wide settings. Every type here is plain serde data, the kernel compiles it.
pub mod definition;
pub use definition::*;

pub mod gateway;
pub use gateway::*;

pub mod http_route;
pub use http_route::*;

pub mod constants;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type BoxResult<T> = Result<T, BoxError>;
