pub mod config;
pub mod endpoint;
pub mod registry;

pub use self::config::RouterConfig;
pub use self::endpoint::{Endpoint, EndpointCall, EndpointMetadata, Handler};
pub use self::registry::{RegisterError, Registry, ResolveError, split_query};
