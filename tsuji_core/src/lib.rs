// Type aliases (must be declared before other modules that use it)
pub mod alias;

pub mod span;
pub mod media;
pub mod template;
pub mod trie;
pub mod convert;
pub mod registry;
pub mod debug;


// Re-export the types a transport layer wires against
pub use convert::{ParamKind, ParamSpec, ParamValue};
pub use media::{MediaGroup, MediaType, Quality};
pub use registry::{
    Endpoint, EndpointCall, EndpointMetadata, Handler, RegisterError, Registry, ResolveError,
    RouterConfig, split_query,
};
pub use span::CharSpan;
pub use trie::BestMatch;
