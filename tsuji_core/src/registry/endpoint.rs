use crate::convert::{ParamSpec, ParamValue};
use crate::media::MediaGroup;
use fnv::FnvHashMap;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Everything an endpoint callable receives for one request.
///
/// `args` holds the converted positional arguments, one per declared
/// parameter descriptor; `path_params` keeps the raw string bindings for
/// callables that prefer to look values up by name.
pub struct EndpointCall<'a> {
    pub verb: &'a Method,
    pub uri: &'a str,
    pub headers: &'a [(String, String)],
    pub args: &'a [ParamValue],
    pub path_params: &'a FnvHashMap<String, String>,
    pub query: &'a [(String, String)],
    pub body: &'a [u8],
}

/// The boundary to user code. The router calls `handle` synchronously
/// from whatever worker thread carried the request; implementations must
/// therefore be shareable across threads.
pub trait Handler<R>: Send + Sync {
    fn handle(&self, call: EndpointCall<'_>) -> R;
}

impl<R, F> Handler<R> for F
where
    F: for<'a> Fn(EndpointCall<'a>) -> R + Send + Sync,
{
    fn handle(&self, call: EndpointCall<'_>) -> R {
        self(call)
    }
}

/// Registration metadata for one endpoint: its template, verb set and
/// media constraints. An empty consumes/produces group means "anything"
/// and defaults to `*/*` during negotiation.
#[derive(Clone, Debug)]
pub struct EndpointMetadata {
    template: String,
    verbs: Vec<Method>,
    consumes: MediaGroup,
    produces: MediaGroup,
}

impl EndpointMetadata {
    pub fn new<T: Into<String>>(
        template: T,
        verbs: Vec<Method>,
        consumes: MediaGroup,
        produces: MediaGroup,
    ) -> Self {
        EndpointMetadata {
            template: template.into(),
            verbs,
            consumes,
            produces,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn verbs(&self) -> &[Method] {
        &self.verbs
    }

    pub fn consumes(&self) -> &MediaGroup {
        &self.consumes
    }

    pub fn produces(&self) -> &MediaGroup {
        &self.produces
    }
}

/// A registered resource method: the user callable plus its metadata and
/// parameter descriptors. Opaque to the trie, which only moves `Arc`s of
/// it around.
pub struct Endpoint<R> {
    meta: EndpointMetadata,
    params: Vec<ParamSpec>,
    handler: Arc<dyn Handler<R>>,
}

impl<R> Endpoint<R> {
    pub fn new(meta: EndpointMetadata, params: Vec<ParamSpec>, handler: Arc<dyn Handler<R>>) -> Self {
        Endpoint { meta, params, handler }
    }

    pub fn metadata(&self) -> &EndpointMetadata {
        &self.meta
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn handler(&self) -> &dyn Handler<R> {
        &*self.handler
    }
}

impl<R> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("template", &self.meta.template)
            .field("verbs", &self.meta.verbs)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
