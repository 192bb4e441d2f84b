use crate::alias::PRwLock;
use crate::convert::{self, ParamSpec};
use crate::debug_log;
use crate::media::{self, Combination, CombinedMediaType, MediaGroup, MediaParseError, combine};
use crate::registry::config::RouterConfig;
use crate::registry::endpoint::{Endpoint, EndpointCall, EndpointMetadata, Handler};
use crate::template::{self, TemplateError};
use crate::trie::{BestMatch, DispatchBlock, InsertError};
use fnv::FnvHashMap;
use http::Method;
use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Errors raised while registering an endpoint. All of them are fatal at
/// startup; a registry with a failed registration should not be served.
#[derive(Debug)]
pub enum RegisterError {
    // The URI template did not parse.
    Template(TemplateError),
    // The trie rejected the registration.
    Trie(InsertError),
    // The registry already froze; registration is closed.
    Frozen,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Template(e) => write!(f, "Template error: {}", e),
            RegisterError::Trie(e) => write!(f, "Registration error: {}", e),
            RegisterError::Frozen => f.write_str("Registry is frozen; registration is closed"),
        }
    }
}

impl std::error::Error for RegisterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegisterError::Template(e) => Some(e),
            RegisterError::Trie(e) => Some(e),
            RegisterError::Frozen => None,
        }
    }
}

impl From<TemplateError> for RegisterError {
    fn from(e: TemplateError) -> Self {
        RegisterError::Template(e)
    }
}

impl From<InsertError> for RegisterError {
    fn from(e: InsertError) -> Self {
        RegisterError::Trie(e)
    }
}

/// Per-request errors. A request that fails here was never routed; the
/// transport maps the error to its 400-class response. "No match" is not
/// an error, it is the `None` result of [`Registry::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Media(MediaParseError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Media(e) => write!(f, "Unparsable media header: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Media(e) => Some(e),
        }
    }
}

impl From<MediaParseError> for ResolveError {
    fn from(e: MediaParseError) -> Self {
        ResolveError::Media(e)
    }
}

/// The endpoint registry: build it at startup, freeze it, then resolve
/// requests against it from any number of threads.
///
/// Registration goes through an interior lock; the first lookup (or an
/// explicit [`Registry::freeze`]) publishes the trie root once, after
/// which the routing structures are immutable and reads take no lock.
/// `R` is the response value produced by this registry's handlers.
pub struct Registry<R> {
    config: RouterConfig,
    building: PRwLock<DispatchBlock<R>>,
    published: OnceCell<Arc<DispatchBlock<R>>>,
    cache: PRwLock<FnvHashMap<(Method, String), Arc<Vec<BestMatch<R>>>>>,
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Registry::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Registry {
            config,
            building: PRwLock::new(DispatchBlock::root()),
            published: OnceCell::new(),
            cache: PRwLock::new(FnvHashMap::default()),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a resource method under a URI template.
    ///
    /// Empty `consumes`/`produces` groups mean the endpoint accepts and
    /// produces anything. Fails on template parse errors, a duplicate
    /// (node, verb) binding, conflicting variable names, duplicate regex
    /// patterns, or a frozen registry.
    pub fn register_endpoint<H>(
        &self,
        template: &str,
        verbs: &[Method],
        consumes: MediaGroup,
        produces: MediaGroup,
        params: Vec<ParamSpec>,
        handler: H,
    ) -> Result<(), RegisterError>
    where
        H: Handler<R> + 'static,
    {
        if self.is_frozen() {
            return Err(RegisterError::Frozen);
        }
        let segments = template::parse(template)?;
        let endpoint = Arc::new(Endpoint::new(
            EndpointMetadata::new(template, verbs.to_vec(), consumes, produces),
            params,
            Arc::new(handler),
        ));
        debug_log!("registering {:?} {}", verbs, template);
        self.building.write().insert(template, &segments, endpoint)?;
        Ok(())
    }

    /// Publish the trie. Registration fails from here on; lookups become
    /// lock-free. Idempotent.
    pub fn freeze(&self) {
        let _ = self.root();
    }

    pub fn is_frozen(&self) -> bool {
        self.published.get().is_some()
    }

    /// The published trie root, freezing the registry on first use.
    pub fn root(&self) -> Arc<DispatchBlock<R>> {
        self.published
            .get_or_init(|| Arc::new(std::mem::take(&mut *self.building.write())))
            .clone()
    }

    /// Resolve a request to an endpoint and its bound path parameters.
    ///
    /// Missing `Content-Type`/`Accept` headers default to `*/*`. When
    /// several endpoints match the path, content-type compatibility
    /// ranks them; a tie falls through to the accept ranking, and a
    /// residual tie logs a warning and keeps the first registered
    /// candidate (the trie's specificity order makes this
    /// deterministic).
    pub fn resolve(
        &self,
        verb: &Method,
        uri: &str,
        headers: &[(String, String)],
    ) -> Result<Option<BestMatch<R>>, ResolveError> {
        let quality_key = self.config.effective_quality_key();
        let content_type = match header_value(headers, "content-type") {
            Some(text) => media::parse(text, quality_key)?,
            None => MediaGroup::wildcard(),
        };
        let accept = match header_value(headers, "accept") {
            Some(text) => media::parse(text, quality_key)?,
            None => MediaGroup::wildcard(),
        };

        let candidates = self.candidate_list(verb, uri);
        if candidates.is_empty() {
            return Ok(None);
        }

        let wildcard = MediaGroup::wildcard();
        let mut type_ranks = rank(&content_type, &candidates, &wildcard, Side::Consumes);
        if type_ranks.is_empty() {
            // Nothing can consume the request entity.
            return Ok(None);
        }
        type_ranks.sort_by(|a, b| b.0.compare(&a.0));

        let winner = if type_ranks.len() > 1
            && type_ranks[0].0.compare(&type_ranks[1].0) == Ordering::Equal
        {
            let mut accept_ranks = rank(&accept, &candidates, &wildcard, Side::Produces);
            accept_ranks.sort_by(|a, b| b.0.compare(&a.0));
            match accept_ranks.len() {
                0 => {
                    warn!(%verb, uri, "content-type tie with no acceptable representation; keeping first candidate");
                    type_ranks[0].1
                }
                1 => accept_ranks[0].1,
                _ => {
                    if accept_ranks[0].0.compare(&accept_ranks[1].0) == Ordering::Equal {
                        warn!(%verb, uri, "ambiguous endpoint match; keeping first candidate");
                    }
                    accept_ranks[0].1
                }
            }
        } else {
            type_ranks[0].1
        };

        Ok(Some(candidates[winner].clone()))
    }

    /// Call a resolved endpoint, converting its path parameters into the
    /// positional arguments its descriptors declare.
    pub fn invoke(
        &self,
        matched: &BestMatch<R>,
        verb: &Method,
        uri: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        body: &[u8],
    ) -> R {
        let args = convert::convert(matched.endpoint().params(), matched.values());
        let call = EndpointCall {
            verb,
            uri,
            headers,
            args: &args,
            path_params: matched.values(),
            query,
            body,
        };
        matched.endpoint().handler().handle(call)
    }

    // Candidate endpoints for (verb, uri) in trie specificity order,
    // through the cache when enabled. Computation happens under the
    // write lock so each key is computed at most once.
    fn candidate_list(&self, verb: &Method, uri: &str) -> Arc<Vec<BestMatch<R>>> {
        if !self.config.effective_cache_matches() {
            return Arc::new(self.compute_candidates(verb, uri));
        }
        let key = (verb.clone(), uri.to_string());
        if let Some(hit) = self.cache.read().get(&key) {
            return hit.clone();
        }
        let mut guard = self.cache.write();
        if let Some(hit) = guard.get(&key) {
            return hit.clone();
        }
        let fresh = Arc::new(self.compute_candidates(verb, uri));
        guard.insert(key, fresh.clone());
        fresh
    }

    fn compute_candidates(&self, verb: &Method, uri: &str) -> Vec<BestMatch<R>> {
        let root = self.root();
        match root.find(verb, uri) {
            Some(found) => found.candidates(),
            None => Vec::new(),
        }
    }
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Registry::new()
    }
}

enum Side {
    Consumes,
    Produces,
}

// Combine every client range with every server range of every candidate,
// keeping the compatible results tagged with their candidate index.
// Candidate order is preserved among equal combinations by the caller's
// stable sort.
fn rank<R>(
    client: &MediaGroup,
    candidates: &[BestMatch<R>],
    wildcard: &MediaGroup,
    side: Side,
) -> Vec<(CombinedMediaType, usize)> {
    let mut out = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let meta = candidate.endpoint().metadata();
        let server = match side {
            Side::Consumes => meta.consumes(),
            Side::Produces => meta.produces(),
        };
        let server = if server.is_empty() { wildcard } else { server };
        for client_range in client {
            for server_range in server {
                if let Combination::Compatible(v) = combine(client_range, server_range) {
                    out.push((v, index));
                }
            }
        }
    }
    out
}

// First header value whose name matches case-insensitively.
fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Split a raw query string into name/value pairs without decoding.
///
/// A leading `?` is tolerated; parts without `=` become `(name, "")`.
/// Percent sequences pass through untouched, the transport owns
/// decoding.
pub fn split_query(query: &str) -> Vec<(&str, &str)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((name, value)) => (name, value),
            None => (part, ""),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::endpoint::EndpointCall;

    fn status_handler(status: u16) -> impl Handler<u16> {
        move |_: EndpointCall<'_>| status
    }

    fn register(registry: &Registry<u16>, template: &str, status: u16) {
        registry
            .register_endpoint(
                template,
                &[Method::GET],
                MediaGroup::new(),
                MediaGroup::new(),
                Vec::new(),
                status_handler(status),
            )
            .unwrap();
    }

    #[test]
    fn freeze_closes_registration() {
        let registry: Registry<u16> = Registry::new();
        register(&registry, "/a", 1);
        registry.freeze();
        let err = registry
            .register_endpoint(
                "/b",
                &[Method::GET],
                MediaGroup::new(),
                MediaGroup::new(),
                Vec::new(),
                status_handler(2),
            )
            .unwrap_err();
        assert!(matches!(err, RegisterError::Frozen));
    }

    #[test]
    fn first_lookup_freezes() {
        let registry: Registry<u16> = Registry::new();
        register(&registry, "/a", 1);
        assert!(!registry.is_frozen());
        let _ = registry.resolve(&Method::GET, "/a", &[]).unwrap();
        assert!(registry.is_frozen());
    }

    #[test]
    fn registration_errors_surface() {
        let registry: Registry<u16> = Registry::new();
        let err = registry
            .register_endpoint(
                "/a//b",
                &[Method::GET],
                MediaGroup::new(),
                MediaGroup::new(),
                Vec::new(),
                status_handler(1),
            )
            .unwrap_err();
        assert!(matches!(err, RegisterError::Template(TemplateError::EmptySegment { .. })));

        register(&registry, "/dup", 1);
        let err = registry
            .register_endpoint(
                "/dup",
                &[Method::GET],
                MediaGroup::new(),
                MediaGroup::new(),
                Vec::new(),
                status_handler(2),
            )
            .unwrap_err();
        assert!(matches!(err, RegisterError::Trie(InsertError::DuplicateBinding { .. })));
    }

    #[test]
    fn cached_candidates_keep_resolving_identically() {
        let registry: Registry<u16> =
            Registry::with_config(RouterConfig::new().with_cache_matches(true));
        register(&registry, "/u/{id}", 7);
        let first = registry.resolve(&Method::GET, "/u/alpha", &[]).unwrap().unwrap();
        let second = registry.resolve(&Method::GET, "/u/alpha", &[]).unwrap().unwrap();
        assert_eq!(first.value("id"), second.value("id"));
        // Same key now hits the same cached list.
        let a = registry.candidate_list(&Method::GET, "/u/alpha");
        let b = registry.candidate_list(&Method::GET, "/u/alpha");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unparsable_accept_is_a_typed_error() {
        let registry: Registry<u16> = Registry::new();
        register(&registry, "/a", 1);
        let headers = vec![("Accept".to_string(), "x/y;q=9".to_string())];
        let err = registry.resolve(&Method::GET, "/a", &headers).unwrap_err();
        assert!(matches!(err, ResolveError::Media(MediaParseError::BadQuality { .. })));
    }

    #[test]
    fn split_query_pairs() {
        assert_eq!(split_query("?a=1&b=2"), vec![("a", "1"), ("b", "2")]);
        assert_eq!(split_query("flag&x="), vec![("flag", ""), ("x", "")]);
        assert!(split_query("").is_empty());
        assert_eq!(split_query("k=a%20b"), vec![("k", "a%20b")], "no decoding");
    }
}
