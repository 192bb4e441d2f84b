use crate::registry::endpoint::Endpoint;
use crate::trie::block::DispatchBlock;
use fnv::FnvHashMap;
use std::fmt;
use std::sync::Arc;

/// One node of the ephemeral match tree produced by a lookup.
///
/// An interior node collects the matches of its children, in specificity
/// order (word, then variable, then regex children); a leaf carries the
/// endpoint that terminated there. Values bound while descending hang off
/// the node whose block bound them. The tree lives only for the duration
/// of one lookup.
pub struct DispatchMatch<'a, R> {
    block: &'a DispatchBlock<R>,
    endpoint: Option<Arc<Endpoint<R>>>,
    values: Option<FnvHashMap<String, String>>,
    children: Vec<DispatchMatch<'a, R>>,
}

impl<'a, R> DispatchMatch<'a, R> {
    pub(crate) fn leaf(block: &'a DispatchBlock<R>, endpoint: Arc<Endpoint<R>>) -> Self {
        DispatchMatch {
            block,
            endpoint: Some(endpoint),
            values: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn interior(block: &'a DispatchBlock<R>, children: Vec<Self>) -> Self {
        DispatchMatch {
            block,
            endpoint: None,
            values: None,
            children,
        }
    }

    pub(crate) fn bind(&mut self, name: String, value: String) {
        self.values
            .get_or_insert_with(FnvHashMap::default)
            .insert(name, value);
    }

    pub fn block(&self) -> &DispatchBlock<R> {
        self.block
    }

    pub fn endpoint(&self) -> Option<&Arc<Endpoint<R>>> {
        self.endpoint.as_ref()
    }

    pub fn values(&self) -> Option<&FnvHashMap<String, String>> {
        self.values.as_ref()
    }

    pub fn children(&self) -> &[DispatchMatch<'a, R>] {
        &self.children
    }

    /// Pick the single winner: follow the first child at every level and
    /// accumulate the bound values along the way.
    ///
    /// Children were collected in word, variable, regex order, so the
    /// first child at each level is the most specific match at that
    /// level, independent of deeper choices.
    pub fn best(self) -> Option<BestMatch<R>> {
        let mut values: FnvHashMap<String, String> = FnvHashMap::default();
        let mut current = self;
        loop {
            if let Some(bound) = current.values.take() {
                values.extend(bound);
            }
            if let Some(endpoint) = current.endpoint.take() {
                return Some(BestMatch { endpoint, values });
            }
            if current.children.is_empty() {
                return None;
            }
            current = current.children.remove(0);
        }
    }

    /// Flatten the tree into every terminating candidate, in specificity
    /// order. The first entry is what [`DispatchMatch::best`] returns.
    pub fn candidates(self) -> Vec<BestMatch<R>> {
        let mut out = Vec::new();
        collect(self, FnvHashMap::default(), &mut out);
        out
    }
}

fn collect<R>(
    node: DispatchMatch<'_, R>,
    inherited: FnvHashMap<String, String>,
    out: &mut Vec<BestMatch<R>>,
) {
    let mut values = inherited;
    if let Some(bound) = node.values {
        values.extend(bound);
    }
    if let Some(endpoint) = node.endpoint {
        out.push(BestMatch { endpoint, values });
        return;
    }
    for child in node.children {
        collect(child, values.clone(), out);
    }
}

impl<R> fmt::Debug for DispatchMatch<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchMatch")
            .field("block", &self.block.kind().to_string())
            .field("endpoint", &self.endpoint.as_ref().map(|e| e.metadata().template()))
            .field("values", &self.values)
            .field("children", &self.children)
            .finish()
    }
}

/// The resolved outcome of a lookup: the winning endpoint and its bound
/// path parameters.
pub struct BestMatch<R> {
    endpoint: Arc<Endpoint<R>>,
    values: FnvHashMap<String, String>,
}

impl<R> BestMatch<R> {
    pub fn endpoint(&self) -> &Arc<Endpoint<R>> {
        &self.endpoint
    }

    pub fn values(&self) -> &FnvHashMap<String, String> {
        &self.values
    }

    /// A bound path parameter by name.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl<R> Clone for BestMatch<R> {
    fn clone(&self) -> Self {
        BestMatch {
            endpoint: self.endpoint.clone(),
            values: self.values.clone(),
        }
    }
}

impl<R> fmt::Debug for BestMatch<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestMatch")
            .field("template", &self.endpoint.metadata().template())
            .field("values", &self.values)
            .finish()
    }
}
