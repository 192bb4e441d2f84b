use crate::registry::endpoint::Endpoint;
use crate::template::{Segment, Token};
use crate::trie::matches::DispatchMatch;
use crate::{debug_log, debug_trace};
use fnv::FnvHashMap;
use http::Method;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// What a trie node matches.
#[derive(Debug)]
pub enum BlockKind {
    // Sentinel at the top of the trie.
    Root,
    // Matches exactly this segment text.
    Word(String),
    // Matches any single non-empty segment, binding it to `name`.
    // `template` remembers which registration introduced the variable so
    // a later conflicting name can cite both sides.
    SegVar { name: String, template: String },
    // Matches a run of trailing segments against a compiled expression,
    // binding its named groups.
    RegexSeg(RegexSegment),
}

/// A compiled regex child. `source` is the assembled pattern before
/// anchoring and doubles as the node's identity: two children with the
/// same source are a registration error.
pub struct RegexSegment {
    pattern: Regex,
    source: String,
    // (capture group id, template variable name), in template order.
    groups: Vec<(String, String)>,
}

impl fmt::Debug for RegexSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexSegment")
            .field("source", &self.source)
            .field("groups", &self.groups)
            .finish()
    }
}

/// Errors raised while inserting a template into the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    // Two templates put differently named variables at the same path.
    VariableNameConflict {
        first: String,
        first_template: String,
        second: String,
        second_template: String,
    },
    // A verb already bound at this node.
    DuplicateBinding { verb: Method, template: String },
    // A regex child with this exact pattern already exists at the node.
    DuplicateRegexPattern { pattern: String, template: String },
    // The assembled pattern did not compile.
    PatternCompile { pattern: String, reason: String },
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::VariableNameConflict {
                first,
                first_template,
                second,
                second_template,
            } => write!(
                f,
                "Conflicting variable names at same path: {{{}}} from '{}' vs {{{}}} from '{}'",
                first, first_template, second, second_template
            ),
            InsertError::DuplicateBinding { verb, template } => {
                write!(f, "Verb {} already bound at '{}'", verb, template)
            }
            InsertError::DuplicateRegexPattern { pattern, template } => {
                write!(f, "Pattern '{}' already registered at node reached by '{}'", pattern, template)
            }
            InsertError::PatternCompile { pattern, reason } => {
                write!(f, "Pattern '{}' failed to compile: {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for InsertError {}

/// A node of the dispatch trie.
///
/// Children are kept per kind: a literal map, at most one full-segment
/// variable, and an ordered list of regex children. Lookup visits kinds
/// in that order, which is the specificity contract: literal beats
/// variable beats regex at every level.
///
/// Several endpoints may terminate at a node under the same verb as long
/// as their media constraints differ; content negotiation picks between
/// them. An identical (verb, consumes, produces) binding is a
/// registration error.
pub struct DispatchBlock<R> {
    kind: BlockKind,
    words: FnvHashMap<String, DispatchBlock<R>>,
    var: Option<Box<DispatchBlock<R>>>,
    regexes: Vec<DispatchBlock<R>>,
    endpoints: FnvHashMap<Method, Vec<Arc<Endpoint<R>>>>,
}

impl<R> Default for DispatchBlock<R> {
    fn default() -> Self {
        DispatchBlock::root()
    }
}

// The shape of one template segment, deciding the child kind.
enum Shape<'a> {
    Word(&'a str),
    Var(&'a str),
    Mixed,
}

fn classify(segment: &Segment) -> Shape<'_> {
    match segment.as_slice() {
        [Token::Literal(text)] => Shape::Word(text),
        [Token::PureVar(name)] => Shape::Var(name),
        _ => Shape::Mixed,
    }
}

// Assemble the trailing segments of a template into one pattern, with a
// fresh capture group per variable and a trailing '/'. Matching runs
// against the reconstructed tail URI which carries the same trailing
// slash.
fn assemble(segments: &[Segment]) -> (String, Vec<(String, String)>) {
    let mut pattern = String::new();
    let mut groups: Vec<(String, String)> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            pattern.push('/');
        }
        for token in segment {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(text)),
                Token::PureVar(name) => {
                    let group = format!("g{}", groups.len());
                    pattern.push_str("(?P<");
                    pattern.push_str(&group);
                    pattern.push_str(">[^/]+?)");
                    groups.push((group, name.clone()));
                }
                Token::RegexVar(name, expression) => {
                    let group = format!("g{}", groups.len());
                    pattern.push_str("(?P<");
                    pattern.push_str(&group);
                    pattern.push('>');
                    pattern.push_str(expression);
                    pattern.push(')');
                    groups.push((group, name.clone()));
                }
                Token::Slash => pattern.push('/'),
            }
        }
    }
    pattern.push('/');
    (pattern, groups)
}

impl<R> DispatchBlock<R> {
    pub fn root() -> Self {
        DispatchBlock::with_kind(BlockKind::Root)
    }

    fn with_kind(kind: BlockKind) -> Self {
        DispatchBlock {
            kind,
            words: FnvHashMap::default(),
            var: None,
            regexes: Vec::new(),
            endpoints: FnvHashMap::default(),
        }
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// Endpoints bound at this node under `verb`, in registration order.
    pub fn bindings(&self, verb: &Method) -> &[Arc<Endpoint<R>>] {
        self.endpoints.get(verb).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert a parsed template, binding `endpoint` under each of its
    /// verbs at the terminal node.
    pub(crate) fn insert(
        &mut self,
        template: &str,
        segments: &[Segment],
        endpoint: Arc<Endpoint<R>>,
    ) -> Result<(), InsertError> {
        let mut node: &mut DispatchBlock<R> = self;
        let mut index = 0;
        while index < segments.len() {
            match classify(&segments[index]) {
                Shape::Word(text) => {
                    node = node
                        .words
                        .entry(text.to_string())
                        .or_insert_with(|| DispatchBlock::with_kind(BlockKind::Word(text.to_string())));
                }
                Shape::Var(name) => {
                    if let Some(existing) = node.var.as_deref() {
                        if let BlockKind::SegVar {
                            name: first,
                            template: first_template,
                        } = &existing.kind
                        {
                            if first != name {
                                return Err(InsertError::VariableNameConflict {
                                    first: first.clone(),
                                    first_template: first_template.clone(),
                                    second: name.to_string(),
                                    second_template: template.to_string(),
                                });
                            }
                        }
                    }
                    let name = name.to_string();
                    let owner = template.to_string();
                    node = &mut **node.var.get_or_insert_with(|| {
                        Box::new(DispatchBlock::with_kind(BlockKind::SegVar {
                            name,
                            template: owner,
                        }))
                    });
                }
                Shape::Mixed => {
                    // From here on the rest of the template folds into a
                    // single regex child.
                    let (source, groups) = assemble(&segments[index..]);
                    let duplicate = node.regexes.iter().any(
                        |child| matches!(&child.kind, BlockKind::RegexSeg(seg) if seg.source == source),
                    );
                    if duplicate {
                        return Err(InsertError::DuplicateRegexPattern {
                            pattern: source,
                            template: template.to_string(),
                        });
                    }
                    let anchored = format!("^{}$", source);
                    let pattern = Regex::new(&anchored).map_err(|e| InsertError::PatternCompile {
                        pattern: source.clone(),
                        reason: e.to_string(),
                    })?;
                    debug_log!("compiled regex child '{}' for '{}'", source, template);
                    node.regexes.push(DispatchBlock::with_kind(BlockKind::RegexSeg(
                        RegexSegment { pattern, source, groups },
                    )));
                    let last = node.regexes.len() - 1;
                    node = &mut node.regexes[last];
                    break;
                }
            }
            index += 1;
        }
        node.bind(template, endpoint)
    }

    fn bind(&mut self, template: &str, endpoint: Arc<Endpoint<R>>) -> Result<(), InsertError> {
        let meta = endpoint.metadata();
        for verb in meta.verbs() {
            if let Some(bound) = self.endpoints.get(verb) {
                let collides = bound.iter().any(|existing| {
                    existing.metadata().consumes() == meta.consumes()
                        && existing.metadata().produces() == meta.produces()
                });
                if collides {
                    return Err(InsertError::DuplicateBinding {
                        verb: verb.clone(),
                        template: template.to_string(),
                    });
                }
            }
        }
        for verb in meta.verbs() {
            self.endpoints
                .entry(verb.clone())
                .or_default()
                .push(endpoint.clone());
        }
        Ok(())
    }

    /// Match a request URI, producing the tree of all candidate paths.
    ///
    /// The URI is normalized by stripping one leading and one trailing
    /// slash and splitting on `/`. Returns `None` when nothing under this
    /// node terminates with the given verb.
    pub fn find<'a>(&'a self, verb: &Method, uri: &str) -> Option<DispatchMatch<'a, R>> {
        let trimmed = uri.strip_prefix('/').unwrap_or(uri);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        debug_trace!("find {} '{}' -> {} segments", verb, uri, segments.len());
        self.descend(verb, &segments)
    }

    // Leaf matches for the endpoints terminating here under `verb`: a
    // plain leaf for one binding, an interior of leaves when several
    // media variants share the verb.
    fn terminal<'a>(&'a self, verb: &Method) -> Option<DispatchMatch<'a, R>> {
        let bound = self.endpoints.get(verb)?;
        match bound.as_slice() {
            [] => None,
            [single] => Some(DispatchMatch::leaf(self, single.clone())),
            many => Some(DispatchMatch::interior(
                self,
                many.iter().map(|e| DispatchMatch::leaf(self, e.clone())).collect(),
            )),
        }
    }

    fn descend<'a>(&'a self, verb: &Method, segments: &[&str]) -> Option<DispatchMatch<'a, R>> {
        if segments.is_empty() {
            return self.terminal(verb);
        }
        let segment = segments[0];
        let rest = &segments[1..];
        let mut children: Vec<DispatchMatch<'a, R>> = Vec::new();

        if let Some(word) = self.words.get(segment) {
            if let Some(found) = word.descend(verb, rest) {
                debug_trace!("word child '{}' matched", segment);
                children.push(found);
            }
        }
        if !segment.is_empty() {
            if let Some(var) = self.var.as_deref() {
                if let Some(mut found) = var.descend(verb, rest) {
                    if let BlockKind::SegVar { name, .. } = &var.kind {
                        found.bind(name.clone(), segment.to_string());
                    }
                    children.push(found);
                }
            }
        }
        if !self.regexes.is_empty() {
            let mut tail = segments.join("/");
            tail.push('/');
            for child in &self.regexes {
                if let BlockKind::RegexSeg(seg) = &child.kind {
                    if let Some(found) = child.match_tail(verb, seg, &tail) {
                        children.push(found);
                    }
                }
            }
        }

        if children.is_empty() {
            None
        } else {
            Some(DispatchMatch::interior(self, children))
        }
    }

    // A regex child consumes the whole remaining tail, so a successful
    // match terminates at this node.
    fn match_tail<'a>(
        &'a self,
        verb: &Method,
        seg: &RegexSegment,
        tail: &str,
    ) -> Option<DispatchMatch<'a, R>> {
        let captures = seg.pattern.captures(tail)?;
        let mut found = self.terminal(verb)?;
        debug_trace!("regex child '{}' matched '{}'", seg.source, tail);
        for (group, name) in &seg.groups {
            if let Some(capture) = captures.name(group) {
                found.bind(name.clone(), capture.as_str().to_string());
            }
        }
        Some(found)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Root => f.write_str("/"),
            BlockKind::Word(text) => f.write_str(text),
            BlockKind::SegVar { name, .. } => write!(f, "{{{}}}", name),
            BlockKind::RegexSeg(seg) => write!(f, "re:{}", seg.source),
        }
    }
}

impl<R> fmt::Display for DispatchBlock<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.endpoints.is_empty() {
            let mut verbs: Vec<String> = self.endpoints.keys().map(|m| m.to_string()).collect();
            verbs.sort();
            write!(f, " [{}]", verbs.join(" "))?;
        }
        let mut children: Vec<String> = Vec::new();
        let mut words: Vec<&String> = self.words.keys().collect();
        words.sort();
        for key in words {
            children.push(self.words[key].to_string());
        }
        if let Some(var) = self.var.as_deref() {
            children.push(var.to_string());
        }
        for child in &self.regexes {
            children.push(child.to_string());
        }
        if !children.is_empty() {
            write!(f, " {{ {} }}", children.join(", "))?;
        }
        Ok(())
    }
}
