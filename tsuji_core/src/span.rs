use once_cell::sync::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A borrowed view of a substring: shared source text plus byte offsets.
///
/// Header and template parsing scan the same text many times; keeping spans
/// instead of owned strings removes the allocation tax on the parse/ranking
/// path. A span compares by character content, hashes through a lazily
/// computed cached hash, and can be sub-spanned without copying. The string
/// itself is materialized only when a value leaves the core, and since the
/// source is a shared `str` that materialization is a plain borrow.
#[derive(Clone)]
pub struct CharSpan {
    source: Arc<str>,
    start: usize,
    end: usize,
    // Lazily computed polynomial hash. Shared spans may race to fill the
    // cell; both writers compute the same value.
    hash: OnceCell<u64>,
}

impl CharSpan {
    /// Create a span over `source[start..end]`.
    ///
    /// `start` and `end` must be byte offsets on char boundaries with
    /// `start <= end <= source.len()`.
    pub fn new(source: Arc<str>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= source.len());
        debug_assert!(source.is_char_boundary(start) && source.is_char_boundary(end));
        CharSpan {
            source,
            start,
            end,
            hash: OnceCell::new(),
        }
    }

    /// Span covering an entire source string.
    pub fn whole<S: Into<Arc<str>>>(source: S) -> Self {
        let source = source.into();
        let end = source.len();
        CharSpan::new(source, 0, end)
    }

    /// Length of the viewed text in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Byte offset of this span's start within its source.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of this span's end within its source.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte at position `i` within the span, if in range.
    pub fn byte_at(&self, i: usize) -> Option<u8> {
        self.as_str().as_bytes().get(i).copied()
    }

    /// Sub-span relative to this span, sharing the same source.
    ///
    /// A full-range sub-span returns a clone of `self`, keeping any cached
    /// hash.
    pub fn slice(&self, start: usize, end: usize) -> CharSpan {
        debug_assert!(start <= end && end <= self.len());
        if start == 0 && end == self.len() {
            return self.clone();
        }
        CharSpan::new(self.source.clone(), self.start + start, self.start + end)
    }

    /// The viewed text. Borrowing from the shared source, no copy.
    pub fn as_str(&self) -> &str {
        &self.source[self.start..self.end]
    }

    /// Case-insensitive (ASCII) content comparison against another span.
    pub fn eq_ignore_ascii_case(&self, other: &CharSpan) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }

    /// Case-insensitive (ASCII) content comparison against a plain string.
    pub fn eq_str_ignore_ascii_case(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }

    /// The cached content hash, computing it on first use.
    ///
    /// Polynomial rolling hash over the span's bytes. Two spans with equal
    /// content always produce the same hash regardless of their position in
    /// their sources.
    pub fn content_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut h: u64 = 0;
            for b in self.as_str().bytes() {
                h = h.wrapping_mul(31).wrapping_add(b as u64);
            }
            h
        })
    }
}

impl PartialEq for CharSpan {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for CharSpan {}

impl PartialEq<str> for CharSpan {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for CharSpan {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for CharSpan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl fmt::Display for CharSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CharSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharSpan({:?} @ {}..{})", self.as_str(), self.start, self.end)
    }
}

impl From<&str> for CharSpan {
    fn from(s: &str) -> Self {
        CharSpan::whole(s)
    }
}

impl From<String> for CharSpan {
    fn from(s: String) -> Self {
        CharSpan::whole(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_content() {
        let a = CharSpan::whole("application/json");
        let b = CharSpan::whole("xx application/json yy").slice(3, 19);
        assert_eq!(a, b);
        assert_eq!(b.as_str(), "application/json");
    }

    #[test]
    fn equal_content_hashes_equal() {
        let a = CharSpan::whole("text/html");
        let b = CharSpan::whole("__text/html").slice(2, 11);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_is_cached() {
        let a = CharSpan::whole("cache-me");
        let first = a.content_hash();
        assert_eq!(first, a.content_hash());
        assert_eq!(a.hash.get(), Some(&first));
    }

    #[test]
    fn full_range_slice_keeps_cached_hash() {
        let a = CharSpan::whole("abc");
        let h = a.content_hash();
        let b = a.slice(0, 3);
        assert_eq!(b.hash.get(), Some(&h));
    }

    #[test]
    fn sub_spans_share_source() {
        let a = CharSpan::whole("one/two/three");
        let mid = a.slice(4, 7);
        assert_eq!(mid, "two");
        let inner = mid.slice(1, 3);
        assert_eq!(inner, "wo");
        assert_eq!(inner.start(), 5);
    }

    #[test]
    fn byte_access() {
        let a = CharSpan::whole("q=0.5").slice(2, 5);
        assert_eq!(a.byte_at(0), Some(b'0'));
        assert_eq!(a.byte_at(3), None);
    }

    #[test]
    fn case_insensitive_compare() {
        let a = CharSpan::whole("TEXT");
        let b = CharSpan::whole("text");
        assert_ne!(a, b);
        assert!(a.eq_ignore_ascii_case(&b));
        assert!(a.eq_str_ignore_ascii_case("Text"));
    }

    #[test]
    fn display_materializes() {
        let a = CharSpan::whole("a/b;c=d").slice(0, 3);
        assert_eq!(a.to_string(), "a/b");
    }
}
