use crate::media::range::{MediaGroup, MediaType, Quality, WILDCARD, is_tchar};
use crate::span::CharSpan;
use std::fmt;
use std::sync::Arc;

/// Errors raised while parsing a `Content-Type` or `Accept` header.
///
/// Parse errors are fatal for the whole header, not per-range. Every
/// variant carries the byte position the caller can point a diagnostic at;
/// for [`MediaParseError::Incomplete`] that is the end of the last
/// successfully parsed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaParseError {
    // A comma before the first range.
    LeadingComma { at: usize },
    // The parser could not extend the match to cover the entire header.
    Incomplete { at: usize },
    // A concrete subtype under a wildcard type, e.g. `*/json`.
    WildcardWithConcreteSubtype { at: usize },
    // A quality value outside [0,1] or with more than 3 decimal places.
    BadQuality { at: usize },
}

impl fmt::Display for MediaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaParseError::LeadingComma { at } => {
                write!(f, "Leading comma before the first media range at byte {}", at)
            }
            MediaParseError::Incomplete { at } => {
                write!(f, "Header unparsable past byte {}", at)
            }
            MediaParseError::WildcardWithConcreteSubtype { at } => {
                write!(f, "Concrete subtype under wildcard type at byte {}", at)
            }
            MediaParseError::BadQuality { at } => {
                write!(f, "Invalid quality value at byte {}", at)
            }
        }
    }
}

impl std::error::Error for MediaParseError {}

/// Parse a header into an ordered media group.
///
/// `quality_key` is the parameter key recognized (case-insensitively) as
/// the quality factor, normally `"q"`. The returned media types hold
/// spans over one shared copy of the header text; nothing per-range is
/// allocated.
pub fn parse(header: &str, quality_key: &str) -> Result<MediaGroup, MediaParseError> {
    let mut scanner = Scanner {
        source: Arc::from(header),
        pos: 0,
    };
    scanner.read_group(quality_key)
}

struct Scanner {
    source: Arc<str>,
    pos: usize,
}

impl Scanner {
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_ows(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.bump();
        }
    }

    fn read_token(&mut self) -> Option<CharSpan> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_tchar(b) {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos > start {
            Some(CharSpan::new(self.source.clone(), start, self.pos))
        } else {
            None
        }
    }

    // quoted-string = '"' (qdtext | quoted-pair)* '"'
    // Returns the interior span, escapes left in place.
    fn read_quoted(&mut self) -> Option<CharSpan> {
        self.bump(); // opening quote
        let start = self.pos;
        loop {
            match self.peek()? {
                b'"' => {
                    let span = CharSpan::new(self.source.clone(), start, self.pos);
                    self.bump();
                    return Some(span);
                }
                b'\\' => {
                    self.bump();
                    let escaped = self.peek()?;
                    // quoted-pair = "\" ( HTAB | SP | VCHAR | obs-text )
                    if escaped == b'\t' || escaped == b' ' || (0x21..=0x7e).contains(&escaped) || escaped >= 0x80 {
                        self.bump();
                    } else {
                        return None;
                    }
                }
                b if is_qdtext(b) => self.bump(),
                _ => return None,
            }
        }
    }

    fn read_group(&mut self, quality_key: &str) -> Result<MediaGroup, MediaParseError> {
        let mut group = MediaGroup::new();
        let mut last_ok = 0usize;

        self.skip_ows();
        if self.peek() == Some(b',') {
            return Err(MediaParseError::LeadingComma { at: self.pos });
        }
        loop {
            let media = self.read_range(quality_key, last_ok)?;
            group.push(media);
            last_ok = self.pos;
            self.skip_ows();
            match self.peek() {
                None => break,
                Some(b',') => {
                    self.bump();
                    self.skip_ows();
                }
                Some(_) => return Err(MediaParseError::Incomplete { at: last_ok }),
            }
        }
        Ok(group)
    }

    // media-range = token "/" token parameter*
    fn read_range(&mut self, quality_key: &str, last_ok: usize) -> Result<MediaType, MediaParseError> {
        let range_start = self.pos;
        let kind = self
            .read_token()
            .ok_or(MediaParseError::Incomplete { at: last_ok })?;
        if self.peek() != Some(b'/') {
            return Err(MediaParseError::Incomplete { at: last_ok });
        }
        self.bump();
        let subtype = self
            .read_token()
            .ok_or(MediaParseError::Incomplete { at: last_ok })?;
        if kind == WILDCARD && subtype != WILDCARD {
            return Err(MediaParseError::WildcardWithConcreteSubtype { at: range_start });
        }

        let mut params: Vec<(CharSpan, CharSpan)> = Vec::new();
        let mut q = Quality::MAX;
        loop {
            // parameter = ows ";" ows token "=" (token | quoted-string)
            let save = self.pos;
            self.skip_ows();
            if self.peek() != Some(b';') {
                self.pos = save;
                break;
            }
            self.bump();
            self.skip_ows();
            let key = self
                .read_token()
                .ok_or(MediaParseError::Incomplete { at: last_ok })?;
            if self.peek() != Some(b'=') {
                return Err(MediaParseError::Incomplete { at: last_ok });
            }
            self.bump();
            let value_at = self.pos;
            let value = match self.peek() {
                Some(b'"') => self
                    .read_quoted()
                    .ok_or(MediaParseError::Incomplete { at: last_ok })?,
                _ => self
                    .read_token()
                    .ok_or(MediaParseError::Incomplete { at: last_ok })?,
            };
            if key.eq_str_ignore_ascii_case(quality_key) {
                // Last q wins when the key repeats.
                q = Quality::parse(value.as_str())
                    .ok_or(MediaParseError::BadQuality { at: value_at })?;
            } else {
                params.push((key, value));
            }
        }
        Ok(MediaType::from_parts(kind, subtype, params, q))
    }
}

// qdtext = HTAB / SP / %x21 / %x23-5B / %x5D-7E / obs-text
fn is_qdtext(b: u8) -> bool {
    matches!(b, b'\t' | b' ' | 0x21 | 0x23..=0x5b | 0x5d..=0x7e) || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_q(header: &str) -> Result<MediaGroup, MediaParseError> {
        parse(header, "q")
    }

    #[test]
    fn single_range() {
        let g = parse_q("application/json").unwrap();
        assert_eq!(g.len(), 1);
        let m = g.get(0).unwrap();
        assert_eq!(m.kind().as_str(), "application");
        assert_eq!(m.subtype().as_str(), "json");
        assert_eq!(m.quality(), Quality::MAX, "default q is 1");
        assert!(m.params().is_empty());
    }

    #[test]
    fn ranges_with_q_and_params() {
        let g = parse_q("text/html;level=1;q=0.8, application/json;q=0.9, */*;q=0.1").unwrap();
        assert_eq!(g.len(), 3);
        let html = g.get(0).unwrap();
        assert_eq!(html.quality(), Quality::from_thousandths(800));
        assert_eq!(html.params().len(), 1);
        assert_eq!(html.params()[0].0.as_str(), "level");
        assert_eq!(html.params()[0].1.as_str(), "1");
        assert_eq!(g.get(1).unwrap().quality(), Quality::from_thousandths(900));
        assert_eq!(g.get(2).unwrap().wildcard_count(), 2);
    }

    #[test]
    fn q_param_is_extracted_not_stored() {
        let g = parse_q("a/b;x=1;q=0.5;y=2").unwrap();
        let m = g.get(0).unwrap();
        assert_eq!(m.quality(), Quality::from_thousandths(500));
        let keys: Vec<&str> = m.params().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn q_key_matches_case_insensitively() {
        let g = parse_q("a/b;Q=0.5").unwrap();
        assert_eq!(g.get(0).unwrap().quality(), Quality::from_thousandths(500));
    }

    #[test]
    fn custom_quality_key() {
        let g = parse("a/b;qs=0.5;q=zzz", "qs").unwrap();
        let m = g.get(0).unwrap();
        assert_eq!(m.quality(), Quality::from_thousandths(500));
        // The default key is an ordinary parameter under a custom key.
        assert_eq!(m.params().len(), 1);
        assert_eq!(m.params()[0].0.as_str(), "q");
    }

    #[test]
    fn quoted_parameter_value_keeps_interior_span() {
        let g = parse_q("text/plain;title=\"a, b\";charset=utf-8").unwrap();
        let m = g.get(0).unwrap();
        assert_eq!(m.params()[0].1.as_str(), "a, b");
        assert_eq!(m.params()[1].1.as_str(), "utf-8");
    }

    #[test]
    fn quoted_pair_escapes_are_consumed() {
        let g = parse_q("text/plain;note=\"say \\\"hi\\\"\"").unwrap();
        let m = g.get(0).unwrap();
        assert_eq!(m.params()[0].1.as_str(), "say \\\"hi\\\"");
    }

    #[test]
    fn ows_around_separators() {
        let g = parse_q("text/html ; level=2 , application/json").unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.get(0).unwrap().params().len(), 1);
    }

    #[test]
    fn leading_comma_rejected_at_zero() {
        assert_eq!(parse_q(",text/html"), Err(MediaParseError::LeadingComma { at: 0 }));
    }

    #[test]
    fn wildcard_type_concrete_subtype_rejected() {
        assert_eq!(
            parse_q("*/json"),
            Err(MediaParseError::WildcardWithConcreteSubtype { at: 0 })
        );
        // */* stays legal.
        assert!(parse_q("*/*").is_ok());
        // concrete/* stays legal.
        assert!(parse_q("text/*").is_ok());
    }

    #[test]
    fn four_decimal_q_rejected() {
        assert_eq!(parse_q("x/y;q=0.1234"), Err(MediaParseError::BadQuality { at: 6 }));
    }

    #[test]
    fn q_above_one_rejected() {
        assert!(matches!(parse_q("x/y;q=1.5"), Err(MediaParseError::BadQuality { .. })));
    }

    #[test]
    fn failure_reports_last_successful_position() {
        // First range ends at byte 9; the second never completes.
        assert_eq!(parse_q("text/html, text"), Err(MediaParseError::Incomplete { at: 9 }));
        // Trailing garbage after a complete range.
        assert_eq!(parse_q("text/html garbage"), Err(MediaParseError::Incomplete { at: 9 }));
        // Nothing parsed at all.
        assert_eq!(parse_q("/html"), Err(MediaParseError::Incomplete { at: 0 }));
        assert_eq!(parse_q(""), Err(MediaParseError::Incomplete { at: 0 }));
    }

    #[test]
    fn trailing_comma_rejected() {
        assert!(matches!(parse_q("text/html,"), Err(MediaParseError::Incomplete { .. })));
    }

    #[test]
    fn parameter_without_value_rejected() {
        assert!(matches!(parse_q("a/b;flag"), Err(MediaParseError::Incomplete { .. })));
    }

    #[test]
    fn reemission_round_trips() {
        let header = "text/html;level=1;q=0.8, application/json, */*;q=0.001";
        let once = parse_q(header).unwrap();
        let again = parse_q(&once.to_string()).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn spans_borrow_the_header() {
        let g = parse_q("application/json;charset=utf-8").unwrap();
        let m = g.get(0).unwrap();
        assert_eq!(m.kind().start(), 0);
        assert_eq!(m.subtype().start(), 12);
        assert_eq!(m.params()[0].1.start(), 25);
    }
}
