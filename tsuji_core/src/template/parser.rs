use super::lexer::{TemplateError, Token, tokenize};
use std::collections::HashMap;

/// The tokens of one path segment, in source order. A segment holding a
/// single `Literal` or a single `PureVar` maps onto a plain trie child;
/// anything else forces the regex path.
pub type Segment = Vec<Token>;

/// Parse a URI template into its per-segment token lists.
///
/// Segments are delimited by `/`. A single trailing slash is normalized
/// away; the empty template (and bare `/`) yields no segments and
/// addresses the root. `//` is an error, as is any malformed variable
/// group (see [`TemplateError`]).
pub fn parse(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let tokens = tokenize(template)?;
    let mut segments: Vec<Segment> = Vec::new();
    let mut current: Segment = Vec::new();
    for token in tokens {
        match token {
            Token::Slash => {
                // The lexer rejects empty segments, so current is never
                // empty here.
                segments.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

/// Substitute parameters into parsed template segments to generate a
/// concrete URI path. The inverse of matching: useful for building links
/// back to registered routes.
///
/// Regex constraints are not re-checked against the substituted values.
pub fn substitute(
    segments: &[Segment],
    params: &HashMap<String, String>,
) -> Result<String, String> {
    let mut parts: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        let mut text = String::new();
        for token in segment {
            match token {
                Token::Literal(lit) => text.push_str(lit),
                Token::PureVar(name) | Token::RegexVar(name, _) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| format!("Missing parameter: {}", name))?;
                    text.push_str(value);
                }
                Token::Slash => text.push('/'),
            }
        }
        parts.push(text);
    }
    let path = parts.join("/");
    if path.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::Token::*;

    #[test]
    fn groups_tokens_by_segment() {
        let segments = parse("/users/{id}/posts/{post:\\d+}").unwrap();
        assert_eq!(
            segments,
            vec![
                vec![Literal("users".into())],
                vec![PureVar("id".into())],
                vec![Literal("posts".into())],
                vec![RegexVar("post".into(), "\\d+".into())],
            ]
        );
    }

    #[test]
    fn mixed_segment_stays_together() {
        let segments = parse("/files/doc-{id}.pdf").unwrap();
        assert_eq!(
            segments,
            vec![
                vec![Literal("files".into())],
                vec![
                    Literal("doc-".into()),
                    PureVar("id".into()),
                    Literal(".pdf".into()),
                ],
            ]
        );
    }

    #[test]
    fn root_parses_to_no_segments() {
        assert!(parse("/").unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn trailing_slash_dropped() {
        assert_eq!(parse("/a/b/").unwrap(), parse("/a/b").unwrap());
    }

    #[test]
    fn empty_segment_propagates() {
        assert_eq!(parse("/a//b"), Err(TemplateError::EmptySegment { at: 3 }));
    }

    #[test]
    fn substitution_rebuilds_a_path() {
        let segments = parse("/users/{id}/posts/{post_id}").unwrap();
        let mut params = HashMap::new();
        params.insert("id".to_string(), "123".to_string());
        params.insert("post_id".to_string(), "456".to_string());
        assert_eq!(
            substitute(&segments, &params).unwrap(),
            "/users/123/posts/456"
        );
    }

    #[test]
    fn substitution_fills_mixed_segments() {
        let segments = parse("/page-{num:\\d+}").unwrap();
        let mut params = HashMap::new();
        params.insert("num".to_string(), "42".to_string());
        assert_eq!(substitute(&segments, &params).unwrap(), "/page-42");
    }

    #[test]
    fn substitution_missing_param_errors() {
        let segments = parse("/users/{id}").unwrap();
        assert!(substitute(&segments, &HashMap::new()).is_err());
    }

    #[test]
    fn substitution_of_root_is_slash() {
        assert_eq!(substitute(&parse("/").unwrap(), &HashMap::new()).unwrap(), "/");
    }
}
