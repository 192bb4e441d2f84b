use std::fmt;

/// A URI template lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Plain text within a segment.
    Literal(String),
    // `{name}`: matches one whole non-empty segment.
    PureVar(String),
    // `{name:regex}`: matches by expression, possibly across segments.
    RegexVar(String, String),
    // "/" segment separator.
    Slash,
}

/// Errors raised while reading a URI template. Positions are byte offsets
/// into the template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    // "{" not followed by a variable name.
    ExpectedVariableName { at: usize },
    // A variable name not followed by ":" or "}".
    ExpectedCloseBrace { at: usize },
    // End of input inside a "{...}" group.
    UnterminatedVariable { at: usize },
    // More than one level of "{...}" nesting inside a variable regex.
    NestedBraceDepth { at: usize },
    // "//" produces an empty segment.
    EmptySegment { at: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::ExpectedVariableName { at } => {
                write!(f, "Expected variable name at byte {}", at)
            }
            TemplateError::ExpectedCloseBrace { at } => {
                write!(f, "Expected '}}' at byte {}", at)
            }
            TemplateError::UnterminatedVariable { at } => {
                write!(f, "Unterminated variable group at byte {}", at)
            }
            TemplateError::NestedBraceDepth { at } => {
                write!(f, "Variable regex nests braces deeper than one level at byte {}", at)
            }
            TemplateError::EmptySegment { at } => {
                write!(f, "Empty path segment at byte {}", at)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

// Tokenize a URI template into a flat token stream.
//
// A single leading slash is stripped. At each position we try, in order:
// a literal run (characters that are neither '/' nor '{'), then a
// variable group. '/' advances to the next segment; a second '/' in a
// row is an empty segment and fails.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TemplateError> {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    if bytes.first() == Some(&b'/') {
        i = 1;
    }

    let mut out: Vec<Token> = Vec::new();
    let mut segment_open = false;

    while i < bytes.len() {
        match bytes[i] {
            b'/' => {
                if !segment_open {
                    return Err(TemplateError::EmptySegment { at: i });
                }
                out.push(Token::Slash);
                segment_open = false;
                i += 1;
            }
            b'{' => {
                let (token, next) = read_variable(input, i)?;
                out.push(token);
                segment_open = true;
                i = next;
            }
            _ => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'/' && bytes[i] != b'{' {
                    i += 1;
                }
                out.push(Token::Literal(input[start..i].to_string()));
                segment_open = true;
            }
        }
    }
    Ok(out)
}

// Read a variable group starting at the '{' at `open`. Returns the token
// and the index just past the closing '}'.
//
//   variable := "{" OWS name (":" OWS regex OWS)? "}"
//   name     := \w [\w.-]*
//   regex    := balanced non-brace characters with one-level {...} nesting
fn read_variable(input: &str, open: usize) -> Result<(Token, usize), TemplateError> {
    let bytes = input.as_bytes();
    let mut i = open + 1;
    while i < bytes.len() && is_ows(bytes[i]) {
        i += 1;
    }

    let name_start = i;
    if i >= bytes.len() || !is_word(bytes[i]) {
        return Err(TemplateError::ExpectedVariableName { at: i });
    }
    i += 1;
    while i < bytes.len() && (is_word(bytes[i]) || bytes[i] == b'.' || bytes[i] == b'-') {
        i += 1;
    }
    let name = input[name_start..i].to_string();

    if i >= bytes.len() {
        return Err(TemplateError::UnterminatedVariable { at: i });
    }
    match bytes[i] {
        b'}' => Ok((Token::PureVar(name), i + 1)),
        b':' => {
            i += 1;
            while i < bytes.len() && is_ows(bytes[i]) {
                i += 1;
            }
            let regex_start = i;
            let mut depth = 0u8;
            loop {
                if i >= bytes.len() {
                    return Err(TemplateError::UnterminatedVariable { at: i });
                }
                match bytes[i] {
                    b'{' => {
                        if depth == 1 {
                            return Err(TemplateError::NestedBraceDepth { at: i });
                        }
                        depth += 1;
                        i += 1;
                    }
                    b'}' => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                        i += 1;
                    }
                    _ => i += 1,
                }
            }
            let mut regex_end = i;
            while regex_end > regex_start && is_ows(bytes[regex_end - 1]) {
                regex_end -= 1;
            }
            Ok((
                Token::RegexVar(name, input[regex_start..regex_end].to_string()),
                i + 1,
            ))
        }
        _ => Err(TemplateError::ExpectedCloseBrace { at: i }),
    }
}

#[cfg(test)]
mod tests {
    use super::Token::*;
    use super::*;

    #[test]
    fn literal_and_variable_segments() {
        let tokens = tokenize("/a/{x}/b/{y:\\d+}/c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Literal("a".into()),
                Slash,
                PureVar("x".into()),
                Slash,
                Literal("b".into()),
                Slash,
                RegexVar("y".into(), "\\d+".into()),
                Slash,
                Literal("c".into()),
            ]
        );
    }

    #[test]
    fn mixed_segment_tokens() {
        let tokens = tokenize("/prefix-{id}.txt").unwrap();
        assert_eq!(
            tokens,
            vec![
                Literal("prefix-".into()),
                PureVar("id".into()),
                Literal(".txt".into()),
            ]
        );
    }

    #[test]
    fn leading_slash_optional() {
        assert_eq!(tokenize("a/b").unwrap(), tokenize("/a/b").unwrap());
    }

    #[test]
    fn root_and_empty_templates() {
        assert_eq!(tokenize("/").unwrap(), vec![]);
        assert_eq!(tokenize("").unwrap(), vec![]);
    }

    #[test]
    fn ows_inside_variable_group() {
        let tokens = tokenize("/{ id }").unwrap_err();
        // Space after the name is not part of the grammar.
        assert!(matches!(tokens, TemplateError::ExpectedCloseBrace { .. }));

        let tokens = tokenize("/{ id}").unwrap();
        assert_eq!(tokens, vec![PureVar("id".into())]);

        let tokens = tokenize("/{n: \\d+ }").unwrap();
        assert_eq!(tokens, vec![RegexVar("n".into(), "\\d+".into())]);
    }

    #[test]
    fn variable_names_allow_dots_and_dashes() {
        let tokens = tokenize("/{file.name-v2}").unwrap();
        assert_eq!(tokens, vec![PureVar("file.name-v2".into())]);
    }

    #[test]
    fn regex_with_one_level_of_nested_braces() {
        let tokens = tokenize("/{v:a{1,2}}").unwrap();
        assert_eq!(tokens, vec![RegexVar("v".into(), "a{1,2}".into())]);
    }

    #[test]
    fn regex_nesting_too_deep_fails() {
        let err = tokenize("/{v:a{b{c}}}").unwrap_err();
        assert_eq!(err, TemplateError::NestedBraceDepth { at: 7 });
    }

    #[test]
    fn closing_brace_in_literal_is_plain_text() {
        let tokens = tokenize("/a}b").unwrap();
        assert_eq!(tokens, vec![Literal("a}b".into())]);
    }

    #[test]
    fn unterminated_variable_fails() {
        assert!(matches!(
            tokenize("/{id"),
            Err(TemplateError::UnterminatedVariable { .. })
        ));
        assert!(matches!(
            tokenize("/{n:\\d+"),
            Err(TemplateError::UnterminatedVariable { .. })
        ));
    }

    #[test]
    fn missing_variable_name_fails() {
        assert_eq!(tokenize("/{}"), Err(TemplateError::ExpectedVariableName { at: 2 }));
        assert_eq!(tokenize("/{:\\d+}"), Err(TemplateError::ExpectedVariableName { at: 2 }));
    }

    #[test]
    fn double_slash_fails() {
        assert_eq!(tokenize("/a//b"), Err(TemplateError::EmptySegment { at: 3 }));
        assert_eq!(tokenize("//a"), Err(TemplateError::EmptySegment { at: 1 }));
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let tokens = tokenize("/a/").unwrap();
        assert_eq!(tokens, vec![Literal("a".into()), Slash]);
    }
}
