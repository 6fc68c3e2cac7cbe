//! Attribute paths in dot/bracket notation.
//!
//! `resources[0].instance_type`, `providers["aws"].alias`, `a.b.c`.
//! The empty path addresses the whole import.

use crate::error::EvalError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

pub fn parse(path: &str) -> Result<Vec<Segment>, EvalError> {
    let invalid = |reason: &str| EvalError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let chars: Vec<char> = path.chars().collect();
    let mut i = 0;
    // True right after a '.', or at the start: an identifier must follow.
    let mut expect_ident = !chars.is_empty();

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if expect_ident {
                    return Err(invalid("empty segment"));
                }
                expect_ident = true;
                i += 1;
            }
            '[' => {
                if expect_ident && !segments.is_empty() {
                    return Err(invalid("'[' cannot follow '.'"));
                }
                let close = chars[i..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|p| p + i)
                    .ok_or_else(|| invalid("unclosed '['"))?;
                let inner: String = chars[i + 1..close].iter().collect();
                segments.push(parse_bracket(&inner).ok_or_else(|| {
                    invalid("bracket must hold an index or a quoted key")
                })?);
                expect_ident = false;
                i = close + 1;
            }
            ']' => return Err(invalid("unexpected ']'")),
            _ => {
                if !expect_ident {
                    return Err(invalid("expected '.' or '[' between segments"));
                }
                let start = i;
                while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                segments.push(Segment::Key(ident));
                expect_ident = false;
            }
        }
    }

    if expect_ident {
        return Err(invalid("path ends with '.'"));
    }
    Ok(segments)
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    let inner = inner.trim();
    if let Some(quoted) = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
    {
        return Some(Segment::Key(quoted.to_string()));
    }
    inner.parse::<usize>().ok().map(Segment::Index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Segment {
        Segment::Key(s.to_string())
    }

    #[test]
    fn parses_dotted_and_bracketed_segments() {
        assert_eq!(parse("").expect("empty"), Vec::new());
        assert_eq!(parse("providers").expect("single"), vec![key("providers")]);
        assert_eq!(
            parse("resources[0].instance_type").expect("index"),
            vec![key("resources"), Segment::Index(0), key("instance_type")]
        );
        assert_eq!(
            parse("resources[\"aws_instance.web\"].type").expect("quoted"),
            vec![key("resources"), key("aws_instance.web"), key("type")]
        );
        assert_eq!(
            parse("[1]").expect("leading bracket"),
            vec![Segment::Index(1)]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["a.", ".a", "a..b", "a[0", "a[x]", "a]", "a.[0]"] {
            let err = parse(bad).unwrap_err();
            assert!(
                matches!(err, EvalError::InvalidPath { .. }),
                "{bad} should be invalid"
            );
        }
    }
}
