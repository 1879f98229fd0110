//! Invocation and pipeline surface syntax
//!
//! An invocation is `id` or `id(a0, a1, key=v, …)`. All values are
//! strings; commas and parentheses cannot appear inside them, so no
//! escaping exists. A pipeline is a comma-separated invocation list.
//! The sentinel value `any` is a wildcard: it matches any existing
//! instance at that position and falls back to the default when a new
//! instance must be built.

use mica_common::PassError;

/// A parsed pass invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: String,
    pub positional: Vec<String>,
    pub keyword: Vec<(String, String)>,
}

/// An instance query: `None` positions are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassQuery {
    pub id: String,
    pub positional: Vec<Option<String>>,
    pub keyword: Vec<(String, Option<String>)>,
}

impl PassQuery {
    pub fn new(id: impl Into<String>) -> PassQuery {
        PassQuery {
            id: id.into(),
            positional: Vec::new(),
            keyword: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> PassQuery {
        self.positional.push(wildcard(value.into()));
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<String>) -> PassQuery {
        self.keyword.push((name.into(), wildcard(value.into())));
        self
    }
}

fn wildcard(value: String) -> Option<String> {
    if value == "any" {
        None
    } else {
        Some(value)
    }
}

impl From<&Invocation> for PassQuery {
    fn from(invocation: &Invocation) -> PassQuery {
        PassQuery {
            id: invocation.id.clone(),
            positional: invocation
                .positional
                .iter()
                .map(|value| wildcard(value.clone()))
                .collect(),
            keyword: invocation
                .keyword
                .iter()
                .map(|(name, value)| (name.clone(), wildcard(value.clone())))
                .collect(),
        }
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn bad(id: &str, reason: impl Into<String>) -> PassError {
    PassError::BadArguments {
        id: id.to_string(),
        reason: reason.into(),
    }
}

/// Parse a single invocation.
pub fn parse_invocation(text: &str) -> Result<Invocation, PassError> {
    let text = text.trim();
    let (id, arg_text) = match text.find('(') {
        None => (text, None),
        Some(open) => {
            let Some(body) = text[open + 1..].strip_suffix(')') else {
                return Err(bad(text, "unbalanced parentheses"));
            };
            (&text[..open], Some(body))
        }
    };
    let id = id.trim();
    if id.is_empty() || !id.chars().all(is_id_char) {
        return Err(bad(id, format!("invalid pass id {id:?}")));
    }

    let mut invocation = Invocation {
        id: id.to_string(),
        positional: Vec::new(),
        keyword: Vec::new(),
    };
    let Some(arg_text) = arg_text else {
        return Ok(invocation);
    };
    if arg_text.trim().is_empty() {
        return Ok(invocation);
    }

    for piece in arg_text.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(bad(id, "empty argument"));
        }
        match piece.split_once('=') {
            Some((name, value)) => {
                let name = name.trim();
                let value = value.trim();
                if name.is_empty() {
                    return Err(bad(id, "keyword argument without a name"));
                }
                if invocation.keyword.iter().any(|(seen, _)| seen == name) {
                    return Err(bad(id, format!("keyword {name:?} given twice")));
                }
                invocation.keyword.push((name.to_string(), value.to_string()));
            }
            None => {
                if !invocation.keyword.is_empty() {
                    return Err(bad(id, "positional argument after a keyword argument"));
                }
                invocation.positional.push(piece.to_string());
            }
        }
    }
    Ok(invocation)
}

/// Parse a comma-separated pipeline; commas inside parentheses belong
/// to the invocation.
pub fn parse_pipeline(text: &str) -> Result<Vec<Invocation>, PassError> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (offset, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| bad(text, "unbalanced parentheses"))?;
            }
            ',' if depth == 0 => {
                steps.push(&text[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(bad(text, "unbalanced parentheses"));
    }
    steps.push(&text[start..]);

    steps
        .into_iter()
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(parse_invocation)
        .collect()
}
