//! Ant style patterns over separated strings, shared by the `path` (separator `/`) and `host`
//! (separator `.`) predicates.
//!
//! Within a segment `?` matches one character, `*` any number of characters, `{name}` captures
//! the segment and `{name:regex}` captures it when it matches `regex`. A segment `**` matches any
//! number of segments and a final `{*name}` captures everything left.
use std::{collections::HashMap, fmt};

use regex::Regex;

use crate::BoxError;

/// Variables captured by a successful match.
pub type UriVariables = HashMap<String, String>;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Pattern { regex: Regex, names: Vec<String> },
    AnySegments,
    Rest(String),
}

impl Segment {
    fn compile(text: &str, is_last: bool) -> Result<Self, BoxError> {
        if text == "**" {
            return Ok(Self::AnySegments);
        }
        if let Some(name) = text.strip_prefix("{*").and_then(|rest| rest.strip_suffix('}')) {
            if !is_last {
                return Err(format!("`{{*{name}}}` is only allowed at the end of a pattern").into());
            }
            return Ok(Self::Rest(name.to_string()));
        }
        if !text.contains(['*', '?', '{']) {
            return Ok(Self::Literal(text.to_string()));
        }
        let mut regex = String::from("^");
        let mut names = Vec::new();
        let mut chars = text.chars();
        let mut buf = [0; 4];
        while let Some(c) = chars.next() {
            match c {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                '{' => {
                    let mut depth = 1usize;
                    let mut variable = String::new();
                    for c in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        variable.push(c);
                    }
                    if depth != 0 {
                        return Err(format!("unclosed variable in `{text}`").into());
                    }
                    let (name, constraint) = variable.split_once(':').unwrap_or((variable.as_str(), ".+"));
                    regex.push_str(&format!("(?<v{}>{constraint})", names.len()));
                    names.push(name.trim().to_string());
                }
                c => regex.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
        regex.push('$');
        Ok(Self::Pattern {
            regex: Regex::new(&regex)?,
            names,
        })
    }

    fn matches(&self, part: &str, variables: &mut UriVariables) -> bool {
        match self {
            Self::Literal(literal) => literal == part,
            Self::Pattern { regex, names } => {
                let Some(captures) = regex.captures(part) else {
                    return false;
                };
                for (index, name) in names.iter().enumerate() {
                    if let Some(value) = captures.name(&format!("v{index}")) {
                        variables.insert(name.clone(), value.as_str().to_string());
                    }
                }
                true
            }
            Self::AnySegments | Self::Rest(_) => true,
        }
    }
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    separator: char,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// # Errors
    /// If a variable is not closed, `{*name}` is not the last segment, or a variable regex is invalid.
    pub fn new(pattern: &str, separator: char) -> Result<Self, BoxError> {
        let parts: Vec<&str> = pattern.split(separator).collect();
        let last = parts.len().saturating_sub(1);
        let segments = parts.iter().enumerate().map(|(index, part)| Segment::compile(part, index == last)).collect::<Result<_, _>>()?;
        Ok(Self {
            raw: pattern.to_string(),
            separator,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `value` as a whole, returning the captured variables.
    pub fn matches(&self, value: &str) -> Option<UriVariables> {
        let parts: Vec<&str> = value.split(self.separator).collect();
        let mut variables = UriVariables::new();
        match_segments(&self.segments, &parts, self.separator, &mut variables).then_some(variables)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_segments(segments: &[Segment], parts: &[&str], separator: char, variables: &mut UriVariables) -> bool {
    match segments.split_first() {
        None => parts.is_empty(),
        Some((Segment::AnySegments, rest)) => {
            (0..=parts.len()).any(|skip| match_segments(rest, parts.get(skip..).unwrap_or_default(), separator, variables))
        }
        Some((Segment::Rest(name), _)) => {
            let captured: String = parts.iter().map(|part| format!("{separator}{part}")).collect();
            variables.insert(name.clone(), captured);
            true
        }
        Some((segment, rest)) => match parts.split_first() {
            Some((part, tail)) => {
                let snapshot = variables.clone();
                if segment.matches(part, variables) && match_segments(rest, tail, separator, variables) {
                    true
                } else {
                    *variables = snapshot;
                    false
                }
            }
            None => false,
        },
    }
}
