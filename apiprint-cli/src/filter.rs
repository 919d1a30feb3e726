//! Glob-style file filter for selecting which modules to compare.
//!
//! `*` matches within one path segment, `**` across segments and `?` one
//! non-separator character. `/` and `\` are interchangeable. Matching is
//! case-insensitive and anchored at both ends.

use regex::Regex;

/// Predicate over relative module paths.
#[derive(Debug, Clone)]
pub struct FileFilter {
    regex: Option<Regex>,
}

impl FileFilter {
    /// Build a filter from glob patterns. No patterns selects every `.dll`.
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        if patterns.is_empty() {
            return Ok(Self { regex: None });
        }
        let alternatives: Vec<String> = patterns.iter().map(|p| glob_to_regex(p)).collect();
        let regex = Regex::new(&format!("(?i)^(?:{})$", alternatives.join("|")))?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn matches(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        match &self.regex {
            Some(regex) => regex.is_match(&normalized),
            None => normalized.to_ascii_lowercase().ends_with(".dll"),
        }
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            '*' => {
                let mut run = 1;
                while chars.peek() == Some(&'*') {
                    chars.next();
                    run += 1;
                }
                if run == 1 { "[^/]*" } else { ".*" }
            }
            '?' => "[^/]",
            '/' | '\\' => {
                while matches!(chars.peek(), Some('/') | Some('\\')) {
                    chars.next();
                }
                "/"
            }
            other => {
                literal.push(other);
                continue;
            }
        };
        out.push_str(&regex::escape(&literal));
        literal.clear();
        out.push_str(token);
    }
    out.push_str(&regex::escape(&literal));
    out
}
