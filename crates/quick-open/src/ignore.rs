//! Ignore rules used to prune the scan.
//!
//! Rules use shell-glob syntax with `fnmatch`-like semantics: `*` and `?`
//! may cross `/`, and backslash is an ordinary character. A pattern starting
//! with `*/` is a folder pattern and is tested against the whole absolute
//! path with leading-directory matching; any other pattern is tested against
//! the final path component only.

use std::hash::{Hash, Hasher};
use std::path::Path;

use glob::{MatchOptions, Pattern};

const FOLDER_PATTERN_PREFIX: &str = "*/";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One compiled ignore rule.
///
/// Two rules are equal when their pattern text is equal.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: String,
    is_folder_pattern: bool,
    /// `None` when the pattern failed to compile; such a rule never matches.
    compiled: Option<Pattern>,
}

impl IgnoreRule {
    pub fn new(pattern: &str) -> Self {
        let compiled = match Pattern::new(&to_glob_syntax(pattern)) {
            Ok(compiled) => Some(compiled),
            Err(error) => {
                log::warn!("ignore pattern {pattern:?} disabled: {error}");
                None
            }
        };
        Self {
            pattern: pattern.to_string(),
            is_folder_pattern: pattern.starts_with(FOLDER_PATTERN_PREFIX),
            compiled,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_folder_pattern(&self) -> bool {
        self.is_folder_pattern
    }

    /// Returns true when the rule excludes `absolute_path`.
    pub fn matches(&self, absolute_path: &Path) -> bool {
        let Some(compiled) = self.compiled.as_ref() else {
            return false;
        };

        if self.is_folder_pattern {
            let path = absolute_path.to_string_lossy();
            matches_leading_dir(compiled, &path)
        } else {
            let Some(name) = absolute_path.file_name() else {
                return false;
            };
            compiled.matches_with(&name.to_string_lossy(), MATCH_OPTIONS)
        }
    }
}

/// Rewrites fnmatch syntax the `glob` crate reads differently.
///
/// Runs of `*` collapse to one `*`; with non-literal separators they match
/// the same strings, but `glob` only accepts `**` as a whole component. A
/// bracket expression opened with `[^` is negated, as with `[!`.
fn to_glob_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '*' if !in_class => {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                out.push('*');
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                match chars.peek() {
                    Some('^') | Some('!') => {
                        chars.next();
                        out.push('!');
                    }
                    _ => {}
                }
                // A leading `]` is a member, not the end of the class.
                if chars.peek() == Some(&']') {
                    chars.next();
                    out.push(']');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Matches the whole path, or any prefix of it that ends right before a `/`.
fn matches_leading_dir(pattern: &Pattern, path: &str) -> bool {
    if pattern.matches_with(path, MATCH_OPTIONS) {
        return true;
    }
    path.match_indices('/')
        .any(|(index, _)| pattern.matches_with(&path[..index], MATCH_OPTIONS))
}

impl PartialEq for IgnoreRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for IgnoreRule {}

impl Hash for IgnoreRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
    }
}

/// The set of rules applied during one scan.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// Compiles patterns, dropping duplicates and blank entries.
    pub fn from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut rules: Vec<IgnoreRule> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() || rules.iter().any(|rule| rule.pattern == pattern) {
                continue;
            }
            rules.push(IgnoreRule::new(pattern));
        }
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter()
    }

    /// Returns true when any rule excludes `absolute_path`.
    pub fn matches(&self, absolute_path: &Path) -> bool {
        self.rules.iter().any(|rule| rule.matches(absolute_path))
    }
}
