//! Statement translator.
//!
//! Rewrites one raw DSL line into one executable statement, or signals that
//! the line should be dropped. Keyword rules are looked up by the first
//! whitespace-delimited token and may be extended by the host without
//! touching the block parser.

use std::collections::HashMap;

/// A keyword rewrite rule. Receives the remainder of the line after the
/// keyword and its separator; returns the full rewritten statement, or
/// `None` to discard the line.
pub type RewriteRule = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct Translator {
    rules: HashMap<String, RewriteRule>,
}

impl Translator {
    /// Translator with the built-in rule set: `print` auto-quoting and the
    /// leading-dot self-reference shorthand.
    pub fn new() -> Self {
        let mut t = Self {
            rules: HashMap::new(),
        };
        t.register_rule("print", |rest| Some(rewrite_print(rest)));
        t
    }

    /// Registers (or replaces) a keyword rule.
    pub fn register_rule(
        &mut self,
        keyword: impl Into<String>,
        rule: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) {
        self.rules.insert(keyword.into(), Box::new(rule));
    }

    /// Rewrites one line. `None` means "drop this line".
    pub fn translate(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (first, rest) = match line.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (line, ""),
        };
        if let Some(rule) = self.rules.get(first) {
            return rule(rest);
        }

        // `.field = x` shorthand expands to `this.field = x`.
        if line.starts_with('.') {
            return Some(terminate(&format!("this{}", line)));
        }

        Some(terminate(line))
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

fn terminate(stmt: &str) -> String {
    if stmt.ends_with(';') {
        stmt.to_string()
    } else {
        format!("{};", stmt)
    }
}

fn rewrite_print(rest: &str) -> String {
    let arg = rest.trim().trim_end_matches(';').trim_end();
    if is_quoted(arg) {
        format!("print({});", arg)
    } else {
        format!("print(\"{}\");", arg)
    }
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}
