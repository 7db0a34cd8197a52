//! Directive extraction from the leading comment block.
//!
//! The first run of consecutive `#` lines at the top of an input may carry
//! computation directives:
//!
//! ```text
//! # +TBLFM: $4=$2*$3
//! # +MLR: $total = $price * $qty
//! ```
//!
//! Scanning stops at the first non-comment line; directives keep their
//! top-to-bottom order. The scan never consumes the input - callers hand
//! the same buffer to the codec afterwards.

use regex::Regex;
use std::sync::OnceLock;

/// Directives collected from a preamble.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directives {
    /// `# +TBLFM:` formula payloads.
    pub formulas: Vec<String>,
    /// `# +MLR:` / `# +MILLER:` script payloads.
    pub scripts: Vec<String>,
}

fn formula_directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#\s*\+TBLFM\s*:\s*(?P<formula>.*)$").expect("directive regex must compile")
    })
}

fn script_directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#\s*\+(?:MLR|MILLER)\s*:\s*(?P<script>.*)$")
            .expect("directive regex must compile")
    })
}

/// Scan the leading comment block of `content` for directives.
pub fn scan(content: &str) -> Directives {
    let mut directives = Directives::default();

    for line in content.lines() {
        if !line.starts_with('#') {
            break;
        }
        let line = line.trim();
        if let Some(caps) = formula_directive_re().captures(line) {
            directives.formulas.push(caps["formula"].to_string());
        } else if let Some(caps) = script_directive_re().captures(line) {
            directives.scripts.push(caps["script"].to_string());
        }
    }

    directives
}
