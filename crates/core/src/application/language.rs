//! Language classifier - guesses JavaScript vs Python from a code snippet
//!
//! Heuristic, not a parser: each rule adds its weight once when its pattern
//! matches anywhere in the comment-stripped code, and the higher total wins.
//! A tie (including 0-0) means the language is unknown.
//!
//! The rule tables below are the contract. Changing a pattern or a weight
//! changes which snippets users can run without an explicit `language`.

use crate::domain::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

struct Rule {
    pattern: Regex,
    points: u32,
}

fn rules(table: &[(&str, u32)]) -> Vec<Rule> {
    table
        .iter()
        .map(|(pattern, points)| Rule {
            pattern: Regex::new(pattern).expect("classifier patterns are static"),
            points: *points,
        })
        .collect()
}

static JAVASCRIPT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (r"undefined", 2),
        (r"console\.log( )*\(", 2),
        (r"(var|const|let)( )+\w+( )*=?", 2),
        (r#"(('|").+('|")( )*|\w+):( )*[{\[]"#, 2), // object / array literal
        (r"===", 1),
        (r"!==", 1),
        (r"function\*?(( )+[$\w]+( )*\(.*\)|( )*\(.*\))", 1),
        (r"null", 1),
        (r"\(.*\)( )*=>( )*.+", 1),
        (r"(else )?if( )+\(.+\)", 1),
        (r"async( )+function", 2),
        (r"module\.exports( )*=", 2),
    ])
});

static PYTHON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (r"def( )+\w+\(.*\)( )*:", 2),
        (r"from [\w.]+ import (\w+|\*)", 2),
        (r"class( )*\w+(\(( )*\w+( )*\))?( )*:", 2),
        (r"if( )+(.+)( )*:", 2),
        (r"elif( )+(.+)( )*:", 2),
        (r"else:", 2),
        (r"for (\w+|\(?\w+,( )*\w+\)?) in (.+):", 2),
        (r"\w+( )*=( )*\w+(\n|$)", 1), // bare assignment, no trailing semicolon
        (r"import ([\[\^.]\w\])+", 1),
        (r"print((( )*\(.+\))|( )+.+)", 1),
    ])
});

static BLOCK_OR_LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*(?s:.*?)\*/|//.*").expect("classifier patterns are static"));

static HASH_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#.*").expect("classifier patterns are static"));

/// Weighted totals of one classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageScores {
    pub javascript: u32,
    pub python: u32,
}

impl LanguageScores {
    pub fn verdict(&self) -> Option<Language> {
        match self.javascript.cmp(&self.python) {
            std::cmp::Ordering::Greater => Some(Language::JavaScript),
            std::cmp::Ordering::Less => Some(Language::Python),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Remove `/* */`, `//` and `#` comments, then trim
fn strip_comments(code: &str) -> String {
    let without_js = BLOCK_OR_LINE_COMMENT.replace_all(code, "");
    HASH_COMMENT.replace_all(&without_js, "").trim().to_string()
}

fn total(rules: &[Rule], code: &str) -> u32 {
    rules
        .iter()
        .filter(|rule| rule.pattern.is_match(code))
        .map(|rule| rule.points)
        .sum()
}

/// Score a snippet against both rule tables
pub fn score(code: &str) -> LanguageScores {
    let clean = strip_comments(code);
    if clean.is_empty() {
        return LanguageScores::default();
    }

    LanguageScores {
        javascript: total(&JAVASCRIPT_RULES, &clean),
        python: total(&PYTHON_RULES, &clean),
    }
}

/// Guess the language of a snippet; `None` when it cannot be told
pub fn classify(code: &str) -> Option<Language> {
    let scores = score(code);
    let verdict = scores.verdict();
    debug!(
        javascript = scores.javascript,
        python = scores.python,
        verdict = ?verdict,
        "Classified snippet"
    );
    verdict
}
