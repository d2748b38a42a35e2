//! Line handling shared by both extraction passes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_DELIMITER: Regex = Regex::new(r"\r?\n").unwrap();
}

/// Returns the first line ending found in `body`, `"\n"` when there is none.
pub fn get_delimiter(body: &str) -> &str {
    RE_DELIMITER
        .find(body)
        .map(|m| m.as_str())
        .unwrap_or("\n")
}

/// Splits a body on `\r?\n`. Every line is kept, so indexes line up with the body.
pub fn split_lines(body: &str) -> Vec<&str> {
    RE_DELIMITER.split(body).collect()
}

pub fn join_lines<S: AsRef<str>>(lines: &[S], delimiter: &str) -> String {
    let mut joined = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            joined.push_str(delimiter);
        }
        joined.push_str(line.as_ref());
    }
    joined
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
