//! Pre- and post-processing of bodies before the quotation pass.
//!
//! A line starting with `>` is a quote marker, so the closing bracket of a wrapped
//! link such as `<http://example.com>` must not end up at the start of a line.

use crate::quotation::splitters::RE_ON_DATE_SMB_WROTE;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref RE_LINK: Regex = Regex::new(r"<(https?://[^>]*)>").unwrap();
    static ref RE_NORMALIZED_LINK: Regex = Regex::new(r"@@(https?://[^>@]*)@@").unwrap();
}

/// Replaces `<link>` brackets with `@@link@@` unless the link sits on a quoted line.
pub fn shield_links(body: &str) -> String {
    RE_LINK
        .replace_all(body, |caps: &Captures| {
            let (Some(link), Some(url)) = (caps.get(0), caps.get(1)) else {
                return String::new();
            };
            let line_start = body[..link.start()].rfind('\n').map_or(0, |i| i + 1);
            if body[line_start..].starts_with('>') {
                link.as_str().to_string()
            } else {
                format!("@@{}@@", url.as_str())
            }
        })
        .into_owned()
}

/// Moves an "On DATE, NAME wrote:" banner that follows other text onto its own line.
pub fn wrap_splitters(body: &str, delimiter: &str) -> String {
    RE_ON_DATE_SMB_WROTE
        .replace_all(body, |caps: &Captures| {
            let Some(splitter) = caps.get(0) else {
                return String::new();
            };
            if splitter.start() > 0 && !body[..splitter.start()].ends_with('\n') {
                format!("{}{}", delimiter, splitter.as_str())
            } else {
                splitter.as_str().to_string()
            }
        })
        .into_owned()
}

pub fn preprocess(body: &str, delimiter: &str) -> String {
    let shielded = shield_links(body);
    wrap_splitters(&shielded, delimiter)
}

/// Restores shielded links and trims the result.
pub fn postprocess(body: &str) -> String {
    RE_NORMALIZED_LINK
        .replace_all(body, "<$1>")
        .trim()
        .to_string()
}
