//! CurseForge `modlist.html` parsing
//!
//! The export is a flat list of `<li><a href="URL">Name (by Author)</a></li>` lines.
//! Only anchors inside list items are read; anything else in the document is ignored.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::core::{ConvertError, FileOperation, Result, SourceReference};

static LIST_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<li\b[^>]*>\s*<a\b([^>]*)>(.*?)</a>").expect("list anchor pattern is valid")
});

static HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href pattern is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity pattern is valid"));

/// Extract every `Name (by Author)` entry, in document order
pub fn parse_source_list(html: &str) -> Vec<SourceReference> {
    let mut references = Vec::new();

    for captures in LIST_ANCHOR.captures_iter(html) {
        let attributes = captures.get(1).map_or("", |m| m.as_str());
        let inner = captures.get(2).map_or("", |m| m.as_str());

        let text = decode_entities(&TAG.replace_all(inner, ""));
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let (name, author) = split_name_author(&text);
        if name.is_empty() {
            warn!("Ignoring list entry without a name: {:?}", inner);
            continue;
        }

        let source_url = HREF
            .captures(attributes)
            .and_then(|href| href.get(1).or_else(|| href.get(2)))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|url| !url.is_empty());

        references.push(SourceReference {
            name,
            author,
            source_url,
        });
    }

    debug!("Parsed {} references from source list", references.len());
    references
}

/// Read and parse a modlist file
pub async fn read_source_list(path: &Path) -> Result<Vec<SourceReference>> {
    let html = match tokio::fs::read_to_string(path).await {
        Ok(html) => html,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::InputMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ConvertError::file_system(path, FileOperation::Read, e)),
    };

    Ok(parse_source_list(&html))
}

/// `"JEI (by mezz)"` -> `("JEI", "mezz")`; text without a `(by ...)` group has no author
///
/// The name ends at the first `(by ` and the author starts after the last one.
fn split_name_author(text: &str) -> (String, String) {
    let (Some(first), Some(last)) = (text.find("(by "), text.rfind("(by ")) else {
        return (text.trim().to_string(), String::new());
    };

    let name = text[..first].trim().to_string();
    let rest = &text[last + "(by ".len()..];
    let author = match rest.rfind(')') {
        Some(end) => &rest[..end],
        None => rest,
    };

    (name, author.trim().to_string())
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |captures: &regex::Captures| {
        let code = &captures[1];
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| captures[0].to_string())
    });

    decoded
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
