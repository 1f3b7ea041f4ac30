//! PDF link extraction from an item's download directory page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Captures the target of every `href` attribute.
#[allow(clippy::expect_used)]
static HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"'#?]+)["']"#).expect("href regex is valid") // Static pattern, safe to panic
});

/// A file link found on a download page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Decoded file name relative to the page (may contain `/`).
    pub name: String,
    /// Absolute link target.
    pub url: Url,
}

/// Extracts links ending in one of `extensions` from `html`.
///
/// Relative links resolve against `page_url`. Links under the page's own path
/// keep their sub-folder in the name; anything else is named by its last
/// segment. Duplicates keep their first position.
pub fn extract_links(html: &str, page_url: &Url, extensions: &[String]) -> Vec<PageLink> {
    let base_path = page_url.path();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for captures in HREF_PATTERN.captures_iter(html) {
        let href = &captures[1];
        if !has_extension(href, extensions) {
            continue;
        }
        let Ok(url) = page_url.join(href) else {
            continue;
        };
        let encoded = url
            .path()
            .strip_prefix(base_path)
            .filter(|rest| !rest.is_empty())
            .or_else(|| url.path_segments().and_then(|mut segments| segments.next_back()))
            .unwrap_or_default();
        let name = urlencoding::decode(encoded)
            .map_or_else(|_| encoded.to_string(), std::borrow::Cow::into_owned);
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        links.push(PageLink { name, url });
    }
    links
}

/// Case-insensitive extension check; `extensions` entries may omit the dot.
pub(crate) fn has_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        !ext.is_empty() && lower.ends_with(&format!(".{ext}"))
    })
}
