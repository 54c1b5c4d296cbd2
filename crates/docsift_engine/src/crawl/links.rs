use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

const DEFAULT_MAX_LINKS: usize = 5_000;

/// Collect crawlable `<a href>` targets from `html`, resolved against `base`.
///
/// Fragments are dropped, only http(s) links are kept, and duplicates keep their first
/// position. At most `max_links` links are returned.
pub fn discover_links(html: &str, base: &Url, max_links: usize) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for href in doc.select(&anchors).filter_map(|a| a.value().attr("href")) {
        if links.len() >= max_links {
            break;
        }
        let Some(mut url) = resolve_url(href, base) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        url.set_fragment(None);
        if seen.insert(url.as_str().to_string()) {
            links.push(url);
        }
    }
    links
}

pub fn discover_links_default(html: &str, base: &Url) -> Vec<Url> {
    discover_links(html, base, DEFAULT_MAX_LINKS)
}

fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:")
    {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.join(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://docs.example.com/guide/intro").unwrap()
    }

    #[test]
    fn relative_links_resolve_against_base() {
        let html = r#"<a href="setup">Setup</a><a href="/api/">API</a>"#;
        let links = discover_links_default(html, &base());
        let urls: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://docs.example.com/guide/setup",
                "https://docs.example.com/api/"
            ]
        );
    }

    #[test]
    fn fragments_duplicates_and_non_http_are_dropped() {
        let html = r##"
            <a href="#top">Top</a>
            <a href="setup#install">Install</a>
            <a href="setup">Setup</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="ftp://example.com/file">FTP</a>
        "##;
        let links = discover_links_default(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://docs.example.com/guide/setup");
    }

    #[test]
    fn link_cap_is_respected() {
        let html: String = (0..10).map(|i| format!(r#"<a href="/p{i}">p</a>"#)).collect();
        assert_eq!(discover_links(&html, &base(), 3).len(), 3);
    }
}
