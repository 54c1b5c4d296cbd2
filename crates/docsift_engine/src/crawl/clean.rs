use scraper::{Html, Selector};

/// Elements that never carry documentation content.
const NOISE_SELECTOR: &str =
    "script, style, noscript, iframe, template, nav, header, footer, form, svg";

/// Subtrees tried in order for the main content.
const CONTENT_SELECTORS: &[&str] = &["main", "article", "[role=main]", "body"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPage {
    pub title: String,
    pub cleaned_html: String,
}

/// Strip navigation/scripting noise and keep the main content subtree.
///
/// Title comes from `<title>`, falling back to the first `<h1>`.
pub fn clean_html(html: &str) -> CleanedPage {
    let mut doc = Html::parse_document(html);
    let title = page_title(&doc);

    if let Ok(noise) = Selector::parse(NOISE_SELECTOR) {
        let ids: Vec<_> = doc.select(&noise).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    let cleaned_html = CONTENT_SELECTORS
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .find_map(|sel| doc.select(&sel).next().map(|node| node.inner_html()))
        .unwrap_or_else(|| doc.root_element().html());

    CleanedPage {
        title,
        cleaned_html: cleaned_html.trim().to_string(),
    }
}

fn page_title(doc: &Html) -> String {
    ["title", "h1"]
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .find_map(|sel| {
            doc.select(&sel)
                .next()
                .map(|el| el.text().collect::<Vec<_>>().join(" "))
                .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default()
}
