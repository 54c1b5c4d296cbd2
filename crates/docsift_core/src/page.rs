/// One crawled page as handed over by the crawl collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub url: String,
    pub raw_html: String,
    /// Cleaned HTML; this is what gets hashed, classified and extracted.
    pub cleaned_html: String,
    pub depth: u32,
    pub title: String,
}

impl PageResult {
    pub fn new(
        url: impl Into<String>,
        raw_html: impl Into<String>,
        cleaned_html: impl Into<String>,
        depth: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            raw_html: raw_html.into(),
            cleaned_html: cleaned_html.into(),
            depth,
            title: title.into(),
        }
    }
}
