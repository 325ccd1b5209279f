use crate::result::HeadingCounts;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

static HEADING_SELECTORS: LazyLock<[Selector; 6]> = LazyLock::new(|| {
    ["h1", "h2", "h3", "h4", "h5", "h6"].map(|tag| Selector::parse(tag).expect("valid selector"))
});

/// Trimmed text of the first `<title>` element, or an empty string.
pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

pub fn count_headings(document: &Html) -> HeadingCounts {
    HeadingCounts::from_levels(
        HEADING_SELECTORS.each_ref().map(|selector| document.select(selector).count()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let document = Html::parse_document(
            "<html><head><title>  Welcome\n home </title></head><body></body></html>",
        );
        assert_eq!(extract_title(&document), "Welcome\n home");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let document = Html::parse_document("<html><body><p>No title</p></body></html>");
        assert_eq!(extract_title(&document), "");
    }

    #[test]
    fn test_count_headings_always_six_levels() {
        let document = Html::parse_document(
            "<h1>One</h1><h2>Two</h2><h2>Two again</h2><section><h3>Three</h3></section><h6>Six</h6>",
        );
        let headings = count_headings(&document);

        assert_eq!(headings, HeadingCounts::from_levels([1, 2, 1, 0, 0, 1]));
        assert_eq!(headings.total(), 5);
    }

    #[test]
    fn test_no_headings() {
        let document = Html::parse_document("<p>plain</p>");
        let headings = count_headings(&document);
        assert_eq!(headings, HeadingCounts::default());
        assert_eq!(headings.levels().len(), 6);
    }
}
