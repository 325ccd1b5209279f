use crate::doctype::detect_html_version;
use crate::links::{ExtractedLinks, extract_links};
use crate::login::LoginSignals;
use crate::result::{HeadingCounts, HtmlVersion};
use crate::structure::{count_headings, extract_title};
use scraper::Html;
use url::Url;

/// Everything the analyzer needs from one page, extracted in a single synchronous pass.
///
/// `scraper::Html` is not `Send`, so the parsed tree never outlives [`PageSnapshot::parse`];
/// the snapshot owns plain data and can be held across await points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub html_version: HtmlVersion,
    pub title: String,
    pub headings: HeadingCounts,
    pub links: ExtractedLinks,
    pub login: LoginSignals,
}

impl PageSnapshot {
    pub fn parse(markup: &str, base: &Url) -> Self {
        // the doctype is matched against the raw text, the rest against the tree
        let html_version = detect_html_version(markup);
        let document = Html::parse_document(markup);

        Self {
            html_version,
            title: extract_title(&document),
            headings: count_headings(&document),
            links: extract_links(&document, base),
            login: LoginSignals::capture(&document),
        }
    }

    pub fn has_login_form(&self, threshold: u32) -> bool {
        self.login.is_login_page(threshold)
    }
}
