use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: String,
    pub class: LinkClass,
}

/// Resolved hyperlinks of one page, split by class, each in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    pub external: Vec<String>,
    pub internal: Vec<String>,
}

impl ExtractedLinks {
    pub fn push(&mut self, record: LinkRecord) {
        match record.class {
            LinkClass::Internal => self.internal.push(record.url),
            LinkClass::External => self.external.push(record.url),
        }
    }

    pub fn total(&self) -> usize {
        self.internal.len() + self.external.len()
    }
}

/// A link is internal when its host and port (scheme default when absent) equal the page's.
pub fn classify(base: &Url, link: &Url) -> LinkClass {
    if link.host_str().is_some()
        && link.host_str() == base.host_str()
        && link.port_or_known_default() == base.port_or_known_default()
    {
        LinkClass::Internal
    } else {
        LinkClass::External
    }
}

/// Resolve `href` against `base`. Returns `None` when the reference cannot be resolved.
pub fn resolve_link(base: &Url, href: &str) -> Option<LinkRecord> {
    let resolved = base.join(href).ok()?;
    let class = classify(base, &resolved);
    Some(LinkRecord {
        url: resolved.to_string(),
        class,
    })
}

/// Walk every `<a href>` of the document and sort resolvable targets into internal and
/// external sequences. Unresolvable hrefs are dropped.
pub fn extract_links(document: &Html, base: &Url) -> ExtractedLinks {
    let mut links = ExtractedLinks::default();

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        match resolve_link(base, href) {
            Some(record) => {
                debug!("Found link: {} ({:?})", record.url, record.class);
                links.push(record);
            }
            None => debug!("Dropping unresolvable href {:?}", href),
        }
    }

    links
}
