use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Markup dialect label derived from the page's DOCTYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtmlVersion {
    #[serde(rename = "HTML5")]
    Html5,
    #[serde(rename = "XHTML 1.1")]
    Xhtml11,
    #[serde(rename = "XHTML 1.0")]
    Xhtml10,
    #[serde(rename = "XHTML 1.0 Strict")]
    Xhtml10Strict,
    #[serde(rename = "XHTML 1.0 Transitional")]
    Xhtml10Transitional,
    #[serde(rename = "XHTML 1.0 Frameset")]
    Xhtml10Frameset,
    #[serde(rename = "HTML 4.01")]
    Html401,
    #[serde(rename = "HTML 4.01 Strict")]
    Html401Strict,
    #[serde(rename = "HTML 4.01 Transitional")]
    Html401Transitional,
    #[serde(rename = "HTML 4.01 Frameset")]
    Html401Frameset,
    #[serde(rename = "HTML 4.0")]
    Html40,
    #[serde(rename = "HTML 3.2")]
    Html32,
    #[serde(rename = "HTML 2.0")]
    Html20,
    #[serde(rename = "XHTML")]
    Xhtml,
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl HtmlVersion {
    pub const ALL: [HtmlVersion; 16] = [
        HtmlVersion::Html5,
        HtmlVersion::Xhtml11,
        HtmlVersion::Xhtml10,
        HtmlVersion::Xhtml10Strict,
        HtmlVersion::Xhtml10Transitional,
        HtmlVersion::Xhtml10Frameset,
        HtmlVersion::Html401,
        HtmlVersion::Html401Strict,
        HtmlVersion::Html401Transitional,
        HtmlVersion::Html401Frameset,
        HtmlVersion::Html40,
        HtmlVersion::Html32,
        HtmlVersion::Html20,
        HtmlVersion::Xhtml,
        HtmlVersion::Html,
        HtmlVersion::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HtmlVersion::Html5 => "HTML5",
            HtmlVersion::Xhtml11 => "XHTML 1.1",
            HtmlVersion::Xhtml10 => "XHTML 1.0",
            HtmlVersion::Xhtml10Strict => "XHTML 1.0 Strict",
            HtmlVersion::Xhtml10Transitional => "XHTML 1.0 Transitional",
            HtmlVersion::Xhtml10Frameset => "XHTML 1.0 Frameset",
            HtmlVersion::Html401 => "HTML 4.01",
            HtmlVersion::Html401Strict => "HTML 4.01 Strict",
            HtmlVersion::Html401Transitional => "HTML 4.01 Transitional",
            HtmlVersion::Html401Frameset => "HTML 4.01 Frameset",
            HtmlVersion::Html40 => "HTML 4.0",
            HtmlVersion::Html32 => "HTML 3.2",
            HtmlVersion::Html20 => "HTML 2.0",
            HtmlVersion::Xhtml => "XHTML",
            HtmlVersion::Html => "HTML",
            HtmlVersion::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HtmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of `h1`..`h6` elements on the page. All six levels are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub h4: usize,
    pub h5: usize,
    pub h6: usize,
}

impl HeadingCounts {
    /// Build from per-level counts, index 0 being `h1`.
    pub fn from_levels(levels: [usize; 6]) -> Self {
        let [h1, h2, h3, h4, h5, h6] = levels;
        Self {
            h1,
            h2,
            h3,
            h4,
            h5,
            h6,
        }
    }

    pub fn levels(&self) -> [(&'static str, usize); 6] {
        [
            ("h1", self.h1),
            ("h2", self.h2),
            ("h3", self.h3),
            ("h4", self.h4),
            ("h5", self.h5),
            ("h6", self.h6),
        ]
    }

    pub fn total(&self) -> usize {
        self.h1 + self.h2 + self.h3 + self.h4 + self.h5 + self.h6
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub internal: usize,
    pub external: usize,
    pub inaccessible: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub url: String,
    pub html_version: HtmlVersion,
    pub title: String,
    pub headings: HeadingCounts,
    pub links: LinkStats,
    pub has_login_form: bool,
    pub analyzed_at: DateTime<Utc>,
}
