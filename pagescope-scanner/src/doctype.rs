//! DOCTYPE based markup dialect detection.
//!
//! The declaration is normalised into a *doctype token* (leading XML declaration and
//! comment removed, uppercased) and then matched against version keywords in a fixed
//! priority order, so the same markup always yields the same label.

use crate::result::HtmlVersion;
use regex::Regex;
use std::sync::LazyLock;

static XML_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<\?xml[^>]*\?>\s*").expect("valid regex"));

static LEADING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<!--.*?-->\s*").expect("valid regex"));

static DOCTYPE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<!DOCTYPE\s+[^>]*>").expect("valid regex"));

static BARE_HTML5_DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!DOCTYPE\s+HTML\s*>\s*$").expect("valid regex"));

/// A DOCTYPE family whose declarations may carry a Strict/Transitional/Frameset variant.
struct VersionFamily {
    keyword: &'static str,
    base: HtmlVersion,
    variants: &'static [(&'static str, HtmlVersion)],
}

const FAMILIES: [VersionFamily; 3] = [
    VersionFamily {
        keyword: "XHTML 1.1",
        base: HtmlVersion::Xhtml11,
        variants: &[],
    },
    VersionFamily {
        keyword: "XHTML 1.0",
        base: HtmlVersion::Xhtml10,
        variants: &[
            ("STRICT", HtmlVersion::Xhtml10Strict),
            ("TRANSITIONAL", HtmlVersion::Xhtml10Transitional),
            ("FRAMESET", HtmlVersion::Xhtml10Frameset),
        ],
    },
    VersionFamily {
        keyword: "HTML 4.01",
        base: HtmlVersion::Html401,
        variants: &[
            ("STRICT", HtmlVersion::Html401Strict),
            ("TRANSITIONAL", HtmlVersion::Html401Transitional),
            ("FRAMESET", HtmlVersion::Html401Frameset),
        ],
    },
];

// Checked in this order after the families; "HTML 4.0" must not shadow "HTML 4.01",
// which is why the families run first.
const SIMPLE_VERSIONS: [(&str, HtmlVersion); 3] = [
    ("HTML 4.0", HtmlVersion::Html40),
    ("HTML 3.2", HtmlVersion::Html32),
    ("HTML 2.0", HtmlVersion::Html20),
];

/// Extract the uppercased DOCTYPE declaration at the start of `markup`, or an empty
/// string when there is none.
pub fn extract_doctype(markup: &str) -> String {
    let cleaned = markup.trim_start();
    let cleaned = XML_DECLARATION.replace(cleaned, "");
    let cleaned = LEADING_COMMENT.replace(&cleaned, "");

    DOCTYPE_DECLARATION
        .find(&cleaned)
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_default()
}

/// Classify the markup dialect of `markup` from its DOCTYPE.
pub fn detect_html_version(markup: &str) -> HtmlVersion {
    classify_doctype(&extract_doctype(markup))
}

/// Classify an already extracted, uppercased doctype token.
pub fn classify_doctype(doctype: &str) -> HtmlVersion {
    if doctype.is_empty() || BARE_HTML5_DOCTYPE.is_match(doctype) {
        return HtmlVersion::Html5;
    }

    for family in &FAMILIES {
        if !doctype.contains(family.keyword) {
            continue;
        }
        return family
            .variants
            .iter()
            .find(|(variant, _)| doctype.contains(variant))
            .map(|(_, version)| *version)
            .unwrap_or(family.base);
    }

    if let Some((_, version)) = SIMPLE_VERSIONS
        .iter()
        .find(|(keyword, _)| doctype.contains(keyword))
    {
        return *version;
    }

    if doctype.contains("XHTML") {
        HtmlVersion::Xhtml
    } else if doctype.contains("HTML") {
        HtmlVersion::Html
    } else {
        HtmlVersion::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doctype_variants() {
        let cases = [
            ("<!DOCTYPE html><html></html>", "<!DOCTYPE HTML>"),
            (
                r#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE html><html></html>"#,
                "<!DOCTYPE HTML>",
            ),
            (
                "<!-- This is a comment --><!DOCTYPE html><html></html>",
                "<!DOCTYPE HTML>",
            ),
            ("<!--\n multi\n line\n--><!DOCTYPE html>", "<!DOCTYPE HTML>"),
            ("   \n\t<!DOCTYPE html><html></html>", "<!DOCTYPE HTML>"),
            ("<html></html>", ""),
            ("", ""),
        ];

        for (markup, expected) in cases {
            assert_eq!(extract_doctype(markup), expected, "markup: {:?}", markup);
        }
    }

    #[test]
    fn test_html5() {
        let markup = "<!DOCTYPE html>\n<html>\n<head><title>Test</title></head>\n<body><h1>Hello</h1></body>\n</html>";
        assert_eq!(detect_html_version(markup), HtmlVersion::Html5);
    }

    #[test]
    fn test_missing_doctype_defaults_to_html5() {
        assert_eq!(
            detect_html_version("<html><head><title>Test</title></head></html>"),
            HtmlVersion::Html5
        );
    }

    #[test]
    fn test_known_doctypes() {
        let cases = [
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#,
                HtmlVersion::Html401Strict,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN" "http://www.w3.org/TR/html4/loose.dtd">"#,
                HtmlVersion::Html401Transitional,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01 Frameset//EN" "http://www.w3.org/TR/html4/frameset.dtd">"#,
                HtmlVersion::Html401Frameset,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN">"#,
                HtmlVersion::Html401,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#,
                HtmlVersion::Xhtml10Strict,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#,
                HtmlVersion::Xhtml10Transitional,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#,
                HtmlVersion::Xhtml10Frameset,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#,
                HtmlVersion::Xhtml11,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.0//EN">"#,
                HtmlVersion::Html40,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">"#,
                HtmlVersion::Html32,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//IETF//DTD HTML 2.0//EN">"#,
                HtmlVersion::Html20,
            ),
            (
                r#"<!DOCTYPE html PUBLIC "-//SOMETHING//DTD XHTML Custom//EN">"#,
                HtmlVersion::Xhtml,
            ),
            (
                r#"<!DOCTYPE HTML PUBLIC "-//SOMETHING//DTD HTML Custom//EN">"#,
                HtmlVersion::Html,
            ),
            ("<!DOCTYPE something-else>", HtmlVersion::Unknown),
        ];

        for (markup, expected) in cases {
            assert_eq!(detect_html_version(markup), expected, "markup: {}", markup);
        }
    }

    #[test]
    fn test_xml_prolog_before_xhtml_doctype() {
        let markup = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"></html>"
        );
        assert_eq!(detect_html_version(markup), HtmlVersion::Xhtml10Strict);
    }

    #[test]
    fn test_doctype_not_at_start_is_ignored() {
        let markup = "<p>intro</p><!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\">";
        assert_eq!(detect_html_version(markup), HtmlVersion::Html5);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let markup = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.0 and HTML 3.2//EN">"#;
        let first = detect_html_version(markup);
        for _ in 0..50 {
            assert_eq!(detect_html_version(markup), first);
        }
        assert_eq!(first, HtmlVersion::Html40);
    }
}
