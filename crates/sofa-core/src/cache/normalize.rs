//! URL canonicalization and HTML text normalization for content hashing.

use scraper::{Html, Selector};

/// Canonicalize a URL so that Apple's locale/path aliases for the same document
/// collapse onto one cache key (§4.1). Resolves the "alternate detail URL" open
/// question: this is the single call site every cache lookup goes through.
pub fn canonicalize_url(url: &str) -> String {
    let mut out = url.trim_end_matches('/').to_lowercase();

    for (from, to) in [
        ("/kb/ht", "/en-us/ht"),
        ("/en-ca/ht", "/en-us/ht"),
        ("/en-gb/ht", "/en-us/ht"),
    ] {
        if let Some(idx) = out.find(from) {
            out.replace_range(idx..idx + from.len(), to);
        }
    }

    out
}

/// Strip `<script>`/`<style>`/`<noscript>` content and collapse whitespace, per
/// the `content_hash` invariant in §3: hashed over normalized text, not wire bytes.
pub fn normalized_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let skip_selector = Selector::parse("script, style, noscript").expect("static selector");

    let skip_ids: std::collections::HashSet<_> =
        document.select(&skip_selector).map(|el| el.id()).collect();

    let mut text = String::new();
    for node in document.tree.nodes() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|a| skip_ids.contains(&a.id())) {
            continue;
        }
        text.push_str(fragment);
        text.push(' ');
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_maps_known_aliases_to_en_us() {
        assert_eq!(
            canonicalize_url("https://support.apple.com/kb/HT213931"),
            canonicalize_url("https://support.apple.com/en-us/HT213931")
        );
        assert_eq!(
            canonicalize_url("https://support.apple.com/en-ca/HT213931"),
            canonicalize_url("https://support.apple.com/en-us/HT213931")
        );
    }

    #[test]
    fn canonicalize_strips_trailing_slash_and_lowercases() {
        assert_eq!(
            canonicalize_url("https://Support.Apple.com/en-us/HT213931/"),
            "https://support.apple.com/en-us/ht213931"
        );
    }

    #[test]
    fn normalized_text_strips_script_and_style_and_collapses_whitespace() {
        let html = r"
            <html><head><style>.a{color:red}</style></head>
            <body>
              <script>var x = 1;</script>
              <p>Hello   World</p>
            </body></html>
        ";
        let text = normalized_text(html);
        assert_eq!(text, "Hello World");
    }

    #[test]
    fn normalized_text_is_stable_across_whitespace_only_changes() {
        let a = normalized_text("<p>Hello   World</p>");
        let b = normalized_text("<p>Hello\n\nWorld</p>");
        assert_eq!(a, b);
    }
}
