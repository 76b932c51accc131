// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML visible-text extraction and minimal HTML rendering.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").expect("valid regex"));
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|$)").expect("valid regex"));
static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</?(?:p|div|h[1-6]|li|ul|ol|tr|table|thead|tbody|section|article|header|footer|nav|blockquote|pre|title)\b[^>]*>",
    )
    .expect("valid regex")
});
static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</t[dh]\s*>").expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

/// Visible text of an HTML document, one block per line.
///
/// `head`, `script` and `style` content is dropped; when a `<body>` exists
/// only its content is used. Block-level tags become line breaks, table
/// cells are separated by ` | `, and character references are decoded.
pub fn html_to_text(html: &str) -> String {
    let cleaned = COMMENT_RE.replace_all(html, "");
    let cleaned = SCRIPT_RE.replace_all(&cleaned, "");
    let cleaned = STYLE_RE.replace_all(&cleaned, "");

    let content = match BODY_RE.captures(&cleaned) {
        Some(caps) => caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
        None => HEAD_RE.replace_all(&cleaned, "").into_owned(),
    };

    let content = CELL_RE.replace_all(&content, " | ");
    let content = BREAK_RE.replace_all(&content, "\n");
    let content = TAG_RE.replace_all(&content, "");
    let content = decode_entities(&content);

    content
        .lines()
        .map(|line| {
            let line = SPACE_RE.replace_all(line, " ");
            line.trim().trim_end_matches('|').trim_end().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode named and numeric character references in one pass.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "euro" => '€',
        "pound" => '£',
        "deg" => '°',
        _ => return None,
    };
    Some(c)
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Wrap rendered body markup in a complete UTF-8 HTML document.
pub fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

/// Render plain text as HTML.
///
/// With `preserve_lines` every source line is kept inside a `<pre>` block;
/// otherwise blank-line separated paragraphs become `<p>` elements with
/// their internal line breaks folded into spaces.
pub fn text_to_html(title: &str, text: &str, preserve_lines: bool) -> String {
    let mut body = String::new();
    if preserve_lines {
        body.push_str("<pre>");
        body.push_str(&escape(text.trim_end_matches('\n')));
        body.push_str("</pre>\n");
    } else {
        for paragraph in paragraphs(text) {
            body.push_str("<p>");
            body.push_str(&escape(&paragraph));
            body.push_str("</p>\n");
        }
    }
    document(title, &body)
}

/// Render text where every non-empty line is its own paragraph, as produced
/// by the office and PDF extractors.
pub fn lines_to_html(title: &str, text: &str) -> String {
    let body: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>\n", escape(line)))
        .collect();
    document(title, &body)
}

/// Blank-line separated paragraphs with internal whitespace collapsed.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_head_script_and_style() {
        let html = r#"<!DOCTYPE html><html><head><title>Ignored</title><style>p{color:red}</style></head>
            <body><script>var x = "<p>no</p>";</script><h1>Heading</h1><p>Body &amp; soul</p></body></html>"#;
        let text = html_to_text(html);
        assert_eq!(text, "Heading\nBody & soul");
    }

    #[test]
    fn fragment_without_body() {
        let text = html_to_text("<div>one</div><div>two<br/>three</div>");
        assert_eq!(text, "one\ntwo\nthree");
    }

    #[test]
    fn table_cells_are_separated() {
        let text = html_to_text("<table><tr><td>a</td><td>b</td></tr><tr><td>1</td><td>2</td></tr></table>");
        assert_eq!(text, "a | b\n1 | 2");
    }

    #[test]
    fn numeric_entities_decode_once() {
        assert_eq!(decode_entities("&#65;&#x42;&amp;lt;"), "AB&lt;");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn text_to_html_paragraphs() {
        let html = text_to_html("t", "line one\nline two\n\nnext <para>", false);
        assert!(html.contains("<p>line one line two</p>"));
        assert!(html.contains("<p>next &lt;para&gt;</p>"));
    }

    #[test]
    fn text_to_html_preserves_lines() {
        let html = text_to_html("t", "a\nb\n", true);
        assert!(html.contains("<pre>a\nb</pre>"));
    }

    #[test]
    fn lines_become_paragraphs() {
        let html = lines_to_html("t", "first\n\n  second  \n");
        assert!(html.contains("<p>first</p>\n<p>second</p>"));
    }

    #[test]
    fn html_round_trip_keeps_words() {
        let html = text_to_html("t", "Important content here", false);
        assert_eq!(html_to_text(&html), "Important content here");
    }
}
