//! HTML rendering of Prismic structured text.

use serde::Deserialize;
use serde_json::Value;

use st_core::{Paragraph, RichTextRenderer};

#[derive(Debug, Default, Deserialize)]
struct Block {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    spans: Vec<RawSpan>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    oembed: Option<Oembed>,
}

#[derive(Debug, Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Oembed {
    #[serde(default)]
    embed_url: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum SpanKind {
    Strong,
    Em,
    Hyperlink(String),
    Label(String),
    Other,
}

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    kind: SpanKind,
}

/// Maps the UTF-16 offsets Prismic uses for spans onto char indices.
struct Utf16Index {
    /// UTF-16 offset at which each char starts, plus the total length.
    starts: Vec<usize>,
}

impl Utf16Index {
    fn new(chars: &[char]) -> Self {
        let mut starts = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for c in chars {
            starts.push(offset);
            offset += c.len_utf16();
        }
        starts.push(offset);
        Self { starts }
    }

    /// Char index of a UTF-16 offset; an offset inside a surrogate pair
    /// rounds up to the next char.
    fn char_index(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start < offset).min(self.starts.len() - 1)
    }
}

impl Span {
    fn from_raw(raw: &RawSpan, index: &Utf16Index) -> Self {
        let data_str = |key: &str| {
            raw.data
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let kind = match raw.kind.as_str() {
            "strong" => SpanKind::Strong,
            "em" => SpanKind::Em,
            "hyperlink" => SpanKind::Hyperlink(data_str("url")),
            "label" => SpanKind::Label(data_str("label")),
            _ => SpanKind::Other,
        };
        Self {
            start: index.char_index(raw.start),
            end: index.char_index(raw.end),
            kind,
        }
    }

    fn open(&self) -> String {
        match &self.kind {
            SpanKind::Strong => "<strong>".to_string(),
            SpanKind::Em => "<em>".to_string(),
            SpanKind::Hyperlink(url) => format!("<a href=\"{}\">", escape(url)),
            SpanKind::Label(label) => format!("<span class=\"{}\">", escape(label)),
            SpanKind::Other => String::new(),
        }
    }

    fn close(&self) -> &'static str {
        match self.kind {
            SpanKind::Strong => "</strong>",
            SpanKind::Em => "</em>",
            SpanKind::Hyperlink(_) => "</a>",
            SpanKind::Label(_) => "</span>",
            SpanKind::Other => "",
        }
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        '\n' => out.push_str("<br />"),
        c => out.push(c),
    }
}

/// Provider markup from oEmbed, reduced to what an embed needs.
fn sanitize_embed(html: &str) -> String {
    ammonia::Builder::default()
        .add_tags(["iframe"])
        .add_tag_attributes(
            "iframe",
            ["src", "width", "height", "title", "allow", "allowfullscreen", "frameborder"],
        )
        .clean(html)
        .to_string()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out
}

/// Renders `text` with its spans, keeping tags properly nested even when
/// spans overlap.
fn render_spans(text: &str, raw_spans: &[RawSpan]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let index = Utf16Index::new(&chars);
    let spans: Vec<Span> = raw_spans
        .iter()
        .map(|s| Span::from_raw(s, &index))
        .filter(|s| s.end > s.start)
        .collect();

    let mut out = String::new();
    let mut open: Vec<&Span> = Vec::new();

    for i in 0..=chars.len() {
        if open.iter().any(|s| s.end == i) {
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                out.push_str(span.close());
                if span.end != i {
                    reopen.push(span);
                }
                if !open.iter().any(|s| s.end == i) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&span.open());
                open.push(span);
            }
        }

        let mut starting: Vec<&Span> = spans.iter().filter(|s| s.start == i).collect();
        starting.sort_by(|a, b| b.end.cmp(&a.end));
        for span in starting {
            out.push_str(&span.open());
            open.push(span);
        }

        if let Some(c) = chars.get(i) {
            push_escaped(&mut out, *c);
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tags(&self) -> (&'static str, &'static str) {
        match self {
            ListKind::Unordered => ("<ul>", "</ul>"),
            ListKind::Ordered => ("<ol>", "</ol>"),
        }
    }
}

fn block_of(paragraph: &Paragraph) -> Block {
    let mut block: Block = serde_json::from_value(paragraph.markup.clone()).unwrap_or_default();
    if block.text.is_none() {
        block.text = Some(paragraph.text.clone());
    }
    block
}

fn render_block(block: &Block) -> String {
    let text = block.text.as_deref().unwrap_or_default();
    let inner = || render_spans(text, &block.spans);

    match block.kind.as_deref().unwrap_or("paragraph") {
        kind @ ("heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6") => {
            let level = &kind["heading".len()..];
            format!("<h{level}>{}</h{level}>", inner())
        }
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "image" => format!(
            "<p class=\"block-img\"><img src=\"{}\" alt=\"{}\" /></p>",
            escape(block.url.as_deref().unwrap_or_default()),
            escape(block.alt.as_deref().unwrap_or_default())
        ),
        "embed" => {
            let oembed = block.oembed.as_ref();
            format!(
                "<div data-oembed=\"{}\" data-oembed-type=\"{}\">{}</div>",
                escape(oembed.and_then(|o| o.embed_url.as_deref()).unwrap_or_default()),
                escape(oembed.and_then(|o| o.kind.as_deref()).unwrap_or_default()),
                sanitize_embed(oembed.and_then(|o| o.html.as_deref()).unwrap_or_default())
            )
        }
        _ => format!("<p>{}</p>", inner()),
    }
}

/// `RichTextRenderer` for Prismic structured-text blocks.
#[derive(Debug, Clone, Default)]
pub struct PrismicHtmlRenderer;

impl PrismicHtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl RichTextRenderer for PrismicHtmlRenderer {
    fn to_html(&self, paragraphs: &[Paragraph]) -> String {
        let mut out = String::new();
        let mut list: Option<ListKind> = None;

        for paragraph in paragraphs {
            let block = block_of(paragraph);
            let item_list = match block.kind.as_deref() {
                Some("list-item") => Some(ListKind::Unordered),
                Some("o-list-item") => Some(ListKind::Ordered),
                _ => None,
            };

            if list != item_list {
                if let Some(current) = list {
                    out.push_str(current.tags().1);
                }
                if let Some(next) = item_list {
                    out.push_str(next.tags().0);
                }
                list = item_list;
            }
            out.push_str(&render_block(&block));
        }

        if let Some(current) = list {
            out.push_str(current.tags().1);
        }
        out
    }

    fn to_text(&self, paragraph: &Paragraph) -> String {
        block_of(paragraph).text.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paragraph(markup: Value) -> Paragraph {
        Paragraph {
            text: markup.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
            markup,
        }
    }

    fn render(blocks: Vec<Value>) -> String {
        let paragraphs: Vec<_> = blocks.into_iter().map(paragraph).collect();
        PrismicHtmlRenderer::new().to_html(&paragraphs)
    }

    #[test]
    fn test_paragraphs_in_order() {
        let html = render(vec![
            json!({ "type": "paragraph", "text": "primeiro", "spans": [] }),
            json!({ "type": "paragraph", "text": "segundo", "spans": [] }),
        ]);
        assert_eq!(html, "<p>primeiro</p><p>segundo</p>");
    }

    #[test]
    fn test_spans() {
        let html = render(vec![json!({
            "type": "paragraph",
            "text": "Leia a doc oficial",
            "spans": [
                { "start": 0, "end": 4, "type": "strong" },
                { "start": 7, "end": 18, "type": "hyperlink", "data": { "link_type": "Web", "url": "https://react.dev" } }
            ]
        })]);
        assert_eq!(
            html,
            "<p><strong>Leia</strong> a <a href=\"https://react.dev\">doc oficial</a></p>"
        );
    }

    #[test]
    fn test_overlapping_spans_stay_nested() {
        let html = render(vec![json!({
            "type": "paragraph",
            "text": "abcd",
            "spans": [
                { "start": 0, "end": 3, "type": "strong" },
                { "start": 1, "end": 4, "type": "em" }
            ]
        })]);
        assert_eq!(html, "<p><strong>a<em>bc</em></strong><em>d</em></p>");
    }

    #[test]
    fn test_escapes_text() {
        let html = render(vec![json!({ "type": "paragraph", "text": "<script>alert('x')</script>", "spans": [] })]);
        assert_eq!(html, "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>");
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = render(vec![
            json!({ "type": "list-item", "text": "um", "spans": [] }),
            json!({ "type": "list-item", "text": "dois", "spans": [] }),
            json!({ "type": "o-list-item", "text": "três", "spans": [] }),
            json!({ "type": "paragraph", "text": "fim", "spans": [] }),
        ]);
        assert_eq!(html, "<ul><li>um</li><li>dois</li></ul><ol><li>três</li></ol><p>fim</p>");
    }

    #[test]
    fn test_headings_preformatted_and_images() {
        let html = render(vec![
            json!({ "type": "heading2", "text": "Título", "spans": [] }),
            json!({ "type": "preformatted", "text": "let a = 1;\nlet b = 2;", "spans": [] }),
            json!({ "type": "image", "url": "https://images.example.com/a.png", "alt": "diagrama" }),
        ]);
        assert_eq!(
            html,
            "<h2>Título</h2><pre>let a = 1;<br />let b = 2;</pre><p class=\"block-img\"><img src=\"https://images.example.com/a.png\" alt=\"diagrama\" /></p>"
        );
    }

    #[test]
    fn test_span_offsets_count_utf16_units() {
        let html = render(vec![json!({
            "type": "paragraph",
            "text": "🚀 Rust",
            "spans": [{ "start": 3, "end": 7, "type": "strong" }]
        })]);
        assert_eq!(html, "<p>🚀 <strong>Rust</strong></p>");

        let html = render(vec![json!({
            "type": "paragraph",
            "text": "ação 🎉 e mais",
            "spans": [{ "start": 5, "end": 7, "type": "em" }, { "start": 8, "end": 9, "type": "strong" }]
        })]);
        assert_eq!(html, "<p>ação <em>🎉</em> <strong>e</strong> mais</p>");
    }

    #[test]
    fn test_embed_html_is_sanitized() {
        let html = render(vec![json!({
            "type": "embed",
            "oembed": {
                "embed_url": "https://x",
                "type": "video",
                "html": "<img src=x onerror=alert(1)><script>alert(2)</script>"
            }
        })]);
        assert!(!html.contains("onerror"));
        assert!(!html.contains("<script"));
        assert!(html.starts_with("<div data-oembed=\"https://x\" data-oembed-type=\"video\">"));
    }

    #[test]
    fn test_embed_keeps_iframe() {
        let html = render(vec![json!({
            "type": "embed",
            "oembed": {
                "embed_url": "https://www.youtube.com/watch?v=abc",
                "type": "video",
                "html": "<iframe src=\"https://www.youtube.com/embed/abc\" width=\"480\" height=\"270\" onload=\"alert(1)\"></iframe>"
            }
        })]);
        assert!(html.contains("<iframe src=\"https://www.youtube.com/embed/abc\" width=\"480\" height=\"270\">"));
        assert!(!html.contains("onload"));
    }

    #[test]
    fn test_untyped_markup_falls_back_to_text() {
        let p = Paragraph {
            text: "texto simples".to_string(),
            markup: Value::Null,
        };
        let renderer = PrismicHtmlRenderer::new();
        assert_eq!(renderer.to_html(&[p.clone()]), "<p>texto simples</p>");
        assert_eq!(renderer.to_text(&p), "texto simples");
    }
}
