use crate::types::Paragraph;

/// Converts structured text into display markup.
///
/// Implementations are trusted to produce safe HTML; callers pass paragraphs
/// through untouched and in their original order.
pub trait RichTextRenderer: Send + Sync {
    fn to_html(&self, paragraphs: &[Paragraph]) -> String;

    /// Plain text of a single paragraph, markup discarded
    fn to_text(&self, paragraph: &Paragraph) -> String {
        paragraph.text.clone()
    }
}

/// A fire-and-forget side effect attached to an article view, such as
/// mounting the discussion widget for that article's thread.
pub trait ExternalEffect: Send + Sync {
    fn inject(&self, thread_key: &str);
}
