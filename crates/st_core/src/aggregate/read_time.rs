use crate::render::RichTextRenderer;
use crate::types::{ArticleBody, Paragraph};

pub const WORDS_PER_MINUTE: u32 = 200;

/// Naive word count: one more than the number of single spaces.
///
/// Runs of spaces yield empty "words" and an empty string counts as one;
/// existing read times depend on exactly this count.
pub fn count_words(text: &str) -> u32 {
    text.split(' ').count() as u32
}

fn words_with(body: &ArticleBody, plain_text: impl Fn(&Paragraph) -> String) -> u32 {
    body.iter().fold(0, |total, block| {
        let paragraphs: u32 = block.paragraphs.iter().map(|p| count_words(&plain_text(p))).sum();
        total + count_words(&block.heading) + paragraphs
    })
}

pub fn total_words(body: &ArticleBody) -> u32 {
    words_with(body, |p| p.text.clone())
}

/// Estimated reading time in whole minutes, rounded up. No minimum.
pub fn compute_read_time(body: &ArticleBody) -> u32 {
    total_words(body).div_ceil(WORDS_PER_MINUTE)
}

/// Same estimate, with each paragraph's plain text taken from `renderer`.
pub fn compute_read_time_with(body: &ArticleBody, renderer: &dyn RichTextRenderer) -> u32 {
    words_with(body, |p| renderer.to_text(p)).div_ceil(WORDS_PER_MINUTE)
}
