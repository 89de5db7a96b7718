use serde::Serialize;

use super::dates::{format_date, DatePattern};
use super::read_time::compute_read_time_with;
use crate::render::RichTextRenderer;
use crate::types::{ArticleDetail, ArticleSummary, Paragraph};

/// A listing entry ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publication_date: String,
}

impl From<&ArticleSummary> for SummaryView {
    fn from(summary: &ArticleSummary) -> Self {
        Self {
            uid: summary.uid.clone(),
            title: summary.title.clone(),
            subtitle: summary.subtitle.clone(),
            author: summary.author.clone(),
            publication_date: format_date(&summary.publication_date, DatePattern::Publication),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSection {
    pub heading: String,
    pub html: String,
}

/// Flattened article page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleView {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub publication_date: String,
    pub edited_date: Option<String>,
    pub read_time_minutes: u32,
    pub read_time: String,
    pub sections: Vec<RenderedSection>,
}

pub fn render_rich_text(renderer: &dyn RichTextRenderer, paragraphs: &[Paragraph]) -> String {
    renderer.to_html(paragraphs)
}

pub fn build_article_view(detail: &ArticleDetail, renderer: &dyn RichTextRenderer) -> ArticleView {
    let read_time_minutes = compute_read_time_with(&detail.body, renderer);
    ArticleView {
        uid: detail.uid.clone(),
        title: detail.title.clone(),
        subtitle: detail.subtitle.clone(),
        author: detail.author.clone(),
        banner_url: detail.banner_url.clone(),
        publication_date: format_date(&detail.first_publication_date, DatePattern::Publication),
        edited_date: detail
            .last_publication_date
            .as_ref()
            .map(|ts| format_date(ts, DatePattern::Edited)),
        read_time_minutes,
        read_time: format!("{} min", read_time_minutes),
        sections: detail
            .body
            .iter()
            .map(|block| RenderedSection {
                heading: block.heading.clone(),
                html: render_rich_text(renderer, &block.paragraphs),
            })
            .collect(),
    }
}
