//! Read time, date formatting and the render models built from them.

pub mod dates;
pub mod read_time;
pub mod view;

pub use dates::{format_date, parse_date, DatePattern};
pub use read_time::{compute_read_time, compute_read_time_with, count_words, WORDS_PER_MINUTE};
pub use view::{build_article_view, render_rich_text, ArticleView, RenderedSection, SummaryView};
