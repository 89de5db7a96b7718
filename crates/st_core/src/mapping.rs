//! Conversion of loosely typed repository records into the strict article
//! shapes. Nothing outside this module reads `RawArticle::data`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::{ArticleDetail, ArticleSummary, ContentBlock, Paragraph, RawArticle};
use crate::{Error, Result};

/// Parses repository timestamps, which come either as RFC 3339 or with a
/// colon-less offset (`2021-03-25T19:25:28+0000`).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Mapping(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn text_field(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        // Title-like fields may also arrive as structured text.
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn required_uid(raw: &RawArticle) -> Result<String> {
    raw.uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| Error::Mapping(format!("record {:?} has no uid", raw.id)))
}

fn required_first_publication(raw: &RawArticle, uid: &str) -> Result<DateTime<Utc>> {
    let date = raw
        .first_publication_date
        .as_deref()
        .ok_or_else(|| Error::Mapping(format!("record {} has no first publication date", uid)))?;
    parse_timestamp(date)
}

fn content_blocks(data: &Map<String, Value>) -> Vec<ContentBlock> {
    let Some(Value::Array(content)) = data.get("content") else {
        return Vec::new();
    };

    content
        .iter()
        .map(|block| {
            let heading = block
                .get("heading")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let paragraphs = block
                .get("body")
                .and_then(Value::as_array)
                .map(|body| {
                    body.iter()
                        .map(|item| Paragraph {
                            text: item
                                .get("text")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            markup: item.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            ContentBlock { heading, paragraphs }
        })
        .collect()
}

impl TryFrom<RawArticle> for ArticleSummary {
    type Error = Error;

    fn try_from(raw: RawArticle) -> Result<Self> {
        let uid = required_uid(&raw)?;
        let publication_date = required_first_publication(&raw, &uid)?;
        Ok(Self {
            title: text_field(&raw.data, "title"),
            subtitle: text_field(&raw.data, "subtitle"),
            author: text_field(&raw.data, "author"),
            uid,
            publication_date,
        })
    }
}

impl TryFrom<RawArticle> for ArticleDetail {
    type Error = Error;

    fn try_from(raw: RawArticle) -> Result<Self> {
        let uid = required_uid(&raw)?;
        let first_publication_date = required_first_publication(&raw, &uid)?;
        let last_publication_date = raw
            .last_publication_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        let banner_url = raw
            .data
            .get("banner")
            .and_then(|b| b.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            title: text_field(&raw.data, "title"),
            subtitle: text_field(&raw.data, "subtitle"),
            author: text_field(&raw.data, "author"),
            body: content_blocks(&raw.data),
            uid,
            first_publication_date,
            last_publication_date,
            banner_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn raw_post() -> RawArticle {
        serde_json::from_value(json!({
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:27:35+0000",
            "tags": ["react"],
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.example.com/banner.png" },
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [
                            { "type": "paragraph", "text": "Nullam dolor sapien", "spans": [] }
                        ]
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2021-03-15T19:25:28+0000").unwrap();
        let b = parse_timestamp("2021-03-15T19:25:28Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.day(), 15);
        assert_eq!(a.hour(), 19);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_summary_keeps_only_listing_fields() {
        let summary = ArticleSummary::try_from(raw_post()).unwrap();
        assert_eq!(summary.uid, "como-utilizar-hooks");
        assert_eq!(summary.title, "Como utilizar Hooks");
        assert_eq!(summary.author, "Joseph Oliveira");
        assert_eq!(summary.publication_date.month(), 3);
    }

    #[test]
    fn test_detail_maps_body_and_banner() {
        let detail = ArticleDetail::try_from(raw_post()).unwrap();
        assert_eq!(detail.banner_url, "https://images.example.com/banner.png");
        assert_eq!(detail.body.len(), 1);
        assert_eq!(detail.body[0].heading, "Proin et varius");
        assert_eq!(detail.body[0].paragraphs[0].text, "Nullam dolor sapien");
        assert_eq!(detail.body[0].paragraphs[0].markup["type"], "paragraph");
        assert_eq!(detail.last_publication_date.unwrap().day(), 25);
    }

    #[test]
    fn test_missing_uid_is_malformed() {
        let mut raw = raw_post();
        raw.uid = None;
        assert!(matches!(ArticleSummary::try_from(raw), Err(Error::Mapping(_))));
    }

    #[test]
    fn test_missing_publication_date_is_malformed() {
        let mut raw = raw_post();
        raw.first_publication_date = None;
        assert!(matches!(ArticleDetail::try_from(raw), Err(Error::Mapping(_))));
    }

    #[test]
    fn test_structured_title_is_flattened() {
        let mut raw = raw_post();
        raw.data.insert(
            "title".to_string(),
            json!([{ "type": "heading1", "text": "Criando um app", "spans": [] }]),
        );
        let summary = ArticleSummary::try_from(raw).unwrap();
        assert_eq!(summary.title, "Criando um app");
    }
}
