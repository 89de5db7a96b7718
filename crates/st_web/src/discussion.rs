use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use st_core::ExternalEffect;

pub const SCRIPT_SRC: &str = "https://utteranc.es/client.js";
pub const DEFAULT_REPO: &str = "rayssalozorio/projeto01";
const THEME: &str = "github-light";

/// Attributes of the `<script>` tag the page layer mounts for comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptAttributes {
    pub src: &'static str,
    pub crossorigin: &'static str,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub repo: String,
    #[serde(rename = "issue-term")]
    pub issue_term: &'static str,
    pub theme: &'static str,
    pub thread_key: String,
}

/// Utterances comment widget, keyed by article path.
pub struct UtterancesWidget {
    repo: String,
    injections: Mutex<HashMap<String, usize>>,
}

impl UtterancesWidget {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            injections: Mutex::new(HashMap::new()),
        }
    }

    pub fn script_attributes(&self, thread_key: &str) -> ScriptAttributes {
        ScriptAttributes {
            src: SCRIPT_SRC,
            crossorigin: "anonymous",
            is_async: true,
            repo: self.repo.clone(),
            issue_term: "pathname",
            theme: THEME,
            thread_key: thread_key.to_string(),
        }
    }

    pub fn injections(&self, thread_key: &str) -> usize {
        self.injections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(thread_key)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for UtterancesWidget {
    fn default() -> Self {
        Self::new(DEFAULT_REPO)
    }
}

impl ExternalEffect for UtterancesWidget {
    fn inject(&self, thread_key: &str) {
        let mut injections = self.injections.lock().unwrap_or_else(|e| e.into_inner());
        *injections.entry(thread_key.to_string()).or_insert(0) += 1;
        info!("💬 Mounting {} discussion for {}", self.repo, thread_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_attributes() {
        let widget = UtterancesWidget::default();
        let attrs = widget.script_attributes("/post/hooks");
        assert_eq!(attrs.src, "https://utteranc.es/client.js");
        assert_eq!(attrs.repo, "rayssalozorio/projeto01");
        assert_eq!(attrs.issue_term, "pathname");

        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["async"], true);
        assert_eq!(json["issue-term"], "pathname");
    }

    #[test]
    fn test_injections_are_counted_per_thread() {
        let widget = UtterancesWidget::new("owner/blog");
        widget.inject("/post/a");
        widget.inject("/post/a");
        widget.inject("/post/b");
        assert_eq!(widget.injections("/post/a"), 2);
        assert_eq!(widget.injections("/post/b"), 1);
        assert_eq!(widget.injections("/post/c"), 0);
    }
}
