//! Phrase-match strategy: fetch a page and keep its text for phrase search.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use crate::error::QueryError;
use crate::models::{ProviderConfig, Strategy, StrategyKind};
use crate::services::{QueryStrategy, RawResult};
use crate::utils::http::fetch_text;

/// Remove `<!-- ... -->` blocks, including ones spanning lines.
///
/// Outdated text sometimes lingers inside comments and must not count.
pub fn strip_html_comments(html: &str) -> String {
    static COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
    match COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").ok()) {
        Some(re) => re.replace_all(html, "").into_owned(),
        None => html.to_string(),
    }
}

/// Fetches provider pages over HTTP.
pub struct PhraseMatcher {
    client: Client,
}

impl PhraseMatcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryStrategy for PhraseMatcher {
    fn handles(&self, kind: StrategyKind) -> bool {
        kind == StrategyKind::PhraseMatch
    }

    async fn execute(&mut self, provider: &ProviderConfig) -> Result<RawResult, QueryError> {
        let Strategy::PhraseMatch { url, .. } = &provider.strategy else {
            return Err(QueryError::Classification(format!(
                "{} is not a phrase-match provider",
                provider.name
            )));
        };

        let body = fetch_text(&self.client, url).await?;
        Ok(RawResult::Page {
            text: strip_html_comments(&body),
            evidence: body,
        })
    }
}
