//! Browser-navigation strategy.
//!
//! Drives a fixed UI script through a [`BrowserSession`]:
//!
//! 1. open the landing page and click the acknowledgement control
//! 2. open the search page, type the provider's query and submit
//! 3. poll for the result element until it shows up or the wait times out
//!
//! One session is shared by every browser provider. It is opened through a
//! [`SessionFactory`], reopened on the next query after a session failure,
//! and closed by [`QueryStrategy::shutdown`].

use std::fmt;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::QueryError;
use crate::models::{BrowserConfig, ProviderConfig, Strategy, StrategyKind};
use crate::services::{QueryStrategy, RawResult};

/// Result texts that mean no appointments can be booked.
pub const TERMINAL_PHRASES: [&str; 2] = ["Appointments unavailable", "No appointments available"];

/// Opaque handle of an element found in the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal browser automation capability.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), QueryError>;

    /// First element matching a CSS selector, if any.
    async fn find_element(&mut self, selector: &str) -> Result<Option<ElementId>, QueryError>;

    async fn click(&mut self, element: &ElementId) -> Result<(), QueryError>;

    async fn type_text(&mut self, element: &ElementId, text: &str) -> Result<(), QueryError>;

    /// Visible text of an element.
    async fn element_text(&mut self, element: &ElementId) -> Result<String, QueryError>;

    /// End the session. Further calls may fail.
    async fn close(&mut self) -> Result<(), QueryError>;
}

/// Opens new browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, QueryError>;
}

/// Attach the script step to navigation failures.
///
/// Timeouts and session failures pass through so callers can still tell them
/// apart.
fn at_step(step: &str, err: QueryError) -> QueryError {
    match err {
        QueryError::Timeout(_) | QueryError::Session(_) => err,
        other => QueryError::navigation(step, other),
    }
}

/// Runs the navigation script over a long-lived session.
pub struct BrowserNavigator {
    factory: Box<dyn SessionFactory>,
    session: Option<Box<dyn BrowserSession>>,
    script: BrowserConfig,
    closed: bool,
}

impl BrowserNavigator {
    pub fn new(factory: Box<dyn SessionFactory>, script: BrowserConfig) -> Self {
        Self {
            factory,
            session: None,
            script,
            closed: false,
        }
    }

    /// Open the session ahead of the first query.
    ///
    /// A failure is only logged; the next query tries again.
    pub async fn connect(&mut self) {
        if let Err(e) = self.session().await {
            log::warn!("Browser session not available yet: {e}");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>, QueryError> {
        if self.closed {
            return Err(QueryError::Session("session already closed".into()));
        }
        match &mut self.session {
            Some(session) => Ok(session),
            slot => Ok(slot.insert(self.factory.open().await?)),
        }
    }
}

async fn search(
    s: &mut dyn BrowserSession,
    script: &BrowserConfig,
    query: &str,
) -> Result<Option<String>, QueryError> {
    s.navigate(&script.landing_url)
        .await
        .map_err(|e| at_step("open landing page", e))?;
    match s
        .find_element(&script.ack_selector)
        .await
        .map_err(|e| at_step("find acknowledgement", e))?
    {
        Some(ack) => s
            .click(&ack)
            .await
            .map_err(|e| at_step("click acknowledgement", e))?,
        None => log::warn!(
            "Acknowledgement control '{}' not found, continuing",
            script.ack_selector
        ),
    }

    s.navigate(&script.search_url)
        .await
        .map_err(|e| at_step("open search page", e))?;
    let input = s
        .find_element(&script.query_selector)
        .await
        .map_err(|e| at_step("find query input", e))?
        .ok_or_else(|| QueryError::navigation("find query input", "element not found"))?;
    s.type_text(&input, query)
        .await
        .map_err(|e| at_step("type query", e))?;
    let submit = s
        .find_element(&script.submit_selector)
        .await
        .map_err(|e| at_step("find submit", e))?
        .ok_or_else(|| QueryError::navigation("find submit", "element not found"))?;
    s.click(&submit).await.map_err(|e| at_step("submit", e))?;

    wait_for_result(s, script).await
}

/// Spin-wait for the result element, then fall back to the page body.
async fn wait_for_result(
    s: &mut dyn BrowserSession,
    script: &BrowserConfig,
) -> Result<Option<String>, QueryError> {
    let deadline = Instant::now() + script.wait_timeout();

    loop {
        if let Some(element) = s
            .find_element(&script.result_selector)
            .await
            .map_err(|e| at_step("find result", e))?
        {
            let text = s
                .element_text(&element)
                .await
                .map_err(|e| at_step("read result", e))?;
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
        if Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(script.poll_interval()).await;
    }

    log::warn!(
        "No result after {}s, using whatever the page shows",
        script.wait_timeout_secs
    );
    match s
        .find_element("body")
        .await
        .map_err(|e| at_step("find body", e))?
    {
        Some(body) => Ok(Some(
            s.element_text(&body)
                .await
                .map_err(|e| at_step("read body", e))?,
        )),
        None => Ok(None),
    }
}

#[async_trait]
impl QueryStrategy for BrowserNavigator {
    fn handles(&self, kind: StrategyKind) -> bool {
        kind == StrategyKind::Browser
    }

    async fn execute(&mut self, provider: &ProviderConfig) -> Result<RawResult, QueryError> {
        let Strategy::Browser { query } = &provider.strategy else {
            return Err(QueryError::Classification(format!(
                "{} is not a browser provider",
                provider.name
            )));
        };

        let script = self.script.clone();
        let session = self.session().await?;
        match search(&mut **session, &script, query).await {
            Ok(text) => Ok(RawResult::Browser { text }),
            Err(e @ QueryError::Session(_)) => {
                log::warn!("Dropping broken browser session, reopening on next query");
                self.session = None;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let Some(mut session) = self.session.take() else {
            return;
        };
        match session.close().await {
            Ok(()) => log::info!("Browser session closed"),
            Err(e) => log::warn!("Failed to close browser session: {e}"),
        }
    }
}
