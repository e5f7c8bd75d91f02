//! Query strategies.
//!
//! Each strategy fetches raw material for one provider; classification into
//! an [`Availability`](crate::models::Availability) happens afterwards in
//! [`crate::pipeline::classify`].
//!
//! - Phrase matching over a fetched HTML page (`PhraseMatcher`)
//! - Vendor JSON status feeds (`VendorApi`)
//! - Scripted browser navigation (`BrowserNavigator`)

mod browser;
mod phrase;
mod vendor_api;
pub mod webdriver;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::models::{ProviderConfig, StrategyKind};

pub use browser::{BrowserNavigator, BrowserSession, ElementId, SessionFactory, TERMINAL_PHRASES};
pub use phrase::{PhraseMatcher, strip_html_comments};
pub use vendor_api::{ApiLookup, CVS_FULLY_BOOKED, HEB_NO_SLOTS, VendorApi, lookup_cvs, lookup_heb};
pub use webdriver::{WebDriver, WebDriverSession};

/// Raw outcome of one query, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Fetched page with comments stripped, plus the untouched body
    Page { text: String, evidence: String },
    /// Status looked up in a vendor feed
    Api(ApiLookup),
    /// Text of the browser's result element, if anything was found
    Browser { text: Option<String> },
}

impl RawResult {
    /// Raw HTML worth archiving on a transition.
    pub fn evidence(&self) -> Option<&str> {
        match self {
            Self::Page { evidence, .. } => Some(evidence),
            _ => None,
        }
    }
}

/// Common contract of every query mechanism.
#[async_trait]
pub trait QueryStrategy: Send {
    /// Which providers this strategy serves.
    fn handles(&self, kind: StrategyKind) -> bool;

    /// Query the provider's source once.
    async fn execute(&mut self, provider: &ProviderConfig) -> Result<RawResult, QueryError>;

    /// Release long-lived resources. Called once at shutdown.
    async fn shutdown(&mut self) {}
}

/// The set of strategies available to the engine, in lookup order.
#[derive(Default)]
pub struct Strategies {
    strategies: Vec<Box<dyn QueryStrategy>>,
}

impl Strategies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl QueryStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn QueryStrategy>) {
        self.strategies.push(strategy);
    }

    /// The strategy that serves `kind`, if one is registered.
    pub fn for_kind(&mut self, kind: StrategyKind) -> Option<&mut (dyn QueryStrategy + 'static)> {
        self.strategies
            .iter_mut()
            .find(|s| s.handles(kind))
            .map(|s| s.as_mut())
    }

    /// Shut every strategy down.
    pub async fn shutdown(&mut self) {
        for strategy in &mut self.strategies {
            strategy.shutdown().await;
        }
    }
}
