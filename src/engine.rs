// src/engine.rs

//! Polling engine.
//!
//! Owns the immutable configuration and provider list, the query strategies,
//! the notifier and the store. Mutable per-provider state lives in a
//! separate [`EngineState`] that only the engine touches.

use std::collections::HashMap;

use chrono::Local;

use crate::error::{AppError, QueryError, Result};
use crate::models::{
    Availability, Config, ProviderConfig, ProviderRecord, ProviderState, Snapshot,
};
use crate::notify::Notifier;
use crate::pipeline::{TransitionOutcome, classify, transition};
use crate::registry::Registry;
use crate::services::{
    BrowserNavigator, PhraseMatcher, RawResult, Strategies, VendorApi, WebDriver,
};
use crate::storage::{FlushMetadata, LocalStore, StatusStore};
use crate::utils::http::create_async_client;

/// Mutable state of every provider plus the sweep counter.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    providers: HashMap<String, ProviderState>,
    sweeps: u64,
}

impl EngineState {
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            providers: registry
                .initial_states()
                .map(|(p, s)| (p.name.clone(), s.clone()))
                .collect(),
            sweeps: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProviderState> {
        self.providers.get(name)
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }
}

/// Outcome of querying one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Classified; state may or may not have moved
    Classified {
        status: Availability,
        transition: TransitionOutcome,
    },
    /// Query failed; prior state kept
    Skipped { reason: String },
}

/// Summary of one sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep: u64,
    pub outcomes: Vec<(String, ProviderOutcome)>,
    pub flush: FlushMetadata,
}

impl SweepReport {
    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| {
                matches!(o, ProviderOutcome::Classified { transition, .. } if transition.is_changed())
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ProviderOutcome::Skipped { .. }))
            .count()
    }
}

pub struct Engine {
    config: Config,
    providers: Vec<ProviderConfig>,
    strategies: Strategies,
    notifier: Box<dyn Notifier>,
    store: Box<dyn StatusStore>,
    state: EngineState,
}

impl Engine {
    pub fn new(
        config: Config,
        registry: &Registry,
        strategies: Strategies,
        notifier: Box<dyn Notifier>,
        store: Box<dyn StatusStore>,
    ) -> Self {
        Self {
            config,
            providers: registry.providers().to_vec(),
            strategies,
            notifier,
            store,
            state: EngineState::from_registry(registry),
        }
    }

    /// Wire up the default strategies and the local store.
    ///
    /// A browser session is opened only when some provider needs one. If it
    /// cannot be opened now, browser providers are skipped until it can.
    pub async fn build(
        config: Config,
        registry: &Registry,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let client = create_async_client(&config.http)?;

        let mut strategies = Strategies::new()
            .with(PhraseMatcher::new(client.clone()))
            .with(VendorApi::new(client.clone(), config.vendors.clone()));
        if registry.needs_browser() {
            let mut navigator = BrowserNavigator::new(
                Box::new(WebDriver::new(client, config.browser.clone())),
                config.browser.clone(),
            );
            navigator.connect().await;
            strategies.push(Box::new(navigator));
        }

        let store = LocalStore::from_config(&config.output);
        Ok(Self::new(
            config,
            registry,
            strategies,
            notifier,
            Box::new(store),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn sweep_count(&self) -> u64 {
        self.state.sweeps
    }

    /// Query every provider once, in registration order, then flush.
    ///
    /// Provider failures are contained; only a failure to write the canonical
    /// snapshot is returned as an error.
    pub async fn sweep(&mut self) -> Result<SweepReport> {
        let sweep = self.state.sweeps + 1;
        log::info!("Sweep {sweep}: checking {} providers", self.providers.len());

        let mut outcomes = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let Some(strategy) = self.strategies.for_kind(provider.kind()) else {
                log::error!("{}: no {} strategy available", provider.name, provider.kind());
                outcomes.push((
                    provider.name.clone(),
                    ProviderOutcome::Skipped {
                        reason: format!("no {} strategy", provider.kind()),
                    },
                ));
                continue;
            };

            log::debug!("Checking {} ({})", provider.name, provider.strategy.target());
            let result = strategy.execute(provider).await;
            let now = Local::now();

            let (status, raw) = match result {
                Ok(raw) => (classify(&provider.strategy, &raw), Some(raw)),
                Err(e) if e.is_skip() => {
                    report_skip(provider, &e);
                    outcomes.push((
                        provider.name.clone(),
                        ProviderOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    ));
                    continue;
                }
                Err(e) => {
                    log::warn!("{}: {}; treating as {}", provider.name, e, Availability::ProbablyNot);
                    (Availability::ProbablyNot, None)
                }
            };
            log::info!("{}: {}", provider.name, status);

            let state = self.state.providers.entry(provider.name.clone()).or_default();
            let transition = transition::apply(
                state,
                provider,
                status,
                raw.as_ref().and_then(RawResult::evidence),
                now,
                self.notifier.as_ref(),
                self.store.as_ref(),
            )
            .await;
            outcomes.push((
                provider.name.clone(),
                ProviderOutcome::Classified { status, transition },
            ));
        }

        let flush = self.flush().await?;
        self.state.sweeps = sweep;

        let report = SweepReport {
            sweep,
            outcomes,
            flush,
        };
        log::info!(
            "Sweep {} done: {} changed, {} skipped",
            sweep,
            report.changed(),
            report.skipped()
        );
        Ok(report)
    }

    /// Current snapshot of every provider, in registration order.
    pub fn snapshot(&self) -> Snapshot {
        let records = self
            .providers
            .iter()
            .map(|p| {
                let state = self.state.get(&p.name).cloned().unwrap_or_default();
                ProviderRecord::new(p, &state)
            })
            .collect();
        Snapshot::new(Local::now(), records)
    }

    async fn flush(&self) -> Result<FlushMetadata> {
        match self.store.flush(&self.snapshot()).await {
            Ok(meta) => Ok(meta),
            Err(e) => {
                log::error!("{e}");
                let message = match &e {
                    AppError::Persist { path, .. } => format!("Error writing {path}, exiting."),
                    _ => "Error writing status, exiting.".to_string(),
                };
                self.announce(&message).await;
                Err(e)
            }
        }
    }

    /// Send an operator message; failures are only logged.
    pub async fn announce(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message).await {
            log::error!("Failed to send notification '{message}': {e}");
        }
    }

    pub async fn heartbeat(&self) {
        let message = format!("I'm alive! ({})", self.state.sweeps);
        log::info!("{message}");
        self.announce(&message).await;
    }

    /// Release long-lived resources (the browser session).
    pub async fn shutdown(&mut self) {
        self.strategies.shutdown().await;
    }
}

fn report_skip(provider: &ProviderConfig, err: &QueryError) {
    match err {
        QueryError::Timeout(_) => log::warn!(
            "{}: {}; keeping previous status",
            provider.name,
            err
        ),
        _ => log::error!("{}: {}; keeping previous status", provider.name, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderEntry, StrategyKind};
    use crate::notify::MemoryNotifier;
    use crate::services::{ApiLookup, QueryStrategy};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Replays canned results for every kind it is given.
    struct Scripted {
        results: VecDeque<std::result::Result<RawResult, QueryError>>,
    }

    #[async_trait]
    impl QueryStrategy for Scripted {
        fn handles(&self, _kind: StrategyKind) -> bool {
            true
        }

        async fn execute(
            &mut self,
            _provider: &ProviderConfig,
        ) -> std::result::Result<RawResult, QueryError> {
            self.results
                .pop_front()
                .unwrap_or_else(|| Err(QueryError::Http("script exhausted".into())))
        }
    }

    fn registry() -> Registry {
        let entries: Vec<ProviderEntry> = serde_json::from_str(
            r#"[
                {"name": "CVS", "state": "TX", "city": "SAN ANTONIO"},
                {"name": "HEB", "city": "SAN ANTONIO", "status": "maybe"}
            ]"#,
        )
        .unwrap();
        Registry::from_entries(&entries, "test").unwrap()
    }

    fn engine(
        tmp: &TempDir,
        results: Vec<std::result::Result<RawResult, QueryError>>,
        notifier: MemoryNotifier,
    ) -> Engine {
        Engine::new(
            Config::default(),
            &registry(),
            Strategies::new().with(Scripted {
                results: results.into(),
            }),
            Box::new(notifier),
            Box::new(LocalStore::new(tmp.path())),
        )
    }

    fn found(values: &[&str]) -> std::result::Result<RawResult, QueryError> {
        Ok(RawResult::Api(ApiLookup::Found(
            values.iter().map(|v| v.to_string()).collect(),
        )))
    }

    #[tokio::test]
    async fn test_errors_keep_prior_state() {
        let tmp = TempDir::new().unwrap();
        let notifier = MemoryNotifier::new();
        let mut engine = engine(
            &tmp,
            vec![
                Err(QueryError::Timeout("10s".into())),
                Err(QueryError::Http("503".into())),
            ],
            notifier.clone(),
        );

        let report = engine.sweep().await.unwrap();
        assert_eq!(report.skipped(), 2);
        assert_eq!(engine.sweep_count(), 1);
        assert_eq!(
            engine.state().get("HEB").unwrap().status,
            Availability::Maybe
        );
        assert!(notifier.messages().is_empty());
        assert_eq!(report.flush.count, 2);
    }

    #[tokio::test]
    async fn test_classification_error_means_probably_not() {
        let tmp = TempDir::new().unwrap();
        let notifier = MemoryNotifier::new();
        let mut engine = engine(
            &tmp,
            vec![
                found(&["Available"]),
                Err(QueryError::Classification("invalid JSON".into())),
            ],
            notifier.clone(),
        );

        let report = engine.sweep().await.unwrap();
        assert_eq!(report.changed(), 2);
        assert_eq!(
            engine.state().get("CVS").unwrap().status,
            Availability::Maybe
        );
        assert_eq!(
            engine.state().get("HEB").unwrap().status,
            Availability::ProbablyNot
        );
        assert_eq!(
            notifier.messages(),
            vec!["CVS changed to maybe", "HEB changed to probably not"]
        );
    }

    #[tokio::test]
    async fn test_snapshot_follows_registration_order() {
        let tmp = TempDir::new().unwrap();
        let mut engine = engine(
            &tmp,
            vec![found(&["Fully Booked"]), found(&["0"])],
            MemoryNotifier::new(),
        );
        engine.sweep().await.unwrap();

        let snapshot = engine.snapshot();
        let names: Vec<_> = snapshot.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["CVS", "HEB"]);
        assert!(tmp.path().join("status.json").exists());
    }

    #[tokio::test]
    async fn test_heartbeat_reports_sweep_count() {
        let tmp = TempDir::new().unwrap();
        let notifier = MemoryNotifier::new();
        let mut engine = engine(
            &tmp,
            vec![found(&["Fully Booked"]), found(&["0"])],
            notifier.clone(),
        );
        engine.sweep().await.unwrap();
        engine.heartbeat().await;
        assert_eq!(notifier.messages().last().unwrap(), "I'm alive! (1)");
    }

    #[tokio::test]
    async fn test_persist_failure_is_fatal_and_announced() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("status");
        std::fs::write(&root, b"not a directory").unwrap();

        let notifier = MemoryNotifier::new();
        let mut engine = Engine::new(
            Config::default(),
            &registry(),
            Strategies::new(),
            Box::new(notifier.clone()),
            Box::new(LocalStore::new(&root)),
        );

        assert!(engine.sweep().await.is_err());
        assert_eq!(engine.sweep_count(), 0);
        let last = notifier.messages().pop().unwrap();
        assert!(last.starts_with("Error writing"));
        assert!(last.ends_with("exiting."));
    }
}
