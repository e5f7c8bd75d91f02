// src/registry.rs

//! Provider registry.
//!
//! Loads `websites.json` once at startup into an immutable, ordered list of
//! validated providers. Any problem is fatal: the monitor never runs with a
//! partially understood provider list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{
    Availability, ProviderConfig, ProviderEntry, ProviderState, StrategyKind, parse_update_time,
};

const WEBSITES_EXAMPLE: &str = r#"[
    {
        "name": "UT Health San Antonio",
        "website": "https://schedule.utmedicinesa.com/Identity/Account/Register",
        "neg_phrase": "are full",
        "pos_phrase": "you confirm your understanding"
    }
]"#;

/// The validated provider list plus the states they start from.
#[derive(Debug, Clone)]
pub struct Registry {
    providers: Vec<ProviderConfig>,
    initial: Vec<ProviderState>,
}

impl Registry {
    /// Load and validate provider definitions from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = path.display().to_string();
        if !path.exists() {
            log::error!("{source} not found. Example contents:\n{WEBSITES_EXAMPLE}");
            return Err(ConfigError::Missing(source));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::invalid(&source, e))?;
        Self::parse(&content, &source)
    }

    /// Validate provider definitions from a JSON document.
    pub fn parse(content: &str, source: &str) -> Result<Self, ConfigError> {
        let entries: Vec<ProviderEntry> = serde_json::from_str(content).map_err(|e| {
            log::error!("Problem reading {source}. Valid example:\n{WEBSITES_EXAMPLE}");
            ConfigError::invalid(source, e)
        })?;
        Self::from_entries(&entries, source)
    }

    /// Validate already-deserialized entries.
    pub fn from_entries(entries: &[ProviderEntry], source: &str) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::invalid(source, "no providers defined"));
        }

        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(entries.len());
        let mut initial = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let provider = ProviderConfig::from_entry(entry)
                .map_err(|e| ConfigError::invalid(source, format!("entry {index}: {e}")))?;

            if !seen.insert(provider.name.clone()) {
                return Err(ConfigError::invalid(
                    source,
                    format!("duplicate provider name '{}'", provider.name),
                ));
            }

            initial.push(seed_state(entry, &provider.name));
            providers.push(provider);
        }

        log::info!("Loaded {} providers from {}", providers.len(), source);
        Ok(Self { providers, initial })
    }

    /// Providers in registration order.
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Starting state for each provider, aligned with [`Self::providers`].
    pub fn initial_states(&self) -> impl Iterator<Item = (&ProviderConfig, &ProviderState)> {
        self.providers.iter().zip(self.initial.iter())
    }

    /// Whether any provider needs a browser session.
    pub fn needs_browser(&self) -> bool {
        self.providers
            .iter()
            .any(|p| p.kind() == StrategyKind::Browser)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Default missing `status` / `update_time` fields.
fn seed_state(entry: &ProviderEntry, name: &str) -> ProviderState {
    let status = match entry.status.as_deref() {
        None => Availability::default(),
        Some(raw) => Availability::parse(raw).unwrap_or_else(|| {
            log::warn!("Ignoring unknown status '{raw}' for {name}");
            Availability::default()
        }),
    };
    let last_update = entry.update_time.as_deref().and_then(parse_update_time);
    ProviderState::new(status, last_update)
}
