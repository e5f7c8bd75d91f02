//! Provider definitions.
//!
//! Input entries arrive as loosely shaped JSON objects. [`ProviderEntry`]
//! mirrors that shape; [`ProviderConfig::from_entry`] resolves it into a
//! tagged [`Strategy`] once, at load time, so nothing downstream has to guess
//! which fields are meaningful.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Discriminant of the query mechanism a provider uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// HTTP GET + phrase search
    PhraseMatch,
    /// CVS vaccine-status JSON (state + city)
    Cvs,
    /// HEB vaccine-locations JSON (city)
    Heb,
    /// Scripted browser navigation
    Browser,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhraseMatch => "phrase_match",
            Self::Cvs => "cvs",
            Self::Heb => "heb",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy-specific parameters, validated.
///
/// Serialized with a `kind` tag so that `status.json` can be fed back in as
/// provider input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    PhraseMatch {
        #[serde(rename = "website")]
        url: String,
        pos_phrase: String,
        neg_phrase: String,
    },
    Cvs {
        state: String,
        city: String,
    },
    Heb {
        city: String,
    },
    Browser {
        query: String,
    },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::PhraseMatch { .. } => StrategyKind::PhraseMatch,
            Self::Cvs { .. } => StrategyKind::Cvs,
            Self::Heb { .. } => StrategyKind::Heb,
            Self::Browser { .. } => StrategyKind::Browser,
        }
    }

    /// Short human description of what is being queried.
    pub fn target(&self) -> String {
        match self {
            Self::PhraseMatch { url, .. } => url.clone(),
            Self::Cvs { state, city } => format!("CVS {city}, {state}"),
            Self::Heb { city } => format!("HEB {city}"),
            Self::Browser { query } => format!("browser search '{query}'"),
        }
    }
}

/// One entry of `websites.json`, as written by hand.
///
/// Every field is optional here; [`ProviderConfig::from_entry`] decides
/// which ones are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit strategy; inferred from the other fields when absent
    #[serde(default)]
    pub kind: Option<StrategyKind>,

    #[serde(default, alias = "url")]
    pub website: Option<String>,
    #[serde(default)]
    pub pos_phrase: Option<String>,
    #[serde(default)]
    pub neg_phrase: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub query: Option<String>,

    /// Previously recorded status (e.g. when re-using a `status.json`)
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl ProviderEntry {
    fn has_phrase_fields(&self) -> bool {
        self.website.is_some() || self.pos_phrase.is_some() || self.neg_phrase.is_some()
    }

    fn has_query_fields(&self) -> bool {
        self.query.is_some()
    }

    fn has_location_fields(&self) -> bool {
        self.state.is_some() || self.city.is_some()
    }

    /// Infer the strategy from which fields are present.
    fn infer_kind(&self) -> std::result::Result<StrategyKind, String> {
        let families = [
            self.has_phrase_fields(),
            self.has_location_fields(),
            self.has_query_fields(),
        ];
        match families.iter().filter(|present| **present).count() {
            0 => Err("no strategy fields (website/pos_phrase/neg_phrase, state/city, or query)".into()),
            1 if self.has_phrase_fields() => Ok(StrategyKind::PhraseMatch),
            1 if self.has_query_fields() => Ok(StrategyKind::Browser),
            1 if self.state.is_some() => Ok(StrategyKind::Cvs),
            1 => Ok(StrategyKind::Heb),
            _ => Err("fields of more than one strategy are present".into()),
        }
    }
}

/// Immutable, validated provider definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub name: String,
    pub strategy: Strategy,
}

impl ProviderConfig {
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Validate an input entry. The error is a human-readable reason.
    pub fn from_entry(entry: &ProviderEntry) -> std::result::Result<Self, String> {
        let name = entry
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or("missing 'name'")?
            .to_string();

        let kind = match entry.kind {
            Some(kind) => kind,
            None => entry.infer_kind().map_err(|e| format!("'{name}': {e}"))?,
        };

        let required = |field: &Option<String>, label: &str| -> std::result::Result<String, String> {
            field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("'{name}': {kind} provider requires '{label}'"))
        };

        let strategy = match kind {
            StrategyKind::PhraseMatch => {
                let url = required(&entry.website, "website")?;
                Url::parse(&url).map_err(|e| format!("'{name}': bad website '{url}': {e}"))?;
                Strategy::PhraseMatch {
                    url,
                    pos_phrase: entry.pos_phrase.clone().unwrap_or_default(),
                    // Phrases are matched verbatim, surrounding spaces included.
                    neg_phrase: entry
                        .neg_phrase
                        .clone()
                        .filter(|p| !p.trim().is_empty())
                        .ok_or_else(|| format!("'{name}': {kind} provider requires 'neg_phrase'"))?,
                }
            }
            StrategyKind::Cvs => Strategy::Cvs {
                state: required(&entry.state, "state")?.to_ascii_uppercase(),
                city: required(&entry.city, "city")?,
            },
            StrategyKind::Heb => Strategy::Heb {
                city: required(&entry.city, "city")?,
            },
            StrategyKind::Browser => Strategy::Browser {
                query: required(&entry.query, "query")?,
            },
        };

        Ok(Self { name, strategy })
    }
}
