// src/pipeline/transition.rs

//! Transition detection.
//!
//! A provider's state only moves when a freshly classified status differs
//! from the stored one. Each genuine change produces exactly one
//! notification; repeats of the same status are silent.

use chrono::{DateTime, Local};

use crate::models::{Availability, ProviderConfig, ProviderState};
use crate::notify::Notifier;
use crate::storage::StatusStore;

/// What happened to a provider's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Unchanged,
    Changed { from: Availability, to: Availability },
}

impl TransitionOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Compare and update state in place, without side effects.
pub fn detect(
    state: &mut ProviderState,
    new_status: Availability,
    now: DateTime<Local>,
) -> TransitionOutcome {
    if state.status == new_status {
        return TransitionOutcome::Unchanged;
    }
    let from = state.status;
    state.status = new_status;
    state.last_update = Some(now);
    TransitionOutcome::Changed {
        from,
        to: new_status,
    }
}

/// Message sent to the operator for a change.
pub fn change_message(provider: &str, to: Availability) -> String {
    format!("{provider} changed to {to}")
}

/// Update state and, on a change, notify and archive the evidence.
///
/// Notification and evidence failures are logged; they never undo the
/// state update.
pub async fn apply(
    state: &mut ProviderState,
    provider: &ProviderConfig,
    new_status: Availability,
    evidence: Option<&str>,
    now: DateTime<Local>,
    notifier: &dyn Notifier,
    store: &dyn StatusStore,
) -> TransitionOutcome {
    let outcome = detect(state, new_status, now);
    let TransitionOutcome::Changed { from, to } = outcome else {
        return outcome;
    };

    log::info!("{}: {} -> {}", provider.name, from, to);
    let message = change_message(&provider.name, to);
    if let Err(e) = notifier.notify(&message).await {
        log::error!("Failed to send notification '{message}': {e}");
    }

    if let Some(text) = evidence {
        match store.save_evidence(&provider.name, text, now).await {
            Ok(Some(path)) => {
                log::info!("Saved evidence for {} to {}", provider.name, path.display())
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to save evidence for {}: {}", provider.name, e),
        }
    }

    outcome
}
