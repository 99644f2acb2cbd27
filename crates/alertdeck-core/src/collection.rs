use std::collections::BTreeMap;

use alertdeck_api::Alert;

/// Upper bound on the number of alerts kept in a collection.
pub const MAX_ALERTS: usize = 100;

/// Merges `incoming` into `current` and returns the next collection.
///
/// For an `id` present on both sides the incoming version is kept verbatim;
/// within `incoming` the last entry for an `id` wins. The result is ordered by
/// `id` descending and truncated to [`MAX_ALERTS`]. Snapshot and delta frames go
/// through the same path: any batch carrying an `id` is assumed to hold that
/// alert's newest known state.
pub fn reconcile(current: &[Alert], incoming: Vec<Alert>) -> Vec<Alert> {
    if incoming.is_empty() && current.len() <= MAX_ALERTS {
        return current.to_vec();
    }

    let mut by_id = BTreeMap::new();
    for alert in incoming {
        by_id.insert(alert.id, alert);
    }
    for alert in current {
        by_id.entry(alert.id).or_insert_with(|| alert.clone());
    }

    by_id.into_values().rev().take(MAX_ALERTS).collect()
}

/// Replaces the entry matching `updated.id` in place.
///
/// Membership and order never change: a result for an alert that is not in
/// `current` is dropped.
pub fn apply_local_result(current: &[Alert], updated: Alert) -> Vec<Alert> {
    current
        .iter()
        .map(|alert| {
            if alert.id == updated.id {
                updated.clone()
            } else {
                alert.clone()
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Display-ready alert working set, newest first.
pub struct AlertCollection {
    alerts: Vec<Alert>,
}

impl AlertCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from an unordered batch such as the bootstrap page.
    pub fn seeded(items: Vec<Alert>) -> Self {
        let mut collection = Self::new();
        collection.reconcile(items);
        collection
    }

    pub fn reconcile(&mut self, incoming: Vec<Alert>) {
        if incoming.is_empty() {
            return;
        }
        let incoming_len = incoming.len();
        self.alerts = reconcile(&self.alerts, incoming);
        tracing::debug!(
            incoming = incoming_len,
            retained = self.alerts.len(),
            "reconciled alert batch"
        );
    }

    /// Returns `true` when an entry with the same `id` was replaced.
    pub fn apply_local_result(&mut self, updated: Alert) -> bool {
        match self.alerts.iter_mut().find(|alert| alert.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => {
                tracing::debug!(id = updated.id, "dropping result for undisplayed alert");
                false
            }
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn get(&self, id: u64) -> Option<&Alert> {
        self.alerts.iter().find(|alert| alert.id == id)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Generation timestamp of the newest alert.
    pub fn latest_timestamp(&self) -> Option<&str> {
        self.alerts.first().map(|alert| alert.timestamp.as_str())
    }
}
