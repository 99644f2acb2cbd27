use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Business keys with a state transition in flight.
///
/// At most one mutation per alert at a time; different alerts may be acted on
/// concurrently.
pub struct ActionGuard {
    in_flight: BTreeSet<String>,
}

impl ActionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` busy. Returns `false` if it already was.
    pub fn try_begin(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    pub fn finish(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn busy_keys(&self) -> impl Iterator<Item = &str> {
        self.in_flight.iter().map(String::as_str)
    }
}
