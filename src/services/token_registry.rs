use crate::domain::token::DeviceToken;
use crate::error::Result;
use opentelemetry::{global, metrics::UpDownCounter};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug)]
struct Metrics {
    registered: UpDownCounter<i64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("fanout-server");
        Self {
            registered: meter
                .i64_up_down_counter("push_registered_tokens")
                .with_description("Number of device tokens currently registered")
                .build(),
        }
    }

    fn shrink(&self, count: usize) {
        self.registered.add(-i64::try_from(count).unwrap_or(i64::MAX), &[]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// False when the token was already registered.
    pub newly_added: bool,
    pub total_count: usize,
}

/// In-memory set of device tokens eligible for broadcast.
///
/// Every operation takes the lock once, so each is atomic on its own. Sequences of operations
/// (such as snapshot then prune during a dispatch) are not.
#[derive(Debug)]
pub struct TokenRegistry {
    tokens: RwLock<HashSet<DeviceToken>>,
    metrics: Metrics,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: RwLock::new(HashSet::new()), metrics: Metrics::new() }
    }

    // The set stays consistent even if a holder panicked, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashSet<DeviceToken>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<DeviceToken>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a raw token string. Registering a known token is a no-op.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the token is missing or blank.
    pub fn register(&self, raw: Option<String>) -> Result<Registration> {
        let token = DeviceToken::parse(raw)?;
        Ok(self.insert(token))
    }

    /// Adds an already validated token.
    pub fn insert(&self, token: DeviceToken) -> Registration {
        let mut tokens = self.write();
        let newly_added = tokens.insert(token);
        let total_count = tokens.len();
        drop(tokens);

        if newly_added {
            self.metrics.registered.add(1, &[]);
        }
        Registration { newly_added, total_count }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Returns a copy of the registered tokens; later changes to the registry do not affect it.
    #[must_use]
    pub fn list(&self) -> Vec<DeviceToken> {
        self.read().iter().cloned().collect()
    }

    /// Empties the registry and returns how many tokens it held.
    pub fn clear(&self) -> usize {
        let previous = {
            let mut tokens = self.write();
            let previous = tokens.len();
            tokens.clear();
            previous
        };
        self.metrics.shrink(previous);
        previous
    }

    /// Removes every given token that is present. Absent tokens are ignored.
    pub fn remove<'a, I>(&self, tokens: I)
    where
        I: IntoIterator<Item = &'a DeviceToken>,
    {
        let removed = {
            let mut set = self.write();
            tokens.into_iter().filter(|t| set.remove(*t)).count()
        };
        if removed > 0 {
            self.metrics.shrink(removed);
            tracing::info!(count = removed, "Removed tokens from registry");
        }
    }
}
