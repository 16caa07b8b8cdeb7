//! Tri-state tracking for async data sources
//!
//! Every fetched view is one of: never requested (Idle), in flight
//! (Loading), available (Ready), or failed (Failed). Consumers pattern
//! match instead of juggling boolean flags, so "idle" is never conflated
//! with "loaded but empty".
//!
//! `KeyedSlot` pairs a `Remote` with the input key captured at dispatch
//! time. A completion is applied only while the captured key still matches
//! the slot's current key; late results for a superseded key are discarded.

use crate::errors::StakingError;
use tracing::trace;

// ============================================
// REMOTE TRI-STATE
// ============================================

/// Observable state of one async data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Remote<T> {
    /// Never requested (gating predicate not satisfied yet).
    #[default]
    Idle,
    /// Request in flight.
    Loading,
    /// Last fetch succeeded.
    Ready(T),
    /// Last fetch failed.
    Failed(StakingError),
}

impl<T> Remote<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Remote::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Remote::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Remote::Ready(_))
    }

    /// The value, if available.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Remote::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// The error, if the last fetch failed.
    pub fn error(&self) -> Option<&StakingError> {
        match self {
            Remote::Failed(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================
// KEYED SLOT
// ============================================

/// A `Remote` value tagged with the input key that produced it.
///
/// The key is captured at dispatch (`begin`) and checked at completion
/// (`complete`). Changing the key mid-flight (pool address switch,
/// upstream snapshot replaced) makes the pending completion a no-op.
#[derive(Debug, Clone)]
pub struct KeyedSlot<K, T> {
    key: Option<K>,
    state: Remote<T>,
    last_good: Option<T>,
}

impl<K, T> Default for KeyedSlot<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            state: Remote::Idle,
            last_good: None,
        }
    }
}

impl<K: PartialEq + Clone, T: Clone> KeyedSlot<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Remote<T> {
        &self.state
    }

    /// Last successful snapshot, surviving later failures.
    pub fn last_good(&self) -> Option<&T> {
        self.last_good.as_ref()
    }

    /// True when a fetch for `key` should be issued: the slot has never
    /// seen this key, or the previous attempt for it failed.
    pub fn needs_fetch(&self, key: &K) -> bool {
        if self.key.as_ref() != Some(key) {
            return true;
        }
        matches!(self.state, Remote::Idle | Remote::Failed(_))
    }

    /// Capture `key` and mark the slot in flight.
    pub fn begin(&mut self, key: K) {
        self.key = Some(key);
        self.state = Remote::Loading;
    }

    /// Apply a completion. Returns false (and leaves the slot untouched)
    /// when `key` no longer matches the slot's current key.
    pub fn complete(&mut self, key: &K, result: Result<T, StakingError>) -> bool {
        if self.key.as_ref() != Some(key) {
            trace!("discarding stale completion for superseded key");
            return false;
        }
        match result {
            Ok(value) => {
                self.last_good = Some(value.clone());
                self.state = Remote::Ready(value);
            }
            Err(err) => {
                self.state = Remote::Failed(err);
            }
        }
        true
    }

    /// Force a refetch on the next pass while keeping the last-good value.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.state = Remote::Idle;
    }

    /// Drop everything, including the last-good snapshot. Used when the
    /// key space itself changes (e.g. the session pool address).
    pub fn reset(&mut self) {
        self.key = None;
        self.state = Remote::Idle;
        self.last_good = None;
    }

    /// Current value, falling back to the last-good snapshot after a
    /// failure. None while idle/loading with no history.
    pub fn current(&self) -> Option<&T> {
        self.state.ready().or(self.last_good.as_ref())
    }
}

// ============================================
// TESTS
// ============================================
