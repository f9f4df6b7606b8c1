//! Core trait for the local cache.

/// A synchronous string key-value store with best-effort semantics.
///
/// Implementations swallow storage failures: `get` reports a miss and `set`
/// becomes a no-op. Callers never see an error.
pub trait LocalCache: Send + Sync {
  /// Read the value stored in `slot`, if any.
  fn get(&self, slot: &str) -> Option<String>;

  /// Replace the value stored in `slot`.
  fn set(&self, slot: &str, value: &str);
}
