//! Per-session cancellation tokens.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// Session key for a chat of a flow.
pub fn session_key(flow_id: &str, chat_id: &str) -> String {
  format!("{}_chat_{}", flow_id, chat_id)
}

/// Registry of cancellation tokens for running sessions.
///
/// Shared between the runtime and whoever wants to stop a session (an HTTP
/// handler, a signal handler).
#[derive(Debug, Default)]
pub struct AbortRegistry {
  tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl AbortRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a token, replacing any previous token for the key.
  pub fn add(&self, key: impl Into<String>, token: CancellationToken) {
    let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    tokens.insert(key.into(), token);
  }

  pub fn get(&self, key: &str) -> Option<CancellationToken> {
    let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    tokens.get(key).cloned()
  }

  pub fn remove(&self, key: &str) {
    let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    tokens.remove(key);
  }

  /// Remove the key only while it still maps to `token`.
  ///
  /// A run that finishes after its session was re-registered must not drop
  /// the newer run's token.
  pub fn remove_token(&self, key: &str, token: &CancellationToken) {
    let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    if tokens.get(key) == Some(token) {
      tokens.remove(key);
    }
  }

  /// Cancel the session's token. No-op when the key is unknown.
  pub fn abort(&self, key: &str) {
    if let Some(token) = self.get(key) {
      token.cancel();
    }
  }

  /// Cancel every registered session.
  pub fn abort_all(&self) {
    let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    for token in tokens.values() {
      token.cancel();
    }
  }
}
