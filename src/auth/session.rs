use super::store::TokenStore;
use anyhow::Result;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use std::sync::Arc;

/// What the UI layer shows for the current auth state.
#[derive(Debug)]
pub enum SessionStatus {
    Authenticated {
        /// Decoded JWT payload, for display only. `None` when the token isn't
        /// a decodable JWT - still authenticated as far as we know, the
        /// gateway is the one that actually judges the token.
        claims: Option<serde_json::Value>,
        /// Stored absolute expiry, ms since epoch
        expiry_ms: Option<u64>,
    },
    Anonymous,
}

/// Read-only view over the token store. Its single write path is logout,
/// which just delegates to the store's clear.
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn status(&self) -> SessionStatus {
        match self.store.access_token() {
            Some(token) => SessionStatus::Authenticated {
                claims: decode_claims(&token),
                expiry_ms: self.store.expiry_ms(),
            },
            None => SessionStatus::Anonymous,
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        tracing::info!("Logged out, token store cleared");
        Ok(())
    }
}

/// Display-only decode of a JWT's payload segment: split on '.', base64url
/// decode the middle part, parse as JSON. No signature verification - these
/// claims are never trusted for authorization decisions.
pub fn decode_claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
