use super::store::TokenStore;
use crate::config::Config;
use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Token endpoint success body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Token endpoint error body, RFC 6749 shape.
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[allow(dead_code)]
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Tagged result of a login attempt. Login never returns `Err` - every
/// outcome, including the network falling over, comes back as one of these so
/// the caller can render it.
#[derive(Debug)]
pub enum LoginOutcome {
    Success(TokenResponse),
    Failure { message: String },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success(_))
    }
}

/// Obtains tokens from keycloak and writes them through the token store.
pub struct Authenticator {
    client: Client,
    config: Config,
    store: Arc<dyn TokenStore>,
}

impl Authenticator {
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::new(),
            config,
            store,
        }
    }

    /// Resource-owner-password-credentials grant. Deprecated everywhere for
    /// good reasons, kept because it's the only way to log in without a
    /// browser round trip.
    pub async fn login_with_password(&self, username: &str, password: &str) -> LoginOutcome {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
        ];

        let endpoint = self.config.token_endpoint();
        tracing::debug!("Password grant for {} against {}", username, endpoint);

        let response = match self.client.post(&endpoint).form(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Token endpoint unreachable: {}", e);
                return LoginOutcome::Failure {
                    message: e.to_string(),
                };
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            // best effort: the provider usually sends {error, error_description}
            let message = response
                .json::<ProviderError>()
                .await
                .ok()
                .and_then(|e| e.error_description)
                .unwrap_or_else(|| "Login failed".to_string());
            tracing::warn!("Password grant rejected ({}): {}", status, message);
            return LoginOutcome::Failure { message };
        }

        let token: TokenResponse = match response.json().await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("Malformed token response: {}", e);
                return LoginOutcome::Failure {
                    message: e.to_string(),
                };
            }
        };

        if let Err(e) = self.store.save(
            &token.access_token,
            token.refresh_token.as_deref(),
            token.expires_in,
        ) {
            return LoginOutcome::Failure {
                message: format!("Failed to persist tokens: {e:#}"),
            };
        }

        tracing::info!("Logged in as {} via password grant", username);
        LoginOutcome::Success(token)
    }

    /// Entry point for the authorization-code flow: the URL to send a browser
    /// to. Fire-and-forget - the redirect target is expected to exchange the
    /// code, which is not this client's job.
    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.authorize_endpoint())?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryTokenStore;

    fn config() -> Config {
        Config {
            issuer_url: "http://idp.example:8082".to_string(),
            realm: "clinic".to_string(),
            client_id: "clinic-frontend".to_string(),
            client_secret: "shh".to_string(),
            gateway_url: "http://gw.example:8080".to_string(),
            redirect_uri: "http://gw.example:8080/login.html".to_string(),
            token_file: None,
        }
    }

    #[test]
    fn authorize_url_has_code_flow_params() {
        let auth = Authenticator::new(config(), Arc::new(MemoryTokenStore::new()));
        let url = auth.authorize_url().unwrap();

        assert!(url.as_str().starts_with(
            "http://idp.example:8082/realms/clinic/protocol/openid-connect/auth?"
        ));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "clinic-frontend".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://gw.example:8080/login.html".into()
        )));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("scope".into(), "openid".into())));
    }

    #[test]
    fn redirect_uri_is_percent_encoded() {
        let auth = Authenticator::new(config(), Arc::new(MemoryTokenStore::new()));
        let url = auth.authorize_url().unwrap();
        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2Fgw.example%3A8080%2Flogin.html")
        );
    }
}
