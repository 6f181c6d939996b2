use crate::auth::TokenStore;
use crate::error::GatewayError;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, header};
use serde::Serialize;
use std::sync::Arc;
use urlencoding::encode as urlencode;

/// Per-call configuration, merged with the fixed header set before dispatch.
/// Caller headers win over the fixed ones on a name collision.
pub struct RequestOptions {
    pub method: Method,
    pub body: Body,
    pub headers: header::HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: Body::None,
            headers: header::HeaderMap::new(),
        }
    }
}

pub enum Body {
    None,
    Json(serde_json::Value),
    /// Multipart form data. reqwest sets the content-type with its boundary
    /// itself, so we must not.
    Multipart(Form),
}

/// What a 2xx response decodes to, picked purely off the declared
/// content-type. The server's word is trusted; no sniffing.
#[derive(Debug)]
pub enum Payload {
    Json(serde_json::Value),
    Binary {
        content_type: String,
        bytes: Vec<u8>,
    },
    Text(String),
}

impl Payload {
    /// Convenience for call sites that know the endpoint speaks JSON.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Bearer-authenticated client for the API gateway.
///
/// Reads the token store on every call and refuses to dispatch without a
/// token. No retries, no backoff: each call is at-most-once, a failure
/// belongs to the user action that triggered it.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl GatewayClient {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            // no cookie store configured, so credentials are never attached;
            // auth rides exclusively on the bearer header
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, GatewayError> {
        // fail fast before any network I/O
        let Some(token) = self.store.access_token() else {
            return Err(GatewayError::NotAuthenticated);
        };

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", options.method, url);

        let mut request = self
            .client
            .request(options.method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::ACCEPT, "application/json")
            .header(header::CACHE_CONTROL, "no-cache");

        if !options.headers.is_empty() {
            // HeaderMap::extend replaces same-named entries, so per-call
            // headers override the fixed set
            request = request.headers(options.headers);
        }

        request = match options.body {
            Body::None => request,
            // .json() sets Content-Type: application/json
            Body::Json(value) => request.json(&value),
            Body::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // best-effort diagnostic read; an empty body still leaves the
            // status in the message
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Gateway returned {} for {}", status, url);
            return Err(GatewayError::Http { status, body });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.contains("application/json") {
            Ok(Payload::Json(response.json().await?))
        } else if content_type.contains("image/") {
            Ok(Payload::Binary {
                bytes: response.bytes().await?.to_vec(),
                content_type,
            })
        } else {
            Ok(Payload::Text(response.text().await?))
        }
    }

    async fn get(&self, path: &str) -> Result<Payload, GatewayError> {
        self.request(path, RequestOptions::default()).await
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Payload, GatewayError> {
        let value = serde_json::to_value(body)?;
        self.request(
            path,
            RequestOptions {
                method: Method::POST,
                body: Body::Json(value),
                ..Default::default()
            },
        )
        .await
    }

    // ----- users -----

    pub async fn list_users(&self) -> Result<Payload, GatewayError> {
        self.get("/api/users").await
    }

    /// GET /api/users/me - also creates the user record on first contact, so
    /// page flows call it before listing anything.
    pub async fn current_user(&self) -> Result<Payload, GatewayError> {
        self.get("/api/users/me").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<Payload, GatewayError> {
        self.post_json("/api/users", user).await
    }

    // ----- appointments -----

    pub async fn list_appointments(&self) -> Result<Payload, GatewayError> {
        self.get("/api/appointments").await
    }

    pub async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Payload, GatewayError> {
        self.post_json("/api/appointments", appointment).await
    }

    // ----- images -----

    pub async fn list_images(&self) -> Result<Payload, GatewayError> {
        self.get("/api/images").await
    }

    pub async fn fetch_image(&self, id: &str) -> Result<Payload, GatewayError> {
        self.get(&format!("/api/images/{}", urlencode(id))).await
    }

    pub async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Payload, GatewayError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);
        self.request(
            "/api/images/upload",
            RequestOptions {
                method: Method::POST,
                body: Body::Multipart(form),
                ..Default::default()
            },
        )
        .await
    }

    // ----- health -----

    /// Unauthenticated probe of the gateway's actuator endpoint. The one call
    /// that intentionally skips the token precondition.
    pub async fn health(&self) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/actuator/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http { status, body });
        }

        Ok(response.json().await?)
    }
}

/// Body for POST /api/users.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Body for POST /api/appointments. Field names follow the gateway's
/// camelCase contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub appointment_date: String,
    pub description: String,
}
