use std::path::PathBuf;

/// Everything the client needs to know about the outside world, built once at
/// startup and passed by reference. No process-wide globals.
///
/// The client secret is supplied by the operator (flag or env var) rather than
/// baked into the binary. A secret embedded in a distributed client is not a
/// secret, but keycloak's password grant on a confidential client wants one.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Keycloak base URL
    #[arg(long, env = "CLINIC_ISSUER_URL", default_value = "http://localhost:8082")]
    pub issuer_url: String,

    /// Keycloak realm
    #[arg(long, env = "CLINIC_REALM", default_value = "clinic")]
    pub realm: String,

    /// OIDC client id
    #[arg(long, env = "CLINIC_CLIENT_ID", default_value = "clinic-frontend")]
    pub client_id: String,

    /// OIDC client secret
    #[arg(long, env = "CLINIC_CLIENT_SECRET", hide_env_values = true, default_value = "")]
    pub client_secret: String,

    /// API gateway base URL
    #[arg(long, env = "CLINIC_GATEWAY_URL", default_value = "http://localhost:8080")]
    pub gateway_url: String,

    /// Redirect URI for the authorization-code flow
    #[arg(
        long,
        env = "CLINIC_REDIRECT_URI",
        default_value = "http://localhost:8080/login.html"
    )]
    pub redirect_uri: String,

    /// Where to keep tokens (defaults to ~/.clinic-admin/tokens.json)
    #[arg(long, env = "CLINIC_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,
}

impl Config {
    fn issuer(&self) -> &str {
        self.issuer_url.trim_end_matches('/')
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.issuer(),
            self.realm
        )
    }

    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/auth",
            self.issuer(),
            self.realm
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            issuer_url: "http://idp.example:8082/".to_string(),
            realm: "clinic".to_string(),
            client_id: "clinic-frontend".to_string(),
            client_secret: "shh".to_string(),
            gateway_url: "http://gw.example:8080".to_string(),
            redirect_uri: "http://gw.example:8080/login.html".to_string(),
            token_file: None,
        }
    }

    #[test]
    fn endpoints_trim_trailing_slash() {
        let c = config();
        assert_eq!(
            c.token_endpoint(),
            "http://idp.example:8082/realms/clinic/protocol/openid-connect/token"
        );
        assert_eq!(
            c.authorize_endpoint(),
            "http://idp.example:8082/realms/clinic/protocol/openid-connect/auth"
        );
    }
}
