//! OAuth authentication for the Gmail API
//!
//! Handles OAuth 2.0 bootstrap:
//! - Loading client credentials from the keys file
//! - Generating the authorization URL
//! - Interactive browser-based authentication and code exchange
//! - Token storage
//!
//! Token refresh is not implemented; the stored access token is used as-is
//! and a missing token file is a descriptive error.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    pub auth_uri: String,

    /// Token URI
    pub token_uri: String,

    /// Redirect URIs
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// OAuth keys file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Stored token pair, previously obtained via the authorization flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

/// OAuth authenticator
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    /// Current token, if one has been stored
    token: Arc<RwLock<Option<StoredToken>>>,
}

impl Authenticator {
    /// Create a new authenticator
    pub async fn new(config: Config) -> Result<Self> {
        // Try to find and copy OAuth keys from current directory
        config.find_and_copy_oauth_keys()?;

        let keys = Self::load_oauth_keys(&config.oauth_path)?;

        let http_client = reqwest::Client::new();

        let auth = Self {
            config,
            http_client,
            keys,
            token: Arc::new(RwLock::new(None)),
        };

        // Try to load an existing token
        if auth.config.token_exists() {
            if let Ok(token) = auth.load_token().await {
                *auth.token.write().await = Some(token);
            }
        }

        Ok(auth)
    }

    /// Load OAuth keys from file
    fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
        if !path.exists() {
            return Err(GmailMcpError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

        keys_file
            .installed
            .ok_or(GmailMcpError::Auth(AuthError::InvalidKeysFormat))
    }

    /// Load the stored token from file
    async fn load_token(&self) -> Result<StoredToken> {
        let content = tokio::fs::read_to_string(&self.config.token_path).await?;
        let token: StoredToken = serde_json::from_str(&content)?;
        Ok(token)
    }

    /// Save a token to file
    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.config.token_path, content).await?;
        Ok(())
    }

    /// Check if a token has been loaded
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Get the stored access token
    ///
    /// Fails with a descriptive error when no token has been stored yet.
    pub async fn get_access_token(&self) -> Result<String> {
        let token = self.token.read().await;

        match *token {
            Some(ref token) => Ok(token.access_token.clone()),
            None => Err(GmailMcpError::Auth(AuthError::TokenNotFound {
                path: self.config.token_path.display().to_string(),
            })),
        }
    }

    /// Generate the authorization URL
    pub fn generate_auth_url(&self) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(&self.config.oauth_callback_url),
            urlencoding::encode(&scopes)
        )
    }

    /// Path to the OAuth keys file
    pub fn keys_path(&self) -> &Path {
        &self.config.oauth_path
    }

    /// Path to the stored token file
    pub fn token_path(&self) -> &Path {
        &self.config.token_path
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.oauth_callback_url.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let token = StoredToken {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| now + e),
            scope: token_response.scope,
        };

        self.save_token(&token).await?;
        *self.token.write().await = Some(token.clone());

        Ok(token)
    }

    /// Run interactive authentication flow with local HTTP server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let auth_url = self.generate_auth_url();
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        // Try to open in browser
        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        // Create channel for receiving the auth code
        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let tx_clone = tx.clone();
        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            if let Some(code) = params.get("code") {
                if let Some(tx) = tx_clone.lock().unwrap().take() {
                    let _ = tx.send(code.clone());
                }
                Html("<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>")
            } else {
                Html("<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>")
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for authentication callback on port {}...",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(GmailMcpError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            code = rx => {
                match code {
                    Ok(code) => {
                        eprintln!("Received authorization code, exchanging for tokens...");
                        self.exchange_code(&code).await?;
                        eprintln!("Authentication completed successfully!");
                    }
                    Err(_) => {
                        return Err(GmailMcpError::Auth(AuthError::NoAuthCode));
                    }
                }
            }
        }

        Ok(())
    }
}
