use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{validate_key, ObjectStore, ObjectStoreError};

/// Bucket folder that holds document blobs.
const OBJECT_PREFIX: &str = "documents";

/// Refresh the access token this long before Google says it expires.
const TOKEN_SLACK_SECS: i64 = 60;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Google Cloud Storage backend. Documents live at `documents/<id>` in the bucket.
pub struct GcsStore {
    bucket: String,
    client: Client,
    token: RwLock<AccessToken>,
    credentials_file: Option<String>,
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(TOKEN_SLACK_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl GcsStore {
    pub async fn new(bucket: &str, credentials_file: Option<&str>) -> Result<Self, anyhow::Error> {
        let store = Self {
            bucket: bucket.to_string(),
            client: Client::builder().build()?,
            token: RwLock::new(AccessToken {
                value: String::new(),
                expires_at: DateTime::<Utc>::MIN_UTC,
            }),
            credentials_file: credentials_file.map(|s| s.to_string()),
        };

        // Fail at startup rather than on the first upload
        store.bearer().await?;
        Ok(store)
    }

    /// A valid access token, fetching a new one when the cached token is
    /// about to expire.
    async fn bearer(&self) -> Result<String, anyhow::Error> {
        {
            let token = self.token.read().await;
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut token = self.token.write().await;
        if !token.is_fresh() {
            let fetched = match self.credentials_file {
                Some(ref path) => self.token_from_service_account(path).await?,
                None => self.token_from_metadata_server().await?,
            };
            tracing::debug!(expires_in = fetched.expires_in, "Refreshed GCS access token");
            *token = AccessToken {
                value: fetched.access_token,
                expires_at: Utc::now() + Duration::seconds(fetched.expires_in),
            };
        }
        Ok(token.value.clone())
    }

    async fn token_from_service_account(&self, path: &str) -> Result<TokenResponse, anyhow::Error> {
        let key: ServiceAccountKey = serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;

        let now = Utc::now().timestamp();
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/devstorage.read_write",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        }))?);

        let unsigned = format!("{header}.{claims}");
        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let assertion = format!("{unsigned}.{}", URL_SAFE_NO_PAD.encode(signature));

        Ok(self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn token_from_metadata_server(&self) -> Result<TokenResponse, anyhow::Error> {
        Ok(self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Object path segment for a document id (`documents%2F<id>`).
    fn object_name(key: &str) -> String {
        format!("{OBJECT_PREFIX}%2F{key}")
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket,
            Self::object_name(key)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            Self::object_name(key)
        )
    }

    async fn authorized(&self) -> Result<String, ObjectStoreError> {
        self.bearer()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("GCS authentication failed: {e}")))
    }
}

/// Turn a non-success response into a backend error.
async fn check(resp: Response, action: &str) -> Result<Response, ObjectStoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ObjectStoreError::Backend(format!(
        "GCS {action} failed ({status}): {body}"
    )))
}

fn transport(e: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError::Backend(e.to_string())
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.authorized().await?;

        let resp = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(transport)?;

        check(resp, "upload").await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        validate_key(key)?;
        let token = self.authorized().await?;

        let resp = self
            .client
            .get(format!("{}?alt=media", self.object_url(key)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        check(resp, "download").await?.bytes().await.map_err(transport)
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let token = self.authorized().await?;

        let resp = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        // Already gone
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp, "delete").await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        validate_key(key)?;
        let token = self.authorized().await?;

        let resp = self
            .client
            .get(self.object_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        Ok(resp.status().is_success())
    }
}

/// RS256 signature over `data` with a PEM-encoded PKCS#8 RSA key.
fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    let der = STANDARD.decode(der_b64)?;

    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}
