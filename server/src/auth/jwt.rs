use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use http::request::Parts;
use jsonwebtoken::{
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::AppError, server_config::AuthConfig, HttpClient};

const JWKS_TTL: Duration = Duration::from_secs(60 * 60);
const FIREBASE_ISSUER: &str = "https://securetoken.google.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken,
    TokenCreation,
    KeysUnavailable,
    Misconfigured(String),
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

enum KeySource {
    Shared {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Firebase {
        project_id: String,
        jwks_url: String,
        http_client: HttpClient,
        cache: RwLock<Option<CachedKeys>>,
    },
}

/// Verifies bearer tokens either against Firebase's published signing keys
/// or against a shared HS256 secret.
pub struct TokenVerifier {
    source: KeySource,
}

impl TokenVerifier {
    pub fn from_config(auth: &AuthConfig, http_client: HttpClient) -> Result<Self, AuthError> {
        match (&auth.jwt_secret, &auth.project_id) {
            (Some(secret), _) => Self::with_secret(secret),
            (None, Some(project_id)) => Ok(Self {
                source: KeySource::Firebase {
                    project_id: project_id.clone(),
                    jwks_url: auth.jwks_url.clone(),
                    http_client,
                    cache: RwLock::new(None),
                },
            }),
            (None, None) => Err(AuthError::Misconfigured(
                "No token verification keys configured".to_string(),
            )),
        }
    }

    pub fn with_secret(hex_secret: &str) -> Result<Self, AuthError> {
        let secret = hex::decode(hex_secret.trim())
            .map_err(|_| AuthError::Misconfigured("JWT_SECRET was not valid hex".to_string()))?;
        Ok(Self {
            source: KeySource::Shared {
                encoding: EncodingKey::from_secret(&secret),
                decoding: DecodingKey::from_secret(&secret),
            },
        })
    }

    pub fn mode(&self) -> &'static str {
        match self.source {
            KeySource::Shared { .. } => "shared-secret",
            KeySource::Firebase { .. } => "firebase",
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        match &self.source {
            KeySource::Shared { decoding, .. } => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;

                jsonwebtoken::decode::<Claims>(token, decoding, &validation)
                    .map(|data| data.claims)
                    .map_err(|e| {
                        tracing::warn!("Error decoding token: {:?}", e);
                        AuthError::InvalidToken
                    })
            }
            KeySource::Firebase { project_id, .. } => {
                let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::InvalidToken)?;
                let kid = header.kid.ok_or(AuthError::InvalidToken)?;
                let jwk = self.signing_key(&kid).await?;
                let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
                    tracing::error!("Unusable signing key {}: {:?}", kid, e);
                    AuthError::InvalidToken
                })?;

                let mut validation = Validation::new(Algorithm::RS256);
                validation.set_audience(&[project_id]);
                validation.set_issuer(&[format!("{FIREBASE_ISSUER}/{project_id}")]);

                jsonwebtoken::decode::<Claims>(token, &key, &validation)
                    .map(|data| data.claims)
                    .map_err(|e| {
                        tracing::warn!("Error decoding token: {:?}", e);
                        AuthError::InvalidToken
                    })
            }
        }
    }

    /// Looks up `kid` in the cached key set, refetching when the cache is
    /// stale or does not know the key.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let KeySource::Firebase {
            jwks_url,
            http_client,
            cache,
            ..
        } = &self.source
        else {
            return Err(AuthError::KeysUnavailable);
        };

        {
            let cached = cache.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        tracing::info!("Refreshing token signing keys");
        let keys = http_client
            .get(jwks_url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::error!("Could not fetch signing keys: {:?}", e);
                AuthError::KeysUnavailable
            })?
            .json::<JwkSet>()
            .await
            .map_err(|e| {
                tracing::error!("Could not parse signing keys: {:?}", e);
                AuthError::KeysUnavailable
            })?;

        let jwk = keys.find(kid).cloned();
        *cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        jwk.ok_or(AuthError::InvalidToken)
    }

    /// Signs a token with the shared secret. Only available in shared-secret mode.
    pub fn issue(&self, sub: &str, email: Option<&str>, ttl_secs: usize) -> Result<String, AuthError> {
        let KeySource::Shared { encoding, .. } = &self.source else {
            return Err(AuthError::TokenCreation);
        };
        let claims = Claims {
            sub: sub.to_string(),
            email: email.map(|e| e.to_string()),
            exp: chrono::Utc::now().timestamp() as usize + ttl_secs,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, encoding)
            .map_err(|_| AuthError::TokenCreation)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingCredentials)?;

        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let claims = verifier.verify(bearer.token()).await?;

        Ok(claims)
    }
}
