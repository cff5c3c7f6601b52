//! JWT authentication middleware
//!
//! Every request passes through [`JwtAuth::middleware`], which never rejects
//! on its own. It resolves the credentials into an [`Authentication`] and
//! stores it in the request extensions; handlers decide what the route
//! requires through [`Authentication::authorize`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::Error;
use crate::handlers::AppError;
use crate::resources::User;
use crate::store::{Collection, Filter, FindQuery, StoreResult};

/// Cookie value set on logout; treated as no token at all
const LOGGED_OUT_TOKEN: &str = "loggedout";

/// User roles, in the form they appear in tokens and user documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Guide => "guide",
            Self::LeadGuide => "lead-guide",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "guide" => Ok(Self::Guide),
            "lead-guide" => Ok(Self::LeadGuide),
            "admin" => Ok(Self::Admin),
            other => Err(Error::Internal(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

/// Why presented credentials were not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Expired,
    Invalid,
    /// The token is valid but its user no longer exists or was deactivated
    UserGone,
}

impl RejectionReason {
    fn message(&self) -> &'static str {
        match self {
            Self::Expired => "Your token has expired. Please log in again!",
            Self::Invalid => "Invalid token. Please log in again",
            Self::UserGone => "The user belonging to this token does no longer exist.",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::UserGone => "user_gone",
        };
        f.write_str(name)
    }
}

/// Result of resolving a request's credentials
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Authentication {
    /// No credentials were presented
    #[default]
    Anonymous,
    Authenticated(Principal),
    Rejected(RejectionReason),
    /// The token verified but its user could not be looked up
    Unavailable,
}

/// What an operation requires of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    Authenticated,
    /// Authenticated with one of the listed roles
    Roles(&'static [Role]),
}

impl Authentication {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    /// Check this caller against an access policy.
    ///
    /// Public operations never fail, even with rejected credentials; they
    /// simply see no principal.
    pub fn authorize(&self, access: &Access) -> Result<Option<&Principal>, AppError> {
        if matches!(access, Access::Public) {
            return Ok(self.principal());
        }

        let principal = match self {
            Self::Authenticated(principal) => principal,
            Self::Anonymous => {
                return Err(AppError::unauthorized(
                    "You are not logged in! Please log in to get access.",
                ))
            }
            Self::Rejected(reason) => return Err(AppError::unauthorized(reason.message())),
            Self::Unavailable => {
                return Err(AppError::internal("token subject lookup failed"))
            }
        };

        if let Access::Roles(roles) = access {
            if !roles.contains(&principal.role) {
                return Err(AppError::forbidden(
                    "You do not have permission to perform this action",
                )
                .with_entity("User", principal.id.clone()));
            }
        }

        Ok(Some(principal))
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,

    /// Role at signing time; the user store wins when configured
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Source of truth for the users behind tokens
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// The active user with this id, if any
    async fn principal(&self, id: &str) -> StoreResult<Option<Principal>>;
}

#[async_trait]
impl<C> PrincipalStore for C
where
    C: Collection<User>,
{
    async fn principal(&self, id: &str) -> StoreResult<Option<Principal>> {
        let query = FindQuery::new(Filter::new().equals("id", id).equals("active", true)).limit(1);
        let users = self.find(&query).await?;

        Ok(users.into_iter().next().and_then(|user| {
            let role = user.get("role").and_then(|role| role.as_str())?.parse().ok()?;
            Some(Principal {
                id: id.to_string(),
                role,
            })
        }))
    }
}

/// JWT authentication middleware state
#[derive(Clone)]
pub struct JwtAuth {
    decoding_key: Arc<DecodingKey>,
    encoding_key: Arc<EncodingKey>,
    validation: Validation,
    expires_in_secs: i64,
    issuer: Option<String>,
    cookie_name: String,
    principals: Option<Arc<dyn PrincipalStore>>,
}

impl JwtAuth {
    /// Create HS256 keys from the configured secret
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        if config.secret.is_empty() {
            return Err(Error::Config(Box::new(figment::Error::from(
                "JWT secret is empty\n\n\
                Set `jwt.secret` in config.toml or the TOURS_JWT__SECRET environment variable"
                    .to_string(),
            ))));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            encoding_key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            validation,
            expires_in_secs: config.expires_in_secs,
            issuer: config.issuer.clone(),
            cookie_name: config.cookie_name.clone(),
            principals: None,
        })
    }

    /// Look up every token's user in this store
    #[must_use]
    pub fn with_principals(mut self, principals: Arc<dyn PrincipalStore>) -> Self {
        self.principals = Some(principals);
        self
    }

    /// Issue a token for a user
    pub fn sign(&self, sub: &str, role: Role) -> Result<String, Error> {
        let now = chrono::Utc::now().timestamp();
        self.sign_claims(&Claims {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now + self.expires_in_secs,
            iss: self.issuer.clone(),
        })
    }

    pub fn sign_claims(&self, claims: &Claims) -> Result<String, Error> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Bearer token first, then the session cookie
    fn extract_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        let cookie = || {
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == self.cookie_name)
                .map(|(_, token)| token)
        };

        bearer
            .or_else(cookie)
            .filter(|token| !token.is_empty() && *token != LOGGED_OUT_TOKEN)
    }

    /// Resolve the request's credentials
    pub async fn authenticate(&self, headers: &HeaderMap) -> Authentication {
        let Some(token) = self.extract_token(headers) else {
            return Authentication::Anonymous;
        };

        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => RejectionReason::Expired,
                    _ => RejectionReason::Invalid,
                };
                return Authentication::Rejected(reason);
            }
        };

        let Some(principals) = &self.principals else {
            return Authentication::Authenticated(Principal {
                id: claims.sub,
                role: claims.role,
            });
        };

        match principals.principal(&claims.sub).await {
            Ok(Some(principal)) => Authentication::Authenticated(principal),
            Ok(None) => Authentication::Rejected(RejectionReason::UserGone),
            Err(err) => {
                tracing::error!(error = %err, subject = %claims.sub, "Failed to look up token subject");
                Authentication::Unavailable
            }
        }
    }

    /// Middleware function to resolve credentials and inject the result
    pub async fn middleware(
        State(auth): State<Self>,
        mut request: Request<Body>,
        next: Next,
    ) -> Response {
        let authentication = auth.authenticate(request.headers()).await;

        match &authentication {
            Authentication::Rejected(reason) => {
                tracing::warn!(
                    reason = %reason,
                    path = %request.uri().path(),
                    "Rejected request credentials"
                );
            }
            Authentication::Authenticated(principal) => {
                tracing::debug!(subject = %principal.id, role = %principal.role, "Authenticated request");
            }
            Authentication::Anonymous | Authentication::Unavailable => {}
        }

        request.extensions_mut().insert(authentication);
        next.run(request).await
    }
}
