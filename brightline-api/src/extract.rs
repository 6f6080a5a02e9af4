/// Request extractors
///
/// - [`ValidatedJson`]: JSON body that is deserialized and validated before the
///   handler runs
/// - [`JsonBody`]: JSON body with body errors reported in the API error format
/// - [`QueryParams`]: query string with errors reported in the API error format
/// - [`ClientIp`]: caller address for audit
/// - [`Includes`]: parsed `include` query parameter
///
/// Body errors (malformed JSON, wrong types, missing content type) become a
/// 422 with a single `body` field error, and unparseable query strings a 422
/// on `query`, so clients see one shape for every rejected input.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use brightline_shared::{security::client_ip::resolve_client_ip, validation::FieldErrors};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use validator::Validate;

/// Request schemas checked by [`ValidatedJson`]
///
/// Implemented for every `validator::Validate` type; partial-update schemas
/// that validate by hand implement it directly.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), FieldErrors>;
}

impl<T: Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// JSON body that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + ValidateRequest,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate_request()?;
        Ok(Self(value))
    }
}

/// JSON body without validation
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::field("body", rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string parameters
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::field("query", rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Caller address: `X-Forwarded-For`, then `X-Real-IP`, then the socket peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
        };
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIp(resolve_client_ip(
            header("x-forwarded-for"),
            header("x-real-ip"),
            peer,
        )))
    }
}

/// Relationship names requested through `?include=a,b`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Includes(BTreeSet<&'static str>);

impl Includes {
    /// Parses a comma-separated include list against the resource's allowed names
    ///
    /// # Errors
    ///
    /// A 422 on the `include` field naming the first unknown entry.
    pub fn parse(raw: Option<&str>, allowed: &[&'static str]) -> Result<Self, ApiError> {
        let mut names = BTreeSet::new();

        for name in raw.unwrap_or_default().split(',').map(str::trim) {
            if name.is_empty() {
                continue;
            }
            match allowed.iter().find(|a| **a == name) {
                Some(known) => {
                    names.insert(*known);
                }
                None => {
                    return Err(ApiError::field(
                        "include",
                        format!("unknown relationship '{}', expected one of: {}", name, allowed.join(", ")),
                    ))
                }
            }
        }

        Ok(Self(names))
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Adds a relationship that is always included
    pub fn with(mut self, name: &'static str) -> Self {
        self.0.insert(name);
        self
    }
}
