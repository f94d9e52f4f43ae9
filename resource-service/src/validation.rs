//! JSON body extraction with a validation hook, for handlers that take a
//! request payload.

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use common_http_errors::ApiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Parsed and validated JSON body. Malformed JSON is `bad_request`;
/// validation failures carry whatever error the type returns.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request("bad_request", None).with_message(rejection.body_text())
            })?;
        body.validate()?;
        Ok(Self(body))
    }
}

/// Payload field that tells a missing key apart from an explicit `null`.
/// Declare it with `#[serde(default)]` so a missing key reads as `Absent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Nullable<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    pub fn is_set(&self) -> bool {
        !matches!(self, Nullable::Absent)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Nullable::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Nullable::Value(value),
            None => Nullable::Null,
        })
    }
}
