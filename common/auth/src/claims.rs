use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Body posted to the identity service's validate endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest<'a> {
    pub access_token: &'a str,
}

/// Identity service verdict for a token it accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(rename = "id")]
    pub session_id: String,
    #[serde(rename = "user")]
    pub user_id: u64,
    pub role: String,
    #[serde(rename = "mfa")]
    pub mfa_satisfied: bool,
    #[serde(rename = "expires", with = "unix_seconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "issued", with = "unix_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuer: String,
    /// The users service writes an empty audience as `null`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub audience: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Unix seconds. Any `i64` is accepted; values past chrono's range clamp to its bounds.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(at.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(DateTime::from_timestamp(secs, 0).unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        }))
    }
}
