//! Request and response bodies of the JSON API

use crate::types::Tally;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// `POST /api/login-user`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginUserRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub aadhar: String,
}

/// `POST /api/verify-and-vote`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyAndVoteRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub aadhar: String,
    #[serde(deserialize_with = "lenient_string")]
    pub party: String,
    /// Data URL of the live capture
    #[serde(deserialize_with = "lenient_string")]
    pub image: String,
}

/// `POST /api/admin/login`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminLoginRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
}

/// Uniform `{success, message?, name?, tally?, receipt?}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tally: Option<Tally>,

    /// Anonymous receipt of an accepted vote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Uuid>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            name: None,
            tally: None,
            receipt: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            name: None,
            tally: None,
            receipt: None,
        }
    }

    /// Successful admin login, reporting only the admin's display name
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            success: true,
            message: None,
            name: Some(name.into()),
            tally: None,
            receipt: None,
        }
    }

    pub fn with_tally(mut self, tally: Tally) -> Self {
        self.tally = Some(tally);
        self
    }

    pub fn with_receipt(mut self, receipt: Uuid) -> Self {
        self.receipt = Some(receipt);
        self
    }
}

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub registered: usize,
    pub enrolled: usize,
    pub votes: usize,
}

/// Accept strings, numbers, booleans or null where a string is expected
///
/// Form inputs sometimes submit the aadhar as a JSON number; null and
/// absent fields become the empty string and are caught by the
/// required-field checks.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
