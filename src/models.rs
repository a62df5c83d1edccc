use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

// --- Core Domain Types ---

/// AdminType
///
/// The closed enumeration of administrative areas a credential can grant
/// access to. It is part of the credential's lookup key: a username that was
/// provisioned for `camp` cannot authenticate into `enroll`, and vice versa.
///
/// Stored in PostgreSQL as the `admin_type` enum type; serialized on the wire
/// as the lowercase strings `"camp"` and `"enroll"`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "admin_type", rename_all = "lowercase")]
pub enum AdminType {
    Camp,
    Enroll,
}

/// Error returned when input names an admin type outside the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid admin type: {0}")]
pub struct InvalidAdminType(pub String);

impl FromStr for AdminType {
    type Err = InvalidAdminType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camp" => Ok(AdminType::Camp),
            "enroll" => Ok(AdminType::Enroll),
            other => Err(InvalidAdminType(other.to_string())),
        }
    }
}

impl fmt::Display for AdminType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminType::Camp => f.write_str("camp"),
            AdminType::Enroll => f.write_str("enroll"),
        }
    }
}

/// CredentialRecord
///
/// One persisted (username, password hash, admin type) tuple from the
/// `login_users` table. At most one record exists per (username, admin_type)
/// pair, enforced by the composite primary key.
///
/// Internal to the repository and service layers. Deliberately not
/// `Serialize`: the password hash must never reach a response body.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
    pub admin_type: AdminType,
}

// --- Request Payloads (Input Schemas) ---

/// AdminTypeSelector
///
/// The wire shape of the `adminType` field on add-user and whole-username
/// update requests: the original clients send either a single string or an
/// array of strings. Normalized exactly once, at the API boundary, into a
/// deduplicated set of valid enumeration members.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AdminTypeSelector {
    One(String),
    Many(Vec<String>),
}

impl AdminTypeSelector {
    /// Validates every requested value against the closed enumeration and
    /// collapses duplicates. An unknown value fails the whole call.
    pub fn normalize(&self) -> Result<BTreeSet<AdminType>, InvalidAdminType> {
        match self {
            AdminTypeSelector::One(s) => s.parse().map(|t| BTreeSet::from([t])),
            AdminTypeSelector::Many(values) => {
                values.iter().map(|s| s.parse::<AdminType>()).collect()
            }
        }
    }
}

/// LoginRequest
///
/// Input payload for POST /api/login. Fields are optional so that a missing
/// field surfaces as a 400 "Missing fields" response rather than a JSON
/// deserialization rejection; `adminType` arrives as raw text and is
/// validated against the enumeration by the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub admin_type: Option<String>,
}

/// AddUserRequest
///
/// Input payload for POST /api/add-user. A single call may grant several
/// admin types at once; the same credential material backs every grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub admin_type: Option<AdminTypeSelector>,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /api/users/{username}/{adminType}: any of
/// the three fields may be supplied, and empty strings are treated as absent
/// (matching the original portal's form behavior). A supplied password is
/// re-hashed; a supplied admin type must not collide with an existing record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_admin_type: Option<String>,
}

/// ReplaceUserRequest
///
/// Whole-username update payload for PUT /api/update-user: every record of
/// `username` is replaced by one record per entry in `adminType`, optionally
/// under a new name. When no `newPassword` is supplied, each surviving type
/// carries its previous hash forward; granting a type the user did not
/// already hold then requires a password.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceUserRequest {
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_username: Option<String>,

    pub admin_type: Option<AdminTypeSelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

// --- Response Schemas (Output) ---

/// UserEntry
///
/// One row of the grouped listing returned by GET /api/users: a username with
/// every admin type granted to it collected into one array.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub username: String,
    pub admin_type: Vec<AdminType>,
}

/// SessionResponse
///
/// Output of GET /api/session: the identity resolved from the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub username: String,
    pub admin_type: AdminType,
}

/// MessageResponse
///
/// The uniform `{ "message": ... }` body used for every success confirmation
/// and every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct MessageResponse {
    pub message: String,
}
