use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stored account record. Never serialized to clients directly; see [`PublicUser`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: new_id(),
            name,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque structured template body, stored as given.
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn new(owner_id: &str, draft: NewTemplate) -> Self {
        Self {
            id: new_id(),
            owner_id: owner_id.to_owned(),
            name: draft.name,
            kind: draft.kind,
            content: draft.content,
            created_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Signed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub name: String,
    /// Client-supplied rendering of the signature; not verified.
    pub signature: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub client_name: String,
    pub provider_name: String,
    pub status: ContractStatus,
    pub collaborators: Vec<String>,
    pub signatures: Vec<Signature>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(owner_id: &str, draft: NewContract) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            owner_id: owner_id.to_owned(),
            title: draft.title,
            content: draft.content,
            client_name: draft.client_name,
            provider_name: draft.provider_name,
            status: ContractStatus::Draft,
            collaborators: normalize_collaborators(draft.collaborators),
            signatures: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in `update`; absent fields keep their value.
    /// Status and signatures are never touched here.
    pub fn apply_update(&mut self, update: ContractUpdate, at: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(client_name) = update.client_name {
            self.client_name = client_name;
        }
        if let Some(provider_name) = update.provider_name {
            self.provider_name = provider_name;
        }
        if let Some(collaborators) = update.collaborators {
            self.collaborators = normalize_collaborators(collaborators);
        }
        self.updated_at = at;
    }

    /// Appends a signature and moves the contract to `signed`.
    ///
    /// Any number of signatures may be appended, including repeats by the same
    /// signer; the first one is enough to flip the status and nothing reverts it.
    pub fn append_signature(&mut self, name: String, signature: String, at: DateTime<Utc>) {
        self.signatures.push(Signature {
            name,
            signature,
            signed_at: at,
        });
        self.status = ContractStatus::Signed;
        self.updated_at = at;
    }
}

/// Trims entries, drops blanks and removes duplicates, keeping first occurrence order.
pub fn normalize_collaborators(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for email in raw {
        let email = email.trim();
        if !email.is_empty() && !out.iter().any(|e| e == email) {
            out.push(email.to_owned());
        }
    }
    out
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_public: bool,
}

impl Clause {
    pub fn new(title: &str, content: &str, category: &str, is_public: bool) -> Self {
        Self {
            id: new_id(),
            title: title.to_owned(),
            content: content.to_owned(),
            category: category.to_owned(),
            is_public,
        }
    }
}

/// JWT payload. Only the user id is carried; there is no expiry.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
}

// --- Request / response bodies ---

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NewContract {
    pub title: String,
    pub content: String,
    pub client_name: String,
    pub provider_name: String,
    pub collaborators: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub client_name: Option<String>,
    pub provider_name: Option<String>,
    pub collaborators: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct SignRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct SuggestionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Accepted for compatibility; the lookup ignores it.
    pub context: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SuggestionResponse {
    pub suggestion: String,
}
