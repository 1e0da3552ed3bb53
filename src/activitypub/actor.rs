//! ActivityPub actor documents

use serde::Serialize;
use serde_json::Value;

use super::context;
use crate::error::AppError;

/// Actor public key block
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorPublicKey {
    pub id: String,
    pub owner: String,
    pub public_key_pem: String,
}

/// Actor endpoints block
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActorEndpoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_inbox: Option<String>,
}

/// A federated identity
///
/// Local actors are owned by this site; remote actors are cached mirrors
/// kept on follower records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(rename = "@context")]
    context: Vec<Value>,
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub preferred_username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub inbox: String,
    pub outbox: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<String>,
    pub public_key: ActorPublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<ActorEndpoints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
}

impl Actor {
    /// Build an actor document rooted at the given IRI.
    pub fn new(id: impl Into<String>, actor_type: &str, preferred_username: &str, public_key_pem: &str) -> Self {
        let id = id.into();
        Self {
            context: context::actor_context(),
            public_key: ActorPublicKey {
                id: format!("{}#main-key", id),
                owner: id.clone(),
                public_key_pem: public_key_pem.to_string(),
            },
            inbox: format!("{}/inbox", id),
            outbox: format!("{}/outbox", id),
            followers: Some(format!("{}/followers", id)),
            featured: Some(format!("{}/collections/featured", id)),
            id,
            actor_type: actor_type.to_string(),
            preferred_username: preferred_username.to_string(),
            name: None,
            summary: None,
            endpoints: None,
            icon: None,
            image: None,
        }
    }

    pub fn to_json(&self) -> Result<Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Validation(format!("Unserializable actor: {}", e)))
    }
}
