use std::fmt::Display;
use std::time::Duration;

use anyhow::{Error, anyhow};
use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
use serde::{Deserialize, Serialize};

/// Permissions carried in the `video` claim of a LiveKit token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_create: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_join: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ingress_admin: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl VideoGrant {
    pub fn join(room: &str) -> Self {
        Self {
            room_join: true,
            room: room.to_string(),
            ..Default::default()
        }
    }

    pub fn admin(room: &str) -> Self {
        Self {
            room_admin: true,
            room: room.to_string(),
            ..Default::default()
        }
    }
}

impl Display for VideoGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut perms = vec![];
        if self.room_create {
            perms.push("create");
        }
        if self.room_list {
            perms.push("list");
        }
        if self.room_join {
            perms.push("join");
        }
        if self.room_admin {
            perms.push("admin");
        }
        if self.ingress_admin {
            perms.push("ingress");
        }
        write!(f, "[{}] room: {}", perms.join(","), self.room)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// API key the token was signed with
    pub iss: String,
    /// Participant identity, empty for server-to-server calls
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub: String,
    pub nbf: u64,
    pub exp: u64,
    pub video: VideoGrant,
}

/// Signs access tokens with an API key/secret pair
#[derive(Clone)]
pub struct Keys {
    api_key: String,
    encoding: EncodingKey,
}

impl Keys {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            encoding: EncodingKey::from_secret(api_secret.as_bytes()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn claims(&self, identity: &str, grant: VideoGrant, ttl: Duration) -> Claims {
        let now = get_current_timestamp();
        Claims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + ttl.as_secs(),
            video: grant,
        }
    }

    pub fn token(&self, claims: &Claims) -> Result<String, Error> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| anyhow!(e))
    }
}
