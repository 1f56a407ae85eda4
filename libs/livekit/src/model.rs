//! Wire types of the LiveKit Twirp API.
//!
//! The server speaks protobuf JSON: snake_case field names, default values
//! possibly omitted, and 64-bit integers encoded as strings.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub sid: String,
    pub name: String,
    pub empty_timeout: u32,
    pub departure_timeout: u32,
    pub max_participants: u32,
    #[serde(deserialize_with = "int64")]
    pub creation_time: i64,
    pub metadata: String,
    pub num_participants: u32,
    pub num_publishers: u32,
    pub active_recording: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRoomsResponse {
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressInfo {
    pub ingress_id: String,
    pub name: String,
    pub stream_key: String,
    pub url: String,
    pub room_name: String,
    pub participant_identity: String,
    pub participant_name: String,
    pub reusable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRoomRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRoomRequest<'a> {
    pub room: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomParticipantIdentity<'a> {
    pub room: &'a str,
    pub identity: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIngressRequest<'a> {
    pub input_type: &'static str,
    pub name: &'a str,
    pub room_name: &'a str,
    pub participant_identity: &'a str,
}

/// Error body returned by Twirp on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwirpError {
    pub code: String,
    pub msg: String,
}

fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) if s.is_empty() => Ok(0),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
