use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::claims::{Keys, VideoGrant};
use crate::model::{
    CreateIngressRequest, CreateRoomRequest, DeleteRoomRequest, IngressInfo, ListRoomsResponse,
    Room, RoomParticipantIdentity, TwirpError,
};

const ROOM_SERVICE: &str = "livekit.RoomService";
const INGRESS_SERVICE: &str = "livekit.Ingress";
const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct Client {
    base_url: String,
    keys: Keys,
    token_ttl: Duration,
    http: reqwest::Client,
}

impl Client {
    /// `url` may be the signalling URL (`ws://`, `wss://`), it is mapped to HTTP.
    pub fn new(url: &str, api_key: &str, api_secret: &str, token_ttl: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: http_base_url(url),
            keys: Keys::new(api_key, api_secret),
            token_ttl,
            http,
        })
    }

    pub async fn list_rooms(&self) -> Result<ListRoomsResponse> {
        let grant = VideoGrant {
            room_list: true,
            ..Default::default()
        };
        self.twirp(ROOM_SERVICE, "ListRooms", grant, &serde_json::json!({}))
            .await
    }

    pub async fn create_room(&self, name: &str) -> Result<Room> {
        let grant = VideoGrant {
            room_create: true,
            ..Default::default()
        };
        self.twirp(ROOM_SERVICE, "CreateRoom", grant, &CreateRoomRequest { name })
            .await
    }

    pub async fn delete_room(&self, room: &str) -> Result<()> {
        let grant = VideoGrant {
            room_create: true,
            ..Default::default()
        };
        let _: serde_json::Value = self
            .twirp(ROOM_SERVICE, "DeleteRoom", grant, &DeleteRoomRequest { room })
            .await?;
        Ok(())
    }

    pub async fn remove_participant(&self, room: &str, identity: &str) -> Result<()> {
        let _: serde_json::Value = self
            .twirp(
                ROOM_SERVICE,
                "RemoveParticipant",
                VideoGrant::admin(room),
                &RoomParticipantIdentity { room, identity },
            )
            .await?;
        Ok(())
    }

    /// Create an RTMP ingress publishing into `room` as `identity`
    pub async fn create_ingress(&self, room: &str, name: &str, identity: &str) -> Result<IngressInfo> {
        let grant = VideoGrant {
            ingress_admin: true,
            ..Default::default()
        };
        let req = CreateIngressRequest {
            input_type: "RTMP_INPUT",
            name,
            room_name: room,
            participant_identity: identity,
        };
        self.twirp(INGRESS_SERVICE, "CreateIngress", grant, &req)
            .await
    }

    /// Token a participant presents to join `room`
    pub fn join_token(&self, room: &str, identity: &str) -> Result<String> {
        let claims = self
            .keys
            .claims(identity, VideoGrant::join(room), self.token_ttl);
        self.keys.token(&claims)
    }

    async fn twirp<Req, Res>(
        &self,
        service: &str,
        method: &str,
        grant: VideoGrant,
        body: &Req,
    ) -> Result<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = format!("{}/twirp/{}/{}", self.base_url, service, method);
        let claims = self.keys.claims("", grant, SERVICE_TOKEN_TTL);
        let token = self.keys.token(&claims)?;

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            debug!(url, ?status, "livekit request success");
            let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
            return serde_json::from_str(text)
                .map_err(|e| anyhow!("invalid {}/{} response: {}", service, method, e));
        }

        warn!(url, ?status, res_body = text, "livekit request error");
        match serde_json::from_str::<TwirpError>(&text) {
            Ok(err) if !err.code.is_empty() => {
                Err(anyhow!("{} {}: {} ({})", service, method, err.msg, err.code))
            }
            _ => Err(anyhow!("{} {}: http status {}", service, method, status)),
        }
    }
}

fn http_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        url.to_string()
    }
}
