pub const METRICS: &str = "/metrics";
pub const ROOMS: &str = "/room";
pub const HLS: &str = "/hls";

pub fn room(room: &str) -> String {
    format!("/room/{}", room)
}

pub fn join(room: &str, identity: &str) -> String {
    format!("/join/{}/{}", room, identity)
}

pub fn kick(room: &str, identity: &str) -> String {
    format!("/kick/{}/{}", room, identity)
}

pub fn rtmp(room: &str, name: &str, identity: &str) -> String {
    format!("/rtmp/{}/{}/{}", room, name, identity)
}

pub fn hls(stream: &str) -> String {
    format!("/hls/{}", stream)
}
