mod claims;
mod client;
mod model;

pub use claims::{Claims, Keys, VideoGrant};
pub use client::Client;
pub use model::{IngressInfo, ListRoomsResponse, Room, TwirpError};
