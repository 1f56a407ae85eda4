use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StopHls {
    /// Also delete everything already published under the session prefix
    #[serde(default)]
    pub purge: bool,
}
