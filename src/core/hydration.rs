//! # Server → client hand-over.
//!
//! ```text
//! server: Services::dehydrate() ─► HydrationPayload { suspense, state } ─► to_script_json()
//! client: from_json() ─► Services::builder(cfg).hydrate(payload).build()
//! ```

use serde::{Deserialize, Serialize};

use crate::state::StatePayload;
use crate::suspense::SuspensePayload;
use crate::utils::escape_script_json;

/// Everything a server pass hands to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrationPayload {
    /// Settled suspense entries by label.
    #[serde(default)]
    pub suspense: SuspensePayload,
    /// State snapshots by module name.
    #[serde(default)]
    pub state: StatePayload,
}

impl HydrationPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// JSON safe to embed inside an HTML `<script>` element.
    pub fn to_script_json(&self) -> serde_json::Result<String> {
        Ok(escape_script_json(&self.to_json()?))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
