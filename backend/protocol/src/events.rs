use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::ConnId;

/// Search facets as sent by the client. Values stay raw JSON, the server decides what counts as unset.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Filters {
    pub age_group: Option<Value>,
    pub relation_type: Option<Value>,
    pub gender: Option<Value>,
    pub max_distance_km: Option<Value>,
    pub country: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignalRequest {
    pub to: ConnId,

    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    FindPartner(Filters),
    Signal(SignalRequest),
    Leave,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected { id: ConnId },
    PartnerFound { id: ConnId },
    PartnerLeft,
    PartnerDisconnected,
    PartnerDummy { message: String },
    Signal { from: ConnId, data: Value },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::PartnerFound { .. } => "partner-found",
            ServerEvent::PartnerLeft => "partner-left",
            ServerEvent::PartnerDisconnected => "partner-disconnected",
            ServerEvent::PartnerDummy { .. } => "partner-dummy",
            ServerEvent::Signal { .. } => "signal",
        }
    }
}
