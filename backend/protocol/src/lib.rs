//! # Wire Protocol
//!
//! Events exchanged between browser clients and the signaling server.
//!
//! ## Framing
//!
//! One JSON envelope per WebSocket text frame.
//! ```json
//! {"event": "find-partner", "data": {"age_group": "18-25", "country": "dk"}}
//! ```
//!
//! - `event`: kebab-case event name
//! - `data`: payload, absent for events without one
//!
//! ## Inbound
//! - `find-partner`: filter facets, every facet optional
//! - `signal`: `{to, data}`, data is opaque and never inspected
//! - `leave`: drop the current partner or search
//!
//! ## Outbound
//! - `connected`: own connection id, sent once per session
//! - `partner-found`: `{id}` of the new partner
//! - `partner-left`: partner searched again or left
//! - `partner-disconnected`: partner's session ended
//! - `partner-dummy`: `{message}`, nobody matched in time
//! - `signal`: `{from, data}`
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub mod events;
pub mod id;

use events::{ClientEvent, Filters, SignalRequest};

pub const FIND_PARTNER: &str = "find-partner";
pub const SIGNAL: &str = "signal";
pub const LEAVE: &str = "leave";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,

    #[serde(default)]
    data: Value,
}

pub fn decode_client_event(text: &str) -> Result<ClientEvent, DecodeError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    match envelope.event.as_str() {
        // anything that is not a filter object counts as "no filters"
        FIND_PARTNER => Ok(ClientEvent::FindPartner(
            serde_json::from_value::<Filters>(envelope.data).unwrap_or_default(),
        )),
        SIGNAL => Ok(ClientEvent::Signal(serde_json::from_value::<SignalRequest>(
            envelope.data,
        )?)),
        LEAVE => Ok(ClientEvent::Leave),
        other => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}
