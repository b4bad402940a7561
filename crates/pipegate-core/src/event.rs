//! Inbound pipeline event envelope.
//!
//! Events arrive as activity-stream JSON: a `@type` URI saying what
//! happened, an `objectType` URI saying what kind of resource it happened
//! to, and the URL of that resource. Classification is pure — no network
//! call happens until an event is recognized.

use serde::{Deserialize, Serialize};

/// Event type: a pipeline step began executing.
pub const EVENT_STARTED: &str = "https://ns.pipegate.io/pipeline/event/started";
/// Event type: a pipeline step is waiting on an approval decision.
pub const EVENT_WAITING: &str = "https://ns.pipegate.io/pipeline/event/waiting";
/// The only object type the gate reacts to.
pub const OBJECT_STEP_STATE: &str = "https://ns.pipegate.io/pipeline/execution-step-state";

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    #[serde(rename = "@type")]
    pub event_type: String,
    #[serde(rename = "objectType")]
    pub object_type: String,
    #[serde(rename = "activitystreams:object")]
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "@id")]
    pub id: String,
}

/// What an event asks the gate to do, before any state is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind<'a> {
    /// A step began; `0` is the step-state URL.
    Started(&'a str),
    /// A step is waiting for approval; `0` is the step-state URL.
    Waiting(&'a str),
    /// Anything else — tolerated and dropped, never an error.
    Unrecognized,
}

impl PipelineEvent {
    /// Classify the envelope against the recognized URI pairs.
    pub fn kind(&self) -> EventKind<'_> {
        if self.object_type != OBJECT_STEP_STATE {
            return EventKind::Unrecognized;
        }
        match self.event_type.as_str() {
            EVENT_STARTED => EventKind::Started(&self.object.id),
            EVENT_WAITING => EventKind::Waiting(&self.object.id),
            _ => EventKind::Unrecognized,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
