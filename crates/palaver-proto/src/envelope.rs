//! Inbound envelope classification and outbound chat bodies.
//!
//! Every broker `MESSAGE` frame body is a JSON envelope carrying an explicit
//! `messageType` discriminant and a `payload`. The discriminant set is
//! closed here as a tagged variant with an explicit unknown fallback, so a
//! new server-side kind degrades to a logged drop instead of a decode error
//! for everything else in the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EnvelopeError;

/// Identifier of one open conversation.
pub type ConversationId = u64;

/// Who authored a message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorKind {
    /// The human participant on this client.
    User,
    /// An automated participant.
    Assistant,
}

/// One structured chat message, immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Server-assigned record id. Uniqueness is an upstream guarantee.
    pub id: u64,
    /// Attribution side.
    pub author_kind: AuthorKind,
    /// Display name of the author.
    pub author_name: String,
    /// Message text.
    pub content: String,
    /// Server-side creation time.
    pub timestamp: DateTime<Utc>,
}

/// How a fragment patch mutates the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    /// Insert the node, or overwrite it if the target already exists.
    Append,
    /// Overwrite an existing node; a missing target is a no-op.
    Replace,
    /// Remove the node; a missing target is a no-op.
    Remove,
}

/// A pre-rendered, idempotent view mutation.
///
/// The session core routes patches without looking inside them; only the
/// view model interprets the action. Applying the same patch twice yields
/// the same view by construction of the three actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentPatch {
    /// Mutation kind.
    pub action: PatchAction,
    /// Identifier of the view node the patch addresses.
    pub target: String,
    /// Opaque markup for the node. Unused by `remove`.
    #[serde(default)]
    pub markup: String,
}

/// Assistant activity states surfaced on the side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// A message is queued behind other work.
    Waiting,
    /// A message is being processed.
    Processing,
    /// An assistant is composing a reply.
    Thinking,
}

impl ActivityKind {
    /// Default indicator text when the notice carries no detail.
    pub fn label(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting...",
            Self::Processing => "Processing...",
            Self::Thinking => "Thinking...",
        }
    }
}

/// An activity notice with optional server-provided detail text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityNotice {
    /// Activity state.
    pub kind: ActivityKind,
    /// Free-form detail, when the server sends one.
    pub detail: Option<String>,
}

impl ActivityNotice {
    /// Indicator text for the view: the detail if present, else the label.
    pub fn text(&self) -> &str {
        self.detail.as_deref().unwrap_or_else(|| self.kind.label())
    }
}

/// A classified inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Ordered batch of structured message records.
    Messages(Vec<MessageRecord>),
    /// Ordered batch of view patches. A single-patch payload is normalized
    /// to a batch of one.
    Fragments(Vec<FragmentPatch>),
    /// The server closed the conversation.
    Closed,
    /// Assistant activity notice.
    Activity(ActivityNotice),
}

/// Wire shape of an envelope before classification.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "messageType")]
    message_type: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// One patch or a batch of patches; the wire allows both.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<FragmentPatch>),
    One(FragmentPatch),
}

impl Envelope {
    /// Decode and classify a `MESSAGE` frame body.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::Decode` if the body or its payload does not parse
    /// - `EnvelopeError::UnknownKind` for discriminants outside the closed
    ///   set; callers drop these with a warning, they are never fatal
    pub fn decode(body: &str) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_str(body)
            .map_err(|e| EnvelopeError::Decode { reason: e.to_string() })?;

        match raw.message_type.as_str() {
            "MESSAGE" => {
                let records: Vec<MessageRecord> = serde_json::from_value(raw.payload)
                    .map_err(|e| EnvelopeError::Decode { reason: e.to_string() })?;
                Ok(Self::Messages(records))
            }
            "FRAGMENT" => {
                let patches = match serde_json::from_value::<OneOrMany>(raw.payload)
                    .map_err(|e| EnvelopeError::Decode { reason: e.to_string() })?
                {
                    OneOrMany::Many(patches) => patches,
                    OneOrMany::One(patch) => vec![patch],
                };
                Ok(Self::Fragments(patches))
            }
            "CLOSED" => Ok(Self::Closed),
            "MESSAGE_WAITING" => Ok(Self::Activity(activity(ActivityKind::Waiting, raw.payload))),
            "MESSAGE_PROCESSING" => {
                Ok(Self::Activity(activity(ActivityKind::Processing, raw.payload)))
            }
            "THINKING" => Ok(Self::Activity(activity(ActivityKind::Thinking, raw.payload))),
            other => Err(EnvelopeError::UnknownKind { kind: other.to_string() }),
        }
    }
}

/// Build an activity notice, treating any non-string payload as no detail.
fn activity(kind: ActivityKind, payload: serde_json::Value) -> ActivityNotice {
    let detail = match payload {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    };
    ActivityNotice { kind, detail }
}

/// Body of the outbound Join and Send frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBody {
    /// Conversation the frame belongs to.
    pub conversation_id: ConversationId,
    /// User text. Empty for Join.
    pub content: String,
}
