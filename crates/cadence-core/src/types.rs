use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a campaign (UUID v4 string when generated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl CampaignId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CampaignId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CampaignId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for one calendar occurrence, derived from the owning campaign
/// id and the occurrence index: `"{campaign_id}:{index}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Derive the id for occurrence `index` of `campaign`.
    pub fn derived(campaign: &CampaignId, index: usize) -> Self {
        Self(format!("{}:{}", campaign.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Uniform success/failure envelope used at every boundary: per batch item
/// inside a stage run and as the outer shape of a control-surface reply.
///
/// Wire shape is `{success, data, messages}` and must stay exactly that —
/// external consumers depend on the field names.
///
/// Invariants, enforced by the constructors:
/// - `success == false` ⇒ `data` is `None` and `messages` is non-empty;
/// - `success == true` ⇒ `data` is `Some` (possibly an empty collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<T> {
    pub success: bool,
    pub data: Option<T>,
    pub messages: Vec<String>,
}

impl<T> Response<T> {
    /// Successful outcome with no informational notes.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: Vec::new(),
        }
    }

    /// Successful outcome carrying an informational note (e.g. a no-op).
    pub fn ok_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: vec![message.into()],
        }
    }

    /// Failed outcome with a single explanatory message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            messages: vec![message.into()],
        }
    }

    /// Failed outcome with multiple explanatory messages.
    /// An empty list is promoted to a generic message so the failure
    /// invariant (non-empty messages) always holds.
    pub fn failed_many(messages: Vec<String>) -> Self {
        let messages = if messages.is_empty() {
            vec!["unknown error".to_string()]
        } else {
            messages
        };
        Self {
            success: false,
            data: None,
            messages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_is_derived_from_campaign_and_index() {
        let id = EventId::derived(&CampaignId::from("c1"), 4);
        assert_eq!(id.as_str(), "c1:4");
    }

    #[test]
    fn response_wire_shape_is_stable() {
        let ok: Response<u32> = Response::ok(7);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "data": 7, "messages": []})
        );

        let failed: Response<u32> = Response::failed("boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "data": null, "messages": ["boom"]})
        );
    }

    #[test]
    fn failed_many_never_leaves_messages_empty() {
        let r: Response<()> = Response::failed_many(Vec::new());
        assert!(!r.success);
        assert!(!r.messages.is_empty());
    }
}
