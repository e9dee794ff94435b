//! Edit Notification Model
//!
//! Authoring tools describe each edit as an event carrying the request that
//! was made (which resource, which container) and the response (freshly
//! rendered markup per affected resource):
//!
//! ```json
//! {
//!   "type": "update",
//!   "request": { "target": { "resource": "urn:page/main/hero" } },
//!   "response": { "updates": [{ "resource": "urn:page/main/hero", "content": "<div ...>" }] }
//! }
//! ```
//!
//! Move events name their destination under `request.to.container`.

use serde::{Deserialize, Serialize};

// =============================================================================
// Kind
// =============================================================================

/// Which authoring action produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[serde(alias = "aue:content-patch")]
    Patch,
    #[serde(alias = "aue:content-update")]
    Update,
    #[serde(alias = "aue:content-add")]
    Add,
    #[serde(alias = "aue:content-move")]
    Move,
    #[serde(alias = "aue:content-remove")]
    Remove,
    #[serde(alias = "aue:content-copy")]
    Copy,
}

// =============================================================================
// Update Record
// =============================================================================

/// One `(resourceId, markup)` pair from the response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    #[serde(rename = "resource", default)]
    pub resource_id: String,
    #[serde(rename = "content", default)]
    pub markup: String,
}

impl UpdateRecord {
    pub fn new(resource_id: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            markup: markup.into(),
        }
    }
}

// =============================================================================
// Edit Notification
// =============================================================================

/// One authoring-tool event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireNotification", into = "WireNotification")]
pub struct EditNotification {
    pub kind: NotificationKind,
    /// `request.target.resource`
    pub target_resource: Option<String>,
    /// `request.target.container.resource`
    pub container_resource: Option<String>,
    /// `request.to.container.resource` (move destination)
    pub destination_resource: Option<String>,
    /// `response.updates`
    pub updates: Vec<UpdateRecord>,
}

impl EditNotification {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            target_resource: None,
            container_resource: None,
            destination_resource: None,
            updates: Vec::new(),
        }
    }

    pub fn with_target(mut self, resource: impl Into<String>) -> Self {
        self.target_resource = Some(resource.into());
        self
    }

    pub fn with_container(mut self, resource: impl Into<String>) -> Self {
        self.container_resource = Some(resource.into());
        self
    }

    pub fn with_destination(mut self, resource: impl Into<String>) -> Self {
        self.destination_resource = Some(resource.into());
        self
    }

    pub fn with_update(mut self, resource: impl Into<String>, markup: impl Into<String>) -> Self {
        self.updates.push(UpdateRecord::new(resource, markup));
        self
    }

    /// The most specific resource the event is about: direct target, then
    /// the target's container, then the move destination's container.
    pub fn target_resource_id(&self) -> Option<&str> {
        [
            &self.target_resource,
            &self.container_resource,
            &self.destination_resource,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|id| !id.is_empty())
    }

    /// The resource id an update record should be located by.
    ///
    /// Records without their own id apply to the notification's target.
    pub fn record_resource_id<'a>(&'a self, record: &'a UpdateRecord) -> Option<&'a str> {
        if record.resource_id.is_empty() {
            self.target_resource_id()
        } else {
            Some(record.resource_id.as_str())
        }
    }

    /// Whether the notification can drive any mutation at all.
    pub fn is_inert(&self) -> bool {
        self.target_resource_id().is_none() || self.updates.is_empty()
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// Wire Shape
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNotification {
    #[serde(rename = "type")]
    kind: NotificationKind,
    #[serde(default)]
    request: WireRequest,
    #[serde(default)]
    response: WireResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<WireTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<WireTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    container: Option<WireContainer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireContainer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireResponse {
    #[serde(default)]
    updates: Vec<UpdateRecord>,
}

impl From<WireNotification> for EditNotification {
    fn from(wire: WireNotification) -> Self {
        let target = wire.request.target.unwrap_or_default();
        let destination = wire
            .request
            .to
            .and_then(|to| to.container)
            .and_then(|c| c.resource);
        Self {
            kind: wire.kind,
            target_resource: target.resource,
            container_resource: target.container.and_then(|c| c.resource),
            destination_resource: destination,
            updates: wire.response.updates,
        }
    }
}

impl From<EditNotification> for WireNotification {
    fn from(n: EditNotification) -> Self {
        let target = (n.target_resource.is_some() || n.container_resource.is_some()).then(|| {
            WireTarget {
                resource: n.target_resource,
                container: n.container_resource.map(|resource| WireContainer {
                    resource: Some(resource),
                }),
            }
        });
        let to = n.destination_resource.map(|resource| WireTarget {
            resource: None,
            container: Some(WireContainer {
                resource: Some(resource),
            }),
        });
        Self {
            kind: n.kind,
            request: WireRequest { target, to },
            response: WireResponse { updates: n.updates },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_event() {
        let json = r#"{
            "type": "update",
            "request": { "target": { "resource": "res-42" } },
            "response": { "updates": [{ "resource": "res-42", "content": "<p>x</p>" }] }
        }"#;
        let n = EditNotification::from_json(json).unwrap();
        assert_eq!(n.kind, NotificationKind::Update);
        assert_eq!(n.target_resource_id(), Some("res-42"));
        assert_eq!(n.updates, vec![UpdateRecord::new("res-42", "<p>x</p>")]);
        assert!(!n.is_inert());
    }

    #[test]
    fn test_event_type_aliases() {
        let json = r#"{ "type": "aue:content-move", "request": { "to": { "container": { "resource": "sec-2" } } } }"#;
        let n = EditNotification::from_json(json).unwrap();
        assert_eq!(n.kind, NotificationKind::Move);
        assert_eq!(n.target_resource_id(), Some("sec-2"));
        assert!(n.is_inert(), "no updates");
    }

    #[test]
    fn test_target_preference_order() {
        let n = EditNotification::new(NotificationKind::Add)
            .with_container("container")
            .with_destination("destination");
        assert_eq!(n.target_resource_id(), Some("container"));

        let n = n.with_target("direct");
        assert_eq!(n.target_resource_id(), Some("direct"));

        let n = EditNotification::new(NotificationKind::Move)
            .with_target("")
            .with_destination("destination");
        assert_eq!(n.target_resource_id(), Some("destination"));
    }

    #[test]
    fn test_missing_ids_are_none() {
        let n = EditNotification::from_json(r#"{ "type": "patch" }"#).unwrap();
        assert_eq!(n.target_resource_id(), None);
        assert!(n.updates.is_empty());
        assert!(n.is_inert());
    }

    #[test]
    fn test_record_without_id_uses_target() {
        let n = EditNotification::new(NotificationKind::Patch)
            .with_target("res-1")
            .with_update("", "<p>x</p>");
        assert_eq!(n.record_resource_id(&n.updates[0]), Some("res-1"));
    }

    #[test]
    fn test_wire_shape_is_preserved() {
        let n = EditNotification::new(NotificationKind::Move)
            .with_target("a")
            .with_container("b")
            .with_destination("c")
            .with_update("b", "<div></div>");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains(r#""type":"move""#));
        assert!(json.contains(r#""to":{"container":{"resource":"c"}}"#));
        assert_eq!(EditNotification::from_json(&json).unwrap(), n);
    }
}
