use orrery_common::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named message for scripts.
///
/// Broadcast events (no `target`) reach every binding subscribed to `name`.
/// Targeted events reach the target's binding whether or not it subscribed.
/// Either kind is delivered on the tick after it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
    /// Entity whose script emitted the event; `None` when the host did.
    #[serde(default)]
    pub sender: Option<EntityId>,
    #[serde(default)]
    pub target: Option<EntityId>,
}

impl ScriptEvent {
    /// A host event for every subscriber of `name`.
    pub fn broadcast(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            sender: None,
            target: None,
        }
    }

    /// A host event for one entity's binding.
    pub fn to(target: EntityId, name: impl Into<String>, payload: Value) -> Self {
        Self {
            target: Some(target),
            ..Self::broadcast(name, payload)
        }
    }

    pub(crate) fn reaches(&self, entity: EntityId, subscribed: impl FnOnce(&str) -> bool) -> bool {
        match self.target {
            Some(target) => target == entity,
            None => subscribed(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn targeted_events_ignore_subscriptions() {
        let event = ScriptEvent::to(EntityId(2), "hit", json!(3));
        assert!(event.reaches(EntityId(2), |_| false));
        assert!(!event.reaches(EntityId(1), |_| true));
    }

    #[test]
    fn broadcasts_need_a_subscription() {
        let event = ScriptEvent::broadcast("day", Value::Null);
        assert!(event.reaches(EntityId(1), |name| name == "day"));
        assert!(!event.reaches(EntityId(1), |name| name == "night"));
    }

    #[test]
    fn host_events_deserialize_with_defaults() {
        let event: ScriptEvent = serde_json::from_value(json!({ "name": "reset" })).unwrap();
        assert_eq!(event, ScriptEvent::broadcast("reset", Value::Null));
    }
}
