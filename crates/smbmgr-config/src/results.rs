//! Per-resource outcomes of one `apply` call.

use serde::Serialize;

use crate::enums::State;
use crate::resources::Resource;

/// Outcome for a single submitted resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceResult {
    pub resource: Resource,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

impl ResourceResult {
    /// A resource that passed validation but is not yet committed.
    pub fn checked(resource: Resource) -> Self {
        Self {
            resource,
            success: true,
            msg: None,
            state: None,
        }
    }

    /// A committed resource with its store-transition state.
    pub fn committed(resource: Resource, state: State) -> Self {
        Self {
            resource,
            success: true,
            msg: None,
            state: Some(state),
        }
    }

    /// A failed resource with a message for the caller.
    pub fn error(resource: Resource, msg: impl Into<String>) -> Self {
        Self {
            resource,
            success: false,
            msg: Some(msg.into()),
            state: None,
        }
    }

    /// Status map in the external result listing shape.
    pub fn status(&self) -> serde_json::Value {
        let mut status = serde_json::Map::new();
        status.insert("checked".to_string(), serde_json::Value::Bool(true));
        if let Some(state) = self.state {
            status.insert(
                "state".to_string(),
                serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
            );
        }
        serde_json::Value::Object(status)
    }
}

/// Results for one whole `apply` batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultGroup {
    results: Vec<ResourceResult>,
}

impl ResultGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ResourceResult) {
        self.results.push(result);
    }

    /// True iff every result in the group succeeded.
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceResult> {
        self.results.iter()
    }
}

impl IntoIterator for ResultGroup {
    type Item = ResourceResult;
    type IntoIter = std::vec::IntoIter<ResourceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
