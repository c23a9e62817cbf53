use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire shape of a simulation request as submitted by callers.
///
/// The action arrives as a free string; mapping onto the domain action enum
/// (and rejecting unknown actions) happens in
/// `SimulationRequest::from_dto`, before any job is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequestDto {
    pub action: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub dst: Option<String>,
    #[serde(default)]
    pub capacity: Option<u64>,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub cost: Option<i64>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl SimulationRequestDto {
    /// Minimal request for a link-level action; mainly used by the CLI and
    /// tests.
    pub fn link_action(action: impl Into<String>, src: impl Into<String>, dst: impl Into<String>) -> Self {
        SimulationRequestDto {
            action: action.into(),
            src: Some(src.into()),
            dst: Some(dst.into()),
            capacity: None,
            latency: None,
            cost: None,
            node_id: None,
            parameters: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_with_defaults() {
        let dto: SimulationRequestDto = serde_json::from_str(r#"{"action": "add_link", "src": "R1", "dst": "R3", "capacity": 1000}"#).unwrap();

        assert_eq!(dto.action, "add_link");
        assert_eq!(dto.src.as_deref(), Some("R1"));
        assert_eq!(dto.capacity, Some(1000));
        assert!(dto.latency.is_none());
        assert!(dto.parameters.is_empty());
    }
}
