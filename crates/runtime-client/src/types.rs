use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// Everything the registry needs to create or update one deployed action.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    /// Fully-qualified deployment name, version suffix included.
    pub name: String,
    /// Runtime kind understood by the platform (e.g. `nodejs:20`).
    pub kind: String,
    /// Zip archive of the built action.
    pub archive: Vec<u8>,
    /// Whether the action is reachable over HTTP without platform auth.
    pub web_export: bool,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One entry from the registry's action listing. The registry returns more
/// fields (namespace, limits, publish state); only the ones the gate reads
/// are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSummary {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionBody {
    pub exec: ExecBody,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExecBody {
    pub kind: String,
    /// Base64-encoded zip archive.
    pub code: String,
    pub binary: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct Annotation {
    pub key: String,
    pub value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_summary_ignores_extra_fields() {
        let json = r#"{"name":"greeter-1.2.3","version":"0.0.7","namespace":"acme","publish":false}"#;
        let summary: ActionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.name, "greeter-1.2.3");
        assert_eq!(summary.version.as_deref(), Some("0.0.7"));
    }

    #[test]
    fn action_body_serializes_annotations_as_pairs() {
        let body = ActionBody {
            exec: ExecBody {
                kind: "nodejs:20".into(),
                code: "UEsDBA==".into(),
                binary: true,
            },
            annotations: vec![Annotation {
                key: "web-export".into(),
                value: serde_json::Value::Bool(true),
            }],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"kind\":\"nodejs:20\""));
        assert!(json.contains("\"binary\":true"));
        assert!(json.contains("\"key\":\"web-export\""));
        assert!(json.contains("\"value\":true"));
    }
}
