use serde::{Deserialize, Serialize};

pub const KNOWN_DEFECT_TAG: &str = "known external-tool defect";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectRule {
    pub pattern: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

fn default_tag() -> String {
    KNOWN_DEFECT_TAG.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tag: String,
    pub pattern: String,
    pub summary: String,
    pub notes: Vec<String>,
}

impl DefectRule {
    pub fn matches(&self, text: &str) -> bool {
        !self.pattern.is_empty() && text.contains(&self.pattern)
    }

    fn classification(&self) -> Classification {
        Classification {
            tag: self.tag.clone(),
            pattern: self.pattern.clone(),
            summary: self
                .summary
                .clone()
                .unwrap_or_else(|| self.pattern.clone()),
            notes: self
                .notes
                .iter()
                .map(|note| note.replace("{pattern}", &self.pattern))
                .collect(),
        }
    }
}

pub fn classify(rules: &[DefectRule], text: &str) -> Option<Classification> {
    rules
        .iter()
        .find(|rule| rule.matches(text))
        .map(DefectRule::classification)
}

pub fn default_rules() -> Vec<DefectRule> {
    vec![DefectRule {
        pattern: "externref".to_string(),
        tag: default_tag(),
        summary: Some("Rust 1.82 + externref".to_string()),
        notes: vec![
            "This is the known Rust 1.82 + wasm-bindgen {pattern} issue".to_string(),
            "The core code compilation works - this is just a tooling issue".to_string(),
        ],
    }]
}
