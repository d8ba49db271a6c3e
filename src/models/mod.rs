// PolicyLens Data Models
// Migrated from the Python backend schemas

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============ Categories & Weights ============

/// The fixed set of assessment dimensions. Order is declaration order and is
/// the evaluation/serialization order everywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Data Collection")]
    DataCollection,
    #[serde(rename = "Third-Party Sharing/Selling")]
    ThirdPartySharing,
    #[serde(rename = "Purpose Limitation")]
    PurposeLimitation,
    #[serde(rename = "User Control & Rights")]
    UserControlRights,
    #[serde(rename = "Retention & Deletion")]
    RetentionDeletion,
    #[serde(rename = "Security Practices")]
    SecurityPractices,
    #[serde(rename = "International Transfers & Jurisdiction")]
    InternationalTransfers,
    #[serde(rename = "Children/Minors + Sensitive Data")]
    ChildrenSensitiveData,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::DataCollection,
        Category::ThirdPartySharing,
        Category::PurposeLimitation,
        Category::UserControlRights,
        Category::RetentionDeletion,
        Category::SecurityPractices,
        Category::InternationalTransfers,
        Category::ChildrenSensitiveData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::DataCollection => "Data Collection",
            Category::ThirdPartySharing => "Third-Party Sharing/Selling",
            Category::PurposeLimitation => "Purpose Limitation",
            Category::UserControlRights => "User Control & Rights",
            Category::RetentionDeletion => "Retention & Deletion",
            Category::SecurityPractices => "Security Practices",
            Category::InternationalTransfers => "International Transfers & Jurisdiction",
            Category::ChildrenSensitiveData => "Children/Minors + Sensitive Data",
        }
    }

    /// Aggregate weight of this category. The table must sum to 1.0; this is
    /// verified once at startup, not per request.
    pub fn weight(self) -> f64 {
        match self {
            Category::DataCollection => 0.15,
            Category::ThirdPartySharing => 0.20,
            Category::PurposeLimitation => 0.10,
            Category::UserControlRights => 0.15,
            Category::RetentionDeletion => 0.10,
            Category::SecurityPractices => 0.10,
            Category::InternationalTransfers => 0.10,
            Category::ChildrenSensitiveData => 0.10,
        }
    }
}

pub fn category_weights() -> BTreeMap<Category, f64> {
    Category::ALL.iter().map(|c| (*c, c.weight())).collect()
}

// ============ Heuristic Signals ============

/// Per-category output of the pattern detector for one request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeuristicResult {
    pub delta: f64,
    pub flags: Vec<String>,
    /// rule id -> raw (non-overlapping) match count
    pub hits: BTreeMap<String, i32>,
}

/// The slice of heuristic detail embedded in a category result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeuristicSummary {
    pub delta: f64,
    pub flags: Vec<String>,
}

// ============ Semantic Judgment ============

/// One category's judgment from the semantic-judgment service. Untrusted
/// input: the blender clamps the score again regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticJudgment {
    #[serde(default = "default_neutral_score")]
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

impl Default for SemanticJudgment {
    fn default() -> Self {
        Self {
            score: 0.5,
            reason: String::new(),
        }
    }
}

// ============ Evidence ============

/// A ranked sentence excerpt produced by the evidence extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start: i32,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end: i32,
    pub score: f64,
    pub matched: Vec<String>,
}

// ============ Preferences ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceInfo {
    pub r#type: String,
    pub title: String,
    pub category: Category,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceReport {
    pub valid: bool,
    pub values: BTreeMap<String, bool>,
    pub schema: BTreeMap<String, PreferenceInfo>,
}

// ============ Conflicts ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub preference: String,
    pub category: Category,
    pub message: String,
    pub evidence: Option<EvidenceSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Personalized {
    pub conflicts: Vec<Conflict>,
    pub penalties: BTreeMap<Category, f64>,
}

// ============ Overview ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub severity: String,
}

/// Human-facing overview produced by the judgment service's general pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOverview {
    #[serde(default = "default_overall_rating")]
    pub overall_rating: i32,
    #[serde(default = "default_risk_level")]
    pub risk_level: String,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub risks: Vec<RiskItem>,
    #[serde(default)]
    pub missing_disclosures: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl Default for PolicyOverview {
    fn default() -> Self {
        Self {
            overall_rating: default_overall_rating(),
            risk_level: default_risk_level(),
            summary: default_summary(),
            strengths: Vec::new(),
            risks: Vec::new(),
            missing_disclosures: Vec::new(),
            action_items: Vec::new(),
        }
    }
}

// ============ Analyze Request ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    /// Raw client preferences; validated against the schema, never rejected.
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub return_snippets: bool,
    #[serde(default = "default_top_k")]
    pub snippets_top_k: i32,
    #[serde(default = "default_true")]
    pub include_evidence_probs: bool,
    #[serde(default)]
    pub include_overview: bool,
}

impl AnalyzeRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            preferences: None,
            return_snippets: default_true(),
            snippets_top_k: default_top_k(),
            include_evidence_probs: default_true(),
            include_overview: false,
        }
    }
}

// ============ Analyze Response ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub score: f64,
    pub reason: String,
    pub heuristics: HeuristicSummary,
    pub evidence_prob: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub trust_score: f64,
    pub risk_level: String,
    pub categories: BTreeMap<Category, CategoryResult>,
    pub weights: BTreeMap<Category, f64>,
    pub preferences: PreferenceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<BTreeMap<Category, Vec<EvidenceSnippet>>>,
    pub personalized: Personalized,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<PolicyOverview>,
    pub version: String,
    pub request_id: String,
}

// ============ Default Value Functions ============

fn default_true() -> bool { true }
fn default_top_k() -> i32 { 3 }
fn default_neutral_score() -> f64 { 0.5 }
fn default_overall_rating() -> i32 { 50 }
fn default_risk_level() -> String { "Medium".to_string() }
fn default_summary() -> String { "No concise summary produced.".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn category_serializes_as_display_name() {
        let json = serde_json::to_string(&Category::ThirdPartySharing).unwrap();
        assert_eq!(json, "\"Third-Party Sharing/Selling\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::ThirdPartySharing);
    }

    #[test]
    fn categories_used_as_map_keys() {
        let mut m = BTreeMap::new();
        m.insert(Category::DataCollection, 0.5);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"Data Collection\""));
    }

    #[test]
    fn analyze_request_defaults() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(req.return_snippets);
        assert_eq!(req.snippets_top_k, 3);
        assert!(req.include_evidence_probs);
        assert!(!req.include_overview);
        assert!(req.preferences.is_none());
    }
}
