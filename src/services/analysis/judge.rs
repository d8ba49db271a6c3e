// Semantic Judgment
// Prompts the external judgment service for per-category scores and the
// human-facing overview, and sanitizes whatever comes back: scores clamped,
// missing categories neutral, reasons truncated. A failed call never fails
// the analysis; the caller degrades to neutral defaults.

use crate::models::{Category, PolicyOverview, SemanticJudgment};
use crate::services::providers::{
    get_api_key, ProviderClient, ProviderError, ProviderSpec,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

const MAX_REASON_CHARS: usize = 200;

const CATEGORY_SYSTEM_PROMPT: &str = "You are a precise privacy-policy scorer. \
Score each category independently in [0,1]. \
Use 0 for very poor or absent disclosures; 1 for exemplary clarity, limits, and user rights. \
Keep reasons short (<= 25 words).";

const OVERVIEW_SYSTEM_PROMPT: &str = "You are a precise privacy-policy analyst. \
Be neutral, concise, and evidence-oriented. If information is not stated, say so.";

fn category_user_prompt(text: &str) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
    format!(
        r#"Given the privacy policy text, output ONLY a JSON object mapping category -> {{"score": float, "reason": string}}.
- Categories (exact keys): {:?}
- Clamp scores to [0,1].
- Penalize vagueness (e.g., "legitimate interests", "may share", "as long as necessary") without concrete limits.
- Bonus for explicit user rights, retention timelines, encryption, opt-out links, COPPA stance, SCCs/DPF, etc.
- Do NOT include any text outside the JSON.

TEXT:
"""{}""""#,
        categories, text
    )
}

fn overview_user_prompt(text: &str) -> String {
    format!(
        r#"Read the policy text below and produce ONLY a JSON object with this schema:
{{
  "overall_rating": <integer 0-100>,
  "risk_level": "<High|Medium|Low>",
  "summary": "<2-4 sentences, neutral and concrete>",
  "strengths": ["<short bullet>", "..."],
  "risks": [{{"issue":"<short>", "severity":"<low|medium|high>"}}, ...],
  "missing_disclosures": ["<short item>", "..."],
  "action_items": ["<short, actionable advice>", "..."]
}}
Rules:
- Base "risk_level" on rating: 0-39 = High, 40-69 = Medium, 70-100 = Low.
- If unsure, keep conservative (lower the rating).
- Do NOT include any text outside the JSON.

TEXT:
"""{}""""#,
        text
    )
}

/// Extract the first JSON object from model output (tolerates fences and
/// surrounding prose).
fn extract_json(content: &str) -> Option<String> {
    let content = content.trim();
    if content.starts_with('{') && content.ends_with('}') {
        return Some(content.to_string());
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(content[start..=end].to_string())
}

fn parse_value(content: &str) -> Value {
    extract_json(content)
        .and_then(|s| serde_json::from_str::<Value>(&s).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}

// Tolerate numbers that arrive as JSON strings.
fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Fill all categories from the raw judgment payload, clamping scores and
/// defaulting absent/malformed entries to neutral (0.5, "").
fn parse_category_judgments(content: &str) -> BTreeMap<Category, SemanticJudgment> {
    let data = parse_value(content);
    let mut clean = BTreeMap::new();

    for cat in Category::ALL {
        let entry = data.get(cat.name());
        let score = entry
            .and_then(|e| e.get("score"))
            .and_then(as_number)
            .map(|x| x.clamp(0.0, 1.0))
            .unwrap_or(0.5);
        let reason = entry
            .and_then(|e| e.get("reason"))
            .and_then(|r| r.as_str())
            .map(|r| truncate_chars(r, MAX_REASON_CHARS))
            .unwrap_or_default();
        clean.insert(cat, SemanticJudgment { score, reason });
    }

    clean
}

fn parse_overview(content: &str) -> PolicyOverview {
    let data = parse_value(content);
    match serde_json::from_value::<PolicyOverview>(data) {
        Ok(mut overview) => {
            overview.overall_rating = overview.overall_rating.clamp(0, 100);
            overview
        }
        Err(e) => {
            warn!("[JUDGE] overview payload malformed: {}; using defaults", e);
            PolicyOverview::default()
        }
    }
}

/// Ask the judgment service for per-category scores in [0,1] + short reasons.
pub async fn judge_categories(
    client: &ProviderClient,
    provider: &ProviderSpec,
    text: &str,
) -> Result<BTreeMap<Category, SemanticJudgment>, ProviderError> {
    let api_key = get_api_key(&provider.name).ok_or(ProviderError::MissingApiKey)?;
    let result = client
        .call_judge(
            provider,
            &api_key,
            CATEGORY_SYSTEM_PROMPT,
            &category_user_prompt(text),
            2048,
            true,
        )
        .await?;
    info!(
        "[JUDGE] category scoring ok provider={} latency_ms={}",
        provider.name, result.latency_ms
    );
    Ok(parse_category_judgments(&result.content))
}

/// Ask the judgment service for the general policy overview.
pub async fn judge_overview(
    client: &ProviderClient,
    provider: &ProviderSpec,
    text: &str,
) -> Result<PolicyOverview, ProviderError> {
    let api_key = get_api_key(&provider.name).ok_or(ProviderError::MissingApiKey)?;
    let result = client
        .call_judge(
            provider,
            &api_key,
            OVERVIEW_SYSTEM_PROMPT,
            &overview_user_prompt(text),
            1024,
            true,
        )
        .await?;
    info!(
        "[JUDGE] overview ok provider={} latency_ms={}",
        provider.name, result.latency_ms
    );
    Ok(parse_overview(&result.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_judgments() {
        let content = r#"{"Data Collection": {"score": 0.72, "reason": "States categories collected."},
                          "Third-Party Sharing/Selling": {"score": 0.25, "reason": "Shares with partners."}}"#;
        let parsed = parse_category_judgments(content);
        assert_eq!(parsed.len(), Category::ALL.len());
        assert!((parsed[&Category::DataCollection].score - 0.72).abs() < 1e-9);
        assert!((parsed[&Category::ThirdPartySharing].score - 0.25).abs() < 1e-9);
        // Categories the service skipped default to neutral.
        assert!((parsed[&Category::SecurityPractices].score - 0.5).abs() < 1e-9);
        assert!(parsed[&Category::SecurityPractices].reason.is_empty());
    }

    #[test]
    fn test_parse_tolerates_fenced_output() {
        let content = "```json\n{\"Security Practices\": {\"score\": 0.9, \"reason\": \"TLS everywhere\"}}\n```";
        let parsed = parse_category_judgments(content);
        assert!((parsed[&Category::SecurityPractices].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_parse_clamps_and_defaults_malformed_entries() {
        let content = r#"{"Data Collection": {"score": 3.5, "reason": "way too high"},
                          "Purpose Limitation": {"score": "not a number"},
                          "Retention & Deletion": {"score": "0.7"}}"#;
        let parsed = parse_category_judgments(content);
        assert_eq!(parsed[&Category::DataCollection].score, 1.0);
        assert_eq!(parsed[&Category::PurposeLimitation].score, 0.5);
        assert!((parsed[&Category::RetentionDeletion].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_garbage_is_all_neutral() {
        let parsed = parse_category_judgments("the model refused to answer");
        assert_eq!(parsed.len(), Category::ALL.len());
        for judgment in parsed.values() {
            assert_eq!(judgment.score, 0.5);
            assert!(judgment.reason.is_empty());
        }
    }

    #[test]
    fn test_reason_truncated() {
        let long = "x".repeat(500);
        let content = format!(r#"{{"Data Collection": {{"score": 0.5, "reason": "{}"}}}}"#, long);
        let parsed = parse_category_judgments(&content);
        assert_eq!(parsed[&Category::DataCollection].reason.chars().count(), 200);
    }

    #[test]
    fn test_overview_defaults_on_empty() {
        let overview = parse_overview("not json at all");
        assert_eq!(overview.overall_rating, 50);
        assert_eq!(overview.risk_level, "Medium");
        assert!(overview.strengths.is_empty());
    }

    #[test]
    fn test_overview_parses_partial_payload() {
        let overview = parse_overview(
            r#"{"overall_rating": 120, "summary": "Broad collection, few controls.",
                "risks": [{"issue": "sells data", "severity": "high"}]}"#,
        );
        assert_eq!(overview.overall_rating, 100);
        assert_eq!(overview.risk_level, "Medium");
        assert_eq!(overview.risks.len(), 1);
        assert_eq!(overview.risks[0].severity, "high");
    }
}
