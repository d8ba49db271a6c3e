// Analysis Pipeline
// Orchestrates one request end to end: boundary validation, pattern
// detection, the judgment-service calls, evidence extraction, preference
// validation, two-pass conflict detection, and blending. Collaborator
// failures degrade to neutral defaults; only input validation rejects.

use crate::models::{
    category_weights, AnalyzeRequest, AnalyzeResponse, Category, Personalized, PolicyOverview,
    PreferenceReport, SemanticJudgment,
};
use crate::services::providers::{self, ProviderClient};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{blend, conflicts, evidence, heuristics, judge, preferences};

/// Hard ceiling on input length, in characters. Kept generous for
/// whole-page analysis.
pub const MAX_TEXT_LEN: usize = 120_000;

const MIN_TOP_K: i32 = 1;
const MAX_TOP_K: i32 = 10;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Field 'text' is required and must be non-empty.")]
    EmptyText,
    #[error("Text too long (>{max} chars). Consider analyzing a selection.")]
    TextTooLong { max: usize },
}

static CONFIG_CHECK: OnceLock<()> = OnceLock::new();

/// Verify process-wide static configuration once. Violations are deployment
/// bugs, so they panic instead of surfacing as request errors.
pub fn verify_static_config() {
    CONFIG_CHECK.get_or_init(|| {
        let sum: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!(
            (sum - 1.0).abs() < 1e-9,
            "category weights must sum to 1.0 (got {sum})"
        );
        assert!(heuristics::rule_count() > 0);
        assert!(!preferences::SCHEMA.is_empty());
    });
}

fn judge_disabled() -> bool {
    matches!(
        std::env::var("POLICYLENS_DISABLE_JUDGE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

async fn gather_judgments(
    client: &ProviderClient,
    text: &str,
    include_overview: bool,
) -> (BTreeMap<Category, SemanticJudgment>, Option<PolicyOverview>) {
    if judge_disabled() {
        info!("[ANALYSIS] judgment service disabled; scoring with neutral defaults");
        return (BTreeMap::new(), None);
    }

    let provider = providers::resolve_judge_provider();

    if include_overview {
        let (judgments, overview) = tokio::join!(
            judge::judge_categories(client, &provider, text),
            judge::judge_overview(client, &provider, text),
        );
        let judgments = judgments.unwrap_or_else(|e| {
            warn!("[ANALYSIS] category judgment failed: {}; using neutral defaults", e);
            BTreeMap::new()
        });
        let overview = overview
            .map_err(|e| warn!("[ANALYSIS] overview failed: {}; omitting", e))
            .ok();
        (judgments, overview)
    } else {
        match judge::judge_categories(client, &provider, text).await {
            Ok(judgments) => (judgments, None),
            Err(e) => {
                warn!("[ANALYSIS] category judgment failed: {}; using neutral defaults", e);
                (BTreeMap::new(), None)
            }
        }
    }
}

/// Run one full analysis. The only failure modes are the input-validation
/// errors; everything downstream degrades instead of failing.
pub async fn run_analysis(
    client: &ProviderClient,
    req: &AnalyzeRequest,
) -> Result<AnalyzeResponse, AnalysisError> {
    verify_static_config();

    let text = req.text.trim();
    if text.is_empty() {
        return Err(AnalysisError::EmptyText);
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AnalysisError::TextTooLong { max: MAX_TEXT_LEN });
    }

    let request_id = Uuid::new_v4().to_string();
    info!(
        "[ANALYSIS] request={} text: {} chars ({} bytes)",
        request_id,
        text.chars().count(),
        text.len()
    );

    // Deterministic signals first; they never fail.
    let heur = heuristics::detect_flags(text);

    let (judgments, overview) = gather_judgments(client, text, req.include_overview).await;

    let top_k = req.snippets_top_k.clamp(MIN_TOP_K, MAX_TOP_K) as usize;
    let evidence_lines = evidence::extract_category_lines(text, top_k);
    let evidence_scores = evidence::category_scores(&evidence_lines);

    let (prefs_valid, pref_values) = match req.preferences.as_ref() {
        Some(raw) => preferences::validate(raw),
        None => (true, preferences::defaults()),
    };

    // Pass 1: keyword conflicts only (no scores yet) drive the penalties.
    let no_scores = BTreeMap::new();
    let pre_conflicts = conflicts::detect_conflicts(&pref_values, &no_scores, &evidence_lines);
    let penalties = conflicts::preference_penalties(&pre_conflicts);

    let breakdown = blend::compute_score(
        &heur,
        &judgments,
        Some(&evidence_scores),
        Some(&penalties),
    );

    // Pass 2: report conflicts against the post-penalty scores.
    let final_conflicts =
        conflicts::detect_conflicts(&pref_values, &breakdown.categories, &evidence_lines);

    let mut categories = breakdown.categories;
    if !req.include_evidence_probs {
        for result in categories.values_mut() {
            result.evidence_prob = None;
        }
    }

    info!(
        "[ANALYSIS] request={} trust_score={} risk={} conflicts={}",
        request_id,
        breakdown.trust_score,
        breakdown.risk_level,
        final_conflicts.len()
    );

    Ok(AnalyzeResponse {
        trust_score: breakdown.trust_score,
        risk_level: breakdown.risk_level,
        categories,
        weights: category_weights(),
        preferences: PreferenceReport {
            valid: prefs_valid,
            values: pref_values,
            schema: preferences::schema_map(),
        },
        evidence: if req.return_snippets {
            Some(evidence_lines)
        } else {
            None
        },
        personalized: Personalized {
            conflicts: final_conflicts,
            penalties,
        },
        overview,
        version: env!("CARGO_PKG_VERSION").to_string(),
        request_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline() -> ProviderClient {
        std::env::set_var("POLICYLENS_DISABLE_JUDGE", "1");
        ProviderClient::new()
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = offline();
        let req = AnalyzeRequest::new("   ");
        let err = run_analysis(&client, &req).await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyText));
    }

    #[tokio::test]
    async fn test_oversized_text_rejected() {
        let client = offline();
        let req = AnalyzeRequest::new("a".repeat(MAX_TEXT_LEN + 1));
        let err = run_analysis(&client, &req).await.unwrap_err();
        assert!(matches!(err, AnalysisError::TextTooLong { .. }));
    }

    #[tokio::test]
    async fn test_degraded_analysis_is_complete() {
        let client = offline();
        let req = AnalyzeRequest::new("We may sell your data to third parties.");
        let resp = run_analysis(&client, &req).await.unwrap();

        assert_eq!(resp.categories.len(), Category::ALL.len());
        assert_eq!(resp.weights.len(), Category::ALL.len());
        assert!(resp.trust_score >= 0.0 && resp.trust_score <= 100.0);
        assert!(["High", "Medium", "Low"].contains(&resp.risk_level.as_str()));
        assert!(resp.preferences.valid);
        assert!(resp.evidence.is_some());
        assert!(resp.overview.is_none());
        assert!(!resp.request_id.is_empty());

        // Judge disabled: the third-party category runs on neutral 0.5 plus
        // its heuristic delta and evidence, minus the sale/sharing penalty.
        let tp = &resp.categories[&Category::ThirdPartySharing];
        assert!(tp.score < 0.5);
        assert!(!tp.heuristics.flags.is_empty());
    }

    #[tokio::test]
    async fn test_conflict_and_penalty_flow() {
        let client = offline();
        let req = AnalyzeRequest::new("We may sell your data to third parties.");
        let resp = run_analysis(&client, &req).await.unwrap();

        // no_sale_or_sharing defaults to enabled and the text mentions selling.
        assert!(resp
            .personalized
            .conflicts
            .iter()
            .any(|c| c.preference == "no_sale_or_sharing"));
        let penalty = resp.personalized.penalties[&Category::ThirdPartySharing];
        assert!((penalty - (-0.10)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_preferences_respected_and_reported() {
        let client = offline();
        let mut req = AnalyzeRequest::new("We may sell your data to third parties.");
        req.preferences = Some(json!({"no_sale_or_sharing": false, "bogus": true}));
        let resp = run_analysis(&client, &req).await.unwrap();

        assert!(resp.preferences.valid);
        assert_eq!(resp.preferences.values["no_sale_or_sharing"], false);
        assert!(!resp.preferences.values.contains_key("bogus"));
        assert!(resp
            .personalized
            .conflicts
            .iter()
            .all(|c| c.preference != "no_sale_or_sharing"));
        assert!(!resp.personalized.penalties.contains_key(&Category::ThirdPartySharing));
    }

    #[tokio::test]
    async fn test_malformed_preferences_fall_back() {
        let client = offline();
        let mut req = AnalyzeRequest::new("Just some policy text.");
        req.preferences = Some(json!("not a map"));
        let resp = run_analysis(&client, &req).await.unwrap();
        assert!(!resp.preferences.valid);
        assert_eq!(resp.preferences.values, crate::services::analysis::preferences::defaults());
    }

    #[tokio::test]
    async fn test_snippet_and_prob_toggles() {
        let client = offline();
        let mut req = AnalyzeRequest::new("We use encryption and TLS.");
        req.return_snippets = false;
        req.include_evidence_probs = false;
        let resp = run_analysis(&client, &req).await.unwrap();
        assert!(resp.evidence.is_none());
        assert!(resp.categories.values().all(|c| c.evidence_prob.is_none()));
    }

    #[tokio::test]
    async fn test_top_k_clamped() {
        let client = offline();
        let mut req = AnalyzeRequest::new(
            "We sell data. We sell more data. We sell even more data. \
             We sell data again. We sell data one more time.",
        );
        req.snippets_top_k = 0;
        let resp = run_analysis(&client, &req).await.unwrap();
        let evidence = resp.evidence.unwrap();
        assert_eq!(evidence[&Category::ThirdPartySharing].len(), 1);
    }

    #[test]
    fn test_verify_static_config_passes() {
        verify_static_config();
    }
}
