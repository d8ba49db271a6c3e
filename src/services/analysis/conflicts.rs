// Preference Conflict Detection
// Maps enabled preferences onto the evidence: a keyword hit in an associated
// category's snippets is a conflict; failing that, a weak category score with
// any evidence at all counts too. Pure function, safe to run both before
// scores exist (penalty pass) and after (reporting pass).

use crate::models::{Category, CategoryResult, Conflict, EvidenceSnippet};
use std::collections::BTreeMap;

use super::preferences;

/// Score penalty contributed by each detected conflict.
pub const CONFLICT_PENALTY: f64 = -0.10;

/// Category score at or below which a preference counts as conflicted even
/// without a keyword match, provided the category has evidence.
const WEAK_SCORE_MAX: f64 = 0.35;

fn signals_for(pref_key: &str) -> Option<(&'static [Category], &'static [&'static str])> {
    match pref_key {
        "protect_location" => Some((
            &[Category::ChildrenSensitiveData, Category::DataCollection],
            &["precise location", "geolocation", "gps", "location data"],
        )),
        "opt_out_targeted_ads" => Some((
            &[Category::UserControlRights, Category::ThirdPartySharing],
            &["behavioral advertising", "targeted ads", "adtech", "cross-site tracking"],
        )),
        "no_sale_or_sharing" => Some((
            &[Category::ThirdPartySharing],
            &["sell", "sale", "data broker", "share with third"],
        )),
        "limit_data_collection" => Some((
            &[Category::DataCollection, Category::PurposeLimitation],
            &["categories of information", "collect", "legitimate interests", "compatible further processing"],
        )),
        "short_retention" => Some((
            &[Category::RetentionDeletion],
            &["retain indefinitely", "as long as necessary", "retention period"],
        )),
        "restrict_cross_border" => Some((
            &[Category::InternationalTransfers],
            &["international transfers", "cross-border", "standard contractual clauses", "adequacy decision"],
        )),
        "strong_security" => Some((
            &[Category::SecurityPractices],
            &["encryption", "tls", "access controls", "breach notification", "iso 27001", "soc 2"],
        )),
        "child_privacy" => Some((
            &[Category::ChildrenSensitiveData],
            &["coppa", "children", "minor", "biometric", "health data", "sensitive categories"],
        )),
        _ => None,
    }
}

fn text_contains_any(text: &str, terms: &[&str]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|t| lower.contains(t))
}

fn human_message(pref_key: &str, evidence: &EvidenceSnippet) -> String {
    let base = match pref_key {
        "protect_location" => "This app references collecting or sharing precise location, which conflicts with your preference to keep location private.",
        "opt_out_targeted_ads" => "This policy mentions behavioral/targeted advertising; you prefer to opt out of that.",
        "no_sale_or_sharing" => "We found language about selling or sharing personal data; you opted to avoid sale/sharing.",
        "limit_data_collection" => "They describe broad collection or vague purposes; you prefer limiting data collection.",
        "short_retention" => "They imply long/indefinite retention; you prefer short retention periods.",
        "restrict_cross_border" => "Cross-border transfers are mentioned; you prefer restricting transfers without strong safeguards.",
        "strong_security" => "Security language appears weak or absent; you prefer strong security practices.",
        "child_privacy" => "Children/sensitive data handling may be insufficient; you prefer stricter protection.",
        _ => "This seems to conflict with your stated preference.",
    };
    format!("{} Example: \u{201c}{}\u{201d}", base, evidence.text)
}

/// Detect which enabled preferences are contradicted by the text. At most one
/// conflict per preference: keyword matches win (first category, first
/// snippet in ranked order); only when no keyword matches anywhere does the
/// weak-score fallback apply. `category_results` may be empty on the
/// pre-scoring pass -- unknown scores never trigger the fallback.
pub fn detect_conflicts(
    prefs: &BTreeMap<String, bool>,
    category_results: &BTreeMap<Category, CategoryResult>,
    evidence: &BTreeMap<Category, Vec<EvidenceSnippet>>,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for spec in preferences::SCHEMA {
        if !prefs.get(spec.key).copied().unwrap_or(false) {
            continue;
        }
        let Some((categories, keywords)) = signals_for(spec.key) else {
            continue;
        };

        let mut matched: Option<(Category, EvidenceSnippet)> = None;

        // Prefer an evidence line that includes one of the keywords.
        'keyword_scan: for cat in categories {
            let snippets = evidence.get(cat).map(|v| v.as_slice()).unwrap_or(&[]);
            for snippet in snippets {
                if text_contains_any(&snippet.text, keywords) {
                    matched = Some((*cat, snippet.clone()));
                    break 'keyword_scan;
                }
            }
        }

        // Fallback: a notably weak category that still produced evidence.
        if matched.is_none() {
            for cat in categories {
                let score = category_results.get(cat).map(|c| c.score).unwrap_or(1.0);
                let snippets = evidence.get(cat).map(|v| v.as_slice()).unwrap_or(&[]);
                if score <= WEAK_SCORE_MAX {
                    if let Some(top) = snippets.first() {
                        matched = Some((*cat, top.clone()));
                        break;
                    }
                }
            }
        }

        if let Some((category, snippet)) = matched {
            conflicts.push(Conflict {
                preference: spec.key.to_string(),
                category,
                message: human_message(spec.key, &snippet),
                evidence: Some(snippet),
            });
        }
    }

    conflicts
}

/// Turn detected conflicts into per-category score penalties; multiple
/// conflicts on the same category sum.
pub fn preference_penalties(conflicts: &[Conflict]) -> BTreeMap<Category, f64> {
    let mut penalties = BTreeMap::new();
    for conflict in conflicts {
        *penalties.entry(conflict.category).or_insert(0.0) += CONFLICT_PENALTY;
    }
    penalties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeuristicSummary;

    fn snippet(text: &str, score: f64) -> EvidenceSnippet {
        EvidenceSnippet {
            text: text.to_string(),
            start: 0,
            end: text.len() as i32,
            score,
            matched: vec![],
        }
    }

    fn result(score: f64) -> CategoryResult {
        CategoryResult {
            score,
            reason: String::new(),
            heuristics: HeuristicSummary::default(),
            evidence_prob: None,
        }
    }

    fn only(key: &str) -> BTreeMap<String, bool> {
        let mut prefs: BTreeMap<String, bool> =
            preferences::defaults().keys().map(|k| (k.clone(), false)).collect();
        prefs.insert(key.to_string(), true);
        prefs
    }

    #[test]
    fn test_keyword_match_produces_conflict() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ThirdPartySharing,
            vec![snippet("We may sell your personal data to advertisers.", 0.6)],
        );

        let conflicts = detect_conflicts(&only("no_sale_or_sharing"), &BTreeMap::new(), &evidence);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].preference, "no_sale_or_sharing");
        assert_eq!(conflicts[0].category, Category::ThirdPartySharing);
        assert!(conflicts[0].message.contains("sell your personal data"));
        assert!(conflicts[0].evidence.is_some());
    }

    #[test]
    fn test_disabled_preference_never_conflicts() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ThirdPartySharing,
            vec![snippet("We sell everything.", 0.9)],
        );
        let prefs: BTreeMap<String, bool> =
            preferences::defaults().keys().map(|k| (k.clone(), false)).collect();
        assert!(detect_conflicts(&prefs, &BTreeMap::new(), &evidence).is_empty());
    }

    #[test]
    fn test_first_category_first_snippet_wins() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ChildrenSensitiveData,
            vec![
                snippet("We log gps coordinates continuously.", 0.8),
                snippet("We also track precise location indoors.", 0.7),
            ],
        );
        evidence.insert(
            Category::DataCollection,
            vec![snippet("We collect location data broadly.", 0.9)],
        );

        let conflicts = detect_conflicts(&only("protect_location"), &BTreeMap::new(), &evidence);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].category, Category::ChildrenSensitiveData);
        assert!(conflicts[0].evidence.as_ref().unwrap().text.contains("gps"));
    }

    #[test]
    fn test_low_score_fallback_requires_evidence() {
        let mut scores = BTreeMap::new();
        scores.insert(Category::SecurityPractices, result(0.2));

        // Weak score but no evidence: no conflict.
        let conflicts = detect_conflicts(&only("strong_security"), &scores, &BTreeMap::new());
        assert!(conflicts.is_empty());

        // Weak score plus a non-matching snippet: fallback fires with the top snippet.
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::SecurityPractices,
            vec![snippet("We take safety seriously.", 0.3)],
        );
        let conflicts = detect_conflicts(&only("strong_security"), &scores, &evidence);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("safety seriously"));
    }

    #[test]
    fn test_fallback_ignored_when_score_unknown() {
        // Pre-scoring pass: empty score map means no category qualifies as weak.
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::SecurityPractices,
            vec![snippet("We take safety seriously.", 0.3)],
        );
        let conflicts = detect_conflicts(&only("strong_security"), &BTreeMap::new(), &evidence);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_at_most_one_conflict_per_preference() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ThirdPartySharing,
            vec![
                snippet("We sell data.", 0.9),
                snippet("Sale of data is common.", 0.8),
            ],
        );
        let conflicts = detect_conflicts(&only("no_sale_or_sharing"), &BTreeMap::new(), &evidence);
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn test_deterministic_ordering() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ThirdPartySharing,
            vec![snippet("We sell data and run targeted ads.", 0.9)],
        );
        evidence.insert(
            Category::RetentionDeletion,
            vec![snippet("We retain indefinitely.", 0.8)],
        );

        let mut prefs = only("no_sale_or_sharing");
        prefs.insert("opt_out_targeted_ads".to_string(), true);
        prefs.insert("short_retention".to_string(), true);

        let a = detect_conflicts(&prefs, &BTreeMap::new(), &evidence);
        let b = detect_conflicts(&prefs, &BTreeMap::new(), &evidence);
        assert_eq!(a.len(), 3);
        let keys_a: Vec<&str> = a.iter().map(|c| c.preference.as_str()).collect();
        let keys_b: Vec<&str> = b.iter().map(|c| c.preference.as_str()).collect();
        assert_eq!(keys_a, keys_b);
        // Schema declaration order: ads before sale before retention.
        assert_eq!(keys_a, vec!["opt_out_targeted_ads", "no_sale_or_sharing", "short_retention"]);
    }

    #[test]
    fn test_penalties_sum_per_category() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::ChildrenSensitiveData,
            vec![snippet("We collect precise location and biometric data.", 0.9)],
        );

        let mut prefs = only("protect_location");
        prefs.insert("child_privacy".to_string(), true);

        let conflicts = detect_conflicts(&prefs, &BTreeMap::new(), &evidence);
        assert_eq!(conflicts.len(), 2);
        let penalties = preference_penalties(&conflicts);
        assert!((penalties[&Category::ChildrenSensitiveData] - (-0.20)).abs() < 1e-9);
    }

    #[test]
    fn test_message_quotes_snippet_verbatim() {
        let mut evidence = BTreeMap::new();
        evidence.insert(
            Category::RetentionDeletion,
            vec![snippet("Records are kept as long as necessary.", 0.5)],
        );
        let conflicts = detect_conflicts(&only("short_retention"), &BTreeMap::new(), &evidence);
        assert!(conflicts[0]
            .message
            .contains("\u{201c}Records are kept as long as necessary.\u{201d}"));
    }
}
