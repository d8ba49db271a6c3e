// Evidence Extraction
// Sentence-level keyword evidence per category: each sentence is scanned
// against per-category phrase seeds; matching sentences become ranked
// snippets used for display and for conflict matching.

use crate::models::{Category, EvidenceSnippet};
use crate::services::text_processor::split_sentences_with_offsets;
use std::collections::BTreeMap;

fn category_phrases(cat: Category) -> &'static [&'static str] {
    match cat {
        Category::DataCollection => &[
            "information we collect",
            "data we collect",
            "categories of information",
            "collect personal information",
            "collection of personal data",
            "sensitive information",
            "collect",
        ],
        Category::ThirdPartySharing => &[
            "share with third",
            "shared with third parties",
            "our partners",
            "data broker",
            "sell",
            "sale",
            "sold",
            "monetize",
            "monetized",
            "broker",
        ],
        Category::PurposeLimitation => &[
            "purpose",
            "compatible further processing",
            "use only for",
            "use for the purposes described",
            "legitimate interests",
        ],
        Category::UserControlRights => &[
            "access your data",
            "delete your data",
            "erasure",
            "correct your data",
            "rectify",
            "data portability",
            "opt out",
            "do not sell",
            "do not share",
            "ccpa",
            "gdpr",
        ],
        Category::RetentionDeletion => &[
            "retain data",
            "retention period",
            "deleted after",
            "deletion timeline",
            "retain indefinitely",
            "as long as necessary",
            "as long as needed",
            "retain",
        ],
        Category::SecurityPractices => &[
            "encryption",
            "encrypted",
            "tls",
            "iso 27001",
            "soc 2",
            "access controls",
            "security measures",
            "security breach",
            "breach notification",
        ],
        Category::InternationalTransfers => &[
            "international transfers",
            "cross-border",
            "transfer outside",
            "jurisdiction",
            "venue",
            "arbitration",
            "data privacy framework",
            "standard contractual clauses",
            "adequacy decision",
        ],
        Category::ChildrenSensitiveData => &[
            "coppa",
            "child",
            "children",
            "minor",
            "under 13",
            "under thirteen",
            "biometric",
            "health data",
            "precise location",
            "sensitive categories",
        ],
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut pos = 0;
    while let Some(i) = haystack[pos..].find(needle) {
        count += 1;
        pos += i + needle.len();
    }
    count
}

/// Extract up to `top_k` evidence snippets per category, ranked by score
/// descending (stable order for ties). Every category is present in the
/// returned map, with an empty list when nothing matched.
pub fn extract_category_lines(
    text: &str,
    top_k: usize,
) -> BTreeMap<Category, Vec<EvidenceSnippet>> {
    let mut buckets: BTreeMap<Category, Vec<EvidenceSnippet>> = Category::ALL
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();

    for sent in split_sentences_with_offsets(text) {
        let lower = sent.text.to_lowercase();

        for cat in Category::ALL {
            let mut hits = 0usize;
            let mut matched: Vec<&str> = Vec::new();
            for phrase in category_phrases(cat) {
                let n = count_occurrences(&lower, phrase);
                if n > 0 {
                    hits += n;
                    matched.push(phrase);
                }
            }
            if hits == 0 {
                continue;
            }

            let kw = (hits as f64 / 3.0).min(1.0);
            let score = (0.7 * kw).min(1.0);
            matched.sort_unstable();
            matched.dedup();

            buckets
                .get_mut(&cat)
                .expect("all categories initialized")
                .push(EvidenceSnippet {
                    text: sent.text.clone(),
                    start: sent.start,
                    end: sent.end,
                    score,
                    matched: matched.iter().map(|m| m.to_string()).collect(),
                });
        }
    }

    for snippets in buckets.values_mut() {
        snippets.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        snippets.truncate(top_k);
    }

    buckets
}

/// Per-category document-level confidence: the top snippet score. Categories
/// with no matching sentence are omitted entirely -- absence of corroboration
/// is not a zero score.
pub fn category_scores(
    evidence: &BTreeMap<Category, Vec<EvidenceSnippet>>,
) -> BTreeMap<Category, f64> {
    evidence
        .iter()
        .filter_map(|(cat, snippets)| snippets.first().map(|top| (*cat, top.score)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "We may sell your data to partners. \
We use encryption and TLS for transport. \
Data is retained as long as necessary. \
This page is about our company history.";

    #[test]
    fn test_matching_sentences_become_snippets() {
        let evidence = extract_category_lines(POLICY, 3);
        let tp = &evidence[&Category::ThirdPartySharing];
        assert_eq!(tp.len(), 1);
        assert!(tp[0].text.contains("sell your data"));
        assert!(tp[0].matched.contains(&"sell".to_string()));

        let sec = &evidence[&Category::SecurityPractices];
        assert_eq!(sec.len(), 1);
        // "encryption" + "tls" -> 2 hits -> 0.7 * (2/3)
        assert!((sec[0].score - 0.7 * (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_offsets_index_source_text() {
        let evidence = extract_category_lines(POLICY, 3);
        for snippets in evidence.values() {
            for s in snippets {
                assert_eq!(&POLICY[s.start as usize..s.end as usize], s.text);
            }
        }
    }

    #[test]
    fn test_silent_categories_have_empty_lists() {
        let evidence = extract_category_lines("Nothing relevant here at all", 3);
        assert_eq!(evidence.len(), Category::ALL.len());
        assert!(evidence.values().all(|v| v.is_empty()));
        assert!(category_scores(&evidence).is_empty());
    }

    #[test]
    fn test_ranking_and_top_k_cap() {
        let text = "We sell data. We sell and sell and sell data to a data broker. We sell things.";
        let evidence = extract_category_lines(text, 2);
        let tp = &evidence[&Category::ThirdPartySharing];
        assert_eq!(tp.len(), 2);
        assert!(tp[0].score >= tp[1].score);
        // The sentence with the most hits ranks first.
        assert!(tp[0].text.contains("data broker"));
    }

    #[test]
    fn test_category_scores_take_top_snippet() {
        let evidence = extract_category_lines(POLICY, 3);
        let scores = category_scores(&evidence);
        assert!(scores.contains_key(&Category::ThirdPartySharing));
        assert!(!scores.contains_key(&Category::UserControlRights));
        for v in scores.values() {
            assert!(*v >= 0.0 && *v <= 1.0);
        }
    }
}
