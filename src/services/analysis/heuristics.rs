// Heuristic Pattern Detector
// Deterministic regex rules aggregated with diminishing returns per rule.
// Rules are static data iterated in declaration order so results are
// reproducible; the per-category delta is clamped after every rule.

use crate::models::{Category, HeuristicResult};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RuleKind {
    Penalty,
    Bonus,
}

pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub pattern: &'static str,
    pub delta: f64,
    pub flag: &'static str,
    pub kind: RuleKind,
}

const RULES: &[Rule] = &[
    // --- Third-Party Sharing/Selling ---
    Rule {
        id: "TP_SELL",
        category: Category::ThirdPartySharing,
        pattern: r"\b(sell|sale|sold|monetiz(?:e|ation)|broker|data broker)\b",
        delta: -0.35,
        flag: "Mentions selling/monetizing or broker relationship",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "TP_SHARE_THIRDPARTY",
        category: Category::ThirdPartySharing,
        pattern: r"\bshare(?:s|d|ing)?\b.{0,30}\b(third[- ]?part(?:y|ies)|partners?)\b",
        delta: -0.25,
        flag: "Mentions sharing with third parties/partners",
        kind: RuleKind::Penalty,
    },
    // UI control but helps sharing via user choice
    Rule {
        id: "TP_DNS_LINK",
        category: Category::UserControlRights,
        pattern: r"do\s+not\s+(sell|share)",
        delta: 0.15,
        flag: "Provides a Do Not Sell/Share option",
        kind: RuleKind::Bonus,
    },
    // --- Tracking/Ads ---
    Rule {
        id: "ADS_TRACKING",
        category: Category::ThirdPartySharing,
        pattern: r"\b(adtech|behavioral\s+advertising|targeted\s+ads|cross[- ]site\s+tracking)\b",
        delta: -0.15,
        flag: "Behavioral/targeted advertising or cross-site tracking",
        kind: RuleKind::Penalty,
    },
    // --- Purpose Limitation / Vagueness ---
    Rule {
        id: "PURPOSE_VAGUE_LI",
        category: Category::PurposeLimitation,
        pattern: r"\blegitimate\s+interests\b",
        delta: -0.15,
        flag: "Relies on vague 'legitimate interests'",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "PURPOSE_VAGUE_MAY_SHARE",
        category: Category::PurposeLimitation,
        pattern: r"\bmay\b.{0,20}\bshare\b",
        delta: -0.10,
        flag: "Vague 'may share' without specifics",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "PURPOSE_LIMIT_GOOD",
        category: Category::PurposeLimitation,
        pattern: r"\buse(?:d)?\s+only\s+for\b|\bfor\s+the\s+purposes\s+described\b",
        delta: 0.10,
        flag: "States use limited to specific purposes",
        kind: RuleKind::Bonus,
    },
    // --- Data Collection ---
    Rule {
        id: "COLLECT_SENSITIVE",
        category: Category::DataCollection,
        pattern: r"\b(sensitive\s+(?:personal\s+)?information|biometric|genetic|health\s+data|precise\s+location)\b",
        delta: -0.20,
        flag: "Collects sensitive categories",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "COLLECT_LISTS_CATEGORIES",
        category: Category::DataCollection,
        pattern: r"\b(categories|types)\s+of\s+(?:personal\s+)?(information|data)\b",
        delta: 0.10,
        flag: "Discloses categories of data collected",
        kind: RuleKind::Bonus,
    },
    // --- User Rights & Controls ---
    Rule {
        id: "RIGHTS_LIST",
        category: Category::UserControlRights,
        pattern: r"\b(access|delete|erasure|correct|rectify|portability|opt[- ]?out)\b",
        delta: 0.15,
        flag: "Lists user rights (access/delete/correct/portability/opt-out)",
        kind: RuleKind::Bonus,
    },
    Rule {
        id: "REGULATORY_RIGHTS",
        category: Category::UserControlRights,
        pattern: r"\b(CCPA|GDPR|Do\s+Not\s+Sell|Do\s+Not\s+Share)\b",
        delta: 0.10,
        flag: "References CCPA/GDPR or Do Not Sell/Share",
        kind: RuleKind::Bonus,
    },
    // --- Retention & Deletion ---
    Rule {
        id: "RETENTION_INDEFINITE",
        category: Category::RetentionDeletion,
        pattern: r"\bretain(?:ed|tion)?\b.*\bindefinite(?:ly)?\b",
        delta: -0.25,
        flag: "States indefinite retention",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "RETENTION_VAGUE_LONG",
        category: Category::RetentionDeletion,
        pattern: r"\bretain\b.*\b(as long as (?:necessary|needed))\b",
        delta: -0.15,
        flag: "Vague retention ('as long as necessary')",
        kind: RuleKind::Penalty,
    },
    Rule {
        id: "RETENTION_TIMELINE",
        category: Category::RetentionDeletion,
        pattern: r"\b(retention\s+period|deleted\s+after|deletion\s+timeline|retain(?:ed|tion)?\s+for\s+\d+\s+(?:days|months|years))\b",
        delta: 0.15,
        flag: "Provides retention/deletion timelines",
        kind: RuleKind::Bonus,
    },
    // --- Security Practices ---
    Rule {
        id: "SECURITY_ENCRYPTION",
        category: Category::SecurityPractices,
        pattern: r"\b(encrypt(?:ed|ion)|TLS|HTTPS)\b",
        delta: 0.10,
        flag: "Mentions encryption/TLS",
        kind: RuleKind::Bonus,
    },
    Rule {
        id: "SECURITY_CONTROLS",
        category: Category::SecurityPractices,
        pattern: r"\b(access\s+controls|SOC\s*2|ISO\s*27001|security\s+measures|breach\s+notification)\b",
        delta: 0.10,
        flag: "Mentions recognized security controls or breach notice",
        kind: RuleKind::Bonus,
    },
    // --- International Transfers & Jurisdiction ---
    Rule {
        id: "XFER_SAFEGUARDS",
        category: Category::InternationalTransfers,
        pattern: r"\b(standard\s+contractual\s+clauses|SCCs?|data\s+privacy\s+framework|adequacy\s+decision)\b",
        delta: 0.10,
        flag: "Mentions SCCs/DPF/adequacy safeguards",
        kind: RuleKind::Bonus,
    },
    Rule {
        id: "JURIS_ARBITRATION",
        category: Category::InternationalTransfers,
        pattern: r"\b(arbitration|venue|governing\s+law|jurisdiction)\b",
        delta: -0.05,
        flag: "Specifies venue/arbitration (potentially user-unfriendly)",
        kind: RuleKind::Penalty,
    },
    // --- Children & Sensitive Data ---
    Rule {
        id: "COPPA_CHILDREN",
        category: Category::ChildrenSensitiveData,
        pattern: r"\b(COPPA|child(?:ren)?|minor|under\s*1[3-8])\b",
        delta: 0.10,
        flag: "States minors/COPPA stance",
        kind: RuleKind::Bonus,
    },
    Rule {
        id: "SENSITIVE_LIMITS",
        category: Category::ChildrenSensitiveData,
        pattern: r"\b(biometric|health\s+data|precise\s+location)\b.*\b(not\s+collect|do\s+not\s+collect|prohibit)\b",
        delta: 0.10,
        flag: "Limits collection of sensitive categories",
        kind: RuleKind::Bonus,
    },
];

struct CompiledRule {
    spec: &'static Rule,
    regex: Regex,
}

static COMPILED: OnceLock<Vec<CompiledRule>> = OnceLock::new();

fn compiled_rules() -> &'static [CompiledRule] {
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| CompiledRule {
                spec: rule,
                regex: RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                    .unwrap_or_else(|e| panic!("rule {} pattern failed to compile: {}", rule.id, e)),
            })
            .collect()
    })
}

/// Number of rules in the static table; forces pattern compilation.
pub fn rule_count() -> usize {
    compiled_rules().len()
}

fn apply(delta: f64, amount: f64) -> f64 {
    (delta + amount).clamp(-1.0, 1.0)
}

/// Run all rules and aggregate penalties/bonuses per category.
/// Returns every category, zeroed when nothing fired.
pub fn detect_flags(text: &str) -> BTreeMap<Category, HeuristicResult> {
    let mut out: BTreeMap<Category, HeuristicResult> = Category::ALL
        .iter()
        .map(|c| (*c, HeuristicResult::default()))
        .collect();

    for rule in compiled_rules() {
        let n = rule.regex.find_iter(text).count();
        if n == 0 {
            continue;
        }

        // Diminishing returns: effective_count = 1 + 0.5*(n-1) up to 3 hits
        let eff = 1.0 + 0.5 * ((n.min(3) as f64) - 1.0);
        let delta_add = rule.spec.delta * eff;

        let entry = out.get_mut(&rule.spec.category).expect("all categories initialized");
        entry.delta = apply(entry.delta, delta_add);
        entry.hits.insert(rule.spec.id.to_string(), n as i32);

        let pretty = if n > 1 {
            format!("{} (x{})", rule.spec.flag, n)
        } else {
            rule.spec.flag.to_string()
        };
        entry.flags.push(pretty);
    }

    out
}
