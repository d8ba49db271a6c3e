// Preference Schema
// Fixed questionnaire of boolean privacy preferences. True means
// "I prefer to KEEP this private / I OPT OUT". Validation never fails:
// untrusted client input degrades to defaults instead of rejecting.

use crate::models::{Category, PreferenceInfo};
use serde_json::Value;
use std::collections::BTreeMap;

pub struct PreferenceSpec {
    pub key: &'static str,
    pub title: &'static str,
    pub category: Category,
    pub default: bool,
}

pub const SCHEMA: &[PreferenceSpec] = &[
    PreferenceSpec {
        key: "protect_location",
        title: "Keep my precise location private",
        category: Category::ChildrenSensitiveData,
        default: true,
    },
    PreferenceSpec {
        key: "opt_out_targeted_ads",
        title: "Opt out of targeted/behavioral advertising",
        category: Category::UserControlRights,
        default: true,
    },
    PreferenceSpec {
        key: "no_sale_or_sharing",
        title: "Do not sell or share my personal data",
        category: Category::ThirdPartySharing,
        default: true,
    },
    PreferenceSpec {
        key: "limit_data_collection",
        title: "Limit the types of data collected (only necessary)",
        category: Category::DataCollection,
        default: false,
    },
    PreferenceSpec {
        key: "short_retention",
        title: "Do not retain my data indefinitely (short retention only)",
        category: Category::RetentionDeletion,
        default: true,
    },
    PreferenceSpec {
        key: "restrict_cross_border",
        title: "Avoid cross-border transfers unless strong safeguards",
        category: Category::InternationalTransfers,
        default: false,
    },
    PreferenceSpec {
        key: "strong_security",
        title: "Require strong security (encryption, access controls, breach notice)",
        category: Category::SecurityPractices,
        default: true,
    },
    PreferenceSpec {
        key: "child_privacy",
        title: "Protect minors' data and sensitive categories",
        category: Category::ChildrenSensitiveData,
        default: true,
    },
];

pub fn defaults() -> BTreeMap<String, bool> {
    SCHEMA
        .iter()
        .map(|spec| (spec.key.to_string(), spec.default))
        .collect()
}

pub fn schema_map() -> BTreeMap<String, PreferenceInfo> {
    SCHEMA
        .iter()
        .map(|spec| {
            (
                spec.key.to_string(),
                PreferenceInfo {
                    r#type: "boolean".to_string(),
                    title: spec.title.to_string(),
                    category: spec.category,
                    default: spec.default,
                },
            )
        })
        .collect()
}

// JSON truthiness: null/false/0/""/[]/{} are false, everything else true.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Validate client preferences against the schema. Non-object input falls
/// back entirely to defaults with `valid = false`; an object yields the full
/// default set with known keys overridden and unknown keys dropped.
pub fn validate(input: &Value) -> (bool, BTreeMap<String, bool>) {
    let obj = match input.as_object() {
        Some(obj) => obj,
        None => return (false, defaults()),
    };

    let mut cleaned = defaults();
    for spec in SCHEMA {
        if let Some(value) = obj.get(spec.key) {
            cleaned.insert(spec.key.to_string(), truthy(value));
        }
    }
    (true, cleaned)
}
