// Analysis Module
// Policy trust scoring core organized into specialized submodules:
// - heuristics: deterministic pattern detection (rule table + flags)
// - preferences: user preference schema and total-tolerance validation
// - evidence: sentence-level keyword evidence extraction
// - judge: semantic-judgment service prompts and lenient parsing
// - blend: signal blending into category scores and the trust score
// - conflicts: preference conflict detection (two-pass capable)
// - pipeline: per-request orchestration and graceful degradation

pub mod heuristics;
pub mod preferences;
pub mod evidence;
pub mod judge;
pub mod blend;
pub mod conflicts;
pub mod pipeline;

// Re-export commonly used functions
pub use heuristics::detect_flags;
pub use preferences::{defaults as preference_defaults, validate as validate_preferences};
pub use evidence::{category_scores, extract_category_lines};
pub use judge::{judge_categories, judge_overview};
pub use blend::{compute_score, risk_label, ScoreBreakdown};
pub use conflicts::{detect_conflicts, preference_penalties, CONFLICT_PENALTY};
pub use pipeline::{run_analysis, verify_static_config, AnalysisError, MAX_TEXT_LEN};
