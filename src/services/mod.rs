// PolicyLens Core Services
// Migrated from the Python backend

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod analysis;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;

// Re-export analysis module functions
pub use analysis::{
    detect_flags,
    preference_defaults,
    validate_preferences,
    extract_category_lines,
    category_scores,
    compute_score,
    risk_label,
    detect_conflicts,
    preference_penalties,
    run_analysis,
    verify_static_config,
    AnalysisError,
    MAX_TEXT_LEN,
};
