use anyhow::Context;
use policy_lens_lib::models::{AnalyzeRequest, Category};
use policy_lens_lib::services::providers::ProviderClient;
use policy_lens_lib::services::text_processor::normalize_punctuation;
use policy_lens_lib::services::{run_analysis, verify_static_config};

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

/// Parse `--prefs k=v,k2=v2` into a JSON object the validator understands.
fn parse_prefs(spec: &str) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for pair in spec.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (pair, "true"),
        };
        let enabled = matches!(value, "1" | "true" | "TRUE" | "yes" | "on");
        map.insert(key.to_string(), serde_json::Value::Bool(enabled));
    }
    serde_json::Value::Object(map)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin analyze_policy -- <policy.txt> [--prefs k=v,...] [--top-k <n>] [--no-snippets] [--overview] [--offline] [--out <json_path>]\n\nNotes:\n  - The judgment service needs GEMINI_API_KEY (or OPENAI_API_KEY with POLICYLENS_JUDGE_PROVIDER=openai).\n  - `--offline` skips the judgment call; categories score from heuristics and evidence around a neutral baseline.\n  - Preference keys default to the schema defaults; `--prefs no_sale_or_sharing=false` overrides one."
        );
        return Ok(());
    }

    policy_lens_lib::init_logging();
    verify_static_config();

    let path = args[1].clone();
    let prefs = parse_arg_value(&args, "--prefs");
    let top_k: i32 = parse_arg_value(&args, "--top-k")
        .and_then(|s| s.parse().ok())
        .unwrap_or(3);
    let no_snippets = has_flag(&args, "--no-snippets");
    let include_overview = has_flag(&args, "--overview");
    let offline = has_flag(&args, "--offline");
    let out_path = parse_arg_value(&args, "--out");

    if offline {
        std::env::set_var("POLICYLENS_DISABLE_JUDGE", "1");
    }

    let raw = std::fs::read_to_string(&path).with_context(|| format!("read file failed: {}", path))?;
    let text = normalize_punctuation(&raw);

    println!("File: {}", path);
    println!("Text: {} chars ({} bytes)", text.chars().count(), text.len());
    println!("Judgment service: {}", if offline { "off" } else { "on" });
    println!();

    let mut req = AnalyzeRequest::new(text);
    req.preferences = prefs.as_deref().map(parse_prefs);
    req.snippets_top_k = top_k;
    req.return_snippets = !no_snippets;
    req.include_overview = include_overview;

    let client = ProviderClient::new();
    let resp = run_analysis(&client, &req).await?;

    println!("Trust score: {} ({} risk)", resp.trust_score, resp.risk_level);
    println!();
    for cat in Category::ALL {
        let result = &resp.categories[&cat];
        println!(
            "[{:>5.2}] {}  {}",
            result.score,
            cat.name(),
            preview(&result.reason, 100)
        );
        for flag in &result.heuristics.flags {
            println!("        - {}", flag);
        }
    }

    if !resp.personalized.conflicts.is_empty() {
        println!();
        println!("Preference conflicts: {}", resp.personalized.conflicts.len());
        for conflict in &resp.personalized.conflicts {
            println!("  * [{}] {}", conflict.preference, preview(&conflict.message, 160));
        }
    }

    if let Some(ref overview) = resp.overview {
        println!();
        println!(
            "Overview: {} ({} risk)  {}",
            overview.overall_rating,
            overview.risk_level,
            preview(&overview.summary, 200)
        );
    }

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&resp)?;
        std::fs::write(&out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
