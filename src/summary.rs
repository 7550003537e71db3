//! Best-effort project-level summary from the repository README.
//!
//! One non-retried oracle call, independent of the chunk pipeline.
//! This step must never abort an analysis run: a missing document
//! yields `None`, any oracle or parse failure yields a
//! `{"readme_error": ...}` object that lands in the report header.

use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::oracle::{clean_json_payload, OracleTransport};

/// Conventional README names checked under the source root, in order.
const README_NAMES: &[&str] = &["README.md", "README.MD", "readme.md", "README", "README.txt"];

/// Locate and read a README under the source root.
pub fn find_readme(root: &Path) -> Option<String> {
    for name in README_NAMES {
        let path = root.join(name);
        if path.is_file() {
            match std::fs::read_to_string(&path) {
                Ok(body) => return Some(body),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read README");
                }
            }
        }
    }
    None
}

/// Summarize the project document with a single oracle call.
pub async fn summarize(
    transport: &dyn OracleTransport,
    document: Option<&str>,
) -> Option<Value> {
    let document = document?;
    let prompt = build_readme_prompt(document);

    match transport.complete(&prompt).await {
        Ok(raw) => {
            let cleaned = clean_json_payload(&raw);
            match serde_json::from_str::<Value>(&cleaned) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "README summary response was not valid JSON");
                    Some(serde_json::json!({
                        "readme_error": format!("invalid summary JSON: {}", e)
                    }))
                }
            }
        }
        Err(e) => {
            let message = format!("{:#}", e);
            warn!(error = %message, "README summary call failed");
            Some(serde_json::json!({ "readme_error": message }))
        }
    }
}

fn build_readme_prompt(readme: &str) -> String {
    format!(
        "You are an expert software architect. Summarize the following README for \
         onboarding. Return a JSON object with keys \"readme_summary\", \
         \"main_features\", and \"usage\". Return ONLY the JSON object.\n\nREADME:\n{}",
        readme
    )
}
