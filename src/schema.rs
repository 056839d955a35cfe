use schemars::schema_for;

use crate::model::Strategy;

/// JSON Schema for [`Strategy`], pretty-printed.
pub fn get_schema_json() -> String {
    let schema = schema_for!(Strategy);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("Serialization error: {e}") }).to_string()
    })
}

/// Print the strategy JSON Schema (for editors and LLM prompts).
pub fn run() -> anyhow::Result<()> {
    println!("{}", get_schema_json());
    Ok(())
}
