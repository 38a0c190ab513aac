//! Instructions sent to the model with the page images.
//!
//! Backends that accept a response schema natively get
//! [`DEFAULT_INSTRUCTION`] alone. Backends that do not get the same
//! instruction followed by the schema and an output-format section, built by
//! [`instruction_with_schema`].

use serde_json::Value;

/// Default extraction instruction.
///
/// Used when `ScanConfig::instruction` is `None`.
pub const DEFAULT_INSTRUCTION: &str = "You are an expert financial assistant specialized in \
parsing credit card statements. Analyze the following statement image(s) and extract the \
required information precisely according to the provided JSON schema. Ensure all fields are \
populated accurately.";

/// Output rules appended for backends without native schema support.
pub const JSON_OUTPUT_RULES: &str = r#"OUTPUT FORMAT
   - Respond with a single JSON object that conforms to the schema above
   - Every field listed under "required" must be present
   - STRING fields are JSON strings; NUMBER fields are plain JSON numbers
     without currency symbols or thousands separators
   - If the statement lists no transactions, use an empty array
   - Do NOT wrap the JSON in ``` fences
   - Do NOT add commentary or explanations"#;

/// Build the instruction for a backend that cannot enforce `schema` itself.
pub fn instruction_with_schema(instruction: &str, schema: &Value) -> String {
    let schema_text =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!("{instruction}\n\nJSON SCHEMA\n{schema_text}\n\n{JSON_OUTPUT_RULES}")
}
