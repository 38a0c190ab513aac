//! The response schema sent to the model, and validation against it.
//!
//! One schema value serves both ends: it is sent as the response contract
//! (in the `OBJECT`/`STRING`/`NUMBER`/`ARRAY` dialect of the Gemini API) and
//! it drives [`validate`], so the two can never disagree about which fields
//! are required or how they are typed.

use serde_json::{json, Value};
use std::fmt;

/// Top-level fields every response must carry.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "cardType",
    "cardHolderName",
    "cardLastFourDigits",
    "billingCycle",
    "paymentDueDate",
    "totalDues",
    "transactions",
];

/// The statement response schema.
pub fn statement_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cardType": {
                "type": "STRING",
                "description": "The type or variant of the credit card, for example, 'HDFC Regalia' or 'SBI SimplyCLICK'."
            },
            "cardHolderName": {
                "type": "STRING",
                "description": "Full name of the cardholder."
            },
            "cardLastFourDigits": {
                "type": "STRING",
                "description": "The last 4 digits of the credit card number."
            },
            "billingCycle": {
                "type": "STRING",
                "description": "The billing cycle period for the statement, for example, '02 Oct – 02 Nov 2025'."
            },
            "paymentDueDate": {
                "type": "STRING",
                "description": "The date the payment is due (e.g., '12 Nov 2025')."
            },
            "totalDues": {
                "type": "NUMBER",
                "description": "The total amount due."
            },
            "transactions": {
                "type": "ARRAY",
                "description": "A list of all transactions on the statement.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": {
                            "type": "STRING",
                            "description": "Date of the transaction (e.g., '05/10/2025')."
                        },
                        "description": {
                            "type": "STRING",
                            "description": "Description of the transaction."
                        },
                        "amount": {
                            "type": "NUMBER",
                            "description": "Amount of the transaction."
                        }
                    },
                    "required": ["date", "description", "amount"]
                }
            }
        },
        "required": REQUIRED_FIELDS
    })
}

/// One way a value failed the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON-pointer-like location, `$` for the root.
    pub path: String,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Check `value` against [`statement_schema`].
///
/// Returns every violation found, not just the first. Properties the
/// schema does not declare are ignored.
pub fn validate(value: &Value) -> Result<(), Vec<SchemaViolation>> {
    let schema = statement_schema();
    let mut violations = Vec::new();
    check(&schema, value, "$", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check(schema: &Value, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    let expected = schema.get("type").and_then(Value::as_str).unwrap_or("");
    let matches = match expected {
        "OBJECT" => value.is_object(),
        "ARRAY" => value.is_array(),
        "STRING" => value.is_string(),
        "NUMBER" => value.is_number(),
        _ => true,
    };
    if !matches {
        out.push(SchemaViolation {
            path: path.to_string(),
            reason: format!("expected {}, found {}", expected, kind(value)),
        });
        return;
    }

    match expected {
        "OBJECT" => {
            let obj = match value.as_object() {
                Some(o) => o,
                None => return,
            };
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if !obj.contains_key(name) {
                        out.push(SchemaViolation {
                            path: format!("{path}.{name}"),
                            reason: "required field is missing".to_string(),
                        });
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (name, prop_schema) in props {
                    if let Some(v) = obj.get(name) {
                        check(prop_schema, v, &format!("{path}.{name}"), out);
                    }
                }
            }
        }
        "ARRAY" => {
            if let (Some(items), Some(elems)) = (schema.get("items"), value.as_array()) {
                for (i, elem) in elems.iter().enumerate() {
                    check(items, elem, &format!("{path}[{i}]"), out);
                }
            }
        }
        _ => {}
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
