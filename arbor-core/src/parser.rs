//! Reading and writing the program notation
//!
//! Programs are exchanged as JSON documents: arrays are call nodes, objects
//! are environment records, everything else is a literal.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::environment::Environment;
use crate::error::Error;
use crate::language::Value;
use crate::numeric::Number;

// Integral floats at or below this magnitude serialize as integers; above it
// the integer reading would not be exact anyway.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

// ============================================================================
// Reading
// ============================================================================

pub fn parse(text: &str) -> Result<Value, Error> {
    let doc: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::Syntax(e.to_string()))?;
    Ok(from_json(&doc))
}

fn from_json(doc: &serde_json::Value) -> Value {
    match doc {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(Number::Int(i))
            } else {
                Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => {
            // Parsed objects are plain records: every key is an own member
            // and no runtime marker is present.
            let env = Environment::new();
            for (key, field) in fields {
                env.insert_own(key, from_json(field));
            }
            Value::Env(env)
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

pub fn stringify(value: &Value) -> String {
    serde_json::to_string(value).expect("value serialization is infallible")
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Value::Number(Number::Float(x)) => {
                if !x.is_finite() {
                    serializer.serialize_unit()
                } else if x.fract() == 0.0 && x.abs() <= MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*x as i64)
                } else {
                    serializer.serialize_f64(*x)
                }
            }
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Env(env) => {
                let entries = env.entries();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, member) in &entries {
                    map.serialize_entry(name, member)?;
                }
                map.end()
            }
            // Built-ins have no notation of their own.
            Value::Native(_) => serializer.serialize_unit(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        for text in ["null", "true", "42", "-7", "0.5", "\"hi\"", "[1,2,[3]]"] {
            let value = parse(text).unwrap();
            assert_eq!(stringify(&value), text);
        }
    }

    #[test]
    fn integral_floats_serialize_as_integers() {
        assert_eq!(stringify(&Value::float(3.0)), "3");
        assert_eq!(stringify(&Value::float(2.5)), "2.5");
    }

    #[test]
    fn non_finite_floats_serialize_as_null() {
        assert_eq!(stringify(&Value::float(f64::NAN)), "null");
        assert_eq!(stringify(&Value::float(f64::INFINITY)), "null");
    }

    #[test]
    fn objects_parse_to_unmarked_records() {
        let value = parse(r#"{"a": 1, "b": [2]}"#).unwrap();
        let env = value.as_env().expect("expected a record");
        assert!(!env.is_runtime());
        assert!(env.is_own("a"));
        assert_eq!(env.get("a"), Some(Value::int(1)));
    }

    #[test]
    fn records_serialize_sorted_by_name() {
        let value = parse(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(stringify(&value), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn malformed_text_is_a_syntax_error() {
        assert!(matches!(parse("[1,"), Err(Error::Syntax(_))));
    }
}
