//! Native function utilities and helpers
//!
//! Extraction, construction and arity-checking helpers shared by the
//! primitives in the standard library.

use crate::environment::Environment;
use crate::error::Error;
use crate::language::Value;
use crate::numeric::Number;

// ============================================================================
// Value Extraction Helpers
// ============================================================================

pub fn extract_str(value: &Value) -> Result<String, Error> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(Error::BadArgumentType(format!(
            "expected string, got {value}"
        ))),
    }
}

pub fn extract_number(value: &Value) -> Result<Number, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(Error::BadArgumentType(format!(
            "expected number, got {value}"
        ))),
    }
}

pub fn extract_list(value: &Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::List(items) => Ok(items.as_ref().clone()),
        _ => Err(Error::BadArgumentType(format!("expected list, got {value}"))),
    }
}

pub fn extract_env(value: &Value) -> Result<Environment, Error> {
    match value {
        Value::Env(env) => Ok(env.clone()),
        _ => Err(Error::BadArgumentType(format!(
            "expected environment, got {value}"
        ))),
    }
}

// ============================================================================
// Argument Checking Helpers
// ============================================================================

/// Check that the number of arguments is exactly n
pub fn check_arity_exact<T>(name: &str, args: &[T], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::BadArgumentType(format!(
            "{name}: expected {expected} argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

/// Check that the number of arguments is at least n
pub fn check_arity_min<T>(name: &str, args: &[T], min: usize) -> Result<(), Error> {
    if args.len() < min {
        return Err(Error::BadArgumentType(format!(
            "{name}: expected at least {min} argument{}, got {}",
            if min == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

/// Check that the number of arguments is in range [min, max]
pub fn check_arity_range<T>(name: &str, args: &[T], min: usize, max: usize) -> Result<(), Error> {
    if args.len() < min || args.len() > max {
        return Err(Error::BadArgumentType(format!(
            "{name}: expected {min}-{max} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}
