use crate::environment::{CALLEE, CALLENV, CALLER, Environment, PARENT};
use crate::error::{Error, EvalResult};
use crate::language::Value;
use crate::stdlib;

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluate one node: lists dispatch as calls through `callq`, everything
/// else evaluates to itself.
pub fn call(env: &Environment, node: &Value) -> EvalResult {
    match node {
        Value::List(items) => {
            let callee = match items.first() {
                Some(expr) => call(env, expr)?,
                None => Value::Null,
            };
            core_func(
                env,
                &[Value::str("callq"), callee, node.clone()],
            )
        }
        _ => Ok(node.clone()),
    }
}

// ============================================================================
// Core Operation Dispatcher
// ============================================================================

/// Dispatch a core operation, honoring a per-record override first.
///
/// An override is a member of `env` itself (never of an ancestor) named like
/// the operation; it is applied through the default `callq`, so the
/// privileged-call guard still holds. A name with neither an override nor a
/// default yields null rather than failing.
pub fn core_func(env: &Environment, ast: &[Value]) -> EvalResult {
    let name = match ast.first().and_then(Value::as_str) {
        Some(name) => name,
        None => return Ok(Value::Null),
    };

    if let Some(override_value) = env.get(name) {
        if let Some(Value::Native(callq)) = stdlib::core_default("callq") {
            let caller = Value::list(ast.to_vec());
            return callq.invoke(env, &[Value::str("callq"), override_value, caller]);
        }
    }

    match stdlib::core_default(name) {
        Some(Value::Native(op)) => op.invoke(env, ast),
        _ => Ok(Value::Null),
    }
}

// ============================================================================
// Default Core Operations
// ============================================================================

// Execute a caller node against a resolved callee, dispatching on the
// callee's runtime kind.
pub(crate) fn core_callq(env: &Environment, ast: &[Value]) -> EvalResult {
    let callee = ast.get(1).cloned().unwrap_or(Value::Null);
    let caller = ast.get(2).cloned().unwrap_or(Value::Null);

    match callee {
        Value::Str(name) => {
            // Resolve the name, then re-dispatch; alias entries resolve by
            // re-entering this arm with the target name.
            let resolved = core_func(env, &[Value::str("getq"), Value::str(name.as_str())])?;
            if matches!(resolved, Value::Null) {
                Err(Error::CalleeNotFound(name))
            } else {
                core_func(env, &[Value::str("callq"), resolved, caller])
            }
        }
        Value::Native(f) => match &caller {
            Value::List(items) => f.invoke(env, items),
            other => Err(Error::BadArgumentType(format!(
                "caller node must be a list, got {other}"
            ))),
        },
        Value::List(body) => {
            // The callee is a program: run it in a fresh record that knows
            // its caller, its own body, and the scope it was referenced in.
            // `parent` stays unset; closure bodies wire it themselves.
            let frame = Environment::runtime();
            frame.set_slot(CALLER, caller);
            frame.set_slot(CALLEE, Value::List(body.clone()));
            let callenv = core_func(env, &[Value::str("envq")])?;
            frame.set_slot(CALLENV, callenv);
            call(&frame, &Value::List(body))
        }
        Value::Env(scope) => {
            // A record used as callee becomes the evaluation scope for the
            // caller's single argument expression.
            let arg = match &caller {
                Value::List(items) => items.get(1).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            };
            call(&scope, &arg)
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

// Return the current record.
pub(crate) fn core_envq(env: &Environment, _ast: &[Value]) -> EvalResult {
    Ok(Value::Env(env.clone()))
}

// Resolve a name against the current record, deferring misses to xgetq.
pub(crate) fn core_getq(env: &Environment, ast: &[Value]) -> EvalResult {
    let name = getq_name("getq", ast)?;
    match env.get(name) {
        Some(value) => Ok(value),
        None => core_func(env, &[Value::str("xgetq"), Value::str(name)]),
    }
}

// Resolve a name outside the current record: through the parent when one is
// present, otherwise against the standard-library registry.
pub(crate) fn core_xgetq(env: &Environment, ast: &[Value]) -> EvalResult {
    let name = getq_name("xgetq", ast)?;
    match env.get(PARENT) {
        Some(Value::Env(parent)) => core_func(&parent, &[Value::str("getq"), Value::str(name)]),
        Some(other) => Err(Error::BadArgumentType(format!(
            "parent is not an environment: {other}"
        ))),
        None => core_func(
            &stdlib::registry_env(),
            &[Value::str("getq"), Value::str(name)],
        ),
    }
}

// Write an own binding and yield the written value.
pub(crate) fn core_setq(env: &Environment, ast: &[Value]) -> EvalResult {
    let name = getq_name("setq", ast)?;
    let value = ast.get(2).cloned().unwrap_or(Value::Null);
    env.set(name, value.clone())?;
    Ok(value)
}

// Remove an own binding.
pub(crate) fn core_delq(env: &Environment, ast: &[Value]) -> EvalResult {
    let name = getq_name("delq", ast)?;
    env.delete(name)?;
    Ok(Value::Bool(true))
}

fn getq_name<'a>(op: &str, ast: &'a [Value]) -> Result<&'a str, Error> {
    ast.get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::BadArgumentType(format!("{op}: name must be a string")))
}
