//! Calling-convention adapters
//!
//! Built-ins receive the raw caller node and are responsible for their own
//! argument handling. The wrap constructors automate that: they convert a
//! conventional function over evaluated (or deferred) arguments into the
//! built-in shape. Two orthogonal axes combine freely: whether arguments are
//! evaluated eagerly or packaged as thunks, and whether the target wants the
//! active environment. The bridge constructors at the bottom expose host
//! method tables through the same name-resolution protocol user code uses.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::environment::Environment;
use crate::error::{Error, EvalResult};
use crate::interpreter::call;
use crate::language::{NativeFn, Value};
use crate::native::extract_str;
use crate::stdlib;

// ============================================================================
// Deferred arguments
// ============================================================================

/// Zero-argument thunk capturing an argument expression and the environment
/// it must evaluate in. Forcing twice evaluates twice; loop primitives rely
/// on that.
pub struct LazyArg {
    env: Environment,
    expr: Value,
}

impl LazyArg {
    pub fn new(env: Environment, expr: Value) -> Self {
        LazyArg { env, expr }
    }

    pub fn force(&self) -> EvalResult {
        call(&self.env, &self.expr)
    }
}

// ============================================================================
// Wrap constructors
// ============================================================================

/// Eager arguments, no environment access.
pub fn wrap<F>(f: F) -> Value
where
    F: Fn(&[Value]) -> EvalResult + Send + Sync + 'static,
{
    Value::Native(NativeFn::new(move |env, ast| {
        let args = eval_args(env, ast)?;
        f(&args)
    }))
}

/// Eager arguments, environment prepended.
pub fn wrap_env<F>(f: F) -> Value
where
    F: Fn(&Environment, &[Value]) -> EvalResult + Send + Sync + 'static,
{
    Value::Native(NativeFn::new(move |env, ast| {
        let args = eval_args(env, ast)?;
        f(env, &args)
    }))
}

/// Deferred arguments, no environment access.
pub fn wrap_lazy<F>(f: F) -> Value
where
    F: Fn(&[LazyArg]) -> EvalResult + Send + Sync + 'static,
{
    Value::Native(NativeFn::new(move |env, ast| {
        let args = delay_args(env, ast);
        f(&args)
    }))
}

/// Deferred arguments, environment prepended.
pub fn wrap_lazy_env<F>(f: F) -> Value
where
    F: Fn(&Environment, &[LazyArg]) -> EvalResult + Send + Sync + 'static,
{
    Value::Native(NativeFn::new(move |env, ast| {
        let args = delay_args(env, ast);
        f(env, &args)
    }))
}

fn eval_args(env: &Environment, ast: &[Value]) -> Result<Vec<Value>, Error> {
    let mut args = Vec::with_capacity(ast.len().saturating_sub(1));
    for expr in ast.iter().skip(1) {
        args.push(call(env, expr)?);
    }
    Ok(args)
}

fn delay_args(env: &Environment, ast: &[Value]) -> Vec<LazyArg> {
    ast.iter()
        .skip(1)
        .map(|expr| LazyArg::new(env.clone(), expr.clone()))
        .collect()
}

// ============================================================================
// Privileged guard
// ============================================================================

/// Guard a core operation: it only runs against records carrying the
/// runtime marker.
pub fn wrap_core<F>(f: F) -> Value
where
    F: Fn(&Environment, &[Value]) -> EvalResult + Send + Sync + 'static,
{
    Value::Native(NativeFn::new(move |env, ast| {
        if env.is_runtime() {
            f(env, ast)
        } else {
            let name = ast
                .first()
                .map(|v| v.to_display_string())
                .unwrap_or_default();
            Err(Error::Privileged(name))
        }
    }))
}

// ============================================================================
// Host bridges
// ============================================================================

/// Method signature for a flat host-object bridge.
pub type ObjMethod = fn(&[Value]) -> EvalResult;

/// Method signature for a receiver-checked bridge: first the receiver, then
/// the remaining evaluated arguments.
pub type ClassMethod = fn(&Value, &[Value]) -> EvalResult;

/// Expose a flat method table as a callable record. Member lookup resolves
/// method names to wrapped built-ins and defers unknown names to the
/// standard library, so the record behaves like any other scope.
pub fn wrap_obj(name: &str, methods: &[(&str, ObjMethod)]) -> Value {
    let mut table: FxHashMap<String, Value> = FxHashMap::default();
    for (method_name, method) in methods {
        table.insert((*method_name).to_string(), wrap(*method));
    }
    bridge_env(name, Arc::new(table))
}

/// Expose a method table whose entries operate on a receiver of one runtime
/// kind. Invoking a method on a receiver of any other kind fails.
pub fn wrap_class(
    name: &str,
    is_instance: fn(&Value) -> bool,
    methods: &[(&str, ClassMethod)],
) -> Value {
    let mut table: FxHashMap<String, Value> = FxHashMap::default();
    for (method_name, method) in methods {
        let method = *method;
        let label = (*method_name).to_string();
        table.insert(
            label.clone(),
            wrap(move |args: &[Value]| {
                let receiver = args
                    .first()
                    .ok_or_else(|| Error::BadMethodAccess(label.clone()))?;
                if !is_instance(receiver) {
                    return Err(Error::BadMethodAccess(label.clone()));
                }
                method(receiver, &args[1..])
            }),
        );
    }
    bridge_env(name, Arc::new(table))
}

fn bridge_env(name: &str, table: Arc<FxHashMap<String, Value>>) -> Value {
    let env = Environment::runtime();

    let label = name.to_string();
    env.set_slot(
        "envq",
        Value::Native(NativeFn::new(move |_env, _ast| {
            Ok(Value::str(label.as_str()))
        })),
    );

    env.set_slot(
        "xgetq",
        Value::Native(NativeFn::new(move |_env, ast| {
            let member = ast
                .get(1)
                .ok_or_else(|| Error::BadArgumentType("xgetq: name must be a string".into()))
                .and_then(extract_str)?;
            match table.get(&member) {
                Some(value) => Ok(value.clone()),
                None => stdlib::lookup(&member),
            }
        })),
    );

    Value::Env(env)
}
