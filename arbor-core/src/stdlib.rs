//! The standard library
//!
//! Two flat registries: the privileged core table holding the six
//! overridable operations, and the public table everything else lives in.
//! Name resolution that falls off the end of a scope chain lands in the
//! registry facade, a marked record whose own `getq` resolves the core
//! table first and whose `envq` is refused outright. Registration fails
//! fast when a name is already taken.

use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::adapter::{
    LazyArg, wrap, wrap_class, wrap_core, wrap_env, wrap_lazy, wrap_lazy_env, wrap_obj,
};
use crate::environment::{CALLENV, CALLER, EXCEPTION, Environment, PARENT};
use crate::error::{Error, EvalResult};
use crate::interpreter::{
    call, core_callq, core_delq, core_envq, core_func, core_getq, core_setq, core_xgetq,
};
use crate::language::{NativeFn, Value};
use crate::native::{
    check_arity_exact, check_arity_min, check_arity_range, extract_env, extract_list, extract_str,
};
use crate::numeric::Number;
use crate::parser;

// ============================================================================
// Registry
// ============================================================================

pub struct Stdlib {
    core: FxHashMap<String, Value>,
    public: FxHashMap<String, Value>,
    facade: Environment,
}

static STDLIB: Lazy<Stdlib> =
    Lazy::new(|| build().unwrap_or_else(|e| panic!("standard library registration failed: {e}")));

/// Default implementation of a privileged core operation, if one exists.
pub fn core_default(name: &str) -> Option<Value> {
    STDLIB.core.get(name).cloned()
}

/// Root resolution: the core table shadows the public one.
pub fn lookup(name: &str) -> EvalResult {
    if let Some(value) = STDLIB.core.get(name) {
        return Ok(value.clone());
    }
    if let Some(value) = STDLIB.public.get(name) {
        return Ok(value.clone());
    }
    Err(Error::NameNotFound(name.to_string()))
}

/// The registry facade `xgetq` resolves against when a record has no parent.
pub fn registry_env() -> Environment {
    STDLIB.facade.clone()
}

fn add(table: &mut FxHashMap<String, Value>, name: &str, value: Value) -> Result<(), Error> {
    if table.contains_key(name) {
        return Err(Error::NamingConflict(name.to_string()));
    }
    table.insert(name.to_string(), value);
    Ok(())
}

fn raw(f: fn(&Environment, &[Value]) -> EvalResult) -> Value {
    Value::Native(NativeFn::new(f))
}

fn build() -> Result<Stdlib, Error> {
    let mut core = FxHashMap::default();
    add(&mut core, "callq", wrap_core(core_callq))?;
    add(&mut core, "envq", wrap_core(core_envq))?;
    add(&mut core, "getq", wrap_core(core_getq))?;
    add(&mut core, "xgetq", wrap_core(core_xgetq))?;
    add(&mut core, "setq", wrap_core(core_setq))?;
    add(&mut core, "delq", wrap_core(core_delq))?;

    let mut public = FxHashMap::default();
    register_access(&mut public)?;
    register_quoting(&mut public)?;
    register_adapters(&mut public)?;
    register_functions(&mut public)?;
    register_control(&mut public)?;
    register_iteration(&mut public)?;
    register_exceptions(&mut public)?;
    register_operators(&mut public)?;
    register_collections(&mut public)?;
    register_conversions(&mut public)?;
    register_text(&mut public)?;
    register_constants(&mut public)?;
    register_bridges(&mut public)?;
    register_aliases(&mut public)?;

    let facade = Environment::runtime();
    facade.set_slot("getq", raw(std_getq));
    facade.set_slot("envq", raw(std_envq));

    Ok(Stdlib {
        core,
        public,
        facade,
    })
}

// Resolution override installed on the registry facade.
fn std_getq(_env: &Environment, ast: &[Value]) -> EvalResult {
    let name = ast
        .get(1)
        .ok_or_else(|| Error::BadArgumentType("getq: name must be a string".into()))
        .and_then(extract_str)?;
    lookup(&name)
}

// The registry facade is not a scope of its own.
fn std_envq(_env: &Environment, _ast: &[Value]) -> EvalResult {
    Err(Error::Privileged("envq in the standard library".into()))
}

// ============================================================================
// Access & Call
// ============================================================================

fn register_access(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["call", callee, caller] => dispatch caller against callee
    fn std_call(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("call", args, 2)?;
        core_func(
            env,
            &[Value::str("callq"), args[0].clone(), args[1].clone()],
        )
    }

    /// Usage: ["env"] => the current record
    fn std_env(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("env", args, 0)?;
        core_func(env, &[Value::str("envq")])
    }

    /// Usage: ["get", name] => resolved value
    fn std_get(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("get", args, 1)?;
        core_func(env, &[Value::str("getq"), args[0].clone()])
    }

    /// Usage: ["xget", name] => value resolved outside the current record
    fn std_xget(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("xget", args, 1)?;
        core_func(env, &[Value::str("xgetq"), args[0].clone()])
    }

    /// Usage: ["set", name, value] => value
    fn std_set(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("set", args, 2)?;
        core_func(
            env,
            &[Value::str("setq"), args[0].clone(), args[1].clone()],
        )
    }

    /// Usage: ["del", name] => true
    fn std_del(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("del", args, 1)?;
        core_func(env, &[Value::str("delq"), args[0].clone()])
    }

    /// Usage: ["var", name, value] => binds the quoted value, so a nullary
    /// call of the name yields it back
    fn std_var(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("var", args, 2)?;
        core_func(
            env,
            &[Value::str("setq"), args[0].clone(), quoted(args[1].clone())],
        )
    }

    add(table, "call", wrap_env(std_call))?;
    add(table, "env", wrap_env(std_env))?;
    add(table, "get", wrap_env(std_get))?;
    add(table, "xget", wrap_env(std_xget))?;
    add(table, "set", wrap_env(std_set))?;
    add(table, "del", wrap_env(std_del))?;
    add(table, "var", wrap_env(std_var))?;
    Ok(())
}

fn quoted(value: Value) -> Value {
    Value::list(vec![Value::str("quote"), value])
}

// ============================================================================
// Quoting & Application
// ============================================================================

fn register_quoting(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    // Usage: ["quote", node] => node, unevaluated
    fn std_quote(_env: &Environment, ast: &[Value]) -> EvalResult {
        Ok(ast.get(1).cloned().unwrap_or(Value::Null))
    }

    // Usage: ["pass", node] => evaluate node once
    fn std_pass(env: &Environment, ast: &[Value]) -> EvalResult {
        let node = ast.get(1).cloned().unwrap_or(Value::Null);
        call(env, &node)
    }

    // Usage: ["eval", node] => evaluate node, then evaluate the result
    fn std_eval(env: &Environment, ast: &[Value]) -> EvalResult {
        let node = ast.get(1).cloned().unwrap_or(Value::Null);
        let once = call(env, &node)?;
        call(env, &once)
    }

    // Usage: ["mut", func, name, extra...] => apply func to the binding's
    // current value and rebind the result
    fn std_mut(env: &Environment, ast: &[Value]) -> EvalResult {
        check_arity_min("mut", ast.get(1..).unwrap_or(&[]), 2)?;
        let name_value = call(env, &ast[2])?;
        let name = name_value
            .as_str()
            .ok_or_else(|| Error::BadArgumentType("mut: name must be a string".into()))?;
        let old = core_func(env, &[Value::str("getq"), Value::str(name)])?;

        let mut items: Vec<Value> = ast[1..].to_vec();
        items[1] = old;
        let new = call(env, &Value::list(items))?;

        core_func(
            env,
            &[Value::str("setq"), Value::str(name), quoted(new)],
        )
    }

    add(table, "quote", raw(std_quote))?;
    add(table, "pass", raw(std_pass))?;
    add(table, "eval", raw(std_eval))?;
    add(table, "mut", raw(std_mut))?;
    Ok(())
}

// ============================================================================
// Argument Adapters
// ============================================================================

// The four wrappers `setarg` applies to incoming arguments. Each receives
// the scope the argument expression belongs to and the raw expression, and
// yields the node that gets bound to the parameter name.

fn register_adapters(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    // Usage: ["argcall", scope, expr] => quote of the evaluated argument
    fn std_argcall(_env: &Environment, ast: &[Value]) -> EvalResult {
        let scope = extract_env(ast.get(1).unwrap_or(&Value::Null))?;
        let expr = ast.get(2).cloned().unwrap_or(Value::Null);
        Ok(quoted(call(&scope, &expr)?))
    }

    // Usage: ["argpass", scope, expr] => node that re-evaluates the argument
    // in its defining scope on every use
    fn std_argpass(_env: &Environment, ast: &[Value]) -> EvalResult {
        let scope = ast.get(1).cloned().unwrap_or(Value::Null);
        let expr = ast.get(2).cloned().unwrap_or(Value::Null);
        Ok(Value::list(vec![
            scope,
            Value::list(vec![Value::str("pass"), expr]),
        ]))
    }

    // Usage: ["argquote", scope, expr] => quote of the raw expression
    fn std_argquote(_env: &Environment, ast: &[Value]) -> EvalResult {
        Ok(quoted(ast.get(2).cloned().unwrap_or(Value::Null)))
    }

    // Usage: ["argraw", scope, expr] => the raw expression itself
    fn std_argraw(_env: &Environment, ast: &[Value]) -> EvalResult {
        Ok(ast.get(2).cloned().unwrap_or(Value::Null))
    }

    /// Usage: ["setarg", wrapper, name...] => bind each parameter name to the
    /// correspondingly-positioned caller argument, adapted by wrapper
    fn std_setarg(env: &Environment, args: &[Value]) -> EvalResult {
        let caller = core_func(env, &[Value::str("getq"), Value::str(CALLER)])?;
        let callenv = core_func(env, &[Value::str("getq"), Value::str(CALLENV)])?;
        let caller_items = extract_list(&caller)?;

        for (position, name) in args.iter().enumerate().skip(1) {
            let expr = caller_items.get(position).cloned().unwrap_or(Value::Null);
            let adapted = call(
                env,
                &Value::list(vec![args[0].clone(), callenv.clone(), expr]),
            )?;
            core_func(env, &[Value::str("setq"), name.clone(), adapted])?;
        }

        Ok(caller)
    }

    add(table, "argcall", raw(std_argcall))?;
    add(table, "argpass", raw(std_argpass))?;
    add(table, "argquote", raw(std_argquote))?;
    add(table, "argraw", raw(std_argraw))?;
    add(table, "setarg", wrap_env(std_setarg))?;
    Ok(())
}

// ============================================================================
// Function Constructors
// ============================================================================

fn register_functions(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    // Usage: ["lambda", wrapper, name..., body] => function value
    //
    // Expands to a body that first anchors the new record to the scope this
    // expansion ran in, which is what makes the result a lexical closure.
    fn std_lambda(env: &Environment, ast: &[Value]) -> EvalResult {
        check_arity_min("lambda", ast.get(1..).unwrap_or(&[]), 1)?;
        let defining = core_func(env, &[Value::str("envq")])?;
        let anchor = Value::list(vec![Value::str("setq"), Value::str(PARENT), defining]);
        Ok(Value::list(vec![
            Value::str("do"),
            anchor,
            binding_step(ast),
            body_of(ast),
        ]))
    }

    // Usage: ["macro", wrapper, name..., body] => function value
    //
    // Same expansion without the anchoring step: the new record has no
    // parent, so free names skip the definition site entirely and resolve
    // against the standard library.
    fn std_macro(_env: &Environment, ast: &[Value]) -> EvalResult {
        check_arity_min("macro", ast.get(1..).unwrap_or(&[]), 1)?;
        Ok(Value::list(vec![
            Value::str("do"),
            binding_step(ast),
            body_of(ast),
        ]))
    }

    fn binding_step(ast: &[Value]) -> Value {
        let mut step = vec![Value::str("setarg")];
        step.extend(ast[1..ast.len() - 1].iter().cloned());
        Value::list(step)
    }

    fn body_of(ast: &[Value]) -> Value {
        ast.last().cloned().unwrap_or(Value::Null)
    }

    add(table, "lambda", raw(std_lambda))?;
    add(table, "macro", raw(std_macro))?;
    Ok(())
}

// ============================================================================
// Control Flow
// ============================================================================

fn register_control(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["cond", test, action, ...] => first action whose test holds
    fn std_cond(args: &[LazyArg]) -> EvalResult {
        let mut i = 0;
        while i + 1 < args.len() {
            if args[i].force()?.is_truthy() {
                return args[i + 1].force();
            }
            i += 2;
        }
        Ok(Value::Null)
    }

    /// Usage: ["case", value, default, match, action, ...] => action whose
    /// match equals value (a list matches any of its elements)
    fn std_case(args: &[LazyArg]) -> EvalResult {
        check_arity_min("case", args, 2)?;
        let value = args[0].force()?;
        let mut i = 2;
        while i + 1 < args.len() {
            let target = args[i].force()?;
            let hit = match &target {
                Value::List(items) => items.iter().any(|item| value.loose_eq(item)),
                other => value.loose_eq(other),
            };
            if hit {
                return args[i + 1].force();
            }
            i += 2;
        }
        args[1].force()
    }

    /// Usage: ["if", test, then, else?] => branch; the untaken branch is
    /// never evaluated
    fn std_if(args: &[LazyArg]) -> EvalResult {
        check_arity_min("if", args, 2)?;
        if args[0].force()?.is_truthy() {
            args[1].force()
        } else {
            match args.get(2) {
                Some(alternative) => alternative.force(),
                None => Ok(Value::Null),
            }
        }
    }

    /// Usage: ["loop", count, body] => list of every body result
    fn std_loop(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("loop", args, 2)?;
        let count = args[0].force()?.to_number().floor_i64();
        let mut all = Vec::new();
        for _ in 0..count.max(0) {
            all.push(args[1].force()?);
        }
        Ok(Value::list(all))
    }

    /// Usage: ["for", init, test, step, body] => list of every body result
    fn std_for(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("for", args, 4)?;
        args[0].force()?;
        let mut all = Vec::new();
        while args[1].force()?.is_truthy() {
            all.push(args[3].force()?);
            args[2].force()?;
        }
        Ok(Value::list(all))
    }

    /// Usage: ["while", test, body] => list of every body result
    fn std_while(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("while", args, 2)?;
        let mut all = Vec::new();
        while args[0].force()?.is_truthy() {
            all.push(args[1].force()?);
        }
        Ok(Value::list(all))
    }

    /// Usage: ["until", test, body] => like while, but the body runs first
    fn std_until(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("until", args, 2)?;
        let mut all = Vec::new();
        loop {
            all.push(args[1].force()?);
            if !args[0].force()?.is_truthy() {
                break;
            }
        }
        Ok(Value::list(all))
    }

    fn std_not(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("!", args, 1)?;
        Ok(Value::Bool(!args[0].force()?.is_truthy()))
    }

    fn std_void(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("void", args, 1)?;
        args[0].force()?;
        Ok(Value::Null)
    }

    // && and || yield the deciding operand itself; the triple forms yield
    // booleans.
    fn std_and(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("&&", args, 2)?;
        let first = args[0].force()?;
        if first.is_truthy() {
            args[1].force()
        } else {
            Ok(first)
        }
    }

    fn std_or(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("||", args, 2)?;
        let first = args[0].force()?;
        if first.is_truthy() {
            Ok(first)
        } else {
            args[1].force()
        }
    }

    fn std_and_bool(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("&&&", args, 2)?;
        if !args[0].force()?.is_truthy() {
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(args[1].force()?.is_truthy()))
    }

    fn std_or_bool(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("|||", args, 2)?;
        if args[0].force()?.is_truthy() {
            return Ok(Value::Bool(true));
        }
        Ok(Value::Bool(args[1].force()?.is_truthy()))
    }

    fn std_comma(args: &[LazyArg]) -> EvalResult {
        check_arity_exact(",", args, 2)?;
        args[0].force()?;
        args[1].force()
    }

    fn std_ternary(args: &[LazyArg]) -> EvalResult {
        check_arity_exact("?:", args, 3)?;
        if args[0].force()?.is_truthy() {
            args[1].force()
        } else {
            args[2].force()
        }
    }

    add(table, "cond", wrap_lazy(std_cond))?;
    add(table, "case", wrap_lazy(std_case))?;
    add(table, "if", wrap_lazy(std_if))?;
    add(table, "loop", wrap_lazy(std_loop))?;
    add(table, "for", wrap_lazy(std_for))?;
    add(table, "while", wrap_lazy(std_while))?;
    add(table, "until", wrap_lazy(std_until))?;
    add(table, "!", wrap_lazy(std_not))?;
    add(table, "void", wrap_lazy(std_void))?;
    add(table, "&&", wrap_lazy(std_and))?;
    add(table, "||", wrap_lazy(std_or))?;
    add(table, "&&&", wrap_lazy(std_and_bool))?;
    add(table, "|||", wrap_lazy(std_or_bool))?;
    add(table, ",", wrap_lazy(std_comma))?;
    add(table, "?:", wrap_lazy(std_ternary))?;
    Ok(())
}

// ============================================================================
// Iteration
// ============================================================================

fn bind_quoted(env: &Environment, name: &Value, value: Value) -> Result<(), Error> {
    core_func(env, &[Value::str("setq"), name.clone(), quoted(value)])?;
    Ok(())
}

fn register_iteration(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["forin", name, list, body] => list of body results, with the
    /// name bound to each index in turn
    fn std_forin(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("forin", args, 3)?;
        let name = args[0].force()?;
        let list = extract_list(&args[1].force()?)?;
        let mut all = Vec::new();
        for i in 0..list.len() {
            bind_quoted(env, &name, Value::int(i as i64))?;
            all.push(args[2].force()?);
        }
        Ok(Value::list(all))
    }

    /// Usage: ["each", name, list, body] => list of body results, with the
    /// name bound to each element in turn
    fn std_each(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("each", args, 3)?;
        let name = args[0].force()?;
        let list = extract_list(&args[1].force()?)?;
        let mut all = Vec::new();
        for item in list {
            bind_quoted(env, &name, item)?;
            all.push(args[2].force()?);
        }
        Ok(Value::list(all))
    }

    /// Usage: ["find", name, list, test] => first element for which the test
    /// holds, or null
    fn std_find(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("find", args, 3)?;
        let name = args[0].force()?;
        let list = extract_list(&args[1].force()?)?;
        for item in list {
            bind_quoted(env, &name, item.clone())?;
            if args[2].force()?.is_truthy() {
                return Ok(item);
            }
        }
        Ok(Value::Null)
    }

    /// Usage: ["filter", name, list, test] => elements for which the test
    /// holds
    fn std_filter(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("filter", args, 3)?;
        let name = args[0].force()?;
        let list = extract_list(&args[1].force()?)?;
        let mut all = Vec::new();
        for item in list {
            bind_quoted(env, &name, item.clone())?;
            if args[2].force()?.is_truthy() {
                all.push(item);
            }
        }
        Ok(Value::list(all))
    }

    /// Usage: ["table", name, begin, end, step, body] => body results over a
    /// linear index; end and step re-evaluate on every round
    fn std_table(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("table", args, 5)?;
        let name = args[0].force()?;
        let mut i = args[1].force()?.to_number();
        let mut all = Vec::new();
        loop {
            let end = args[2].force()?.to_number();
            if i == end {
                break;
            }
            bind_quoted(env, &name, Value::Number(i))?;
            all.push(args[4].force()?);
            i = i.add(&args[3].force()?.to_number());
        }
        Ok(Value::list(all))
    }

    /// Usage: ["range", begin, end, step] => list of linear values
    fn std_range(_env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("range", args, 3)?;
        let mut i = args[0].force()?.to_number();
        let mut all = Vec::new();
        loop {
            let end = args[1].force()?.to_number();
            if i == end {
                break;
            }
            all.push(Value::Number(i));
            i = i.add(&args[2].force()?.to_number());
        }
        Ok(Value::list(all))
    }

    /// Usage: ["foldl", name1, name2, list, body] => fold the body over the
    /// list left to right, name1 carrying the accumulator
    fn std_foldl(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("foldl", args, 4)?;
        let acc_name = args[0].force()?;
        let item_name = args[1].force()?;
        let list = extract_list(&args[2].force()?)?;
        let Some(first) = list.first() else {
            return Ok(Value::Null);
        };
        let mut value = first.clone();
        for item in &list[1..] {
            bind_quoted(env, &acc_name, value)?;
            bind_quoted(env, &item_name, item.clone())?;
            value = args[3].force()?;
        }
        Ok(value)
    }

    /// Usage: ["foldr", name1, name2, list, body] => fold right to left,
    /// name2 carrying the accumulator
    fn std_foldr(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_exact("foldr", args, 4)?;
        let item_name = args[0].force()?;
        let acc_name = args[1].force()?;
        let list = extract_list(&args[2].force()?)?;
        let Some(last) = list.last() else {
            return Ok(Value::Null);
        };
        let mut value = last.clone();
        for item in list[..list.len() - 1].iter().rev() {
            bind_quoted(env, &item_name, item.clone())?;
            bind_quoted(env, &acc_name, value)?;
            value = args[3].force()?;
        }
        Ok(value)
    }

    /// Usage: ["map", func, list] => func applied to each element and index
    fn std_map(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("map", args, 2)?;
        let list = extract_list(&args[1])?;
        let mut all = Vec::new();
        for (i, item) in list.into_iter().enumerate() {
            let node = Value::list(vec![
                quoted(args[0].clone()),
                quoted(item),
                quoted(Value::int(i as i64)),
            ]);
            all.push(call(env, &node)?);
        }
        Ok(Value::list(all))
    }

    /// Usage: ["reducel", func, list] => left fold using func(acc, item,
    /// left index, right index)
    fn std_reducel(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("reducel", args, 2)?;
        let list = extract_list(&args[1])?;
        let Some(first) = list.first() else {
            return Ok(Value::Null);
        };
        let mut value = first.clone();
        for (i, item) in list.iter().enumerate().skip(1) {
            let node = Value::list(vec![
                quoted(args[0].clone()),
                quoted(value),
                quoted(item.clone()),
                quoted(Value::int(i as i64 - 1)),
                quoted(Value::int(i as i64)),
            ]);
            value = call(env, &node)?;
        }
        Ok(value)
    }

    /// Usage: ["reducer", func, list] => right fold using func(item, acc,
    /// left index, right index)
    fn std_reducer(env: &Environment, args: &[Value]) -> EvalResult {
        check_arity_exact("reducer", args, 2)?;
        let list = extract_list(&args[1])?;
        let Some(last) = list.last() else {
            return Ok(Value::Null);
        };
        let mut value = last.clone();
        for i in (0..list.len() - 1).rev() {
            let node = Value::list(vec![
                quoted(args[0].clone()),
                quoted(list[i].clone()),
                quoted(value),
                quoted(Value::int(i as i64)),
                quoted(Value::int(i as i64 + 1)),
            ]);
            value = call(env, &node)?;
        }
        Ok(value)
    }

    add(table, "forin", wrap_lazy_env(std_forin))?;
    add(table, "each", wrap_lazy_env(std_each))?;
    add(table, "find", wrap_lazy_env(std_find))?;
    add(table, "filter", wrap_lazy_env(std_filter))?;
    add(table, "table", wrap_lazy_env(std_table))?;
    add(table, "range", wrap_lazy_env(std_range))?;
    add(table, "foldl", wrap_lazy_env(std_foldl))?;
    add(table, "foldr", wrap_lazy_env(std_foldr))?;
    add(table, "map", wrap_env(std_map))?;
    add(table, "reducel", wrap_env(std_reducel))?;
    add(table, "reducer", wrap_env(std_reducer))?;
    Ok(())
}

// ============================================================================
// Exceptions
// ============================================================================

fn error_record(name: &str, message: &str) -> Value {
    let record = Environment::runtime();
    record.insert_own("name", Value::str(name));
    record.insert_own("message", Value::str(message));
    Value::Env(record)
}

// What a handler sees: thrown values verbatim, runtime failures as a record
// with name and message members.
fn caught_value(error: &Error) -> Value {
    match error {
        Error::Thrown(value) => value.clone(),
        other => error_record(other.kind(), &other.to_string()),
    }
}

fn register_exceptions(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["try", body, handler, finalizer?] => body result, or the
    /// handler result with the caught failure bound to `exception`; the
    /// finalizer always runs
    fn std_try(env: &Environment, args: &[LazyArg]) -> EvalResult {
        check_arity_range("try", args, 2, 3)?;
        let outcome = match args[0].force() {
            Ok(value) => Ok(value),
            Err(error) => {
                env.set_slot(EXCEPTION, caught_value(&error));
                args[1].force()
            }
        };
        if let Some(finalizer) = args.get(2) {
            finalizer.force()?;
        }
        outcome
    }

    /// Usage: ["throw", value] => never returns
    fn std_throw(args: &[Value]) -> EvalResult {
        check_arity_exact("throw", args, 1)?;
        Err(Error::Thrown(args[0].clone()))
    }

    /// Usage: ["error", message, name?] => failure record
    fn std_error(args: &[Value]) -> EvalResult {
        check_arity_range("error", args, 1, 2)?;
        let name = match args.get(1) {
            Some(kind) => kind.to_display_string(),
            None => "Error".to_string(),
        };
        Ok(error_record(&name, &args[0].to_display_string()))
    }

    add(table, "try", wrap_lazy_env(std_try))?;
    add(table, "throw", wrap(std_throw))?;
    add(table, "error", wrap(std_error))?;
    Ok(())
}

// ============================================================================
// Operators
// ============================================================================

fn register_operators(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    fn std_positive(args: &[Value]) -> EvalResult {
        check_arity_exact("positive", args, 1)?;
        Ok(Value::Number(args[0].to_number()))
    }

    fn std_negative(args: &[Value]) -> EvalResult {
        check_arity_exact("negative", args, 1)?;
        Ok(Value::Number(args[0].to_number().neg()))
    }

    fn std_bitnot(args: &[Value]) -> EvalResult {
        check_arity_exact("~", args, 1)?;
        Ok(Value::int(!args[0].to_number().to_i32() as i64))
    }

    fn std_typeof(args: &[Value]) -> EvalResult {
        check_arity_exact("typeof", args, 1)?;
        Ok(Value::str(args[0].kind()))
    }

    // Addition concatenates as soon as either side is a string; the other
    // arithmetic operators convert both sides numerically.
    fn std_add(args: &[Value]) -> EvalResult {
        check_arity_exact("+", args, 2)?;
        match (&args[0], &args[1]) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.add(b))),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::str(format!(
                "{}{}",
                args[0].to_display_string(),
                args[1].to_display_string()
            ))),
            _ => Ok(Value::Number(
                args[0].to_number().add(&args[1].to_number()),
            )),
        }
    }

    fn std_sub(args: &[Value]) -> EvalResult {
        check_arity_exact("-", args, 2)?;
        Ok(Value::Number(args[0].to_number().sub(&args[1].to_number())))
    }

    fn std_mul(args: &[Value]) -> EvalResult {
        check_arity_exact("*", args, 2)?;
        Ok(Value::Number(args[0].to_number().mul(&args[1].to_number())))
    }

    fn std_div(args: &[Value]) -> EvalResult {
        check_arity_exact("/", args, 2)?;
        Ok(Value::Number(args[0].to_number().div(&args[1].to_number())))
    }

    fn std_rem(args: &[Value]) -> EvalResult {
        check_arity_exact("%", args, 2)?;
        Ok(Value::Number(args[0].to_number().rem(&args[1].to_number())))
    }

    // Strings order lexicographically against each other; any other pairing
    // orders numerically, and NaN never orders.
    fn ordering(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            _ => a.to_number().partial_cmp(&b.to_number()),
        }
    }

    fn std_lt(args: &[Value]) -> EvalResult {
        check_arity_exact("<", args, 2)?;
        Ok(Value::Bool(matches!(
            ordering(&args[0], &args[1]),
            Some(std::cmp::Ordering::Less)
        )))
    }

    fn std_gt(args: &[Value]) -> EvalResult {
        check_arity_exact(">", args, 2)?;
        Ok(Value::Bool(matches!(
            ordering(&args[0], &args[1]),
            Some(std::cmp::Ordering::Greater)
        )))
    }

    fn std_le(args: &[Value]) -> EvalResult {
        check_arity_exact("<=", args, 2)?;
        Ok(Value::Bool(matches!(
            ordering(&args[0], &args[1]),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        )))
    }

    fn std_ge(args: &[Value]) -> EvalResult {
        check_arity_exact(">=", args, 2)?;
        Ok(Value::Bool(matches!(
            ordering(&args[0], &args[1]),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        )))
    }

    fn std_eq(args: &[Value]) -> EvalResult {
        check_arity_exact("==", args, 2)?;
        Ok(Value::Bool(args[0].loose_eq(&args[1])))
    }

    fn std_ne(args: &[Value]) -> EvalResult {
        check_arity_exact("!=", args, 2)?;
        Ok(Value::Bool(!args[0].loose_eq(&args[1])))
    }

    fn std_strict_eq(args: &[Value]) -> EvalResult {
        check_arity_exact("===", args, 2)?;
        Ok(Value::Bool(args[0].strict_eq(&args[1])))
    }

    fn std_strict_ne(args: &[Value]) -> EvalResult {
        check_arity_exact("!==", args, 2)?;
        Ok(Value::Bool(!args[0].strict_eq(&args[1])))
    }

    fn std_shl(args: &[Value]) -> EvalResult {
        check_arity_exact("<<", args, 2)?;
        let shift = args[1].to_number().to_u32() & 31;
        Ok(Value::int((args[0].to_number().to_i32() << shift) as i64))
    }

    fn std_shr(args: &[Value]) -> EvalResult {
        check_arity_exact(">>", args, 2)?;
        let shift = args[1].to_number().to_u32() & 31;
        Ok(Value::int((args[0].to_number().to_i32() >> shift) as i64))
    }

    fn std_ushr(args: &[Value]) -> EvalResult {
        check_arity_exact(">>>", args, 2)?;
        let shift = args[1].to_number().to_u32() & 31;
        Ok(Value::int((args[0].to_number().to_u32() >> shift) as i64))
    }

    fn std_bitand(args: &[Value]) -> EvalResult {
        check_arity_exact("&", args, 2)?;
        Ok(Value::int(
            (args[0].to_number().to_i32() & args[1].to_number().to_i32()) as i64,
        ))
    }

    fn std_bitxor(args: &[Value]) -> EvalResult {
        check_arity_exact("^", args, 2)?;
        Ok(Value::int(
            (args[0].to_number().to_i32() ^ args[1].to_number().to_i32()) as i64,
        ))
    }

    fn std_bitor(args: &[Value]) -> EvalResult {
        check_arity_exact("|", args, 2)?;
        Ok(Value::int(
            (args[0].to_number().to_i32() | args[1].to_number().to_i32()) as i64,
        ))
    }

    /// Usage: ["in", key, container] => membership by member name or index
    fn std_in(args: &[Value]) -> EvalResult {
        check_arity_exact("in", args, 2)?;
        match &args[1] {
            Value::Env(env) => Ok(Value::Bool(env.contains(&args[0].to_display_string()))),
            Value::List(items) => {
                let n = args[0].to_number();
                let i = n.floor_i64();
                Ok(Value::Bool(
                    n == Number::Int(i) && i >= 0 && (i as usize) < items.len(),
                ))
            }
            other => Err(Error::BadArgumentType(format!(
                "in: expected list or environment, got {other}"
            ))),
        }
    }

    /// Usage: ["has", record, name] => whether the record has the member
    fn std_has(args: &[Value]) -> EvalResult {
        check_arity_exact("has", args, 2)?;
        let env = extract_env(&args[0])?;
        Ok(Value::Bool(env.contains(&args[1].to_display_string())))
    }

    fn class_match(value: &Value, class: &str) -> bool {
        matches!(
            (class, value),
            ("Array", Value::List(_))
                | ("String", Value::Str(_))
                | ("Number", Value::Number(_))
                | ("Boolean", Value::Bool(_))
                | ("Object", Value::Env(_))
                | ("Function", Value::Native(_))
        )
    }

    /// Usage: ["is", value, kind] => kind test by class name for structured
    /// values, by typeof name for scalars
    fn std_is(args: &[Value]) -> EvalResult {
        check_arity_exact("is", args, 2)?;
        let kind = extract_str(&args[1])?;
        match &args[0] {
            Value::Env(_) | Value::List(_) | Value::Native(_) => {
                Ok(Value::Bool(class_match(&args[0], &kind)))
            }
            scalar => Ok(Value::Bool(scalar.kind() == kind)),
        }
    }

    /// Usage: ["instanceof", value, class] => class test by runtime kind
    fn std_instanceof(args: &[Value]) -> EvalResult {
        check_arity_exact("instanceof", args, 2)?;
        let class = extract_str(&args[1])?;
        Ok(Value::Bool(class_match(&args[0], &class)))
    }

    add(table, "positive", wrap(std_positive))?;
    add(table, "negative", wrap(std_negative))?;
    add(table, "~", wrap(std_bitnot))?;
    add(table, "typeof", wrap(std_typeof))?;
    add(table, "+", wrap(std_add))?;
    add(table, "-", wrap(std_sub))?;
    add(table, "*", wrap(std_mul))?;
    add(table, "/", wrap(std_div))?;
    add(table, "%", wrap(std_rem))?;
    add(table, "<", wrap(std_lt))?;
    add(table, ">", wrap(std_gt))?;
    add(table, "<=", wrap(std_le))?;
    add(table, ">=", wrap(std_ge))?;
    add(table, "==", wrap(std_eq))?;
    add(table, "!=", wrap(std_ne))?;
    add(table, "===", wrap(std_strict_eq))?;
    add(table, "!==", wrap(std_strict_ne))?;
    add(table, "<<", wrap(std_shl))?;
    add(table, ">>", wrap(std_shr))?;
    add(table, ">>>", wrap(std_ushr))?;
    add(table, "&", wrap(std_bitand))?;
    add(table, "^", wrap(std_bitxor))?;
    add(table, "|", wrap(std_bitor))?;
    add(table, "in", wrap(std_in))?;
    add(table, "has", wrap(std_has))?;
    add(table, "is", wrap(std_is))?;
    add(table, "instanceof", wrap(std_instanceof))?;
    Ok(())
}

// ============================================================================
// Collections
// ============================================================================

fn register_collections(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["list", ...] => the evaluated arguments as a list
    fn std_list(args: &[Value]) -> EvalResult {
        Ok(Value::list(args.to_vec()))
    }

    /// Usage: ["head", first, ...] => the first argument
    fn std_head(args: &[Value]) -> EvalResult {
        Ok(args.first().cloned().unwrap_or(Value::Null))
    }

    /// Usage: ["do", ..., last] => the last argument
    fn std_do(args: &[Value]) -> EvalResult {
        Ok(args.last().cloned().unwrap_or(Value::Null))
    }

    /// Usage: ["dict", key, value, ...] => record with the given members
    fn std_dict(args: &[Value]) -> EvalResult {
        let record = Environment::runtime();
        for pair in args.chunks(2) {
            let key = pair[0].to_display_string();
            let value = pair.get(1).cloned().unwrap_or(Value::Null);
            record.set(&key, value)?;
        }
        Ok(Value::Env(record))
    }

    /// Usage: ["count", value, ...] => record mapping each value to its
    /// multiplicity
    fn std_count(args: &[Value]) -> EvalResult {
        let record = Environment::runtime();
        for arg in args {
            let key = arg.to_display_string();
            let next = match record.get(&key) {
                Some(current) => current.to_number().add(&Number::Int(1)),
                None => Number::Int(1),
            };
            record.set(&key, Value::Number(next))?;
        }
        Ok(Value::Env(record))
    }

    /// Usage: ["mkenv", key, value, ...] => record whose parent is the
    /// current scope
    fn std_mkenv(env: &Environment, args: &[Value]) -> EvalResult {
        let record = Environment::runtime();
        record.set_slot(PARENT, core_func(env, &[Value::str("envq")])?);
        for pair in args.chunks(2) {
            let key = pair[0].to_display_string();
            let value = pair.get(1).cloned().unwrap_or(Value::Null);
            record.set(&key, value)?;
        }
        Ok(Value::Env(record))
    }

    /// Usage: ["length", value] => element count of a list or string
    fn std_length(args: &[Value]) -> EvalResult {
        check_arity_exact("length", args, 1)?;
        match &args[0] {
            Value::List(items) => Ok(Value::int(items.len() as i64)),
            Value::Str(s) => Ok(Value::int(s.chars().count() as i64)),
            other => Err(Error::BadArgumentType(format!(
                "length: object does not have length: {other}"
            ))),
        }
    }

    /// Usage: ["index", value, i] => element at the (floored) index, or null
    fn std_index(args: &[Value]) -> EvalResult {
        check_arity_exact("index", args, 2)?;
        let i = args[1].to_number().floor_i64();
        element_at(&args[0], i)
    }

    /// Usage: ["xindex", value, i] => element at the index wrapped modulo
    /// the length
    fn std_xindex(args: &[Value]) -> EvalResult {
        check_arity_exact("xindex", args, 2)?;
        let len = match &args[0] {
            Value::List(items) => items.len() as i64,
            Value::Str(s) => s.chars().count() as i64,
            other => {
                return Err(Error::BadArgumentType(format!(
                    "xindex: object does not have index: {other}"
                )));
            }
        };
        if len == 0 {
            return Ok(Value::Null);
        }
        let i = args[1].to_number().floor_i64();
        element_at(&args[0], i.rem_euclid(len))
    }

    fn element_at(value: &Value, i: i64) -> EvalResult {
        if i < 0 {
            return Ok(Value::Null);
        }
        match value {
            Value::List(items) => Ok(items.get(i as usize).cloned().unwrap_or(Value::Null)),
            Value::Str(s) => Ok(s
                .chars()
                .nth(i as usize)
                .map(|c| Value::str(c.to_string()))
                .unwrap_or(Value::Null)),
            other => Err(Error::BadArgumentType(format!(
                "index: object does not have index: {other}"
            ))),
        }
    }

    /// Usage: ["indexSet", list, i, value] => the list with the element
    /// replaced (lists are values; the original is untouched)
    fn std_index_set(args: &[Value]) -> EvalResult {
        check_arity_exact("indexSet", args, 3)?;
        match &args[0] {
            Value::List(items) => {
                let i = args[1].to_number().floor_i64();
                if i < 0 || i as usize >= items.len() {
                    return Err(Error::BadArgumentType(format!(
                        "indexSet: index {i} out of range"
                    )));
                }
                let mut updated = items.as_ref().clone();
                updated[i as usize] = args[2].clone();
                Ok(Value::list(updated))
            }
            Value::Str(_) => Err(Error::BadArgumentType("indexSet: string is atomic".into())),
            other => Err(Error::BadArgumentType(format!(
                "indexSet: object does not have index: {other}"
            ))),
        }
    }

    /// Usage: ["keys", record] => member names in name order
    fn std_keys(args: &[Value]) -> EvalResult {
        check_arity_exact("keys", args, 1)?;
        let env = extract_env(&args[0])?;
        Ok(Value::list(
            env.member_names().into_iter().map(Value::Str).collect(),
        ))
    }

    add(table, "list", wrap(std_list))?;
    add(table, "head", wrap(std_head))?;
    add(table, "do", wrap(std_do))?;
    add(table, "dict", wrap(std_dict))?;
    add(table, "count", wrap(std_count))?;
    add(table, "mkenv", wrap_env(std_mkenv))?;
    add(table, "length", wrap(std_length))?;
    add(table, "index", wrap(std_index))?;
    add(table, "xindex", wrap(std_xindex))?;
    add(table, "indexSet", wrap(std_index_set))?;
    add(table, "keys", wrap(std_keys))?;
    Ok(())
}

// ============================================================================
// Conversions
// ============================================================================

static FLOAT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

fn register_conversions(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    fn std_string(args: &[Value]) -> EvalResult {
        check_arity_exact("string", args, 1)?;
        Ok(Value::str(args[0].to_display_string()))
    }

    fn std_boolean(args: &[Value]) -> EvalResult {
        check_arity_exact("boolean", args, 1)?;
        Ok(Value::Bool(args[0].is_truthy()))
    }

    fn std_number(args: &[Value]) -> EvalResult {
        check_arity_exact("number", args, 1)?;
        Ok(Value::Number(args[0].to_number()))
    }

    /// Usage: ["int", text, radix?] => integer parsed from the longest valid
    /// prefix, NaN when there is none
    fn std_int(args: &[Value]) -> EvalResult {
        check_arity_range("int", args, 1, 2)?;
        let radix = match args.get(1) {
            Some(r) => r.to_number().floor_i64(),
            None => 10,
        };
        if !(2..=36).contains(&radix) {
            return Ok(Value::float(f64::NAN));
        }
        if let Value::Number(n) = &args[0] {
            if radix == 10 {
                return Ok(match n {
                    Number::Int(i) => Value::int(*i),
                    Number::Float(x) if x.is_finite() => Value::int(x.trunc() as i64),
                    _ => Value::float(f64::NAN),
                });
            }
        }
        let text = args[0].to_display_string();
        Ok(parse_int_prefix(&text, radix as u32))
    }

    /// Usage: ["float", text] => float parsed from the longest valid prefix
    fn std_float(args: &[Value]) -> EvalResult {
        check_arity_exact("float", args, 1)?;
        if let Value::Number(n) = &args[0] {
            return Ok(Value::Number(*n));
        }
        let text = args[0].to_display_string();
        let trimmed = text.trim_start();
        match FLOAT_PREFIX.find(trimmed) {
            Some(m) => Ok(m
                .as_str()
                .parse::<f64>()
                .map(Value::float)
                .unwrap_or(Value::float(f64::NAN))),
            None => Ok(Value::float(f64::NAN)),
        }
    }

    /// Usage: ["chr", code, ...] => string built from character codes
    fn std_chr(args: &[Value]) -> EvalResult {
        check_arity_min("chr", args, 1)?;
        let mut out = String::new();
        for arg in args {
            let code = arg.to_number().floor_i64();
            let c = u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or('\u{FFFD}');
            out.push(c);
        }
        Ok(Value::Str(out))
    }

    fn std_is_nan(args: &[Value]) -> EvalResult {
        check_arity_exact("isNaN", args, 1)?;
        Ok(Value::Bool(args[0].to_number().is_nan()))
    }

    fn std_is_finite(args: &[Value]) -> EvalResult {
        check_arity_exact("isFinite", args, 1)?;
        Ok(Value::Bool(args[0].to_number().is_finite()))
    }

    fn std_is_array(args: &[Value]) -> EvalResult {
        check_arity_exact("isArray", args, 1)?;
        Ok(Value::Bool(matches!(args[0], Value::List(_))))
    }

    add(table, "string", wrap(std_string))?;
    add(table, "boolean", wrap(std_boolean))?;
    add(table, "number", wrap(std_number))?;
    add(table, "int", wrap(std_int))?;
    add(table, "float", wrap(std_float))?;
    add(table, "chr", wrap(std_chr))?;
    add(table, "isNaN", wrap(std_is_nan))?;
    add(table, "isFinite", wrap(std_is_finite))?;
    add(table, "isArray", wrap(std_is_array))?;
    Ok(())
}

fn parse_int_prefix(text: &str, radix: u32) -> Value {
    let mut rest = text.trim_start();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if radix == 16 {
        rest = rest
            .strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .unwrap_or(rest);
    }

    let mut value: f64 = 0.0;
    let mut seen = false;
    for c in rest.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                value = value * radix as f64 + d as f64;
                seen = true;
            }
            None => break,
        }
    }
    if !seen {
        return Value::float(f64::NAN);
    }
    let value = if negative { -value } else { value };
    if value.abs() <= i64::MAX as f64 && value.fract() == 0.0 {
        Value::int(value as i64)
    } else {
        Value::float(value)
    }
}

// ============================================================================
// Text, Regexp & Time
// ============================================================================

fn register_text(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    /// Usage: ["parse", text] => program node
    fn std_parse(args: &[Value]) -> EvalResult {
        check_arity_exact("parse", args, 1)?;
        parser::parse(&extract_str(&args[0])?)
    }

    /// Usage: ["stringify", node] => program text
    fn std_stringify(args: &[Value]) -> EvalResult {
        check_arity_exact("stringify", args, 1)?;
        Ok(Value::str(parser::stringify(&args[0])))
    }

    fn compile(pattern: &Value) -> Result<Regex, Error> {
        let source = extract_str(pattern)?;
        Regex::new(&source).map_err(|e| Error::BadArgumentType(format!("regexp: {e}")))
    }

    /// Usage: ["reTest", pattern, text] => whether the pattern matches
    fn std_re_test(args: &[Value]) -> EvalResult {
        check_arity_exact("reTest", args, 2)?;
        let re = compile(&args[0])?;
        Ok(Value::Bool(re.is_match(&extract_str(&args[1])?)))
    }

    /// Usage: ["reMatch", pattern, text] => every match as a list of strings
    fn std_re_match(args: &[Value]) -> EvalResult {
        check_arity_exact("reMatch", args, 2)?;
        let re = compile(&args[0])?;
        let text = extract_str(&args[1])?;
        Ok(Value::list(
            re.find_iter(&text)
                .map(|m| Value::str(m.as_str()))
                .collect(),
        ))
    }

    /// Usage: ["reReplace", pattern, text, replacement] => text with every
    /// match replaced
    fn std_re_replace(args: &[Value]) -> EvalResult {
        check_arity_exact("reReplace", args, 3)?;
        let re = compile(&args[0])?;
        let text = extract_str(&args[1])?;
        let replacement = extract_str(&args[2])?;
        Ok(Value::str(
            re.replace_all(&text, replacement.as_str()).into_owned(),
        ))
    }

    /// Usage: ["now"] => milliseconds since the epoch
    fn std_now(args: &[Value]) -> EvalResult {
        check_arity_exact("now", args, 0)?;
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::BadArgumentType(format!("now: {e}")))?;
        Ok(Value::int(duration.as_millis() as i64))
    }

    add(table, "parse", wrap(std_parse))?;
    add(table, "stringify", wrap(std_stringify))?;
    add(table, "reTest", wrap(std_re_test))?;
    add(table, "reMatch", wrap(std_re_match))?;
    add(table, "reReplace", wrap(std_re_replace))?;
    add(table, "now", wrap(std_now))?;
    Ok(())
}

// ============================================================================
// Constants
// ============================================================================

// Constants are quote-thunk nodes: calling the bare name yields the value.
fn register_constants(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    use std::f64::consts;

    add(table, "NaN", quoted(Value::float(f64::NAN)))?;
    add(table, "Infinity", quoted(Value::float(f64::INFINITY)))?;
    add(table, "undefined", quoted(Value::Null))?;

    add(table, "E", quoted(Value::float(consts::E)))?;
    add(table, "LN2", quoted(Value::float(consts::LN_2)))?;
    add(table, "LN10", quoted(Value::float(consts::LN_10)))?;
    add(table, "LOG2E", quoted(Value::float(consts::LOG2_E)))?;
    add(table, "LOG10E", quoted(Value::float(consts::LOG10_E)))?;
    add(table, "PI", quoted(Value::float(consts::PI)))?;
    add(table, "SQRT1_2", quoted(Value::float(consts::FRAC_1_SQRT_2)))?;
    add(table, "SQRT2", quoted(Value::float(consts::SQRT_2)))?;

    add(table, "NUMMAX", quoted(Value::float(f64::MAX)))?;
    add(table, "NUMMIN", quoted(Value::float(f64::MIN_POSITIVE)))?;
    Ok(())
}

// ============================================================================
// Host Bridges
// ============================================================================

fn register_bridges(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    add(table, "Math", math_bridge())?;
    add(table, "String", string_bridge())?;
    add(table, "Array", array_bridge())?;
    add(table, "Number", number_bridge())?;
    Ok(())
}

fn math1(args: &[Value], f: fn(f64) -> f64) -> EvalResult {
    check_arity_exact("Math", args, 1)?;
    Ok(Value::float(f(args[0].to_number().to_f64())))
}

fn math_bridge() -> Value {
    fn abs(args: &[Value]) -> EvalResult {
        math1(args, f64::abs)
    }
    fn floor(args: &[Value]) -> EvalResult {
        math1(args, f64::floor)
    }
    fn ceil(args: &[Value]) -> EvalResult {
        math1(args, f64::ceil)
    }
    fn trunc(args: &[Value]) -> EvalResult {
        math1(args, f64::trunc)
    }
    fn round(args: &[Value]) -> EvalResult {
        // Round halves up, including for negative values.
        math1(args, |x| (x + 0.5).floor())
    }
    fn sqrt(args: &[Value]) -> EvalResult {
        math1(args, f64::sqrt)
    }
    fn cbrt(args: &[Value]) -> EvalResult {
        math1(args, f64::cbrt)
    }
    fn exp(args: &[Value]) -> EvalResult {
        math1(args, f64::exp)
    }
    fn log(args: &[Value]) -> EvalResult {
        math1(args, f64::ln)
    }
    fn log2(args: &[Value]) -> EvalResult {
        math1(args, f64::log2)
    }
    fn log10(args: &[Value]) -> EvalResult {
        math1(args, f64::log10)
    }
    fn sin(args: &[Value]) -> EvalResult {
        math1(args, f64::sin)
    }
    fn cos(args: &[Value]) -> EvalResult {
        math1(args, f64::cos)
    }
    fn tan(args: &[Value]) -> EvalResult {
        math1(args, f64::tan)
    }
    fn sign(args: &[Value]) -> EvalResult {
        math1(args, |x| {
            if x.is_nan() || x == 0.0 { x } else { x.signum() }
        })
    }
    fn pow(args: &[Value]) -> EvalResult {
        check_arity_exact("pow", args, 2)?;
        Ok(Value::float(
            args[0]
                .to_number()
                .to_f64()
                .powf(args[1].to_number().to_f64()),
        ))
    }
    fn atan2(args: &[Value]) -> EvalResult {
        check_arity_exact("atan2", args, 2)?;
        Ok(Value::float(
            args[0]
                .to_number()
                .to_f64()
                .atan2(args[1].to_number().to_f64()),
        ))
    }
    // A single NaN argument poisons the result; f64::max/min would drop it.
    fn max(args: &[Value]) -> EvalResult {
        let mut acc = f64::NEG_INFINITY;
        for v in args {
            let x = v.to_number().to_f64();
            if x.is_nan() {
                return Ok(Value::float(f64::NAN));
            }
            acc = acc.max(x);
        }
        Ok(Value::float(acc))
    }
    fn min(args: &[Value]) -> EvalResult {
        let mut acc = f64::INFINITY;
        for v in args {
            let x = v.to_number().to_f64();
            if x.is_nan() {
                return Ok(Value::float(f64::NAN));
            }
            acc = acc.min(x);
        }
        Ok(Value::float(acc))
    }

    wrap_obj(
        "Math",
        &[
            ("abs", abs),
            ("floor", floor),
            ("ceil", ceil),
            ("trunc", trunc),
            ("round", round),
            ("sqrt", sqrt),
            ("cbrt", cbrt),
            ("exp", exp),
            ("log", log),
            ("log2", log2),
            ("log10", log10),
            ("sin", sin),
            ("cos", cos),
            ("tan", tan),
            ("sign", sign),
            ("pow", pow),
            ("atan2", atan2),
            ("max", max),
            ("min", min),
        ],
    )
}

fn is_str(value: &Value) -> bool {
    matches!(value, Value::Str(_))
}

fn is_list(value: &Value) -> bool {
    matches!(value, Value::List(_))
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Number(_))
}

fn receiver_str(recv: &Value) -> Result<&str, Error> {
    recv.as_str()
        .ok_or_else(|| Error::BadMethodAccess("string method".into()))
}

fn receiver_list(recv: &Value) -> Result<&[Value], Error> {
    recv.as_list()
        .ok_or_else(|| Error::BadMethodAccess("list method".into()))
}

// Slice boundary with the usual negative-offset convention.
fn clamp_offset(i: i64, len: i64) -> i64 {
    if i < 0 { (len + i).max(0) } else { i.min(len) }
}

fn string_bridge() -> Value {
    fn to_upper_case(recv: &Value, _args: &[Value]) -> EvalResult {
        Ok(Value::str(receiver_str(recv)?.to_uppercase()))
    }
    fn to_lower_case(recv: &Value, _args: &[Value]) -> EvalResult {
        Ok(Value::str(receiver_str(recv)?.to_lowercase()))
    }
    fn trim(recv: &Value, _args: &[Value]) -> EvalResult {
        Ok(Value::str(receiver_str(recv)?.trim()))
    }
    fn char_at(recv: &Value, args: &[Value]) -> EvalResult {
        let s = receiver_str(recv)?;
        let i = args.first().map(|v| v.to_number().floor_i64()).unwrap_or(0);
        if i < 0 {
            return Ok(Value::str(""));
        }
        Ok(Value::str(
            s.chars()
                .nth(i as usize)
                .map(|c| c.to_string())
                .unwrap_or_default(),
        ))
    }
    fn index_of(recv: &Value, args: &[Value]) -> EvalResult {
        let s = receiver_str(recv)?;
        let needle = args
            .first()
            .map(|v| v.to_display_string())
            .unwrap_or_default();
        match s.find(&needle) {
            Some(byte_pos) => Ok(Value::int(s[..byte_pos].chars().count() as i64)),
            None => Ok(Value::int(-1)),
        }
    }
    fn slice(recv: &Value, args: &[Value]) -> EvalResult {
        let s = receiver_str(recv)?;
        let len = s.chars().count() as i64;
        let begin = clamp_offset(
            args.first().map(|v| v.to_number().floor_i64()).unwrap_or(0),
            len,
        );
        let end = clamp_offset(
            args.get(1).map(|v| v.to_number().floor_i64()).unwrap_or(len),
            len,
        );
        if begin >= end {
            return Ok(Value::str(""));
        }
        Ok(Value::str(
            s.chars()
                .skip(begin as usize)
                .take((end - begin) as usize)
                .collect::<String>(),
        ))
    }
    fn split(recv: &Value, args: &[Value]) -> EvalResult {
        let s = receiver_str(recv)?;
        let Some(separator) = args.first() else {
            return Ok(Value::list(vec![Value::str(s)]));
        };
        let separator = separator.to_display_string();
        if separator.is_empty() {
            return Ok(Value::list(
                s.chars().map(|c| Value::str(c.to_string())).collect(),
            ));
        }
        Ok(Value::list(
            s.split(&separator).map(Value::str).collect(),
        ))
    }
    fn concat(recv: &Value, args: &[Value]) -> EvalResult {
        let mut out = receiver_str(recv)?.to_string();
        for arg in args {
            out.push_str(&arg.to_display_string());
        }
        Ok(Value::Str(out))
    }
    fn replace(recv: &Value, args: &[Value]) -> EvalResult {
        check_arity_exact("replace", args, 2)?;
        let s = receiver_str(recv)?;
        let pattern = args[0].to_display_string();
        let replacement = args[1].to_display_string();
        Ok(Value::str(s.replacen(&pattern, &replacement, 1)))
    }

    wrap_class(
        "String",
        is_str,
        &[
            ("toUpperCase", to_upper_case),
            ("toLowerCase", to_lower_case),
            ("trim", trim),
            ("charAt", char_at),
            ("indexOf", index_of),
            ("slice", slice),
            ("split", split),
            ("concat", concat),
            ("replace", replace),
        ],
    )
}

fn array_bridge() -> Value {
    fn join(recv: &Value, args: &[Value]) -> EvalResult {
        let items = receiver_list(recv)?;
        let separator = args
            .first()
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| ",".to_string());
        let parts: Vec<String> = items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => other.to_display_string(),
            })
            .collect();
        Ok(Value::str(parts.join(&separator)))
    }
    fn concat(recv: &Value, args: &[Value]) -> EvalResult {
        let mut out = receiver_list(recv)?.to_vec();
        for arg in args {
            match arg {
                Value::List(items) => out.extend(items.iter().cloned()),
                other => out.push(other.clone()),
            }
        }
        Ok(Value::list(out))
    }
    fn index_of(recv: &Value, args: &[Value]) -> EvalResult {
        let items = receiver_list(recv)?;
        let Some(needle) = args.first() else {
            return Ok(Value::int(-1));
        };
        for (i, item) in items.iter().enumerate() {
            if item.strict_eq(needle) {
                return Ok(Value::int(i as i64));
            }
        }
        Ok(Value::int(-1))
    }
    fn slice(recv: &Value, args: &[Value]) -> EvalResult {
        let items = receiver_list(recv)?;
        let len = items.len() as i64;
        let begin = clamp_offset(
            args.first().map(|v| v.to_number().floor_i64()).unwrap_or(0),
            len,
        );
        let end = clamp_offset(
            args.get(1).map(|v| v.to_number().floor_i64()).unwrap_or(len),
            len,
        );
        if begin >= end {
            return Ok(Value::list(vec![]));
        }
        Ok(Value::list(items[begin as usize..end as usize].to_vec()))
    }
    fn reverse(recv: &Value, _args: &[Value]) -> EvalResult {
        let mut items = receiver_list(recv)?.to_vec();
        items.reverse();
        Ok(Value::list(items))
    }

    wrap_class(
        "Array",
        is_list,
        &[
            ("join", join),
            ("concat", concat),
            ("indexOf", index_of),
            ("slice", slice),
            ("reverse", reverse),
        ],
    )
}

fn number_bridge() -> Value {
    fn to_fixed(recv: &Value, args: &[Value]) -> EvalResult {
        let x = recv.to_number().to_f64();
        let digits = args.first().map(|v| v.to_number().floor_i64()).unwrap_or(0);
        if !(0..=100).contains(&digits) {
            return Err(Error::BadArgumentType(format!(
                "toFixed: digits {digits} out of range"
            )));
        }
        Ok(Value::str(format!("{:.*}", digits as usize, x)))
    }
    fn to_string(recv: &Value, args: &[Value]) -> EvalResult {
        let n = recv.to_number();
        let radix = args.first().map(|v| v.to_number().floor_i64()).unwrap_or(10);
        match radix {
            10 => Ok(Value::str(n.to_string())),
            2 | 8 | 16 => {
                let i = n.floor_i64();
                let magnitude = i.unsigned_abs();
                let digits = match radix {
                    2 => format!("{magnitude:b}"),
                    8 => format!("{magnitude:o}"),
                    _ => format!("{magnitude:x}"),
                };
                let sign = if i < 0 { "-" } else { "" };
                Ok(Value::str(format!("{sign}{digits}")))
            }
            _ => Err(Error::BadArgumentType(format!(
                "toString: unsupported radix {radix}"
            ))),
        }
    }

    wrap_class(
        "Number",
        is_number,
        &[("toFixed", to_fixed), ("toString", to_string)],
    )
}

// ============================================================================
// Aliases
// ============================================================================

// Aliases are plain strings: resolving one yields the target name, and call
// dispatch re-resolves until it reaches the real entry.
fn register_aliases(table: &mut FxHashMap<String, Value>) -> Result<(), Error> {
    add(table, ":", Value::str("get"))?;
    add(table, ":=", Value::str("set"))?;
    add(table, "=", Value::str("var"))?;
    add(table, "", Value::str("quote"))?;
    add(table, "~~", Value::str("negative"))?;
    add(table, "\\", Value::str("lambda"))?;
    add(table, "repr", Value::str("stringify"))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_table_holds_the_six_operations() {
        for name in ["callq", "envq", "getq", "xgetq", "setq", "delq"] {
            assert!(core_default(name).is_some(), "missing core op {name}");
        }
    }

    #[test]
    fn lookup_prefers_core_over_public() {
        assert!(matches!(lookup("callq"), Ok(Value::Native(_))));
        assert!(matches!(lookup("if"), Ok(Value::Native(_))));
        assert!(matches!(lookup("no-such-name"), Err(Error::NameNotFound(_))));
    }

    #[test]
    fn double_registration_is_a_conflict() {
        let mut table = FxHashMap::default();
        add(&mut table, "x", Value::int(1)).unwrap();
        assert!(matches!(
            add(&mut table, "x", Value::int(2)),
            Err(Error::NamingConflict(_))
        ));
    }

    #[test]
    fn aliases_resolve_to_target_names() {
        assert_eq!(lookup(":").unwrap(), Value::str("get"));
        assert_eq!(lookup("").unwrap(), Value::str("quote"));
    }

    #[test]
    fn registry_facade_refuses_envq() {
        let facade = registry_env();
        assert!(matches!(
            core_func(&facade, &[Value::str("envq")]),
            Err(Error::Privileged(_))
        ));
    }
}
