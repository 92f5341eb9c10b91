//! Scoped name records
//!
//! An environment is a mutable name-to-value record with an explicit set of
//! own names. Members installed by the runtime itself (the marker and the
//! control slots) are visible to lookup but are not own; user-level writes
//! and deletes may not touch a member they do not own.

use std::fmt;
use std::sync::{Arc, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Error;
use crate::language::Value;

// ============================================================================
// Reserved names
// ============================================================================

/// Marker member identifying a record created by the runtime. Privileged
/// core operations refuse to run against a record that lacks it.
pub const MARKER: &str = "ARBOR";
/// Enclosing scope, followed by chained lookup.
pub const PARENT: &str = "parent";
/// Raw caller node of the invocation that created the record.
pub const CALLER: &str = "caller";
/// Body being evaluated in the record.
pub const CALLEE: &str = "callee";
/// Environment that was active where the callee was referenced.
pub const CALLENV: &str = "callenv";
/// Caught failure, installed transiently by the `try` combinator.
pub const EXCEPTION: &str = "exception";

// ============================================================================
// Environment
// ============================================================================

struct EnvState {
    members: FxHashMap<String, Value>,
    own: FxHashSet<String>,
}

/// Shared mutable record. Cloning is cheap (a pointer copy) and every clone
/// observes mutations immediately; closures routinely keep a parent record
/// alive past the call frame that created it.
#[derive(Clone)]
pub struct Environment {
    state: Arc<RwLock<EnvState>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An empty, unmarked record (object literals parse into these).
    pub fn new() -> Self {
        Environment {
            state: Arc::new(RwLock::new(EnvState {
                members: FxHashMap::default(),
                own: FxHashSet::default(),
            })),
        }
    }

    /// A record created by the runtime, carrying the marker member.
    pub fn runtime() -> Self {
        let env = Environment::new();
        env.set_slot(MARKER, Value::Bool(true));
        env
    }

    /// Look up a member by name. Own bindings and runtime slots resolve the
    /// same way; chained lookup is the evaluator's job, not this record's.
    pub fn get(&self, name: &str) -> Option<Value> {
        let state = self.state.read().unwrap();
        state.members.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let state = self.state.read().unwrap();
        state.members.contains_key(name)
    }

    pub fn is_own(&self, name: &str) -> bool {
        let state = self.state.read().unwrap();
        state.own.contains(name)
    }

    /// Write an own binding. Fails when the name is present but owned by the
    /// runtime, so user code cannot shadow control members by assignment.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut state = self.state.write().unwrap();
        if state.members.contains_key(name) && !state.own.contains(name) {
            return Err(Error::IllegalName(name.to_string()));
        }
        state.members.insert(name.to_string(), value);
        state.own.insert(name.to_string());
        Ok(())
    }

    /// Install a runtime slot, bypassing the ownership check. The member
    /// becomes protected from user-level writes.
    pub fn set_slot(&self, name: &str, value: Value) {
        let mut state = self.state.write().unwrap();
        state.members.insert(name.to_string(), value);
        state.own.remove(name);
    }

    pub(crate) fn insert_own(&self, name: &str, value: Value) {
        let mut state = self.state.write().unwrap();
        state.members.insert(name.to_string(), value);
        state.own.insert(name.to_string());
    }

    /// Remove an own binding. Runtime slots are protected; a missing binding
    /// is reported as not found.
    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let mut state = self.state.write().unwrap();
        if state.members.contains_key(name) && !state.own.contains(name) {
            return Err(Error::IllegalName(name.to_string()));
        }
        if state.own.remove(name) {
            state.members.remove(name);
            Ok(())
        } else {
            Err(Error::NameNotFound(name.to_string()))
        }
    }

    pub fn is_runtime(&self) -> bool {
        self.contains(MARKER)
    }

    /// Member snapshot in name order, used by serialization and `keys`.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let state = self.state.read().unwrap();
        let mut entries: Vec<(String, Value)> = state
            .members
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn member_names(&self) -> Vec<String> {
        let state = self.state.read().unwrap();
        let mut names: Vec<String> = state.members.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<environment>")
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let env = Environment::runtime();
        env.set("x", Value::int(42)).unwrap();
        assert_eq!(env.get("x"), Some(Value::int(42)));
        assert!(env.is_own("x"));
    }

    #[test]
    fn slots_resolve_but_reject_user_writes() {
        let env = Environment::runtime();
        env.set_slot(CALLER, Value::list(vec![]));
        assert!(env.get(CALLER).is_some());
        assert!(matches!(
            env.set(CALLER, Value::Null),
            Err(Error::IllegalName(_))
        ));
        assert!(matches!(env.delete(CALLER), Err(Error::IllegalName(_))));
    }

    #[test]
    fn marker_is_protected() {
        let env = Environment::runtime();
        assert!(env.is_runtime());
        assert!(matches!(
            env.set(MARKER, Value::Bool(false)),
            Err(Error::IllegalName(_))
        ));
    }

    #[test]
    fn absent_reserved_names_are_writable() {
        // The closure wiring relies on writing `parent` into a fresh record.
        let env = Environment::runtime();
        env.set(PARENT, Value::Env(Environment::runtime())).unwrap();
        assert!(env.is_own(PARENT));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let env = Environment::runtime();
        assert!(matches!(env.delete("x"), Err(Error::NameNotFound(_))));
    }

    #[test]
    fn clones_share_state() {
        let env = Environment::runtime();
        let alias = env.clone();
        env.set("x", Value::int(1)).unwrap();
        assert_eq!(alias.get("x"), Some(Value::int(1)));
        assert!(env.ptr_eq(&alias));
    }
}
