//! Failure taxonomy for the evaluator
//!
//! Every failure propagates unchanged up the call stack until either the
//! embedding caller receives it or a `try` form intercepts it.

use crate::language::Value;

pub type EvalResult = Result<Value, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Name resolution exhausted the scope chain and the standard library.
    #[error("value not found: {0}")]
    NameNotFound(String),

    /// A string callee did not resolve to any value.
    #[error("callee not found: {0}")]
    CalleeNotFound(String),

    /// The resolved callee is of a kind that cannot be applied.
    #[error("callee is not callable: {0}")]
    NotCallable(String),

    /// A write or delete targeted a runtime-installed member that is not an
    /// own binding of the environment.
    #[error("name is not acceptable: {0}")]
    IllegalName(String),

    /// Two registrations targeted the same name in the same registry.
    #[error("naming conflict in the library: {0}")]
    NamingConflict(String),

    /// A bridged method was invoked on a receiver of the wrong kind.
    #[error("bad access to object method: {0}")]
    BadMethodAccess(String),

    /// A primitive received a value of the wrong runtime kind.
    #[error("bad argument type: {0}")]
    BadArgumentType(String),

    /// A privileged core operation was invoked from an environment that does
    /// not carry the runtime marker.
    #[error("core operation is not allowed: {0}")]
    Privileged(String),

    /// The program text is not well-formed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A value raised by the `throw` primitive.
    #[error("uncaught exception: {0}")]
    Thrown(Value),
}

impl Error {
    /// Short kind tag, used when a caught failure is materialized into a
    /// record for an exception handler.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NameNotFound(_) => "NameNotFound",
            Error::CalleeNotFound(_) => "CalleeNotFound",
            Error::NotCallable(_) => "NotCallable",
            Error::IllegalName(_) => "IllegalName",
            Error::NamingConflict(_) => "NamingConflict",
            Error::BadMethodAccess(_) => "BadMethodAccess",
            Error::BadArgumentType(_) => "BadArgumentType",
            Error::Privileged(_) => "Privileged",
            Error::Syntax(_) => "Syntax",
            Error::Thrown(_) => "Thrown",
        }
    }
}
