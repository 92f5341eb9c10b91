pub mod adapter;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod language;
pub mod native;
pub mod numeric;
pub mod parser;
pub mod stdlib;

// Re-export commonly used items for convenience
pub use environment::Environment;
pub use error::{Error, EvalResult};
pub use interpreter::{call, core_func};
pub use language::{NativeFn, Value};
pub use numeric::Number;
pub use parser::{parse, stringify};

/// Allocate a fresh root environment.
pub fn init() -> Environment {
    Environment::runtime()
}

/// Parse `program`, evaluate it against `env`, and serialize the result.
pub fn exec(env: &Environment, program: &str) -> Result<String, Error> {
    let node = parser::parse(program)?;
    let result = interpreter::call(env, &node)?;
    Ok(parser::stringify(&result))
}

/// Evaluate `program` against a fresh root environment.
pub fn boot(program: &str) -> Result<String, Error> {
    exec(&init(), program)
}
