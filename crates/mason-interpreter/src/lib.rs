//! Mason interpreter: evaluates a parsed build file with a tree-walking
//! interpreter and accumulates the build model as a side effect.
//!
//! The interpreter is single-threaded and synchronous. Configuration blocks
//! (`project`, `executable`, `compiler`, ...) push environment frames and
//! read their recognized keys back out of them; everything else is ordinary
//! expression evaluation over a small dynamic value model.

pub mod builtins;
pub mod env;
mod flow;
pub mod interpreter;
pub mod value;

pub use env::Env;
pub use interpreter::Interpreter;
pub use value::Value;
