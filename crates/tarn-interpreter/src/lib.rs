//! Tarn interpreter: evaluates analyzed programs with a tree-walking
//! evaluator over a runtime scope chain.
//!
//! Function values close over the scope active when they are installed, so
//! a call always enters a child of its definition scope, never of its call
//! site. Early `RETURN` travels as a control-flow signal that only the
//! function-invocation frame intercepts.

pub mod builtins;
pub mod flow;
pub mod interpreter;
pub mod scope;
pub mod value;

pub use builtins::Output;
pub use interpreter::Interpreter;
pub use scope::Scope;
pub use value::Value;
