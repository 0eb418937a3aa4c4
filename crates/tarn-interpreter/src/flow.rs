//! Control flow signal for non-local returns.

use crate::value::Value;

/// Result of executing a statement: either fall through to the next
/// statement, or unwind to the nearest function-invocation frame, which is
/// the only place that turns `Return` back into a plain value.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}
