//! Runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

/// A Tarn runtime value. Numbers are exact big numbers; lists share their
/// storage, so an element assignment through one binding is visible through
/// every alias of the same list.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(values)))
    }

    /// The type name used in runtime error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Character(_) => "Character",
            Value::Str(_) => "String",
            Value::List(_) => "List",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Character(value) => write!(f, "{}", value),
            Value::Str(value) => write!(f, "{}", value),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}
