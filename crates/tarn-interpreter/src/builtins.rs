//! Built-in functions preinstalled in the interpreter's root scope.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use tarn_syntax::error::{error, Error, Result};

use crate::scope::{Callable, Scope};
use crate::value::Value;

/// Shared sink for `print` output, injectable so tests can capture it.
pub type Output = Rc<RefCell<dyn Write>>;

/// Installs `print/1`, `logarithm/1`, and `converter/2` into `scope`.
pub fn install(scope: &Scope, out: Output) {
    let sink = out.clone();
    scope.define_function(
        "print",
        1,
        Callable::Builtin(Box::new(move |args| {
            let [value] = args else {
                return error("print expects one argument");
            };
            writeln!(sink.borrow_mut(), "{}", value)
                .map_err(|e| Error::new(format!("print failed: {}", e)))?;
            Ok(Value::Nil)
        })),
    );

    scope.define_function(
        "logarithm",
        1,
        Callable::Builtin(Box::new(|args| {
            let value = match args {
                [Value::Decimal(value)] => value,
                [other] => {
                    return error(format!(
                        "logarithm expects a Decimal, received {}",
                        other.kind()
                    ));
                }
                _ => return error("logarithm expects one argument"),
            };
            let approx = match value.to_f64() {
                Some(approx) => approx,
                None => return error("logarithm argument does not fit a double"),
            };
            if approx <= 0.0 {
                return error("logarithm expects a positive Decimal");
            }
            // widen back through the shortest decimal rendering of the
            // host float rather than its exact binary expansion
            let result = BigDecimal::from_str(&approx.ln().to_string())
                .map_err(|_| Error::new("logarithm produced a non-decimal result"))?;
            Ok(Value::Decimal(result))
        })),
    );

    scope.define_function(
        "converter",
        2,
        Callable::Builtin(Box::new(|args| {
            let (value, base) = match args {
                [Value::Integer(value), Value::Integer(base)] => (value, base),
                [a, b] => {
                    return error(format!(
                        "converter expects two Integers, received {} and {}",
                        a.kind(),
                        b.kind()
                    ));
                }
                _ => return error("converter expects two arguments"),
            };
            if value.is_negative() {
                return error("converter expects a non-negative Integer");
            }
            if base < &BigInt::from(2) {
                return error("converter expects a base of at least 2");
            }
            // repeated division; each digit keeps its decimal rendering
            let mut digits = Vec::new();
            let mut quotient = value.clone();
            loop {
                digits.push((&quotient % base).to_string());
                quotient = &quotient / base;
                if quotient.is_zero() {
                    break;
                }
            }
            digits.reverse();
            Ok(Value::Str(digits.concat()))
        })),
    );
}
