//! Tree-walking evaluator for analyzed Tarn programs.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::io;
use std::rc::Rc;

use bigdecimal::RoundingMode;
use num_traits::{Signed, ToPrimitive, Zero};

use tarn_syntax::ast::{
    BinaryOp, Case, Expression, Function, Global, LiteralValue, Source, Statement,
};
use tarn_syntax::error::{error, Result};

use crate::builtins::{self, Output};
use crate::flow::Flow;
use crate::scope::{Callable, RuntimeFunction, Scope};
use crate::value::Value;

pub struct Interpreter {
    scope: Scope,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter whose built-ins write to standard output.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// An interpreter with an injected `print` sink; tests pass a buffer.
    pub fn with_output(out: Output) -> Self {
        let scope = Scope::root();
        builtins::install(&scope, out);
        Interpreter { scope }
    }

    /// The interpreter's root scope, holding globals and built-ins.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Evaluates a program: globals first, then function installation, then
    /// `main/0`, whose result is returned.
    pub fn interpret(&mut self, source: &Source) -> Result<Value> {
        for global in &source.globals {
            self.eval_global(global)?;
        }
        for function in &source.functions {
            self.install_function(function);
        }
        let main = self.scope.lookup_function("main", 0)?;
        self.call(&main, Vec::new())
    }

    /// Evaluates a single expression in the interpreter's root scope.
    pub fn evaluate(&self, expression: &Expression) -> Result<Value> {
        self.eval_expression(&self.scope, expression)
    }

    fn eval_global(&self, global: &Global) -> Result<()> {
        let value = match &global.value {
            Some(value) => self.eval_expression(&self.scope, value)?,
            None => Value::Nil,
        };
        self.scope
            .define_variable(global.name.clone(), global.mutable, value);
        Ok(())
    }

    /// Installs a function value closing over the scope active right now.
    fn install_function(&self, function: &Function) {
        self.scope.define_function(
            function.name.clone(),
            function.parameters.len(),
            Callable::Defined {
                parameters: function.parameters.clone(),
                body: Rc::new(function.statements.clone()),
                closure: self.scope.clone(),
            },
        );
    }

    /// Invokes a function: built-ins run directly; defined functions enter a
    /// child of their capture scope, bind parameters, and run their body.
    /// The returned value is the non-local return value, or nil when the
    /// body falls off the end.
    pub fn call(&self, function: &RuntimeFunction, arguments: Vec<Value>) -> Result<Value> {
        match &function.callable {
            Callable::Builtin(body) => body(&arguments),
            Callable::Defined {
                parameters,
                body,
                closure,
            } => {
                let frame = closure.child();
                for (parameter, argument) in parameters.iter().zip(arguments) {
                    frame.define_variable(parameter.clone(), true, argument);
                }
                match self.exec_block(&frame, body)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }

    fn exec_block(&self, scope: &Scope, statements: &[Statement]) -> Result<Flow> {
        for statement in statements {
            match self.exec_statement(scope, statement)? {
                Flow::Normal => {}
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&self, scope: &Scope, statement: &Statement) -> Result<Flow> {
        match statement {
            Statement::Expression { expression } => {
                self.eval_expression(scope, expression)?;
                Ok(Flow::Normal)
            }
            Statement::Declaration { name, value, .. } => {
                let value = match value {
                    Some(value) => self.eval_expression(scope, value)?,
                    None => Value::Nil,
                };
                scope.define_variable(name.clone(), true, value);
                Ok(Flow::Normal)
            }
            Statement::Assignment { receiver, value } => {
                let (name, index) = match receiver {
                    Expression::Access { name, offset, .. } => (name, offset),
                    _ => return error("an assignment target must be a variable access"),
                };
                let binding = scope.lookup_variable(name)?;
                if !binding.borrow().mutable {
                    return error(format!("cannot assign to immutable variable '{}'", name));
                }
                let value = self.eval_expression(scope, value)?;
                match index {
                    None => {
                        binding.borrow_mut().value = value;
                    }
                    Some(index) => {
                        let index = self.eval_index(scope, index)?;
                        let list = match &binding.borrow().value {
                            Value::List(values) => values.clone(),
                            other => {
                                return error(format!(
                                    "'{}' is not a list, it is a {}",
                                    name,
                                    other.kind()
                                ));
                            }
                        };
                        let mut values = list.borrow_mut();
                        match values.get_mut(index) {
                            Some(slot) => *slot = value,
                            None => return error(format!("index {} is out of range", index)),
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                if self.eval_condition(scope, condition)? {
                    self.exec_block(&scope.child(), then_statements)
                } else {
                    self.exec_block(&scope.child(), else_statements)
                }
            }
            Statement::Switch { condition, cases } => {
                let subject = self.eval_expression(scope, condition)?;
                self.exec_switch(scope, &subject, cases)
            }
            Statement::While {
                condition,
                statements,
            } => {
                while self.eval_condition(scope, condition)? {
                    match self.exec_block(&scope.child(), statements)? {
                        Flow::Normal => {}
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return { value } => {
                let value = self.eval_expression(scope, value)?;
                Ok(Flow::Return(value))
            }
        }
    }

    /// Case values are compared top to bottom by value equality; the first
    /// match runs. The value-less default sits last and catches the rest.
    fn exec_switch(&self, scope: &Scope, subject: &Value, cases: &[Case]) -> Result<Flow> {
        for case in cases {
            match &case.value {
                Some(value) => {
                    if self.eval_expression(scope, value)? == *subject {
                        return self.exec_block(&scope.child(), &case.statements);
                    }
                }
                None => return self.exec_block(&scope.child(), &case.statements),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_expression(&self, scope: &Scope, expression: &Expression) -> Result<Value> {
        match expression {
            Expression::Literal { value, .. } => Ok(literal_value(value)),
            Expression::Group { inner, .. } => self.eval_expression(scope, inner),
            Expression::Binary {
                op, left, right, ..
            } => self.eval_binary(scope, *op, left, right),
            Expression::Access { name, offset, .. } => {
                let binding = scope.lookup_variable(name)?;
                let current = binding.borrow().value.clone();
                match offset {
                    None => Ok(current),
                    Some(offset) => {
                        let index = self.eval_index(scope, offset)?;
                        let values = match current {
                            Value::List(values) => values,
                            other => {
                                return error(format!(
                                    "'{}' is not a list, it is a {}",
                                    name,
                                    other.kind()
                                ));
                            }
                        };
                        let values = values.borrow();
                        match values.get(index) {
                            Some(value) => Ok(value.clone()),
                            None => error(format!("index {} is out of range", index)),
                        }
                    }
                }
            }
            Expression::Call {
                name, arguments, ..
            } => {
                let mut evaluated = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated.push(self.eval_expression(scope, argument)?);
                }
                let function = scope.lookup_function(name, arguments.len())?;
                self.call(&function, evaluated)
            }
            Expression::List { values, .. } => {
                let mut elements = Vec::with_capacity(values.len());
                for value in values {
                    elements.push(self.eval_expression(scope, value)?);
                }
                Ok(Value::list(elements))
            }
        }
    }

    fn eval_binary(
        &self,
        scope: &Scope,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Value> {
        match op {
            // && and || short-circuit: the right operand is untouched when
            // the left decides the result
            BinaryOp::And => {
                if !self.eval_condition(scope, left)? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval_condition(scope, right)?))
            }
            BinaryOp::Or => {
                if self.eval_condition(scope, left)? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval_condition(scope, right)?))
            }
            BinaryOp::Equal => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                Ok(Value::Boolean(left == right))
            }
            BinaryOp::NotEqual => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                Ok(Value::Boolean(left != right))
            }
            BinaryOp::Less | BinaryOp::Greater => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                let ordering = compare(&left, &right)?;
                Ok(Value::Boolean(match op {
                    BinaryOp::Less => ordering == Ordering::Less,
                    _ => ordering == Ordering::Greater,
                }))
            }
            BinaryOp::Add => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                match (left, right) {
                    (Value::Str(l), r) => Ok(Value::Str(format!("{}{}", l, r))),
                    (l, Value::Str(r)) => Ok(Value::Str(format!("{}{}", l, r))),
                    (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l + r)),
                    (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l + r)),
                    (l, r) => error(format!("cannot add {} and {}", l.kind(), r.kind())),
                }
            }
            BinaryOp::Subtract => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                match (left, right) {
                    (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l - r)),
                    (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l - r)),
                    (l, r) => error(format!("cannot subtract {} from {}", r.kind(), l.kind())),
                }
            }
            BinaryOp::Multiply => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                match (left, right) {
                    (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l * r)),
                    (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l * r)),
                    (l, r) => error(format!("cannot multiply {} and {}", l.kind(), r.kind())),
                }
            }
            BinaryOp::Divide => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                match (left, right) {
                    (Value::Integer(l), Value::Integer(r)) => {
                        if r.is_zero() {
                            return error("division by zero");
                        }
                        Ok(Value::Integer(l / r))
                    }
                    (Value::Decimal(l), Value::Decimal(r)) => {
                        if r.is_zero() {
                            return error("division by zero");
                        }
                        // quotient keeps the dividend's scale, rounding
                        // half to even
                        let scale = l.as_bigint_and_exponent().1;
                        let quotient = l / r;
                        Ok(Value::Decimal(
                            quotient.with_scale_round(scale, RoundingMode::HalfEven),
                        ))
                    }
                    (l, r) => error(format!("cannot divide {} by {}", l.kind(), r.kind())),
                }
            }
            BinaryOp::Power => {
                let left = self.eval_expression(scope, left)?;
                let right = self.eval_expression(scope, right)?;
                match (left, right) {
                    (Value::Integer(base), Value::Integer(exponent)) => {
                        if exponent.is_negative() {
                            return error("exponent must be non-negative");
                        }
                        match exponent.to_usize() {
                            Some(exponent) => Ok(Value::Integer(num_traits::pow(base, exponent))),
                            None => error(format!("exponent {} is too large", exponent)),
                        }
                    }
                    (l, r) => error(format!("cannot raise {} to {}", l.kind(), r.kind())),
                }
            }
        }
    }

    fn eval_condition(&self, scope: &Scope, expression: &Expression) -> Result<bool> {
        match self.eval_expression(scope, expression)? {
            Value::Boolean(value) => Ok(value),
            other => error(format!("expected a Boolean, received {}", other.kind())),
        }
    }

    fn eval_index(&self, scope: &Scope, expression: &Expression) -> Result<usize> {
        match self.eval_expression(scope, expression)? {
            Value::Integer(value) => match value.to_usize() {
                Some(index) => Ok(index),
                None => error(format!("index {} is out of range", value)),
            },
            other => error(format!(
                "an index must be an Integer, received {}",
                other.kind()
            )),
        }
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Nil => Value::Nil,
        LiteralValue::Boolean(value) => Value::Boolean(*value),
        LiteralValue::Integer(value) => Value::Integer(value.clone()),
        LiteralValue::Decimal(value) => Value::Decimal(value.clone()),
        LiteralValue::Character(value) => Value::Character(*value),
        LiteralValue::Str(value) => Value::Str(value.clone()),
    }
}

/// Orders two values of the same comparable runtime type.
fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    let ordering = match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => l.cmp(r),
        (Value::Decimal(l), Value::Decimal(r)) => l.cmp(r),
        (Value::Character(l), Value::Character(r)) => l.cmp(r),
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        (l, r) => {
            return error(format!(
                "cannot order {} against {}",
                l.kind(),
                r.kind()
            ));
        }
    };
    Ok(ordering)
}
