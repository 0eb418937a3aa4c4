//! Abstract syntax tree for Tarn programs.
//!
//! Nodes carry `Option` annotation slots that start out `None` and are
//! written exactly once by the analyzer: every expression gets a resolved
//! [`Type`], accesses and declarations a resolved [`Variable`], calls and
//! function definitions a resolved [`FunctionSig`]. The interpreter and the
//! emitter both consume the annotated tree.

use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::error::{error, Result};

/// Static types, with `Any` at the top and `Comparable` over the four
/// ordered primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Any,
    Nil,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
    Comparable,
}

impl Type {
    /// Resolves a type name as written at a declaration site.
    pub fn from_name(name: &str) -> Result<Type> {
        match name {
            "Any" => Ok(Type::Any),
            "Nil" => Ok(Type::Nil),
            "Boolean" => Ok(Type::Boolean),
            "Integer" => Ok(Type::Integer),
            "Decimal" => Ok(Type::Decimal),
            "Character" => Ok(Type::Character),
            "String" => Ok(Type::String),
            "Comparable" => Ok(Type::Comparable),
            _ => error(format!("unknown type '{}'", name)),
        }
    }

    /// The Java spelling used by the emitter.
    pub fn jvm_name(self) -> &'static str {
        match self {
            Type::Any => "Object",
            Type::Nil => "Void",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
            Type::Comparable => "Comparable",
        }
    }

    /// Whether a value of this type can be used where `target` is expected:
    /// equal types, anything into `Any`, and the ordered primitives into
    /// `Comparable`.
    pub fn assignable_to(self, target: Type) -> bool {
        if self == target || target == Type::Any {
            return true;
        }
        target == Type::Comparable
            && matches!(
                self,
                Type::Integer | Type::Decimal | Type::Character | Type::String
            )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Any => "Any",
            Type::Nil => "Nil",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Character => "Character",
            Type::String => "String",
            Type::Comparable => "Comparable",
        };
        write!(f, "{}", name)
    }
}

/// A variable binding as resolved by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub mutable: bool,
    pub ty: Type,
}

/// A function binding as resolved by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    /// Spelling at the emission target; differs from `name` for built-ins.
    pub jvm_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

/// Decoded literal payloads. Integer and decimal literals are exact big
/// numbers; character and string literals have had their escapes translated
/// and quotes stripped by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    Str(String),
}

/// Binary operators, from lowest to highest precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Less,
    Greater,
    Equal,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
        }
    }
}

/// Expressions. Every variant carries a `ty` slot the analyzer fills.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        value: LiteralValue,
        ty: Option<Type>,
    },
    Group {
        inner: Box<Expression>,
        ty: Option<Type>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Option<Type>,
    },
    /// A variable read, optionally indexed into a list.
    Access {
        name: String,
        offset: Option<Box<Expression>>,
        variable: Option<Variable>,
        ty: Option<Type>,
    },
    Call {
        name: String,
        arguments: Vec<Expression>,
        signature: Option<FunctionSig>,
        ty: Option<Type>,
    },
    /// A `[e, ...]` list literal; only legal as a `LIST` global initializer.
    /// Its resolved type is the element type, taken from the first element.
    List {
        values: Vec<Expression>,
        ty: Option<Type>,
    },
}

impl Expression {
    pub fn literal(value: LiteralValue) -> Self {
        Expression::Literal { value, ty: None }
    }

    pub fn group(inner: Expression) -> Self {
        Expression::Group {
            inner: Box::new(inner),
            ty: None,
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty: None,
        }
    }

    pub fn access(name: impl Into<String>, offset: Option<Expression>) -> Self {
        Expression::Access {
            name: name.into(),
            offset: offset.map(Box::new),
            variable: None,
            ty: None,
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            name: name.into(),
            arguments,
            signature: None,
            ty: None,
        }
    }

    pub fn list(values: Vec<Expression>) -> Self {
        Expression::List { values, ty: None }
    }

    /// The resolved type; present on every expression after analysis.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Expression::Literal { ty, .. }
            | Expression::Group { ty, .. }
            | Expression::Binary { ty, .. }
            | Expression::Access { ty, .. }
            | Expression::Call { ty, .. }
            | Expression::List { ty, .. } => *ty,
        }
    }
}

/// Statements, legal only inside function bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression {
        expression: Expression,
    },
    /// `LET name (: Type)? (= value)? ;`
    Declaration {
        name: String,
        type_name: Option<String>,
        value: Option<Expression>,
        variable: Option<Variable>,
    },
    Assignment {
        receiver: Expression,
        value: Expression,
    },
    If {
        condition: Expression,
        then_statements: Vec<Statement>,
        else_statements: Vec<Statement>,
    },
    Switch {
        condition: Expression,
        cases: Vec<Case>,
    },
    While {
        condition: Expression,
        statements: Vec<Statement>,
    },
    Return {
        value: Expression,
    },
}

/// One arm of a `SWITCH`. The default case has no value and must be last.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Expression>,
    pub statements: Vec<Statement>,
}

/// A top-level `LIST`, `VAR`, or `VAL` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub type_name: String,
    pub mutable: bool,
    pub value: Option<Expression>,
    pub variable: Option<Variable>,
}

/// A `FUN` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Statement>,
    pub signature: Option<FunctionSig>,
}

/// A whole program: globals first, then functions. A well-formed program
/// defines `main/0` returning `Integer`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}
