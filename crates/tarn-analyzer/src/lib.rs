//! Tarn semantic analyzer: resolves names through the lexical scope chain
//! and annotates every expression with its type.
//!
//! Analysis is a single top-down walk over the parsed tree. It fills the
//! AST's annotation slots in place, so the same tree feeds both the
//! interpreter and the emitter afterwards.

pub mod scope;

pub use scope::Scope;

use num_traits::ToPrimitive;

use tarn_syntax::ast::{
    BinaryOp, Expression, Function, FunctionSig, Global, LiteralValue, Source, Statement, Type,
    Variable,
};
use tarn_syntax::error::{error, Result};

pub struct Analyzer {
    scope: Scope,
    /// Expected return type of the innermost function being analyzed.
    return_type: Option<Type>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// An analyzer whose root scope knows the built-in functions.
    pub fn new() -> Self {
        let scope = Scope::root();
        scope.define_function(FunctionSig {
            name: "print".to_string(),
            jvm_name: "System.out.println".to_string(),
            parameter_types: vec![Type::Any],
            return_type: Type::Nil,
        });
        scope.define_function(FunctionSig {
            name: "logarithm".to_string(),
            jvm_name: "Math.log".to_string(),
            parameter_types: vec![Type::Decimal],
            return_type: Type::Decimal,
        });
        scope.define_function(FunctionSig {
            name: "converter".to_string(),
            jvm_name: "converter".to_string(),
            parameter_types: vec![Type::Integer, Type::Integer],
            return_type: Type::String,
        });
        Analyzer {
            scope,
            return_type: None,
        }
    }

    /// Analyzes a whole program in place. Afterwards every expression has a
    /// resolved type, every access a resolved variable, and every call a
    /// resolved function.
    pub fn analyze(&mut self, source: &mut Source) -> Result<()> {
        for global in &mut source.globals {
            self.analyze_global(global)?;
        }
        for function in &mut source.functions {
            self.analyze_function(function)?;
        }
        let main = self.scope.lookup_function("main", 0)?;
        if main.return_type != Type::Integer {
            return error("main/0 must return Integer");
        }
        Ok(())
    }

    fn analyze_global(&mut self, global: &mut Global) -> Result<()> {
        let ty = Type::from_name(&global.type_name)?;
        if let Some(value) = &mut global.value {
            self.analyze_expression(value)?;
            require_assignable(ty, expression_type(value)?)?;
        }
        let variable = Variable {
            name: global.name.clone(),
            mutable: global.mutable,
            ty,
        };
        self.scope.define_variable(variable.clone());
        global.variable = Some(variable);
        Ok(())
    }

    fn analyze_function(&mut self, function: &mut Function) -> Result<()> {
        let mut parameter_types = Vec::with_capacity(function.parameter_type_names.len());
        for name in &function.parameter_type_names {
            parameter_types.push(Type::from_name(name)?);
        }
        let return_type = match &function.return_type_name {
            Some(name) => Type::from_name(name)?,
            None => Type::Nil,
        };
        let signature = FunctionSig {
            name: function.name.clone(),
            jvm_name: function.name.clone(),
            parameter_types: parameter_types.clone(),
            return_type,
        };
        // installed before the body is analyzed so the function can call
        // itself
        self.scope.define_function(signature.clone());
        function.signature = Some(signature);

        let enclosing_return = self.return_type.replace(return_type);
        let outer = self.scope.clone();
        self.scope = outer.child();
        for (name, ty) in function.parameters.iter().zip(&parameter_types) {
            self.scope.define_variable(Variable {
                name: name.clone(),
                mutable: true,
                ty: *ty,
            });
        }
        let result = self.analyze_block(&mut function.statements);
        self.scope = outer;
        self.return_type = enclosing_return;
        result
    }

    fn analyze_block(&mut self, statements: &mut [Statement]) -> Result<()> {
        for statement in statements {
            self.analyze_statement(statement)?;
        }
        Ok(())
    }

    /// Analyzes a block in a fresh child scope, restoring the outer scope
    /// afterwards.
    fn analyze_nested_block(&mut self, statements: &mut [Statement]) -> Result<()> {
        let outer = self.scope.clone();
        self.scope = outer.child();
        let result = self.analyze_block(statements);
        self.scope = outer;
        result
    }

    fn analyze_statement(&mut self, statement: &mut Statement) -> Result<()> {
        match statement {
            Statement::Expression { expression } => {
                if !matches!(expression, Expression::Call { .. }) {
                    return error("an expression statement must be a function call");
                }
                self.analyze_expression(expression)
            }
            Statement::Declaration {
                name,
                type_name,
                value,
                variable,
            } => {
                let declared = match type_name {
                    Some(type_name) => Some(Type::from_name(type_name)?),
                    None => None,
                };
                let value_type = match value {
                    Some(value) => {
                        self.analyze_expression(value)?;
                        Some(expression_type(value)?)
                    }
                    None => None,
                };
                let ty = match (declared, value_type) {
                    (Some(declared), Some(value_type)) => {
                        require_assignable(declared, value_type)?;
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(value_type)) => value_type,
                    (None, None) => {
                        return error(format!(
                            "declaration of '{}' needs a type or a value",
                            name
                        ));
                    }
                };
                let resolved = Variable {
                    name: name.clone(),
                    mutable: true,
                    ty,
                };
                self.scope.define_variable(resolved.clone());
                *variable = Some(resolved);
                Ok(())
            }
            Statement::Assignment { receiver, value } => {
                if !matches!(receiver, Expression::Access { .. }) {
                    return error("an assignment target must be a variable access");
                }
                self.analyze_expression(receiver)?;
                self.analyze_expression(value)?;
                let target = match receiver {
                    Expression::Access {
                        variable: Some(variable),
                        ..
                    } => variable.ty,
                    _ => return error("assignment target was not resolved"),
                };
                require_assignable(target, expression_type(value)?)
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                self.analyze_expression(condition)?;
                require_assignable(Type::Boolean, expression_type(condition)?)?;
                if then_statements.is_empty() {
                    return error("IF needs at least one statement in its DO block");
                }
                self.analyze_nested_block(then_statements)?;
                self.analyze_nested_block(else_statements)
            }
            Statement::Switch { condition, cases } => {
                self.analyze_expression(condition)?;
                let condition_type = expression_type(condition)?;
                let count = cases.len();
                for (index, case) in cases.iter_mut().enumerate() {
                    let last = index + 1 == count;
                    match &mut case.value {
                        Some(value) => {
                            if last {
                                return error("a SWITCH must end with a value-less DEFAULT case");
                            }
                            self.analyze_expression(value)?;
                            require_assignable(condition_type, expression_type(value)?)?;
                        }
                        None => {
                            if !last {
                                return error("only the last case of a SWITCH may be the default");
                            }
                        }
                    }
                    self.analyze_nested_block(&mut case.statements)?;
                }
                Ok(())
            }
            Statement::While {
                condition,
                statements,
            } => {
                self.analyze_expression(condition)?;
                require_assignable(Type::Boolean, expression_type(condition)?)?;
                self.analyze_nested_block(statements)
            }
            Statement::Return { value } => {
                self.analyze_expression(value)?;
                let expected = match self.return_type {
                    Some(expected) => expected,
                    None => return error("RETURN outside of a function"),
                };
                require_assignable(expected, expression_type(value)?)
            }
        }
    }

    fn analyze_expression(&mut self, expression: &mut Expression) -> Result<()> {
        match expression {
            Expression::Literal { value, ty } => {
                let resolved = match value {
                    LiteralValue::Nil => Type::Nil,
                    LiteralValue::Boolean(_) => Type::Boolean,
                    LiteralValue::Integer(value) => {
                        if value.to_i32().is_none() {
                            return error(format!(
                                "integer literal {} does not fit the target integer",
                                value
                            ));
                        }
                        Type::Integer
                    }
                    LiteralValue::Decimal(value) => {
                        if !value.to_f64().map_or(false, f64::is_finite) {
                            return error("decimal literal does not fit the target double");
                        }
                        Type::Decimal
                    }
                    LiteralValue::Character(_) => Type::Character,
                    LiteralValue::Str(_) => Type::String,
                };
                *ty = Some(resolved);
                Ok(())
            }
            Expression::Group { inner, ty } => {
                if !matches!(inner.as_ref(), Expression::Binary { .. }) {
                    return error("a group must contain a binary expression");
                }
                self.analyze_expression(inner)?;
                *ty = inner.ty();
                Ok(())
            }
            Expression::Binary {
                op,
                left,
                right,
                ty,
            } => {
                self.analyze_expression(left)?;
                self.analyze_expression(right)?;
                let lt = expression_type(left)?;
                let rt = expression_type(right)?;
                let resolved = match *op {
                    BinaryOp::And | BinaryOp::Or => {
                        require_assignable(Type::Boolean, lt)?;
                        require_assignable(Type::Boolean, rt)?;
                        Type::Boolean
                    }
                    BinaryOp::Less | BinaryOp::Greater | BinaryOp::Equal | BinaryOp::NotEqual => {
                        require_assignable(Type::Comparable, lt)?;
                        require_assignable(Type::Comparable, rt)?;
                        if lt != rt {
                            return error(format!("cannot compare {} with {}", lt, rt));
                        }
                        Type::Boolean
                    }
                    BinaryOp::Add if lt == Type::String || rt == Type::String => Type::String,
                    BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
                        if lt != Type::Integer && lt != Type::Decimal {
                            return error(format!(
                                "'{}' expects Integer or Decimal operands, found {}",
                                op.as_str(),
                                lt
                            ));
                        }
                        if rt != lt {
                            return error(format!(
                                "'{}' expects matching operand types, found {} and {}",
                                op.as_str(),
                                lt,
                                rt
                            ));
                        }
                        lt
                    }
                    BinaryOp::Power => {
                        require_assignable(Type::Integer, lt)?;
                        require_assignable(Type::Integer, rt)?;
                        Type::Integer
                    }
                };
                *ty = Some(resolved);
                Ok(())
            }
            Expression::Access {
                name,
                offset,
                variable,
                ty,
            } => {
                let resolved = self.scope.lookup_variable(name)?;
                if let Some(offset) = offset {
                    self.analyze_expression(offset)?;
                    require_assignable(Type::Integer, expression_type(offset)?)?;
                }
                *ty = Some(resolved.ty);
                *variable = Some(resolved);
                Ok(())
            }
            Expression::Call {
                name,
                arguments,
                signature,
                ty,
            } => {
                let resolved = self.scope.lookup_function(name, arguments.len())?;
                for (argument, parameter_type) in
                    arguments.iter_mut().zip(&resolved.parameter_types)
                {
                    self.analyze_expression(argument)?;
                    require_assignable(*parameter_type, expression_type(argument)?)?;
                }
                *ty = Some(resolved.return_type);
                *signature = Some(resolved);
                Ok(())
            }
            Expression::List { values, ty } => {
                let mut element_type = None;
                for value in values.iter_mut() {
                    self.analyze_expression(value)?;
                    let value_type = expression_type(value)?;
                    match element_type {
                        None => element_type = Some(value_type),
                        Some(element_type) => require_assignable(element_type, value_type)?,
                    }
                }
                match element_type {
                    Some(element_type) => {
                        *ty = Some(element_type);
                        Ok(())
                    }
                    None => error("a list literal needs at least one element"),
                }
            }
        }
    }
}

fn require_assignable(target: Type, ty: Type) -> Result<()> {
    if ty.assignable_to(target) {
        Ok(())
    } else {
        error(format!("type mismatch: cannot assign {} to {}", ty, target))
    }
}

fn expression_type(expression: &Expression) -> Result<Type> {
    match expression.ty() {
        Some(ty) => Ok(ty),
        None => error("expression has no resolved type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_lexer::Lexer;
    use tarn_parser::Parser;

    fn analyze_source(input: &str) -> Result<Source> {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        let mut source = Parser::new(tokens)
            .parse_source()
            .expect("parsing should succeed");
        Analyzer::new().analyze(&mut source)?;
        Ok(source)
    }

    fn expect_ok(input: &str) -> Source {
        analyze_source(input).unwrap_or_else(|e| panic!("analysis failed: {}\nInput: {}", e, input))
    }

    fn expect_error(input: &str) {
        if let Ok(source) = analyze_source(input) {
            panic!("expected analysis error, got {:?}", source);
        }
    }

    #[test]
    fn main_must_exist_and_return_integer() {
        expect_ok("FUN main(): Integer DO RETURN 0; END");
        expect_error("FUN other(): Integer DO RETURN 0; END");
        expect_error("FUN main(): String DO RETURN \"x\"; END");
        expect_error("FUN main(x: Integer): Integer DO RETURN x; END");
    }

    #[test]
    fn every_slot_is_filled_after_analysis() {
        let source = expect_ok(
            "VAR x: Integer = 1;\n\
             FUN main(): Integer DO RETURN x + 2; END",
        );
        let global = &source.globals[0];
        assert_eq!(
            global.variable,
            Some(Variable {
                name: "x".to_string(),
                mutable: true,
                ty: Type::Integer,
            })
        );
        let function = &source.functions[0];
        let signature = function.signature.as_ref().expect("signature filled");
        assert_eq!(signature.return_type, Type::Integer);
        match &function.statements[0] {
            Statement::Return { value } => {
                assert_eq!(value.ty(), Some(Type::Integer));
                match value {
                    Expression::Binary { left, right, .. } => {
                        assert_eq!(left.ty(), Some(Type::Integer));
                        assert_eq!(right.ty(), Some(Type::Integer));
                        assert!(matches!(
                            left.as_ref(),
                            Expression::Access {
                                variable: Some(_),
                                ..
                            }
                        ));
                    }
                    other => panic!("expected Binary, got {:?}", other),
                }
            }
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn global_initializer_must_match_its_type() {
        expect_ok("VAR x: Integer = 1; FUN main(): Integer DO RETURN 0; END");
        expect_ok("VAR a: Any = 1; FUN main(): Integer DO RETURN 0; END");
        expect_error("VAR x: Integer = \"text\"; FUN main(): Integer DO RETURN 0; END");
        expect_error("VAR x: Nonsense = 1; FUN main(): Integer DO RETURN 0; END");
    }

    #[test]
    fn comparable_accepts_the_ordered_primitives() {
        expect_ok("VAR c: Comparable = 'x'; FUN main(): Integer DO RETURN 0; END");
        expect_ok("VAR c: Comparable = 1.5; FUN main(): Integer DO RETURN 0; END");
        expect_error("VAR c: Comparable = TRUE; FUN main(): Integer DO RETURN 0; END");
    }

    #[test]
    fn declarations_need_a_type_or_a_value() {
        expect_ok("FUN main(): Integer DO LET x = 1; RETURN x; END");
        expect_ok("FUN main(): Integer DO LET x: Integer; RETURN 0; END");
        expect_error("FUN main(): Integer DO LET x; RETURN 0; END");
        expect_error("FUN main(): Integer DO LET x: Integer = \"text\"; RETURN 0; END");
    }

    #[test]
    fn assignment_checks_the_receiver() {
        expect_ok("VAR x: Integer = 1; FUN main(): Integer DO x = 2; RETURN x; END");
        expect_error("FUN main(): Integer DO 1 = 2; RETURN 0; END");
        expect_error(
            "VAR x: Integer = 1; FUN main(): Integer DO x = \"text\"; RETURN x; END",
        );
    }

    #[test]
    fn if_condition_must_be_boolean_and_then_nonempty() {
        expect_ok("FUN main(): Integer DO IF TRUE DO RETURN 1; END RETURN 0; END");
        expect_error("FUN main(): Integer DO IF 1 DO RETURN 1; END RETURN 0; END");
        expect_error("FUN main(): Integer DO IF TRUE DO ELSE RETURN 1; END RETURN 0; END");
    }

    #[test]
    fn branch_locals_do_not_leak() {
        expect_error(
            "FUN main(): Integer DO \
             IF TRUE DO LET a = 1; END \
             RETURN a; \
             END",
        );
    }

    #[test]
    fn switch_cases_must_match_the_condition_type() {
        expect_ok(
            "VAR c: Integer = 2;\n\
             FUN main(): Integer DO \
             SWITCH c CASE 1: print(1); DEFAULT print(0); END \
             RETURN 0; \
             END",
        );
        expect_error(
            "VAR c: Integer = 2;\n\
             FUN main(): Integer DO \
             SWITCH c CASE \"one\": print(1); DEFAULT print(0); END \
             RETURN 0; \
             END",
        );
    }

    #[test]
    fn comparisons_require_matching_comparable_types() {
        expect_ok("FUN main(): Integer DO IF 1 < 2 DO RETURN 1; END RETURN 0; END");
        expect_error("FUN main(): Integer DO IF 1 < 2.0 DO RETURN 1; END RETURN 0; END");
        expect_error("FUN main(): Integer DO IF NIL == NIL DO RETURN 1; END RETURN 0; END");
    }

    #[test]
    fn plus_concatenates_when_either_side_is_a_string() {
        expect_ok(
            "FUN main(): Integer DO print(\"n = \" + 1); RETURN 0; END",
        );
        expect_ok(
            "FUN main(): Integer DO print(1.5 + \" half\"); RETURN 0; END",
        );
        expect_error("FUN main(): Integer DO print(1 + 2.0); RETURN 0; END");
    }

    #[test]
    fn power_is_integer_only() {
        expect_ok("FUN main(): Integer DO RETURN 2 ^ 8; END");
        expect_error("FUN main(): Integer DO RETURN 2.0 ^ 8; END");
    }

    #[test]
    fn groups_must_wrap_a_binary_expression() {
        expect_ok("FUN main(): Integer DO RETURN (1 + 2); END");
        expect_error("FUN main(): Integer DO RETURN (1); END");
    }

    #[test]
    fn calls_check_arity_and_argument_types() {
        expect_ok(
            "FUN f(a: Integer): Integer DO RETURN a; END\n\
             FUN main(): Integer DO RETURN f(1); END",
        );
        expect_error(
            "FUN f(a: Integer): Integer DO RETURN a; END\n\
             FUN main(): Integer DO RETURN f(1, 2); END",
        );
        expect_error(
            "FUN f(a: Integer): Integer DO RETURN a; END\n\
             FUN main(): Integer DO RETURN f(\"text\"); END",
        );
    }

    #[test]
    fn recursion_resolves_through_the_stub() {
        expect_ok(
            "FUN fact(n: Integer): Integer DO \
             IF n < 2 DO RETURN 1; END \
             RETURN n * fact(n - 1); \
             END\n\
             FUN main(): Integer DO RETURN fact(5); END",
        );
    }

    #[test]
    fn expression_statements_must_be_calls() {
        expect_ok("FUN main(): Integer DO print(1); RETURN 0; END");
        expect_error("FUN main(): Integer DO 1 + 2; RETURN 0; END");
    }

    #[test]
    fn return_value_must_match_the_function() {
        expect_error("FUN main(): Integer DO RETURN \"text\"; END");
        expect_ok(
            "FUN show(v: Any) DO print(v); END\n\
             FUN main(): Integer DO show(1); RETURN 0; END",
        );
    }

    #[test]
    fn integer_literals_must_fit_the_target_int() {
        expect_ok("FUN main(): Integer DO RETURN 2147483647; END");
        expect_error("FUN main(): Integer DO RETURN 2147483648; END");
    }

    #[test]
    fn list_elements_follow_the_first_element() {
        expect_ok(
            "LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO RETURN nums[0]; END",
        );
        expect_error(
            "LIST nums: Integer = [1, \"two\"];\n\
             FUN main(): Integer DO RETURN 0; END",
        );
        expect_error(
            "LIST nums: Integer = [1.0, 2.0];\n\
             FUN main(): Integer DO RETURN 0; END",
        );
    }

    #[test]
    fn list_index_must_be_an_integer() {
        expect_error(
            "LIST nums: Integer = [1, 2];\n\
             FUN main(): Integer DO RETURN nums[\"zero\"]; END",
        );
    }

    #[test]
    fn builtins_are_preinstalled() {
        expect_ok(
            "FUN main(): Integer DO \
             print(logarithm(2.0)); \
             print(converter(255, 2)); \
             RETURN 0; \
             END",
        );
        expect_error("FUN main(): Integer DO print(logarithm(2)); RETURN 0; END");
    }
}
