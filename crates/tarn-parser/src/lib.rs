//! Tarn parser: turns the lexer's token stream into an abstract syntax tree.

pub mod parser;

pub use parser::Parser;

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use tarn_lexer::Lexer;
    use tarn_syntax::ast::*;

    fn parse_expression_str(input: &str) -> Expression {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        Parser::new(tokens)
            .parse_expression()
            .expect("parsing should succeed")
    }

    fn parse_statement_str(input: &str) -> Statement {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        Parser::new(tokens)
            .parse_statement()
            .expect("parsing should succeed")
    }

    fn parse_source_str(input: &str) -> Source {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        Parser::new(tokens)
            .parse_source()
            .expect("parsing should succeed")
    }

    fn source_error(input: &str) -> tarn_syntax::error::Error {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        match Parser::new(tokens).parse_source() {
            Ok(source) => panic!("expected parse error, got {:?}", source),
            Err(e) => e,
        }
    }

    fn int(value: i64) -> Expression {
        Expression::literal(LiteralValue::Integer(BigInt::from(value)))
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(
            parse_expression_str("NIL"),
            Expression::literal(LiteralValue::Nil)
        );
        assert_eq!(
            parse_expression_str("TRUE"),
            Expression::literal(LiteralValue::Boolean(true))
        );
        assert_eq!(
            parse_expression_str("FALSE"),
            Expression::literal(LiteralValue::Boolean(false))
        );
        assert_eq!(parse_expression_str("42"), int(42));
        assert_eq!(parse_expression_str("-7"), int(-7));
    }

    #[test]
    fn string_literals_decode_escapes() {
        assert_eq!(
            parse_expression_str("\"Hello,\\nWorld\""),
            Expression::literal(LiteralValue::Str("Hello,\nWorld".to_string()))
        );
        assert_eq!(
            parse_expression_str("\"sq\\'dq\\\"bs\\\\\""),
            Expression::literal(LiteralValue::Str("sq'dq\"bs\\".to_string()))
        );
    }

    #[test]
    fn character_literals_decode_escapes() {
        assert_eq!(
            parse_expression_str("'c'"),
            Expression::literal(LiteralValue::Character('c'))
        );
        assert_eq!(
            parse_expression_str("'\\n'"),
            Expression::literal(LiteralValue::Character('\n'))
        );
    }

    #[test]
    fn big_integer_literal_survives() {
        let big = "123456789012345678901234567890";
        let expected: BigInt = big.parse().unwrap();
        assert_eq!(
            parse_expression_str(big),
            Expression::literal(LiteralValue::Integer(expected))
        );
    }

    #[test]
    fn binary_operators_are_left_associative() {
        // 1 - 2 - 3 parses as (1 - 2) - 3
        assert_eq!(
            parse_expression_str("1 - 2 - 3"),
            Expression::binary(
                BinaryOp::Subtract,
                Expression::binary(BinaryOp::Subtract, int(1), int(2)),
                int(3),
            )
        );
    }

    #[test]
    fn precedence_ladder() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        assert_eq!(
            parse_expression_str("1 + 2 * 3"),
            Expression::binary(
                BinaryOp::Add,
                int(1),
                Expression::binary(BinaryOp::Multiply, int(2), int(3)),
            )
        );
        // comparison binds looser than additive
        assert!(matches!(
            parse_expression_str("1 + 2 == 3"),
            Expression::Binary {
                op: BinaryOp::Equal,
                ..
            }
        ));
        // logical binds loosest
        assert!(matches!(
            parse_expression_str("1 < 2 && 3 < 4"),
            Expression::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn power_sits_in_the_multiplicative_tier() {
        assert_eq!(
            parse_expression_str("2 ^ 8"),
            Expression::binary(BinaryOp::Power, int(2), int(8))
        );
    }

    #[test]
    fn groups() {
        assert_eq!(
            parse_expression_str("(1 + 2)"),
            Expression::group(Expression::binary(BinaryOp::Add, int(1), int(2)))
        );
    }

    #[test]
    fn access_and_calls() {
        assert_eq!(parse_expression_str("x"), Expression::access("x", None));
        assert_eq!(
            parse_expression_str("nums[0]"),
            Expression::access("nums", Some(int(0)))
        );
        assert_eq!(
            parse_expression_str("foo()"),
            Expression::call("foo", vec![])
        );
        assert_eq!(
            parse_expression_str("add(1, 2)"),
            Expression::call("add", vec![int(1), int(2)])
        );
    }

    #[test]
    fn declaration_statements() {
        assert_eq!(
            parse_statement_str("LET x = 5;"),
            Statement::Declaration {
                name: "x".to_string(),
                type_name: None,
                value: Some(int(5)),
                variable: None,
            }
        );
        assert_eq!(
            parse_statement_str("LET x: Integer;"),
            Statement::Declaration {
                name: "x".to_string(),
                type_name: Some("Integer".to_string()),
                value: None,
                variable: None,
            }
        );
    }

    #[test]
    fn assignment_and_expression_statements() {
        assert_eq!(
            parse_statement_str("x = 5;"),
            Statement::Assignment {
                receiver: Expression::access("x", None),
                value: int(5),
            }
        );
        assert_eq!(
            parse_statement_str("nums[1] = 5;"),
            Statement::Assignment {
                receiver: Expression::access("nums", Some(int(1))),
                value: int(5),
            }
        );
        assert_eq!(
            parse_statement_str("print(1);"),
            Statement::Expression {
                expression: Expression::call("print", vec![int(1)]),
            }
        );
    }

    #[test]
    fn if_statements() {
        let statement = parse_statement_str("IF TRUE DO print(1); ELSE print(2); END");
        match statement {
            Statement::If {
                then_statements,
                else_statements,
                ..
            } => {
                assert_eq!(then_statements.len(), 1);
                assert_eq!(else_statements.len(), 1);
            }
            other => panic!("expected If, got {:?}", other),
        }
        let statement = parse_statement_str("IF TRUE DO print(1); END");
        assert!(matches!(
            statement,
            Statement::If { ref else_statements, .. } if else_statements.is_empty()
        ));
    }

    #[test]
    fn switch_appends_the_default_as_the_last_case() {
        let statement =
            parse_statement_str("SWITCH c CASE 1: print(1); CASE 2: print(2); DEFAULT print(0); END");
        match statement {
            Statement::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert_eq!(cases[0].value, Some(int(1)));
                assert_eq!(cases[1].value, Some(int(2)));
                assert_eq!(cases[2].value, None);
            }
            other => panic!("expected Switch, got {:?}", other),
        }
    }

    #[test]
    fn while_and_return_statements() {
        assert!(matches!(
            parse_statement_str("WHILE x < 10 DO x = x + 1; END"),
            Statement::While { .. }
        ));
        assert_eq!(
            parse_statement_str("RETURN 0;"),
            Statement::Return { value: int(0) }
        );
    }

    #[test]
    fn source_with_globals_and_functions() {
        let source = parse_source_str(
            "VAR x: Integer = 1;\n\
             VAL y: Integer = 2;\n\
             LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO RETURN x; END",
        );
        assert_eq!(source.globals.len(), 3);
        assert!(source.globals[0].mutable);
        assert!(!source.globals[1].mutable);
        assert!(matches!(
            source.globals[2].value,
            Some(Expression::List { ref values, .. }) if values.len() == 3
        ));
        assert_eq!(source.functions.len(), 1);
        assert_eq!(source.functions[0].name, "main");
        assert_eq!(source.functions[0].return_type_name.as_deref(), Some("Integer"));
    }

    #[test]
    fn function_parameters_carry_type_names() {
        let source = parse_source_str("FUN f(a: Integer, b: String) DO RETURN a; END");
        let function = &source.functions[0];
        assert_eq!(function.parameters, vec!["a", "b"]);
        assert_eq!(function.parameter_type_names, vec!["Integer", "String"]);
        assert_eq!(function.return_type_name, None);
    }

    #[test]
    fn list_global_requires_an_initializer() {
        source_error("LIST nums: Integer;");
    }

    #[test]
    fn statements_are_rejected_at_the_top_level() {
        let err = source_error("LET x = 5;");
        assert_eq!(err.offset, Some(0));
    }

    #[test]
    fn missing_semicolon_offset_is_one_past_the_last_token() {
        let tokens = Lexer::new("RETURN 5").tokenize().expect("lexing should succeed");
        let err = Parser::new(tokens)
            .parse_statement()
            .expect_err("expected parse error");
        assert_eq!(err.offset, Some(8));
    }

    #[test]
    fn missing_end_is_a_parse_error() {
        source_error("FUN main(): Integer DO RETURN 0;");
    }

    #[test]
    fn hello_world_shape() {
        let statement = parse_statement_str("print(\"Hello, World!\");");
        assert_eq!(
            statement,
            Statement::Expression {
                expression: Expression::call(
                    "print",
                    vec![Expression::literal(LiteralValue::Str(
                        "Hello, World!".to_string()
                    ))],
                ),
            }
        );
    }
}
