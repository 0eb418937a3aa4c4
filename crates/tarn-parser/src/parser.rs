//! Recursive-descent parser over the token stream.
//!
//! One method per grammar rule. The statement dispatcher consumes leading
//! keywords itself, so every `parse_*` helper starts after its keyword.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use tarn_syntax::ast::{
    BinaryOp, Case, Expression, Function, Global, LiteralValue, Source, Statement,
};
use tarn_syntax::error::{error_at, Result};
use tarn_syntax::token::{Token, TokenKind};

/// A lookahead pattern: matches a token by kind or by literal text.
#[derive(Clone, Copy)]
enum Pat<'a> {
    Kind(TokenKind),
    Lit(&'a str),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn has(&self, offset: usize) -> bool {
        self.pos + offset < self.tokens.len()
    }

    fn get(&self, offset: usize) -> &Token {
        &self.tokens[self.pos + offset]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    /// Offset reported for an error here: the current token's offset, or one
    /// past the end of the last consumed token at end of input.
    fn error_offset(&self) -> usize {
        if self.has(0) {
            self.get(0).offset
        } else if self.pos > 0 {
            let last = self.previous();
            last.offset + last.literal.chars().count()
        } else {
            0
        }
    }

    fn peek(&self, patterns: &[Pat]) -> bool {
        patterns.iter().enumerate().all(|(i, pattern)| {
            self.has(i)
                && match pattern {
                    Pat::Kind(kind) => self.get(i).kind == *kind,
                    Pat::Lit(literal) => self.get(i).literal == *literal,
                }
        })
    }

    /// Peek plus advance past all matched tokens on success.
    fn advance_if(&mut self, patterns: &[Pat]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            self.pos += patterns.len();
        }
        matched
    }

    fn expect_literal(&mut self, literal: &str) -> Result<()> {
        if self.advance_if(&[Pat::Lit(literal)]) {
            Ok(())
        } else {
            error_at(self.error_offset(), format!("expected '{}'", literal))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        if self.advance_if(&[Pat::Kind(TokenKind::Identifier)]) {
            Ok(self.previous().literal.clone())
        } else {
            error_at(self.error_offset(), format!("expected {}", what))
        }
    }

    /// source = global* function* EOF
    pub fn parse_source(&mut self) -> Result<Source> {
        let mut globals = Vec::new();
        while self.peek(&[Pat::Lit("LIST")])
            || self.peek(&[Pat::Lit("VAR")])
            || self.peek(&[Pat::Lit("VAL")])
        {
            globals.push(self.parse_global()?);
        }
        let mut functions = Vec::new();
        while self.advance_if(&[Pat::Lit("FUN")]) {
            functions.push(self.parse_function()?);
        }
        if self.has(0) {
            return error_at(self.error_offset(), "expected a declaration");
        }
        Ok(Source { globals, functions })
    }

    fn parse_global(&mut self) -> Result<Global> {
        if self.advance_if(&[Pat::Lit("LIST")]) {
            self.parse_list_global()
        } else if self.advance_if(&[Pat::Lit("VAR")]) {
            self.parse_var_global()
        } else {
            self.expect_literal("VAL")?;
            self.parse_val_global()
        }
    }

    /// LIST name : Type = [ e (, e)* ] ;  — the initializer is mandatory.
    fn parse_list_global(&mut self) -> Result<Global> {
        let name = self.expect_identifier("a name")?;
        self.expect_literal(":")?;
        let type_name = self.expect_identifier("a type name")?;
        self.expect_literal("=")?;
        self.expect_literal("[")?;
        let mut values = vec![self.parse_expression()?];
        while self.advance_if(&[Pat::Lit(",")]) {
            values.push(self.parse_expression()?);
        }
        self.expect_literal("]")?;
        self.expect_literal(";")?;
        Ok(Global {
            name,
            type_name,
            mutable: true,
            value: Some(Expression::list(values)),
            variable: None,
        })
    }

    /// VAR name : Type ( = expression )? ;
    fn parse_var_global(&mut self) -> Result<Global> {
        let name = self.expect_identifier("a name")?;
        self.expect_literal(":")?;
        let type_name = self.expect_identifier("a type name")?;
        let value = if self.advance_if(&[Pat::Lit("=")]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_literal(";")?;
        Ok(Global {
            name,
            type_name,
            mutable: true,
            value,
            variable: None,
        })
    }

    /// VAL name : Type = expression ;
    fn parse_val_global(&mut self) -> Result<Global> {
        let name = self.expect_identifier("a name")?;
        self.expect_literal(":")?;
        let type_name = self.expect_identifier("a type name")?;
        self.expect_literal("=")?;
        let value = self.parse_expression()?;
        self.expect_literal(";")?;
        Ok(Global {
            name,
            type_name,
            mutable: false,
            value: Some(value),
            variable: None,
        })
    }

    /// FUN has been consumed. name ( params? ) (: Type)? DO block END
    fn parse_function(&mut self) -> Result<Function> {
        let name = self.expect_identifier("a function name")?;
        self.expect_literal("(")?;
        let mut parameters = Vec::new();
        let mut parameter_type_names = Vec::new();
        if self.advance_if(&[Pat::Kind(TokenKind::Identifier)]) {
            parameters.push(self.previous().literal.clone());
            self.expect_literal(":")?;
            parameter_type_names.push(self.expect_identifier("a type name")?);
            while self.advance_if(&[Pat::Lit(",")]) {
                parameters.push(self.expect_identifier("a parameter name")?);
                self.expect_literal(":")?;
                parameter_type_names.push(self.expect_identifier("a type name")?);
            }
        }
        self.expect_literal(")")?;
        let return_type_name = if self.advance_if(&[Pat::Lit(":")]) {
            Some(self.expect_identifier("a return type name")?)
        } else {
            None
        };
        self.expect_literal("DO")?;
        let statements = self.parse_block()?;
        self.expect_literal("END")?;
        Ok(Function {
            name,
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
            signature: None,
        })
    }

    /// Statements until a block terminator (END, ELSE, CASE, DEFAULT).
    fn parse_block(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while self.has(0)
            && !self.peek(&[Pat::Lit("END")])
            && !self.peek(&[Pat::Lit("ELSE")])
            && !self.peek(&[Pat::Lit("CASE")])
            && !self.peek(&[Pat::Lit("DEFAULT")])
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        if self.advance_if(&[Pat::Lit("LET")]) {
            self.parse_declaration()
        } else if self.advance_if(&[Pat::Lit("IF")]) {
            self.parse_if()
        } else if self.advance_if(&[Pat::Lit("SWITCH")]) {
            self.parse_switch()
        } else if self.advance_if(&[Pat::Lit("WHILE")]) {
            self.parse_while()
        } else if self.advance_if(&[Pat::Lit("RETURN")]) {
            self.parse_return()
        } else {
            let receiver = self.parse_expression()?;
            if self.advance_if(&[Pat::Lit("=")]) {
                let value = self.parse_expression()?;
                self.expect_literal(";")?;
                Ok(Statement::Assignment { receiver, value })
            } else {
                self.expect_literal(";")?;
                Ok(Statement::Expression {
                    expression: receiver,
                })
            }
        }
    }

    fn parse_declaration(&mut self) -> Result<Statement> {
        let name = self.expect_identifier("a variable name")?;
        let type_name = if self.advance_if(&[Pat::Lit(":")]) {
            Some(self.expect_identifier("a type name")?)
        } else {
            None
        };
        let value = if self.advance_if(&[Pat::Lit("=")]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_literal(";")?;
        Ok(Statement::Declaration {
            name,
            type_name,
            value,
            variable: None,
        })
    }

    fn parse_if(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        self.expect_literal("DO")?;
        let then_statements = self.parse_block()?;
        let else_statements = if self.advance_if(&[Pat::Lit("ELSE")]) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        self.expect_literal("END")?;
        Ok(Statement::If {
            condition,
            then_statements,
            else_statements,
        })
    }

    /// SWITCH e (CASE e : block)* DEFAULT block END — the default block is
    /// appended as a final value-less case.
    fn parse_switch(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.advance_if(&[Pat::Lit("CASE")]) {
            let value = self.parse_expression()?;
            self.expect_literal(":")?;
            let statements = self.parse_block()?;
            cases.push(Case {
                value: Some(value),
                statements,
            });
        }
        self.expect_literal("DEFAULT")?;
        let statements = self.parse_block()?;
        cases.push(Case {
            value: None,
            statements,
        });
        self.expect_literal("END")?;
        Ok(Statement::Switch { condition, cases })
    }

    fn parse_while(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        self.expect_literal("DO")?;
        let statements = self.parse_block()?;
        self.expect_literal("END")?;
        Ok(Statement::While {
            condition,
            statements,
        })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        let value = self.parse_expression()?;
        self.expect_literal(";")?;
        Ok(Statement::Return { value })
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Result<Expression> {
        let mut expression = self.parse_comparison()?;
        loop {
            let op = if self.advance_if(&[Pat::Lit("&&")]) {
                BinaryOp::And
            } else if self.advance_if(&[Pat::Lit("||")]) {
                BinaryOp::Or
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            expression = Expression::binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut expression = self.parse_additive()?;
        loop {
            let op = if self.advance_if(&[Pat::Lit("<")]) {
                BinaryOp::Less
            } else if self.advance_if(&[Pat::Lit(">")]) {
                BinaryOp::Greater
            } else if self.advance_if(&[Pat::Lit("==")]) {
                BinaryOp::Equal
            } else if self.advance_if(&[Pat::Lit("!=")]) {
                BinaryOp::NotEqual
            } else {
                break;
            };
            let right = self.parse_additive()?;
            expression = Expression::binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut expression = self.parse_multiplicative()?;
        loop {
            let op = if self.advance_if(&[Pat::Lit("+")]) {
                BinaryOp::Add
            } else if self.advance_if(&[Pat::Lit("-")]) {
                BinaryOp::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            expression = Expression::binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut expression = self.parse_primary()?;
        loop {
            let op = if self.advance_if(&[Pat::Lit("*")]) {
                BinaryOp::Multiply
            } else if self.advance_if(&[Pat::Lit("/")]) {
                BinaryOp::Divide
            } else if self.advance_if(&[Pat::Lit("^")]) {
                BinaryOp::Power
            } else {
                break;
            };
            let right = self.parse_primary()?;
            expression = Expression::binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        if self.advance_if(&[Pat::Lit("NIL")]) {
            return Ok(Expression::literal(LiteralValue::Nil));
        }
        if self.advance_if(&[Pat::Lit("TRUE")]) {
            return Ok(Expression::literal(LiteralValue::Boolean(true)));
        }
        if self.advance_if(&[Pat::Lit("FALSE")]) {
            return Ok(Expression::literal(LiteralValue::Boolean(false)));
        }
        if self.advance_if(&[Pat::Kind(TokenKind::Integer)]) {
            let token = self.previous();
            let value = BigInt::from_str(&token.literal)
                .map_err(|_| tarn_syntax::error::Error::at("invalid integer literal", token.offset))?;
            return Ok(Expression::literal(LiteralValue::Integer(value)));
        }
        if self.advance_if(&[Pat::Kind(TokenKind::Decimal)]) {
            let token = self.previous();
            let value = BigDecimal::from_str(&token.literal)
                .map_err(|_| tarn_syntax::error::Error::at("invalid decimal literal", token.offset))?;
            return Ok(Expression::literal(LiteralValue::Decimal(value)));
        }
        if self.advance_if(&[Pat::Kind(TokenKind::Character)]) {
            let token = self.previous();
            let decoded = decode_escapes(&token.literal);
            let value = match decoded.chars().nth(1) {
                Some(value) => value,
                None => {
                    return error_at(token.offset, "invalid character literal");
                }
            };
            return Ok(Expression::literal(LiteralValue::Character(value)));
        }
        if self.advance_if(&[Pat::Kind(TokenKind::String)]) {
            let decoded = decode_escapes(&self.previous().literal);
            // the surrounding double quotes survive decoding; drop them
            let value = decoded[1..decoded.len() - 1].to_string();
            return Ok(Expression::literal(LiteralValue::Str(value)));
        }
        if self.advance_if(&[Pat::Lit("(")]) {
            let inner = self.parse_expression()?;
            self.expect_literal(")")?;
            return Ok(Expression::group(inner));
        }
        if self.advance_if(&[Pat::Kind(TokenKind::Identifier)]) {
            let name = self.previous().literal.clone();
            if self.advance_if(&[Pat::Lit("(")]) {
                let mut arguments = Vec::new();
                if !self.peek(&[Pat::Lit(")")]) {
                    arguments.push(self.parse_expression()?);
                    while self.advance_if(&[Pat::Lit(",")]) {
                        arguments.push(self.parse_expression()?);
                    }
                }
                self.expect_literal(")")?;
                return Ok(Expression::call(name, arguments));
            }
            if self.advance_if(&[Pat::Lit("[")]) {
                let offset = self.parse_expression()?;
                self.expect_literal("]")?;
                return Ok(Expression::access(name, Some(offset)));
            }
            return Ok(Expression::access(name, None));
        }
        error_at(self.error_offset(), "expected an expression")
    }
}

/// Translates the escape sequences `\b \n \r \t \' \" \\` inside a raw
/// literal. The lexer has already rejected any other escape.
fn decode_escapes(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{0008}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
