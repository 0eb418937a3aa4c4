//! Emits an analyzed Tarn program as Java source.
//!
//! The whole program becomes one class named `Main`: globals turn into
//! fields, user functions into methods, and a synthetic `public static void
//! main` exits with the integer `main/0` returns.

use tarn_syntax::ast::{
    BinaryOp, Case, Expression, Function, Global, LiteralValue, Source, Statement,
};
use tarn_syntax::error::{error, Result};

/// Renders `source` as Java. The tree must have been analyzed: emission
/// reads the resolved types and signatures the analyzer filled in, and an
/// unfilled slot is an error.
pub fn emit(source: &Source) -> Result<String> {
    let mut generator = Generator::new();
    generator.source(source)?;
    Ok(generator.out)
}

struct Generator {
    out: String,
    indent: usize,
}

impl Generator {
    fn new() -> Self {
        Generator {
            out: String::new(),
            indent: 0,
        }
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self, indent: usize) {
        self.out.push('\n');
        for _ in 0..indent {
            self.out.push_str("    ");
        }
    }

    fn source(&mut self, source: &Source) -> Result<()> {
        self.write("public class Main {");
        if !source.globals.is_empty() {
            self.newline(0);
        }
        self.indent += 1;
        for global in &source.globals {
            self.newline(self.indent);
            self.global(global)?;
        }
        self.newline(0);
        self.newline(self.indent);
        self.write("public static void main(String[] args) {");
        self.indent += 1;
        self.newline(self.indent);
        self.write("System.exit(new Main().main());");
        self.indent -= 1;
        self.newline(self.indent);
        self.write("}");
        for function in &source.functions {
            self.newline(0);
            self.newline(self.indent);
            self.function(function)?;
        }
        self.newline(0);
        self.newline(0);
        self.write("}");
        Ok(())
    }

    fn global(&mut self, global: &Global) -> Result<()> {
        let variable = match &global.variable {
            Some(variable) => variable,
            None => return error("the emitter requires an analyzed tree"),
        };
        if !variable.mutable {
            self.write("final ");
        }
        self.write(variable.ty.jvm_name());
        if matches!(global.value, Some(Expression::List { .. })) {
            self.write("[]");
        }
        self.write(" ");
        self.write(&global.name);
        if let Some(value) = &global.value {
            self.write(" = ");
            self.expression(value)?;
        }
        self.write(";");
        Ok(())
    }

    fn function(&mut self, function: &Function) -> Result<()> {
        let signature = match &function.signature {
            Some(signature) => signature,
            None => return error("the emitter requires an analyzed tree"),
        };
        self.write(signature.return_type.jvm_name());
        self.write(" ");
        self.write(&function.name);
        self.write("(");
        for (i, (parameter, ty)) in function
            .parameters
            .iter()
            .zip(&signature.parameter_types)
            .enumerate()
        {
            if i > 0 {
                self.write(", ");
            }
            self.write(ty.jvm_name());
            self.write(" ");
            self.write(parameter);
        }
        self.write(") {");
        self.indent += 1;
        for statement in &function.statements {
            self.newline(self.indent);
            self.statement(statement)?;
        }
        self.indent -= 1;
        if !function.statements.is_empty() {
            self.newline(self.indent);
        }
        self.write("}");
        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression { expression } => {
                self.expression(expression)?;
                self.write(";");
            }
            Statement::Declaration {
                name,
                value,
                variable,
                ..
            } => {
                let ty = match variable {
                    Some(variable) => variable.ty,
                    None => return error("the emitter requires an analyzed tree"),
                };
                self.write(ty.jvm_name());
                self.write(" ");
                self.write(name);
                if let Some(value) = value {
                    self.write(" = ");
                    self.expression(value)?;
                }
                self.write(";");
            }
            Statement::Assignment { receiver, value } => {
                self.expression(receiver)?;
                self.write(" = ");
                self.expression(value)?;
                self.write(";");
            }
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => {
                self.write("if (");
                self.expression(condition)?;
                self.write(") {");
                self.indent += 1;
                for statement in then_statements {
                    self.newline(self.indent);
                    self.statement(statement)?;
                }
                self.indent -= 1;
                self.newline(self.indent);
                self.write("}");
                if !else_statements.is_empty() {
                    self.write(" else {");
                    self.indent += 1;
                    for statement in else_statements {
                        self.newline(self.indent);
                        self.statement(statement)?;
                    }
                    self.indent -= 1;
                    self.newline(self.indent);
                    self.write("}");
                }
            }
            Statement::Switch { condition, cases } => {
                self.write("switch (");
                self.expression(condition)?;
                self.write(") {");
                self.indent += 1;
                for case in cases {
                    self.case(case)?;
                }
                self.indent -= 1;
                self.newline(self.indent);
                self.write("}");
            }
            Statement::While {
                condition,
                statements,
            } => {
                self.write("while (");
                self.expression(condition)?;
                self.write(") {");
                if !statements.is_empty() {
                    self.indent += 1;
                    for statement in statements {
                        self.newline(self.indent);
                        self.statement(statement)?;
                    }
                    self.indent -= 1;
                    self.newline(self.indent);
                }
                self.write("}");
            }
            Statement::Return { value } => {
                self.write("return ");
                self.expression(value)?;
                self.write(";");
            }
        }
        Ok(())
    }

    /// `break;` closes every non-default case so fallthrough never happens
    /// in the emitted switch.
    fn case(&mut self, case: &Case) -> Result<()> {
        self.newline(self.indent);
        match &case.value {
            Some(value) => {
                self.write("case ");
                self.expression(value)?;
                self.write(":");
            }
            None => self.write("default:"),
        }
        self.indent += 1;
        for statement in &case.statements {
            self.newline(self.indent);
            self.statement(statement)?;
        }
        if case.value.is_some() {
            self.newline(self.indent);
            self.write("break;");
        }
        self.indent -= 1;
        Ok(())
    }

    fn expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Literal { value, .. } => {
                self.literal(value);
                Ok(())
            }
            Expression::Group { inner, .. } => {
                self.write("(");
                self.expression(inner)?;
                self.write(")");
                Ok(())
            }
            Expression::Binary {
                op, left, right, ..
            } => {
                // ^ has no Java operator; it becomes a Math.pow call
                if *op == BinaryOp::Power {
                    self.write("Math.pow(");
                    self.expression(left)?;
                    self.write(", ");
                    self.expression(right)?;
                    self.write(")");
                    return Ok(());
                }
                self.expression(left)?;
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expression(right)?;
                Ok(())
            }
            Expression::Access { name, offset, .. } => {
                self.write(name);
                if let Some(offset) = offset {
                    self.write("[");
                    self.expression(offset)?;
                    self.write("]");
                }
                Ok(())
            }
            Expression::Call {
                arguments,
                signature,
                ..
            } => {
                let jvm_name = match signature {
                    Some(signature) => &signature.jvm_name,
                    None => return error("the emitter requires an analyzed tree"),
                };
                self.write(jvm_name);
                self.write("(");
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expression(argument)?;
                }
                self.write(")");
                Ok(())
            }
            Expression::List { values, .. } => {
                self.write("{");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expression(value)?;
                }
                self.write("}");
                Ok(())
            }
        }
    }

    fn literal(&mut self, value: &LiteralValue) {
        match value {
            LiteralValue::Nil => self.write("null"),
            LiteralValue::Boolean(value) => self.write(if *value { "true" } else { "false" }),
            LiteralValue::Integer(value) => {
                let text = value.to_string();
                self.write(&text);
            }
            LiteralValue::Decimal(value) => {
                let text = value.to_string();
                self.write(&text);
            }
            LiteralValue::Character(value) => {
                let text = format!("'{}'", escape_char(*value));
                self.write(&text);
            }
            LiteralValue::Str(value) => {
                let escaped: String = value.chars().map(escape_char).collect();
                let text = format!("\"{}\"", escaped);
                self.write(&text);
            }
        }
    }
}

/// Re-inserts the source escape for characters that had one.
fn escape_char(c: char) -> String {
    match c {
        '\u{0008}' => "\\b".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\'' => "\\'".to_string(),
        '"' => "\\\"".to_string(),
        '\\' => "\\\\".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_analyzer::Analyzer;
    use tarn_lexer::Lexer;
    use tarn_parser::Parser;

    fn emit_str(input: &str) -> String {
        let tokens = Lexer::new(input).tokenize().expect("lexing should succeed");
        let mut source = Parser::new(tokens)
            .parse_source()
            .expect("parsing should succeed");
        Analyzer::new()
            .analyze(&mut source)
            .expect("analysis should succeed");
        emit(&source).expect("emission should succeed")
    }

    #[test]
    fn hello_world_class_shape() {
        let java = emit_str("FUN main(): Integer DO print(\"Hello, World!\"); RETURN 0; END");
        let expected = "\
public class Main {

    public static void main(String[] args) {
        System.exit(new Main().main());
    }

    int main() {
        System.out.println(\"Hello, World!\");
        return 0;
    }

}";
        assert_eq!(java, expected);
    }

    #[test]
    fn globals_become_fields() {
        let java = emit_str(
            "VAR x: Integer = 1;\n\
             VAL name: String = \"n\";\n\
             LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO RETURN x; END",
        );
        assert!(java.contains("\n    int x = 1;"));
        assert!(java.contains("\n    final String name = \"n\";"));
        assert!(java.contains("\n    int[] nums = {1, 2, 3};"));
    }

    #[test]
    fn parameters_carry_jvm_types() {
        let java = emit_str(
            "FUN area(w: Integer, h: Integer): Integer DO RETURN w * h; END\n\
             FUN main(): Integer DO RETURN area(3, 4); END",
        );
        assert!(java.contains("int area(int w, int h) {"));
        assert!(java.contains("return area(3, 4);"));
    }

    #[test]
    fn power_becomes_math_pow() {
        let java = emit_str("FUN main(): Integer DO RETURN 2 ^ 8; END");
        assert!(java.contains("return Math.pow(2, 8);"));
    }

    #[test]
    fn print_becomes_system_out_println() {
        let java = emit_str("FUN main(): Integer DO print(1); RETURN 0; END");
        assert!(java.contains("System.out.println(1);"));
    }

    #[test]
    fn literal_escapes_are_reinserted() {
        let java = emit_str(
            "FUN main(): Integer DO print(\"line\\nbreak\"); print('\\t'); RETURN 0; END",
        );
        assert!(java.contains("System.out.println(\"line\\nbreak\");"));
        assert!(java.contains("System.out.println('\\t');"));
    }

    #[test]
    fn if_and_while_shapes() {
        let java = emit_str(
            "FUN main(): Integer DO \
             LET i = 0; \
             WHILE i < 3 DO i = i + 1; END \
             IF i > 2 DO RETURN i; ELSE RETURN 0; END \
             END",
        );
        assert!(java.contains("while (i < 3) {"));
        assert!(java.contains("if (i > 2) {"));
        assert!(java.contains("} else {"));
        assert!(java.contains("int i = 0;"));
    }

    #[test]
    fn switch_cases_break_and_default_does_not() {
        let java = emit_str(
            "VAR c: Integer = 1;\n\
             FUN main(): Integer DO \
             SWITCH c \
             CASE 1: print(\"one\"); \
             DEFAULT print(\"other\"); \
             END \
             RETURN 0; \
             END",
        );
        assert!(java.contains("switch (c) {"));
        assert!(java.contains("case 1:"));
        assert!(java.contains("break;"));
        assert!(java.contains("default:"));
        // the default arm has no break
        let default_arm = java.split("default:").nth(1).expect("default arm");
        assert!(!default_arm.contains("break;"));
    }

    #[test]
    fn groups_keep_their_parentheses() {
        let java = emit_str("FUN main(): Integer DO RETURN (1 + 2) * 3; END");
        assert!(java.contains("return (1 + 2) * 3;"));
    }

    #[test]
    fn unanalyzed_trees_are_rejected() {
        let tokens = Lexer::new("FUN main(): Integer DO RETURN 0; END")
            .tokenize()
            .expect("lexing should succeed");
        let source = Parser::new(tokens)
            .parse_source()
            .expect("parsing should succeed");
        assert!(emit(&source).is_err());
    }
}
