//! Impresión textual del módulo IR.
//!
//! Esta es la salida final del compilador: un listado de lectura
//! humana con una sección por función. Las declaraciones sin cuerpo
//! se listan como `declare` y las definiciones como `define` con sus
//! bloques e instrucciones. El envoltorio anónimo de las expresiones
//! sueltas se imprime como `@""`, nombre que ninguna función del
//! programa fuente puede tener.

use crate::ir::{Function, Instruction, Module, Value};
use std::io::{self, Write};

/// Escribe el listado textual de un módulo completo.
pub fn write<W: Write>(module: &Module, output: &mut W) -> io::Result<()> {
    for (index, function) in module.functions.iter().enumerate() {
        if index > 0 {
            writeln!(output)?;
        }

        write_function(function, output)?;
    }

    Ok(())
}

fn write_function<W: Write>(function: &Function, output: &mut W) -> io::Result<()> {
    if function.is_declaration() {
        let parameters = vec!["i32"; function.parameters as usize];
        return writeln!(
            output,
            "declare i32 {}({})",
            symbol(&function.name),
            parameters.join(", ")
        );
    }

    let parameters: Vec<String> = (0..function.parameters)
        .map(|index| format!("i32 {}", operand(Value(index))))
        .collect();

    writeln!(
        output,
        "define i32 {}({}) {{",
        symbol(&function.name),
        parameters.join(", ")
    )?;

    for block in &function.blocks {
        writeln!(output, "{}:", block.label)?;
        for instruction in &block.instructions {
            write_instruction(instruction, output)?;
        }
    }

    writeln!(output, "}}")
}

fn write_instruction<W: Write>(instruction: &Instruction, output: &mut W) -> io::Result<()> {
    use Instruction::*;

    match instruction {
        Const(integer, out) => writeln!(output, "  {} = const i32 {}", operand(*out), integer),

        Add(lhs, rhs, out) => write_binary(output, "add", *lhs, *rhs, *out),
        Sub(lhs, rhs, out) => write_binary(output, "sub", *lhs, *rhs, *out),
        Mul(lhs, rhs, out) => write_binary(output, "mul", *lhs, *rhs, *out),
        DivU(lhs, rhs, out) => write_binary(output, "udiv", *lhs, *rhs, *out),

        Call {
            callee,
            arguments,
            output: out,
        } => {
            let arguments: Vec<String> = arguments.iter().map(|value| operand(*value)).collect();
            writeln!(
                output,
                "  {} = call i32 {}({})",
                operand(*out),
                symbol(callee),
                arguments.join(", ")
            )
        }

        Ret(value) => writeln!(output, "  ret i32 {}", operand(*value)),
    }
}

fn write_binary<W: Write>(
    output: &mut W,
    opcode: &str,
    lhs: Value,
    rhs: Value,
    out: Value,
) -> io::Result<()> {
    writeln!(
        output,
        "  {} = {} i32 {}, {}",
        operand(out),
        opcode,
        operand(lhs),
        operand(rhs)
    )
}

fn operand(Value(index): Value) -> String {
    format!("%{}", index)
}

fn symbol(name: &str) -> String {
    if name.is_empty() {
        String::from("@\"\"")
    } else {
        format!("@{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{driver, source};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn listing(program: &str) -> String {
        let (module, diagnostics) = driver::compile(source::chars(program.as_bytes()));
        assert!(diagnostics.is_empty(), "unexpected diagnostics");

        let mut output = Vec::new();
        write(&module, &mut output).expect("write failure");
        String::from_utf8(output).expect("invalid listing")
    }

    #[test]
    fn definitions_list_their_blocks() {
        let rendered = listing(indoc! {"
            def doble(x) x+x
            doble(21);
        "});

        assert_eq!(
            rendered,
            indoc! {r#"
                define i32 @doble(i32 %0) {
                entry:
                  %1 = add i32 %0, %0
                  ret i32 %1
                }

                define i32 @""() {
                entry:
                  %0 = const i32 21
                  %1 = call i32 @doble(%0)
                  ret i32 %1
                }
            "#},
        );
    }

    #[test]
    fn forward_declarations_list_without_body() {
        let rendered = listing("externa(1, 2);");

        assert_eq!(
            rendered,
            indoc! {r#"
                define i32 @""() {
                entry:
                  %0 = const i32 1
                  %1 = const i32 2
                  %2 = call i32 @externa(%0, %1)
                  ret i32 %2
                }

                declare i32 @externa(i32, i32)
            "#},
        );
    }

    #[test]
    fn division_renders_unsigned() {
        let rendered = listing("8/2;");

        assert_eq!(
            rendered,
            indoc! {r#"
                define i32 @""() {
                entry:
                  %0 = const i32 8
                  %1 = const i32 2
                  %2 = udiv i32 %0, %1
                  ret i32 %2
                }
            "#},
        );
    }
}
