use std::rc::Rc;

use thiserror::Error;

/// Violación estructural encontrada por [`Function::verify`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Block `{0}` is empty")]
    EmptyBlock(String),

    #[error("Block `{0}` does not end in a return")]
    MissingReturn(String),

    #[error("Return before the end of block `{0}`")]
    MisplacedReturn(String),

    #[error("Use of undefined value %{0}")]
    UndefinedValue(u32),

    #[error("Definition of %{0} breaks the numbering sequence")]
    MisnumberedValue(u32),
}

/// El contenedor acumulado de funciones de toda una compilación.
#[derive(Debug, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    /// Busca una función por nombre.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|function| &*function.name == name)
    }
}

/// Una función IR.
///
/// Los parámetros son los valores `%0` a `%n-1`; cada instrucción
/// define el siguiente valor consecutivo. Las funciones de
/// expresión suelta llevan el nombre vacío, el cual ninguna búsqueda
/// puede producir porque los identificadores nunca son vacíos.
#[derive(Debug)]
pub struct Function {
    pub name: Rc<str>,
    pub parameters: u32,
    pub blocks: Vec<Block>,
}

impl Function {
    /// Una función sin bloques es una declaración adelantada.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Revisión estructural: numeración consecutiva de valores,
    /// operandos ya definidos y un retorno exactamente al final de
    /// cada bloque. Las declaraciones se verifican trivialmente.
    pub fn verify(&self) -> Result<(), VerifyError> {
        use Instruction::*;

        let mut defined = self.parameters;

        for block in &self.blocks {
            match block.instructions.last() {
                None => return Err(VerifyError::EmptyBlock(block.label.clone())),
                Some(Ret(_)) => (),
                Some(_) => return Err(VerifyError::MissingReturn(block.label.clone())),
            }

            for (index, instruction) in block.instructions.iter().enumerate() {
                if matches!(instruction, Ret(_)) && index + 1 != block.instructions.len() {
                    return Err(VerifyError::MisplacedReturn(block.label.clone()));
                }

                let (operands, output) = match instruction {
                    Const(_, output) => (Vec::new(), Some(*output)),

                    Add(lhs, rhs, output)
                    | Sub(lhs, rhs, output)
                    | Mul(lhs, rhs, output)
                    | DivU(lhs, rhs, output) => (vec![*lhs, *rhs], Some(*output)),

                    Call {
                        arguments, output, ..
                    } => (arguments.clone(), Some(*output)),

                    Ret(value) => (vec![*value], None),
                };

                for Value(operand) in operands {
                    if operand >= defined {
                        return Err(VerifyError::UndefinedValue(operand));
                    }
                }

                if let Some(Value(output)) = output {
                    if output != defined {
                        return Err(VerifyError::MisnumberedValue(output));
                    }

                    defined += 1;
                }
            }
        }

        Ok(())
    }
}

/// Un bloque básico etiquetado.
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    pub label: String,
    pub instructions: Vec<Instruction>,
}

/// Identifica un valor dentro de una función.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Value(pub u32);

/// Una instrucción IR. Los operandos preceden al valor de salida.
#[derive(Debug, PartialEq, Eq)]
pub enum Instruction {
    Const(i32, Value),
    Add(Value, Value, Value),
    Sub(Value, Value, Value),
    Mul(Value, Value, Value),

    /// División sin signo.
    DivU(Value, Value, Value),

    Call {
        callee: Rc<str>,
        arguments: Vec<Value>,
        output: Value,
    },

    Ret(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(parameters: u32, instructions: Vec<Instruction>) -> Function {
        Function {
            name: Rc::from("f"),
            parameters,
            blocks: vec![Block {
                label: String::from("entry"),
                instructions,
            }],
        }
    }

    #[test]
    fn declarations_verify_trivially() {
        let declaration = Function {
            name: Rc::from("f"),
            parameters: 2,
            blocks: Vec::new(),
        };

        assert!(declaration.is_declaration());
        assert!(declaration.verify().is_ok());
    }

    #[test]
    fn well_formed_bodies_pass() {
        use Instruction::*;

        let function = function(
            1,
            vec![
                Const(2, Value(1)),
                Mul(Value(0), Value(1), Value(2)),
                Ret(Value(2)),
            ],
        );

        assert!(function.verify().is_ok());
    }

    #[test]
    fn bodies_must_end_in_a_return() {
        use Instruction::*;

        let missing = function(0, vec![Const(1, Value(0))]);
        assert!(matches!(missing.verify(), Err(VerifyError::MissingReturn(_))));

        let empty = function(0, Vec::new());
        assert!(matches!(empty.verify(), Err(VerifyError::EmptyBlock(_))));

        let misplaced = function(0, vec![Ret(Value(0)), Const(1, Value(0)), Ret(Value(0))]);
        assert!(matches!(
            misplaced.verify(),
            Err(VerifyError::MisplacedReturn(_))
        ));
    }

    #[test]
    fn operands_must_already_be_defined() {
        use Instruction::*;

        let function = function(0, vec![Add(Value(0), Value(1), Value(2)), Ret(Value(2))]);
        assert!(matches!(
            function.verify(),
            Err(VerifyError::UndefinedValue(0))
        ));
    }

    #[test]
    fn definitions_are_numbered_consecutively() {
        use Instruction::*;

        let function = function(0, vec![Const(1, Value(4)), Ret(Value(4))]);
        assert!(matches!(
            function.verify(),
            Err(VerifyError::MisnumberedValue(4))
        ));
    }
}
