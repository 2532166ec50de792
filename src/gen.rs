//! Generación de representación intermedia.
//!
//! Cada definición de función se baja de su AST a una función IR de
//! un solo bloque. La tabla de símbolos vive exclusivamente durante
//! la generación de una definición: se construye desde cero con los
//! parámetros formales y se descarta al terminar, por lo cual los
//! nombres de una función nunca se filtran hacia la siguiente.
//!
//! Las referencias a variables y a funciones se resuelven aquí y no
//! durante el análisis sintáctico. Llamar a un nombre que el módulo
//! todavía no conoce lo declara adelantadamente con la aridad de la
//! llamada; una definición posterior del mismo nombre se reconcilia
//! con esa declaración en vez de duplicarla.

use std::{collections::HashMap, rc::Rc};

use thiserror::Error;

use crate::{
    ir::{self, Block, Instruction, Value},
    lex::Identifier,
    parse::{self, BinOp, Expr},
    source::Located,
};

/// Error de generación de código.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Symbol `{0}` is undefined")]
    Undefined(Identifier),

    #[error("Redefinition of function `{0}`")]
    Redefinition(Identifier),

    #[error("Signature mismatch for `{0}`: declared with {1} parameters, redeclared with {2}")]
    SignatureMismatch(Identifier, u32, u32),

    #[error("Function `{0}` expects {1} arguments, found {2}")]
    BadArgumentCount(Identifier, u32, u32),

    #[error("Generated function `{0}` is malformed")]
    Malformed(String, #[source] ir::VerifyError),
}

pub type Gen<T> = Result<T, Located<GenError>>;

/// Generador de código intermedio.
///
/// Posee el módulo IR durante toda la unidad de compilación y lo
/// entrega terminado con [`Generator::finish`].
#[derive(Default)]
pub struct Generator {
    module: ir::Module,
}

impl Generator {
    /// Crea un generador con un módulo vacío.
    pub fn new() -> Self {
        Generator::default()
    }

    /// Obtiene el módulo construido hasta el momento.
    pub fn module(&self) -> &ir::Module {
        &self.module
    }

    /// Entrega el módulo construido.
    pub fn finish(self) -> ir::Module {
        self.module
    }

    /// Genera una definición de función completa.
    ///
    /// Si el cuerpo no se puede generar, la función se borra por
    /// completo del módulo: no queda ninguna declaración sin
    /// posibilidad de definición posterior.
    pub fn function(&mut self, function: &parse::Function) -> Gen<()> {
        let prototype = function.prototype();
        let index = self.declare(prototype)?;

        // Los parámetros se ligan por nombre; un nombre duplicado
        // sobreescribe al anterior y el último gana
        let mut symbols = HashMap::new();
        for (position, parameter) in prototype.parameters().iter().enumerate() {
            symbols.insert(parameter.as_ref().clone(), Value(position as u32));
        }

        let (result, mut instructions) = {
            let mut context = Context {
                module: &mut self.module,
                symbols,
                instructions: Vec::new(),
                next: prototype.parameters().len() as u32,
            };

            let result = context.eval(function.body());
            (result, context.instructions)
        };

        let value = match result {
            Ok(value) => value,
            Err(error) => {
                self.module.functions.remove(index);
                return Err(error);
            }
        };

        instructions.push(Instruction::Ret(value));
        self.module.functions[index].blocks = vec![Block {
            label: String::from("entry"),
            instructions,
        }];

        if let Err(error) = self.module.functions[index].verify() {
            let name = self.module.functions[index].name.to_string();
            self.module.functions.remove(index);

            return Err(Located::at(
                GenError::Malformed(name, error),
                *function.body().location(),
            ));
        }

        Ok(())
    }

    /// Genera o resuelve la función IR que corresponde a un prototipo.
    ///
    /// Un nombre ya presente en el módulo se reconcilia: la aridad
    /// debe coincidir con la declarada y la función no debe tener ya
    /// un cuerpo. La aridad se compara primero, de manera que
    /// redeclarar con otra aridad reporta el conflicto de firma
    /// incluso si además existe un cuerpo.
    fn declare(&mut self, prototype: &parse::Prototype) -> Gen<usize> {
        let parameters = prototype.parameters().len() as u32;

        // El envoltorio anónimo nunca se busca ni se reutiliza
        let name = match prototype.name() {
            Some(name) => name,
            None => return Ok(push_declaration(&mut self.module, Rc::from(""), parameters)),
        };

        let id = name.as_ref();
        let symbol: Rc<str> = Rc::from(id.as_ref());

        let index = match self.module.functions.iter().position(|f| f.name == symbol) {
            Some(index) => index,
            None => return Ok(push_declaration(&mut self.module, symbol, parameters)),
        };

        let existing = &self.module.functions[index];
        if existing.parameters != parameters {
            return Err(Located::at(
                GenError::SignatureMismatch(id.clone(), existing.parameters, parameters),
                *name.location(),
            ));
        }

        if !existing.is_declaration() {
            return Err(Located::at(
                GenError::Redefinition(id.clone()),
                *name.location(),
            ));
        }

        Ok(index)
    }
}

fn push_declaration(module: &mut ir::Module, name: Rc<str>, parameters: u32) -> usize {
    module.functions.push(ir::Function {
        name,
        parameters,
        blocks: Vec::new(),
    });

    module.functions.len() - 1
}

/// Estado de generación para el cuerpo de una única función.
struct Context<'a> {
    module: &'a mut ir::Module,
    symbols: HashMap<Identifier, Value>,
    instructions: Vec<Instruction>,
    next: u32,
}

impl Context<'_> {
    fn eval(&mut self, expr: &Located<Expr>) -> Gen<Value> {
        match expr.as_ref() {
            Expr::Number(integer) => Ok(self.push(|output| Instruction::Const(*integer, output))),

            Expr::Variable(name) => match self.symbols.get(name) {
                Some(value) => Ok(*value),
                None => Err(Located::at(
                    GenError::Undefined(name.clone()),
                    *expr.location(),
                )),
            },

            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;

                Ok(self.push(|output| match op {
                    BinOp::Add => Instruction::Add(lhs, rhs, output),
                    BinOp::Sub => Instruction::Sub(lhs, rhs, output),
                    BinOp::Mul => Instruction::Mul(lhs, rhs, output),
                    BinOp::Div => Instruction::DivU(lhs, rhs, output),
                }))
            }

            Expr::Call(callee, args) => {
                let symbol: Rc<str> = Rc::from(callee.as_ref().as_ref());

                // Un nombre desconocido se declara adelantadamente
                // con la aridad de esta llamada
                let expected = self
                    .module
                    .function(&symbol)
                    .map(|function| function.parameters);

                let expected = match expected {
                    Some(expected) => expected,
                    None => {
                        push_declaration(self.module, Rc::clone(&symbol), args.len() as u32);
                        args.len() as u32
                    }
                };

                if expected != args.len() as u32 {
                    return Err(Located::at(
                        GenError::BadArgumentCount(
                            callee.as_ref().clone(),
                            expected,
                            args.len() as u32,
                        ),
                        *callee.location(),
                    ));
                }

                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.eval(arg)?);
                }

                Ok(self.push(|output| Instruction::Call {
                    callee: symbol,
                    arguments,
                    output,
                }))
            }
        }
    }

    /// Numera y emite una instrucción que define un nuevo valor.
    fn push(&mut self, instruction: impl FnOnce(Value) -> Instruction) -> Value {
        let output = Value(self.next);
        self.next += 1;

        self.instructions.push(instruction(output));
        output
    }
}
