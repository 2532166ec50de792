//! Análisis sintáctico.
//!
//! Parser de descenso recursivo. Las expresiones binarias se
//! resuelven por el método de escalada de precedencias: cada
//! operador tiene una precedencia entera y el lado derecho de un
//! operador absorbe recursivamente a los operadores más fuertes que
//! le siguen. Un fallo sintáctico nunca consume el token ofensor,
//! de manera que el llamador puede decidir dónde reanudar.

use std::{collections::HashMap, io, iter::Peekable};
use thiserror::Error;

use crate::{
    lex::{Identifier, Lexer, LexerError, Token},
    source::{Located, Location},
};

/// Una expresión con valor.
#[derive(Debug)]
pub enum Expr {
    /// Constante entera.
    Number(i32),

    /// Referencia a una variable. El nombre se resuelve durante la
    /// generación de código, no aquí.
    Variable(Identifier),

    /// Operación binaria.
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),

    /// Llamada a función.
    Call(Located<Identifier>, Vec<Located<Expr>>),
}

/// Un operador binario.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Firma de una función: nombre y parámetros formales.
///
/// Un prototipo sin nombre es el envoltorio sintético que el driver
/// fabrica para ejecutar una expresión suelta al nivel superior;
/// nunca se busca por nombre. Los parámetros duplicados no se
/// rechazan en esta capa.
#[derive(Debug)]
pub struct Prototype {
    name: Option<Located<Identifier>>,
    parameters: Vec<Located<Identifier>>,
}

impl Prototype {
    /// Obtiene el nombre, si el prototipo no es anónimo.
    pub fn name(&self) -> Option<&Located<Identifier>> {
        self.name.as_ref()
    }

    /// Obtiene los nombres de los parámetros formales.
    pub fn parameters(&self) -> &[Located<Identifier>] {
        &self.parameters
    }
}

/// Una definición de función: prototipo más cuerpo.
///
/// El lenguaje no tiene secuenciación de sentencias, por lo cual el
/// cuerpo es una única expresión cuyo valor es el valor de retorno.
#[derive(Debug)]
pub struct Function {
    prototype: Prototype,
    body: Located<Expr>,
}

impl Function {
    /// Obtiene el prototipo.
    pub fn prototype(&self) -> &Prototype {
        &self.prototype
    }

    /// Obtiene la expresión de cuerpo.
    pub fn body(&self) -> &Located<Expr> {
        &self.body
    }
}

/// Error de análisis sintáctico.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    /// El lexer encontró un error al producir el siguiente token.
    #[error(transparent)]
    Lex(#[from] LexerError),

    #[error("Expected token {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected token {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected \",\" or \")\"")]
    MissingSeparationToken,

    #[error("Expected identifier")]
    ExpectedId,

    #[error("Expected an expression, found {0}")]
    ExpectedExpr(Token),

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

pub type Parse<T> = Result<T, Located<ParserError>>;

/// Lo que se observa al asomarse al siguiente token sin consumirlo.
pub enum Lookahead {
    /// Hay un token válido pendiente.
    Token(Token),

    /// El lexer reportará un error en la siguiente extracción.
    Error,

    /// El programa terminó.
    End,
}

/// Analizador sintáctico sobre un flujo de tokens.
pub struct Parser<S: Iterator<Item = io::Result<char>>> {
    tokens: Peekable<Lexer<S>>,
    precedence: HashMap<BinOp, i32>,
    last_known: Location,
}

impl<S: Iterator<Item = io::Result<char>>> Parser<S> {
    /// Crea un parser que extrae tokens por demanda del lexer dado.
    pub fn new(lexer: Lexer<S>) -> Self {
        let mut precedence = HashMap::new();
        precedence.insert(BinOp::Sub, 1);
        precedence.insert(BinOp::Add, 2);
        precedence.insert(BinOp::Div, 3);
        precedence.insert(BinOp::Mul, 4);

        Parser {
            tokens: lexer.peekable(),
            precedence,
            last_known: Location::default(),
        }
    }

    /// Observa el siguiente token sin consumirlo.
    pub fn lookahead(&mut self) -> Lookahead {
        match self.tokens.peek() {
            Some(Ok(token)) => {
                self.last_known = *token.location();
                Lookahead::Token(token.as_ref().clone())
            }

            Some(Err(_)) => Lookahead::Error,
            None => Lookahead::End,
        }
    }

    /// Descarta el siguiente token, si existe. El driver usa esta
    /// operación para reanudar después de una unidad fallida.
    pub fn skip(&mut self) {
        self.tokens.next();
    }

    /// Analiza una definición de función encabezada por `def`.
    pub fn definition(&mut self) -> Parse<Function> {
        self.expect(Token::Def)?;
        let prototype = self.prototype()?;
        let body = self.expression()?;

        Ok(Function { prototype, body })
    }

    /// Analiza una expresión suelta y la envuelve en una definición
    /// anónima sin parámetros.
    pub fn top_level(&mut self) -> Parse<Function> {
        let body = self.expression()?;

        Ok(Function {
            prototype: Prototype {
                name: None,
                parameters: Vec::new(),
            },
            body,
        })
    }

    /// Analiza una expresión completa.
    pub fn expression(&mut self) -> Parse<Located<Expr>> {
        let lhs = self.primary()?;
        self.binary_rhs(0, lhs)
    }

    /// Extiende `lhs` mientras le sigan operadores de precedencia no
    /// menor a `min`.
    ///
    /// Tras consumir un operador y su operando derecho, los
    /// operadores estrictamente más fuertes que el recién consumido
    /// se absorben recursivamente dentro del operando derecho. La
    /// igualdad de precedencias no recursa, lo cual produce
    /// asociatividad izquierda.
    fn binary_rhs(&mut self, min: i32, mut lhs: Located<Expr>) -> Parse<Located<Expr>> {
        loop {
            let precedence = self.peek_precedence();
            if precedence < min {
                break Ok(lhs);
            }

            let token = self.next()?.into_inner();
            let op = match binop(&token) {
                Some(op) => op,
                None => break self.fail(ParserError::ExpectedExpr(token)),
            };

            let mut rhs = self.primary()?;
            if precedence < self.peek_precedence() {
                rhs = self.binary_rhs(precedence + 1, rhs)?;
            }

            let location = *lhs.location();
            lhs = Located::at(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), location);
        }
    }

    /// Precedencia del siguiente token, o `-1` si el siguiente token
    /// no es un operador registrado.
    fn peek_precedence(&mut self) -> i32 {
        match self.lookahead() {
            Lookahead::Token(token) => binop(&token)
                .and_then(|op| self.precedence.get(&op))
                .copied()
                .unwrap_or(-1),

            _ => -1,
        }
    }

    /// Analiza una expresión primaria: constante, referencia,
    /// llamada o agrupación entre paréntesis.
    fn primary(&mut self) -> Parse<Located<Expr>> {
        match self.lookahead() {
            Lookahead::Token(Token::Id(_)) => self.identifier_expr(),
            Lookahead::Token(Token::Number(_)) => self.number(),
            Lookahead::Token(Token::OpenParen) => self.paren(),
            Lookahead::Token(found) => self.fail(ParserError::ExpectedExpr(found)),

            // Fin de entrada o error léxico pendiente; `next()`
            // produce el error que corresponda
            _ => match self.next() {
                Err(error) => Err(error),
                Ok(token) => self.fail(ParserError::ExpectedExpr(token.into_inner())),
            },
        }
    }

    /// Analiza una constante entera.
    fn number(&mut self) -> Parse<Located<Expr>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Number(integer) => Ok(Located::at(Expr::Number(integer), location)),
            _ => self.fail(ParserError::ExpectedExpr(token)),
        }
    }

    /// Analiza una referencia a variable o una llamada a función,
    /// distinguidas por el `(` que sigue al identificador.
    fn identifier_expr(&mut self) -> Parse<Located<Expr>> {
        let name = self.id()?;

        if !matches!(self.lookahead(), Lookahead::Token(Token::OpenParen)) {
            let (location, name) = name.split();
            return Ok(Located::at(Expr::Variable(name), location));
        }

        self.expect(Token::OpenParen)?;

        let mut args = Vec::new();
        if !matches!(self.lookahead(), Lookahead::Token(Token::CloseParen)) {
            loop {
                args.push(self.expression()?);

                match self.lookahead() {
                    Lookahead::Token(Token::CloseParen) => break,
                    Lookahead::Token(Token::Comma) => self.skip(),
                    _ => return self.fail(ParserError::MissingSeparationToken),
                }
            }
        }

        self.expect(Token::CloseParen)?;

        let location = *name.location();
        Ok(Located::at(Expr::Call(name, args), location))
    }

    /// Analiza una agrupación `( expresión )`.
    ///
    /// Los paréntesis solo alteran el agrupamiento; no se conservan
    /// como nodo propio.
    fn paren(&mut self) -> Parse<Located<Expr>> {
        self.expect(Token::OpenParen)?;
        let inner = self.expression()?;
        self.expect(Token::CloseParen)?;

        Ok(inner)
    }

    /// Analiza un prototipo: nombre, `(`, cero o más identificadores
    /// de parámetro yuxtapuestos, `)`.
    fn prototype(&mut self) -> Parse<Prototype> {
        let name = self.id()?;

        self.expect(Token::OpenParen)?;

        let mut parameters = Vec::new();
        while matches!(self.lookahead(), Lookahead::Token(Token::Id(_))) {
            parameters.push(self.id()?);
        }

        self.expect(Token::CloseParen)?;

        Ok(Prototype {
            name: Some(name),
            parameters,
        })
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        if !matches!(self.lookahead(), Lookahead::Token(Token::Id(_))) {
            return self.fail(ParserError::ExpectedId);
        }

        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            _ => self.fail(ParserError::ExpectedId),
        }
    }

    fn expect(&mut self, expected: Token) -> Parse<()> {
        match self.lookahead() {
            Lookahead::Token(found) if found == expected => {
                self.next()?;
                Ok(())
            }

            Lookahead::Token(found) => self.fail(ParserError::UnexpectedToken(expected, found)),
            Lookahead::End => self.fail(ParserError::MissingToken(expected)),

            Lookahead::Error => {
                self.next()?;
                self.fail(ParserError::MissingToken(expected))
            }
        }
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(Ok(token)) => {
                self.last_known = *token.location();
                Ok(token)
            }

            Some(Err(error)) => Err(error.map(ParserError::Lex)),
            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.last_known))
    }
}

/// Operador que denota un token, si denota alguno.
fn binop(token: &Token) -> Option<BinOp> {
    match token {
        Token::Plus => Some(BinOp::Add),
        Token::Minus => Some(BinOp::Sub),
        Token::Star => Some(BinOp::Mul),
        Token::Slash => Some(BinOp::Div),
        _ => None,
    }
}
