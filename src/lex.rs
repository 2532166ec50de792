//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un flujo de
//! caracteres en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación.
//! Cada token emitido queda asociado a la ubicación donde comienza
//! en el código fuente, lo cual permite rastrear errores tanto en
//! los tokens como en constructos más elevados de fases posteriores.
//!
//! El lexer conserva entre invocaciones el primer carácter que sigue
//! al token recién emitido: reconocer el final de un identificador o
//! de una constante exige observar un carácter más allá, y ese
//! carácter pertenece al siguiente token.
//!
//! # Reglas del lenguaje
//! - Los identificadores comienzan con una letra y continúan con
//!   letras o dígitos. El lenguaje distingue mayúsculas de minúsculas.
//! - `def` es la única palabra reservada.
//! - Las constantes enteras son secuencias de dígitos decimales, sin
//!   signo y sin parte fraccionaria.
//! - `#` comienza un comentario que se extiende hasta el final de la
//!   línea y nunca produce un token.
//! - Cualquier otro carácter se emite tal cual como token de un solo
//!   carácter; decidir si tiene sentido es trabajo del parser.
//!
//! # Errores
//! Una letra inmediatamente después de una constante entera se
//! rechaza en vez de separarse en dos tokens, y las constantes fuera
//! de rango también son errores. Tras un error se descarta el resto
//! de la línea donde ocurrió y el análisis se reanuda en la línea
//! siguiente.

use crate::source::{Located, Location};
use std::{
    fmt::{self, Display},
    io,
    iter::Peekable,
    rc::Rc,
};

use thiserror::Error;

/// Literal entero máximo.
const INT_MAX: i32 = i32::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el flujo de entrada.
    #[error("I/O error")]
    Input(#[from] io::Error),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Una letra sigue inmediatamente a una constante entera.
    #[error("Letter {0:?} immediately follows an integer literal")]
    NumberBoundary(char),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Literal de entero.
    Number(i32),

    /// Palabra clave `def`.
    Def,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Star,

    /// `/`
    Slash,

    /// `,`
    Comma,

    /// `;`
    Semicolon,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// Cualquier otro carácter.
    Unknown(char),
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Number(integer) => write!(fmt, "literal `{}`", integer),
            Def => fmt.write_str("keyword `def`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Star => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Comma => fmt.write_str("`,`"),
            Semicolon => fmt.write_str("`;`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            Unknown(c) => write!(fmt, "`{}`", c),
        }
    }
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define a
/// partir de su estado actual y el siguiente carácter encontrado en
/// el flujo de entrada.
pub struct Lexer<S: Iterator<Item = io::Result<char>>> {
    source: Peekable<S>,
    state: State,
    start: Location,
    next: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error; descarta la línea donde ocurrió el error.
    Error,

    /// Estado de completitud; siempre emite el token incluido sin
    /// consumir el carácter observado y pasa a [`State::Start`].
    Complete(Token),

    /// Comentario de línea.
    Comment,

    /// Constante entera en acumulación dígito por dígito.
    Integer(i32),

    /// Término que puede ser un identificador o la palabra clave.
    Word(String),
}

impl<S: Iterator<Item = io::Result<char>>> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(source: S) -> Self {
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start: Location::default(),
            next: Location::default(),
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Location)>, LexerError> {
        use {State::*, Token::*};

        let token = loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok(c)) => Some(*c),
                Some(Err(_)) => break Err(self.source.next().unwrap().err().unwrap().into()),
            };

            // La posición de origen se mueve junto a la posición
            // siguiente mientras no se haya encontrado una frontera
            // de token
            if let Start = self.state {
                self.start = self.next;
            }

            // Switch table principal, determina cambios de estado y
            // de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error y el lexer se reanuda al llegar
                // al final de esa línea
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Star),
                (Start, Some('/')) => self.state = Complete(Slash),
                (Start, Some('#')) => self.state = Comment,

                // Identificadores y la palabra clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que esta lógica ya está implementada en
                // el caso de acumulación, por lo cual la constante
                // es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres restantes
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => self.state = Complete(Unknown(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break Ok(std::mem::replace(token, Comma)),

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) => self.state = Start,
                (Comment, Some(_)) => (),
                (Comment, None) => self.state = Start,

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap() as i32;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow),
                    }
                }

                // Una letra pegada a una constante no forma dos
                // tokens, es un error
                (Integer(_), Some(c)) if c.is_ascii_alphabetic() => {
                    break Err(LexerError::NumberBoundary(c))
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(Number(*integer)),

                // Extensión de términos
                (Word(word), Some(c)) if c.is_ascii_alphanumeric() => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    if word.as_str() == "def" {
                        break Ok(Def);
                    } else {
                        break Ok(Id(Identifier(Rc::from(std::mem::take(word)))));
                    }
                }
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok(c)) = self.source.next() {
                self.next = self.next.advance(c);
            }
        };

        token.map(|token| Some((token, self.start)))
    }
}

impl<S: Iterator<Item = io::Result<char>>> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some((token, location))) => {
                self.state = State::Start;
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;
                Some(Err(Located::at(error, self.next)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use pretty_assertions::assert_eq;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source::chars(source.as_bytes()))
            .map(|token| token.expect("unexpected lexer error").into_inner())
            .collect()
    }

    #[test]
    fn scans_the_whole_surface() {
        use Token::*;

        assert_eq!(
            tokens("def f(a b) a + b * 2, g(); -10/x"),
            vec![
                Def,
                id("f"),
                OpenParen,
                id("a"),
                id("b"),
                CloseParen,
                id("a"),
                Plus,
                id("b"),
                Star,
                Number(2),
                Comma,
                id("g"),
                OpenParen,
                CloseParen,
                Semicolon,
                Minus,
                Number(10),
                Slash,
                id("x"),
            ],
        );
    }

    #[test]
    fn keyword_requires_exact_match() {
        assert_eq!(tokens("def define df"), vec![Token::Def, id("define"), id("df")]);
    }

    #[test]
    fn comments_never_produce_tokens() {
        assert_eq!(tokens("# ignore\n5"), vec![Token::Number(5)]);
        assert_eq!(tokens("# solo un comentario"), vec![]);
    }

    #[test]
    fn end_of_input_is_idempotent() {
        let mut lexer = Lexer::new(source::chars("1".as_bytes()));

        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn unexpected_characters_are_tokens() {
        assert_eq!(tokens("a $ b"), vec![id("a"), Token::Unknown('$'), id("b")]);
    }

    #[test]
    fn tokens_know_where_they_begin() {
        let locations: Vec<String> = Lexer::new(source::chars("ab + 1\n  cd".as_bytes()))
            .map(|token| token.unwrap().location().to_string())
            .collect();

        assert_eq!(locations, vec!["1:1", "1:4", "1:6", "2:3"]);
    }

    #[test]
    fn letters_cannot_follow_integers() {
        let mut lexer = Lexer::new(source::chars("12a".as_bytes()));

        match lexer.next() {
            Some(Err(error)) => {
                assert!(matches!(error.as_ref(), LexerError::NumberBoundary('a')))
            }

            other => panic!("expected a lexer error, found {:?}", other),
        }
    }

    #[test]
    fn integer_literals_have_a_range() {
        assert_eq!(tokens("2147483647"), vec![Token::Number(i32::MAX)]);

        let mut lexer = Lexer::new(source::chars("2147483648".as_bytes()));
        match lexer.next() {
            Some(Err(error)) => assert!(matches!(error.as_ref(), LexerError::IntOverflow)),
            other => panic!("expected a lexer error, found {:?}", other),
        }
    }

    #[test]
    fn errors_discard_the_rest_of_the_line() {
        let mut lexer = Lexer::new(source::chars("12a 34 56\ndef".as_bytes()));

        assert!(matches!(lexer.next(), Some(Err(_))));
        assert_eq!(lexer.next().unwrap().unwrap().into_inner(), Token::Def);
        assert!(lexer.next().is_none());
    }

    fn id(name: &str) -> Token {
        Token::Id(Identifier(name.into()))
    }
}
