//! Bucle principal de compilación.
//!
//! El driver separa el programa en unidades: definiciones de función
//! encabezadas por `def`, expresiones sueltas y separadores `;` sin
//! efecto. Cada unidad se analiza y se genera por completo antes de
//! observar el siguiente token. Los fallos se recuperan a nivel de
//! unidad: la unidad ofensora se descarta y se reporta, y la
//! compilación continúa con la siguiente.

use std::io;

use crate::{
    error::Diagnostics,
    gen::Generator,
    ir,
    lex::{Lexer, Token},
    parse::{Lookahead, Parser, ParserError},
};

/// Compila un programa completo, de mejor esfuerzo.
///
/// Nada detiene la compilación: el módulo resultante contiene todas
/// las unidades que sí se pudieron generar y los diagnósticos
/// describen a las que no.
pub fn compile<S>(source: S) -> (ir::Module, Diagnostics)
where
    S: Iterator<Item = io::Result<char>>,
{
    let mut parser = Parser::new(Lexer::new(source));
    let mut generator = Generator::new();
    let mut diagnostics = Diagnostics::default();

    loop {
        let unit = match parser.lookahead() {
            Lookahead::End => break,

            Lookahead::Token(Token::Semicolon) => {
                parser.skip();
                continue;
            }

            Lookahead::Token(Token::Def) => Unit::Definition,
            _ => Unit::Expression,
        };

        let parsed = match unit {
            Unit::Definition => parser.definition(),
            Unit::Expression => parser.top_level(),
        };

        match parsed {
            Ok(function) => {
                if let Err(error) = generator.function(&function) {
                    diagnostics.push(error);
                }
            }

            Err(error) => {
                // El token que provocó el fallo sigue pendiente y se
                // descarta aquí. La excepción son los errores
                // léxicos: el lexer ya consumió el lexema ofensor y
                // descartó su línea, avanzar de nuevo se comería el
                // inicio de la siguiente unidad.
                if !matches!(error.as_ref(), ParserError::Lex(_)) {
                    parser.skip();
                }

                diagnostics.push(error);
            }
        }
    }

    (generator.finish(), diagnostics)
}

enum Unit {
    Definition,
    Expression,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn run(program: &str) -> (ir::Module, Diagnostics) {
        compile(source::chars(program.as_bytes()))
    }

    #[test]
    fn empty_programs_produce_empty_modules() {
        let (module, diagnostics) = run(";;; # nada\n;");

        assert!(module.functions.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn one_bad_unit_does_not_abort_the_run() {
        let (module, diagnostics) = run(indoc! {"
            def (
            def g(x) x
        "});

        assert_eq!(diagnostics.len(), 1);

        let g = module.function("g").expect("second unit was lost");
        assert!(!g.is_declaration());
    }

    #[test]
    fn forward_declarations_reconcile_across_units() {
        let (module, diagnostics) = run(indoc! {"
            f(1);
            def f(a) a
            def f(a b) a
            def f(a) a
        "});

        // Fallan la redeclaración con otra aridad y la redefinición
        assert_eq!(diagnostics.len(), 2);

        // Envoltorio anónimo más una única `f`, ya definida
        assert_eq!(module.functions.len(), 2);
        assert!(!module.function("f").unwrap().is_declaration());
        assert_eq!(module.function("f").unwrap().parameters, 1);
    }

    #[test]
    fn function_scopes_reset_between_units() {
        let (module, diagnostics) = run(indoc! {"
            def f(a) a
            def g(b) a
        "});

        assert_eq!(diagnostics.len(), 1);
        assert!(module.function("f").is_some());
        assert!(module.function("g").is_none());
    }

    #[test]
    fn lexical_errors_discard_their_line_only() {
        let (module, diagnostics) = run(indoc! {"
            12a 34
            def g(x) x
        "});

        assert_eq!(diagnostics.len(), 1);
        assert!(module.function("g").is_some());
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn units_generate_in_program_order() {
        let (module, diagnostics) = run(indoc! {"
            # doble de una suma
            def doble(x) x+x
            doble(2+3);
            doble(1)-1
        "});

        assert!(diagnostics.is_empty());

        let names: Vec<&str> = module
            .functions
            .iter()
            .map(|function| &*function.name)
            .collect();

        assert_eq!(names, vec!["doble", "", ""]);
        assert!(module.functions.iter().all(|f| !f.is_declaration()));
    }
}
