//! Compilador para el lenguaje Arit.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente. El
//! archivo se somete primero a análisis léxico en [`lex`], de lo
//! cual se obtiene un flujo de tokens. El [`driver`] divide ese
//! flujo en unidades: definiciones de función y expresiones sueltas.
//! Cada unidad se dispone en un AST por medio de análisis sintáctico
//! en [`parse`] y se baja de inmediato en [`gen`] a la
//! representación intermedia descrita en [`ir`]. Una unidad que
//! falla se descarta y se reporta por medio de [`error`] sin afectar
//! a las unidades restantes.
//!
//! # Salida
//! El módulo IR terminado se entrega a [`emit`], que produce el
//! listado textual final. No hay back end: selección de
//! instrucciones, asignación de registros y emisión de objetos
//! corresponden a otros componentes.

pub mod driver;
pub mod emit;
pub mod error;
pub mod gen;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod source;
