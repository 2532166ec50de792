use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error de cualquier fase, con ubicación asociada.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Acumulado de errores de una ejecución del compilador.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Etiqueta bajo la cual se reporta cada error.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Agrega un error al acumulado.
    pub fn push<E: 'static + LocatedError>(&mut self, error: E) {
        self.errors.push(Box::new(error));
    }

    /// Cantidad de errores acumulados.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(error);
        diagnostics
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;
            writeln!(fmt, " --> {}", error.location())?;
            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::ParserError, source::Location};
    use pretty_assertions::assert_eq;

    #[test]
    fn reports_count_kind_and_location() {
        let mut diagnostics = Diagnostics::default().kind("Syntax error");
        diagnostics.push(Located::at(ParserError::UnexpectedEof, Location::default()));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.to_string(),
            "Syntax error: Abrupt end of program\n --> 1:1\n\nBuild failed with 1 error\n"
        );
    }

    #[test]
    fn an_empty_report_says_so() {
        assert_eq!(Diagnostics::default().to_string(), "No errors were reported\n");
    }
}
