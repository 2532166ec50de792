//! Rastreo de ubicaciones en el código fuente.
//!
//! Los objetos que el compilador construye a partir del programa
//! fuente llevan consigo la posición donde se originaron, lo cual
//! permite señalar un punto exacto al reportar errores de cualquier
//! fase. Este módulo también adapta un flujo de entrada estándar a
//! la secuencia de caracteres que espera el lexer.

use std::{
    fmt::{self, Display, Formatter},
    io::{self, BufRead},
    iter, vec,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una posición línea-columna en el programa fuente.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Location {
    line: u32,
    column: u32,
}

impl Location {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Posición que le corresponde al carácter siguiente a `c`.
    pub fn advance(self, c: char) -> Location {
        match c {
            '\n' => Location {
                line: self.line + 1,
                column: 1,
            },

            '\t' => Location {
                line: self.line,
                column: 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP,
            },

            _ => Location {
                line: self.line,
                column: self.column + 1,
            },
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location { line: 1, column: 1 }
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Transforma un flujo de entrada estándar en uno que itera por carácter.
///
/// `std` no ofrece un mecanismo directo para esta operación. La
/// entrada se procesa línea por línea, reinsertando el `'\n'` que
/// [`BufRead::lines`] descarta, por lo cual los errores de E/S se
/// manifiestan en fronteras de línea.
pub fn chars<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<char>> {
    reader
        .lines()
        .map(|line| match line {
            Ok(line) => {
                let mut chars: Vec<char> = line.chars().collect();
                chars.push('\n');
                Chars::Line(chars.into_iter())
            }

            Err(error) => Chars::Failed(iter::once(error)),
        })
        .flatten()
        .fuse()
}

/// Una línea ya descompuesta o un error de E/S pendiente.
enum Chars {
    Line(vec::IntoIter<char>),
    Failed(iter::Once<io::Error>),
}

impl Iterator for Chars {
    type Item = io::Result<char>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Chars::Line(chars) => chars.next().map(Ok),
            Chars::Failed(error) => error.next().map(Err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_lines_and_columns() {
        let location = Location::default();
        assert_eq!(location.advance('a'), Location { line: 1, column: 2 });
        assert_eq!(location.advance('\n'), Location { line: 2, column: 1 });
        assert_eq!(location.advance('\t'), Location { line: 1, column: 5 });
    }

    #[test]
    fn chars_reinserts_newlines() {
        let collected: String = chars("ab\nc".as_bytes()).map(Result::unwrap).collect();

        assert_eq!(collected, "ab\nc\n");
    }
}
