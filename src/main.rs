//! Punto de entrada.
//!
//! Este módulo orquesta las fases del proceso de compilación y
//! expone una CLI.

use anyhow::Context;
use aritc::{driver, emit, source};
use clap::{crate_version, Arg};

use std::{
    fs::File,
    io::{self, BufReader},
    process,
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::App::new("Arit compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .default_value("-")
                .value_name("FILE")
                .help("Output file ('-' for stdout)"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").unwrap();
    let output = args.value_of("output").unwrap();

    let file = File::open(input)
        .with_context(|| format!("Failed to open source file: {}", input))?;

    let (module, diagnostics) = driver::compile(source::chars(BufReader::new(file)));
    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics);
    }

    match output {
        // Salida a stdout
        "-" => {
            let stdout = io::stdout();
            emit::write(&module, &mut stdout.lock()).context("Failed to emit to stdout")?;
        }

        // Salida a archivo
        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            emit::write(&module, &mut file)
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    if !diagnostics.is_empty() {
        process::exit(1);
    }

    Ok(())
}
