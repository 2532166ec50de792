use aritc::{driver, emit, lex::Lexer, source};
use std::io::{self, Read};

fn main() -> io::Result<()> {
    let mut program = String::new();
    io::stdin().read_to_string(&mut program)?;

    let tokens: Vec<_> = Lexer::new(source::chars(program.as_bytes())).collect();
    print!("Tokens: {:#?}\n\n", tokens);

    let (module, diagnostics) = driver::compile(source::chars(program.as_bytes()));

    println!("IR:");
    let stdout = io::stdout();
    emit::write(&module, &mut stdout.lock())?;

    eprint!("{}", diagnostics);
    Ok(())
}
