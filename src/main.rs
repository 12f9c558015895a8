use std::fs;
use std::io::{self, Read};

use anyhow::{Context as _, Result, bail};
use minipy::interpreter;
use minipy::runtime::StreamContext;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    let mut ctx = StreamContext::new(&mut output, &mut input);
    interpreter::interpret(&source, &mut ctx)?;
    Ok(())
}
