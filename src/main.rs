//! Demo-block compiler binary

use demoblock::{CompilerError, DemoCli};
use std::process;

fn main() {
    let mut cli = DemoCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(CompilerError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    }
}
