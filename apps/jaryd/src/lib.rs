//! The `jaryd` binary's logic, split from `main.rs` for testability —
//! `run_cli` lives in the library half so it can be exercised directly.
//!
//! Reads a script file, compiles and runs it against a store, and maps
//! failures onto BSD sysexits codes.

mod cli;

use std::fs;

use clap::Parser;
use jary::Runtime;
use jary_store::StoreConfig;

pub use cli::Cli;

/// Input file could not be read (BSD sysexits `EX_IOERR`).
pub const EX_IOERR: i32 = 74;
/// A catch-all failure: compile diagnostics, a runtime crash, or a
/// storage error.
pub const EX_SOFTWARE: i32 = 70;

pub fn run_cli() -> i32 {
    run(Cli::parse())
}

fn run(cli: Cli) -> i32 {
    let source = match fs::read_to_string(&cli.script) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("jaryd: cannot read '{}': {err}", cli.script.display());
            return EX_IOERR;
        }
    };

    let store_config = StoreConfig { path: cli.db.clone() };
    let mut runtime = match Runtime::open(store_config) {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("jaryd: {err}");
            return EX_SOFTWARE;
        }
    };

    if let Err(err) = runtime.compile(&source, cli.modules.as_deref()) {
        eprintln!("jaryd: {err}");
        return EX_SOFTWARE;
    }

    let result = runtime.execute(|rule_name, output| {
        print!("{rule_name}:");
        for i in 0..output.len() {
            if let Some(s) = output.str_at(i) {
                print!(" {s}");
            } else if let Some(n) = output.long_at(i) {
                print!(" {n}");
            } else if let Some(b) = output.bool_at(i) {
                print!(" {b}");
            }
        }
        println!();
    });

    if let Err(err) = result {
        eprintln!("jaryd: {err}");
        return EX_SOFTWARE;
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_script_file_is_an_io_error() {
        let cli = Cli { script: "/no/such/path.jary".into(), modules: None, db: None };
        assert_eq!(run(cli), EX_IOERR);
    }

    #[test]
    fn a_clean_script_runs_successfully() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ingress data {{\nfield:\nage long\n}}\nrule r {{\nmatch:\n$data.age exact 8\n}}\n"
        )
        .unwrap();
        let cli = Cli { script: file.path().to_path_buf(), modules: None, db: None };
        assert_eq!(run(cli), 0);
    }

    #[test]
    fn a_script_with_diagnostics_is_software_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rule r {{\nmatch:\n$data.age exact 8\n}}\n").unwrap();
        let cli = Cli { script: file.path().to_path_buf(), modules: None, db: None };
        assert_eq!(run(cli), EX_SOFTWARE);
    }
}
