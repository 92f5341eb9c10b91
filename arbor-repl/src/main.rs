use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use arbor::{exec, init};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn history_path() -> Option<PathBuf> {
    let dir = dirs::data_dir()?.join("arbor");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join("history.txt"))
}

fn repl() {
    let env = init();

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start line editor: {e}");
            process::exit(1);
        }
    };

    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    println!("Arbor REPL");
    println!("Programs are JSON documents, e.g. [\"+\", 1, 2]. Ctrl-D exits.");
    println!();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                match exec(&env, line) {
                    Ok(result) => println!("{result}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
}

fn run_file(filename: &str) -> Result<(), String> {
    let contents = fs::read_to_string(filename)
        .map_err(|e| format!("Failed to read file '{filename}': {e}"))?;

    let env = init();
    let result = exec(&env, &contents).map_err(|e| format!("Evaluation error: {e}"))?;
    println!("{result}");
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => repl(),
        2 => {
            if let Err(e) = run_file(&args[1]) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: {} [program.json]", args[0]);
            process::exit(1);
        }
    }
}
