use std::{env, fs, path::Path, process, sync::Arc, time::Duration};

use gale::diagnostics::{Diagnostic, error_count, render_diagnostics};
use gale::foreign::{CalcModule, ForeignBridge};
use gale::runtime::{FrontierOrder, Outcome, Scheduler, SchedulerOptions};
use gale::syntax::{Lexer, Parser};

fn main() {
    let mut args: Vec<String> = env::args().collect();
    let trace = args.iter().any(|arg| arg == "--trace");
    let trace_json = args.iter().any(|arg| arg == "--trace-json");
    let link_calc = args.iter().any(|arg| arg == "--link-calc");
    let lifo = args.iter().any(|arg| arg == "--lifo");
    if trace {
        args.retain(|arg| arg != "--trace");
    }
    if trace_json {
        args.retain(|arg| arg != "--trace-json");
    }
    if link_calc {
        args.retain(|arg| arg != "--link-calc");
    }
    if lifo {
        args.retain(|arg| arg != "--lifo");
    }
    let Some(timeout_ms) = extract_u64(&mut args, "--timeout-ms") else {
        return;
    };
    let Some(call_timeout_ms) = extract_u64(&mut args, "--call-timeout-ms") else {
        return;
    };
    let Some(max_steps) = extract_u64(&mut args, "--max-steps") else {
        return;
    };
    let Some(shuffle) = extract_u64(&mut args, "--shuffle") else {
        return;
    };

    if args.len() < 2 {
        print_help();
        return;
    }

    let order = if let Some(seed) = shuffle {
        FrontierOrder::Seeded(seed)
    } else if lifo {
        FrontierOrder::Lifo
    } else {
        FrontierOrder::Fifo
    };
    let options = SchedulerOptions {
        timeout: timeout_ms.map(Duration::from_millis),
        call_timeout: call_timeout_ms.map(Duration::from_millis),
        max_steps,
        order,
        trace,
    };

    if is_gale_file(&args[1]) {
        run_file(&args[1], &options, link_calc, trace, trace_json);
        return;
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: gale run <file.gl>");
                return;
            }
            if !is_gale_file(&args[2]) {
                eprintln!("Error: file must have .gl extension: {}", args[2]);
                return;
            }
            run_file(&args[2], &options, link_calc, trace, trace_json);
        }
        "tokens" => {
            if args.len() < 3 {
                eprintln!("Usage: gale tokens <file.gl>");
                return;
            }
            show_tokens(&args[2]);
        }
        "parse" => {
            if args.len() < 3 {
                eprintln!("Usage: gale parse <file.gl>");
                return;
            }
            show_parse(&args[2]);
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
        }
    }
}

fn print_help() {
    println!(
        "\
Gale CLI

Usage:
  gale <file.gl>
  gale run <file.gl>
  gale tokens <file.gl>
  gale parse <file.gl>

Flags:
  --link-calc            Link the built-in calc module; unlinked modules
                         answer every call with an opaque reference
  --trace                Log scheduler rounds to stderr and print the
                         foreign-call trace after the run
  --trace-json           Print the foreign-call trace as JSON lines on stdout
  --timeout-ms <n>       Stop evaluation after n milliseconds
  --call-timeout-ms <n>  Deadline for each foreign dispatch
  --max-steps <n>        Stop evaluation after n reduction steps
  --lifo                 Step the newest ready nodes first
  --shuffle <seed>       Step ready nodes in a seeded random order
  -h, --help             Show this help message
"
    );
}

fn run_file(
    path: &str,
    options: &SchedulerOptions,
    link_calc: bool,
    trace: bool,
    trace_json: bool,
) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading {}: {}", path, err);
            process::exit(1);
        }
    };

    let lexer = Lexer::new(&source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();

    let mut diagnostics: Vec<Diagnostic> = parser
        .lexer_warnings()
        .iter()
        .map(|warning| {
            Diagnostic::warning(warning.message.clone()).with_position(warning.position)
        })
        .collect();
    diagnostics.append(&mut parser.errors);

    if !diagnostics.is_empty() {
        eprintln!(
            "{}",
            render_diagnostics(&diagnostics, Some(&source), Some(path))
        );
        if error_count(&diagnostics) > 0 {
            process::exit(1);
        }
    }

    let mut bridge = ForeignBridge::new();
    if link_calc {
        bridge.link(Arc::new(CalcModule::new()));
    }

    let mut scheduler = Scheduler::new(bridge, options.clone());
    scheduler.load_program(&program);
    let evaluation = scheduler.run();

    if trace {
        for record in scheduler.trace() {
            eprintln!("{}", record);
        }
    }
    if trace_json {
        for record in scheduler.trace() {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{}", line),
                Err(err) => eprintln!("Error encoding trace record: {}", err),
            }
        }
    }

    match evaluation.outcome {
        Outcome::Value(value) => println!("{}", value),
        Outcome::Empty => {}
        Outcome::Failure(failure) => {
            eprintln!("runtime failure: {}", failure);
            process::exit(1);
        }
        Outcome::Stalled { unresolved } => {
            eprintln!("deadlock: unresolved binding(s): {}", unresolved.join(", "));
            process::exit(1);
        }
        Outcome::OutOfFuel { steps } => {
            eprintln!("evaluation stopped after {} steps", steps);
            process::exit(1);
        }
        Outcome::TimedOut => {
            eprintln!("evaluation timed out");
            process::exit(1);
        }
        Outcome::Cancelled => {
            eprintln!("evaluation cancelled");
            process::exit(1);
        }
    }
}

fn extract_u64(args: &mut Vec<String>, flag: &str) -> Option<Option<u64>> {
    let mut found = None;
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            if i + 1 >= args.len() {
                eprintln!("Usage: gale <file.gl> {} <n>", flag);
                return None;
            }
            let value = args.remove(i + 1);
            args.remove(i);
            match value.parse::<u64>() {
                Ok(parsed) => {
                    found = Some(parsed);
                }
                Err(_) => {
                    eprintln!("Error: {} expects a non-negative integer.", flag);
                    return None;
                }
            }
            continue;
        }
        i += 1;
    }
    Some(found)
}

fn is_gale_file(path: &str) -> bool {
    Path::new(path).extension().and_then(|ext| ext.to_str()) == Some("gl")
}

fn show_tokens(path: &str) {
    match fs::read_to_string(path) {
        Ok(source) => {
            let mut lexer = Lexer::new(&source);
            println!("Tokens from {}:", path);
            println!("{}", "─".repeat(50));
            for tok in lexer.tokenize() {
                println!(
                    "{:>3}:{:<3} {:20} {:?}",
                    tok.position.line,
                    tok.position.column,
                    tok.token_type.to_string(),
                    tok.literal
                );
            }
            for warning in lexer.warnings() {
                eprintln!(
                    "{}",
                    Diagnostic::warning(warning.message.clone())
                        .with_position(warning.position)
                        .render(Some(&source), Some(path))
                );
            }
        }
        Err(e) => eprintln!("Error reading {}: {}", path, e),
    }
}

fn show_parse(path: &str) {
    match fs::read_to_string(path) {
        Ok(source) => {
            let lexer = Lexer::new(&source);
            let mut parser = Parser::new(lexer);
            let program = parser.parse_program();

            if !parser.errors.is_empty() {
                eprintln!(
                    "{}",
                    render_diagnostics(&parser.errors, Some(&source), Some(path))
                );
                process::exit(1);
            }

            println!("Core terms from {}:", path);
            println!("{}", "─".repeat(50));
            for decl in &program.decls {
                println!("{}", decl);
            }

            let notations = parser.notations();
            if !notations.is_empty() {
                println!("\nNotation rules:");
                for rule in notations.rules() {
                    println!("  {}", rule);
                }
            }
        }
        Err(e) => eprintln!("Error reading {}: {}", path, e),
    }
}
