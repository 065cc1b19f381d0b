use clap::Parser;
use jsref::interpreter::ModuleStatus;
use jsref::{Agent, AgentOptions, Completion, ModuleResolver, FEATURES};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "jsref", version, about = "A specification-faithful JavaScript interpreter")]
struct Cli {
    /// JavaScript file to execute
    file: Option<PathBuf>,

    /// Evaluate inline JavaScript
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Treat the input as a module rather than a script
    #[arg(short = 'm', long = "module")]
    module: bool,

    /// Enable a named feature (repeatable)
    #[arg(long = "feature", value_name = "NAME")]
    features: Vec<String>,

    /// List the known feature flags and exit
    #[arg(long = "list-features")]
    list_features: bool,
}

/// Filesystem module resolver: specifiers resolve relative to the
/// importing module's path and records are keyed by the resolved path,
/// so the same file is always the same module.
fn file_resolver() -> ModuleResolver {
    let registry: Rc<RefCell<HashMap<PathBuf, usize>>> = Rc::new(RefCell::new(HashMap::new()));
    Rc::new(move |agent, referrer, specifier| {
        let realm = agent.current_realm();
        let base = referrer
            .and_then(|id| {
                let spec = agent.module_specifier(id);
                Path::new(&spec).parent().map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."));
        let path = base.join(specifier);
        let path = path.canonicalize().unwrap_or(path);
        if let Some(found) = registry.borrow().get(&path) {
            return Ok(*found);
        }
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                let message = format!("Cannot load module '{}': {e}", path.display());
                return Err(agent.throw_error(realm, "TypeError", &message));
            }
        };
        let id = agent.create_source_text_module(realm, &path.to_string_lossy(), &source)?;
        registry.borrow_mut().insert(path, id);
        Ok(id)
    })
}

fn make_agent(features: &[String]) -> Result<Agent, ExitCode> {
    Agent::new(AgentOptions {
        features: features.to_vec(),
    })
    .map_err(|e| {
        eprintln!("{e}");
        ExitCode::from(2)
    })
}

fn report_completion(agent: &Agent, completion: Completion, print_value: bool) -> ExitCode {
    match completion {
        Completion::Normal(value) => {
            if print_value && !value.is_undefined() {
                println!("{}", agent.inspect(&value));
            }
            ExitCode::SUCCESS
        }
        Completion::Throw(error) => {
            eprintln!("Uncaught {}", agent.inspect(&error));
            ExitCode::from(1)
        }
        other => {
            eprintln!("Unexpected completion: {other:?}");
            ExitCode::from(1)
        }
    }
}

fn run_script(agent: &mut Agent, source: &str, specifier: &str, print_value: bool) -> ExitCode {
    let realm = agent.create_realm(Some(file_resolver()));
    let completion = agent.evaluate_script(realm, source, specifier);
    report_completion(agent, completion, print_value)
}

fn run_module(agent: &mut Agent, source: &str, specifier: &str) -> ExitCode {
    let realm = agent.create_realm(Some(file_resolver()));
    let module = match agent.create_source_text_module(realm, specifier, source) {
        Ok(m) => m,
        Err(error) => {
            eprintln!("Uncaught {}", agent.inspect(&error));
            return ExitCode::from(1);
        }
    };
    if let Err(error) = agent.link_module(module) {
        eprintln!("Uncaught {}", agent.inspect(&error));
        return ExitCode::from(1);
    }
    let _promise = agent.evaluate_module(module);
    if agent.module_status(module) == ModuleStatus::Evaluated {
        if let Some(error) = agent.module_evaluation_error(module) {
            eprintln!("Uncaught {}", agent.inspect(&error));
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}

fn run_repl(features: &[String]) -> ExitCode {
    let mut agent = match make_agent(features) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let realm = agent.create_realm(Some(file_resolver()));

    println!("jsref v{}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript expressions. Press Ctrl-D to exit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match agent.evaluate_script(realm, trimmed, "<repl>") {
                    Completion::Normal(value) => {
                        if !value.is_undefined() {
                            println!("{}", agent.inspect(&value));
                        }
                    }
                    Completion::Throw(error) => {
                        eprintln!("Uncaught {}", agent.inspect(&error));
                    }
                    other => eprintln!("Unexpected completion: {other:?}"),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }
    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_features {
        for info in FEATURES {
            println!("{:<24}{}", info.name, info.url);
        }
        return ExitCode::SUCCESS;
    }

    if let Some(code) = &cli.eval {
        let mut agent = match make_agent(&cli.features) {
            Ok(a) => a,
            Err(exit) => return exit,
        };
        if cli.module {
            return run_module(&mut agent, code, "<eval>");
        }
        return run_script(&mut agent, code, "<eval>", true);
    }

    if let Some(path) = &cli.file {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                return ExitCode::from(1);
            }
        };
        let mut agent = match make_agent(&cli.features) {
            Ok(a) => a,
            Err(exit) => return exit,
        };
        let specifier = path.to_string_lossy();
        let is_module = cli.module || path.extension().is_some_and(|e| e == "mjs");
        if is_module {
            return run_module(&mut agent, &source, &specifier);
        }
        return run_script(&mut agent, &source, &specifier, false);
    }

    run_repl(&cli.features)
}
