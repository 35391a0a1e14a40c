//! Dialog dataflow-graph CLI.
//!
//! Provides the `dfg` binary. `run` plays a list of expressions as the turns
//! of one dialog, `parse` shows the AST of an expression and `dot` renders
//! its constructed graph for Graphviz.

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use dfg_core::parser::parse_expression;
use dfg_core::printer::to_expression;
use dfg_core::viz::GraphView;
use dfg_core::{DialogContext, SessionConfig, SimplifyMode, TypeRegistry};
use dfg_engine::{construct_graph, process_turn, simplify_graph, ConstructOptions, SimplifyOptions};
use dfg_storage::{SessionStore, SqliteStore};

/// Dialog expression engine and tools.
#[derive(Parser)]
#[command(name = "dfg", about = "Dialog expression engine and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Construct and evaluate each expression as one dialog turn.
    Run {
        /// Expressions, one per turn.
        #[arg(required = true)]
        exprs: Vec<String>,

        /// Also print the simplified form of each goal.
        #[arg(long)]
        simplify: bool,

        /// Use aggressive simplification rules.
        #[arg(long, requires = "simplify")]
        aggressive: bool,

        /// JSON file holding a session configuration.
        #[arg(short, long)]
        config: Option<String>,

        /// Save the final session to this SQLite database.
        #[arg(long)]
        save: Option<String>,

        /// Session name used with --save.
        #[arg(long, default_value = "cli")]
        name: String,
    },
    /// Print the syntax tree of an expression as JSON.
    Parse {
        expr: String,
    },
    /// Print the constructed graph of an expression in DOT format.
    Dot {
        expr: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run {
            exprs,
            simplify,
            aggressive,
            config,
            save,
            name,
        } => {
            let mode = if aggressive {
                SimplifyMode::Aggressive
            } else {
                SimplifyMode::Conservative
            };
            run_turns(&exprs, simplify.then_some(mode), config.as_deref(), save.as_deref(), &name)
        }
        Commands::Parse { expr } => run_parse(&expr),
        Commands::Dot { expr } => run_dot(&expr),
    };
    process::exit(exit_code);
}

fn new_context() -> DialogContext {
    DialogContext::new(Arc::new(TypeRegistry::new()))
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = every turn succeeded, 1 = a turn failed to
/// construct or raised a fault, 2 = a turn reported exceptions, 3 = I/O or
/// storage error.
fn run_turns(
    exprs: &[String],
    simplify: Option<SimplifyMode>,
    config_path: Option<&str>,
    save: Option<&str>,
    name: &str,
) -> i32 {
    let mut ctx = new_context();
    if let Some(path) = config_path {
        match load_config(path) {
            Ok(config) => *ctx.config_mut() = config,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return 3;
            }
        }
    }

    let mut exit_code = 0;
    for (i, text) in exprs.iter().enumerate() {
        let options = ConstructOptions::tagged(format!("turn{}", i + 1));
        let outcome = match process_turn(&mut ctx, text, &options) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Error in turn {}: {}", i + 1, e);
                return 1;
            }
        };

        let result = ctx.effective(outcome.goal);
        println!("[{}] {}", ctx.turn_num(), to_expression(&ctx, outcome.goal));
        if result != outcome.goal {
            println!("  => {}", to_expression(&ctx, result));
        }
        if !outcome.ok {
            exit_code = 2;
            let turn = ctx.turn_num();
            for record in ctx.exceptions().iter().filter(|r| r.turn == turn) {
                println!("  ! {}", record.error);
                for hint in &record.error.hints {
                    println!("    hint: {}", hint);
                }
                for suggestion in &record.error.suggestions {
                    println!("    try: {}", suggestion.expression);
                }
            }
        }

        if let Some(mode) = simplify {
            let options = SimplifyOptions {
                mode,
                ..SimplifyOptions::default()
            };
            match simplify_graph(&mut ctx, outcome.goal, &options) {
                Ok(root) => println!("  ~ {}", to_expression(&ctx, root)),
                Err(e) => {
                    eprintln!("Error simplifying turn {}: {}", i + 1, e);
                    exit_code = 1;
                }
            }
        }
    }

    if let Some(db) = save {
        if let Err(msg) = save_session(db, name, &ctx) {
            eprintln!("Error: {}", msg);
            return 3;
        }
    }
    exit_code
}

fn load_config(path: &str) -> Result<SessionConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config '{}': {}", path, e))
}

fn save_session(db: &str, name: &str, ctx: &DialogContext) -> Result<(), String> {
    let mut store = SqliteStore::new(db)
        .map_err(|e| format!("failed to open database '{}': {}", db, e))?;
    let id = store
        .create_session(name)
        .map_err(|e| format!("failed to create session: {}", e))?;
    store
        .save_context(id, ctx)
        .map_err(|e| format!("failed to save {}: {}", id, e))?;
    eprintln!("saved {} to {}", id, db);
    Ok(())
}

fn run_parse(text: &str) -> i32 {
    match parse_expression(text) {
        Ok(ast) => {
            let json = serde_json::to_string_pretty(&ast).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize AST: {}\"}}", e)
            });
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Parse error: {}", e);
            1
        }
    }
}

fn run_dot(text: &str) -> i32 {
    let mut ctx = new_context();
    match construct_graph(&mut ctx, text, &ConstructOptions::default()) {
        Ok(root) => {
            print!("{}", GraphView::from_goals(&ctx, &[root]).to_dot());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
