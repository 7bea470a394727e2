//! gridtype CLI - check and evaluate expressions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gridtype::prelude::*;
use gridtype::{registry, value_to_expression, FunctionLookup, RecordedError};
use gridtype_expr::types::Unifier;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridtype")]
#[command(author, version, about = "Check and evaluate unit-aware expressions")]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the type of an expression, or its type errors
    Check {
        /// Expression text
        expression: String,

        /// Check as a table-level expression
        #[arg(long)]
        table_level: bool,
    },

    /// Check and evaluate an expression
    Eval {
        /// Expression text
        expression: String,

        /// Show how the value was computed
        #[arg(short, long)]
        explain: bool,
    },

    /// List the declared units
    Units,

    /// List the standard functions
    Functions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            expression,
            table_level,
        } => check(&expression, table_level),
        Commands::Eval { expression, explain } => eval(&expression, explain),
        Commands::Units => list_units(),
        Commands::Functions => list_functions(),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "gridtype=warn,gridtype_expr=warn",
        1 => "gridtype=debug,gridtype_expr=debug",
        _ => "gridtype=trace,gridtype_expr=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse and check, printing diagnostics on failure
fn check_text(text: &str, options: &CheckOptions) -> Result<(Expression, DataType)> {
    let expr = parse_expression(text).context("Failed to parse expression")?;
    let mut errors = CollectingRecorder::new();
    match check_expression(&expr, &CheckContext::standalone(options), &mut errors) {
        Ok(ty) => {
            let data_type = ty
                .to_data_type()
                .map_err(|e| anyhow::anyhow!("Cannot determine the type of `{}`: {}", expr, e.0))?;
            debug!(%expr, %data_type, "checked");
            Ok((expr, data_type))
        }
        Err(gridtype::CheckError::Reported) => {
            for error in errors.errors() {
                print_error(error);
            }
            bail!("{} type error(s)", errors.errors().len())
        }
        Err(gridtype::CheckError::Internal(e)) => Err(e.into()),
    }
}

fn print_error(error: &RecordedError) {
    eprintln!("error: {}", error);
    for fix in &error.fixes {
        eprintln!("  fix: {} -> {}", fix.title, fix.replacement);
    }
}

fn check(text: &str, table_level: bool) -> Result<()> {
    let options = CheckOptions {
        location: if table_level {
            LocationInfo::TableLevel
        } else {
            LocationInfo::RowLevel
        },
        ..Default::default()
    };
    let (_, data_type) = check_text(text, &options)?;
    println!("{}", data_type);
    Ok(())
}

fn eval(text: &str, explain: bool) -> Result<()> {
    let options = CheckOptions::default();
    let (expr, data_type) = check_text(text, &options)?;

    let ctx = EvaluationContext::standalone(&options.type_catalogue);
    let state = EvaluateState::new(&EvaluationOptions {
        record_explanation: explain,
    });
    let result = match evaluate_expression(&expr, &ctx, state) {
        Ok(result) => result,
        Err(gridtype::EvalError::Failure(failure)) => {
            eprintln!("error: {} (in `{}`)", failure.message, failure.node);
            for (child, value) in &failure.evaluated {
                eprintln!("  {} = {}", child, value);
            }
            bail!("Evaluation failed");
        }
        Err(gridtype::EvalError::Internal(e)) => return Err(e.into()),
    };

    let rendered = value_to_expression(
        result.value(),
        &data_type,
        &options.type_catalogue,
        &options.unit_catalogue,
    )
    .map(|literal| literal.to_string())
    .unwrap_or_else(|| result.value().to_string());
    println!("{} : {}", rendered, data_type);

    if explain {
        let explanation = result.explain().context("Failed to build explanation")?;
        print!("{}", explanation.describe());
    }
    Ok(())
}

fn list_units() -> Result<()> {
    let catalogue = UnitCatalogue::default();
    for unit in catalogue.declarations() {
        if unit.aliases.is_empty() {
            println!("{}\t{}", unit.name, unit.description);
        } else {
            println!(
                "{}\t{} (also: {})",
                unit.name,
                unit.description,
                unit.aliases.join(", ")
            );
        }
    }
    Ok(())
}

fn list_functions() -> Result<()> {
    for definition in registry().definitions() {
        let mut unifier = Unifier::new();
        let signature = definition.instantiate(&mut unifier).function_type();
        println!(
            "{}\t{}\t{}\t{}",
            definition.namespace,
            definition.name,
            unifier.display(&signature),
            definition.description
        );
    }
    Ok(())
}
