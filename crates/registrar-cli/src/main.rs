//! Registrar CLI - access-scoped query template engine

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use registrar_core::access::{AccessAssignment, Partition, Role};
use registrar_core::config::Config;
use registrar_core::delex::{DelexicalizedResult, QueryPlan};
use registrar_core::engine::{PreparedQuery, QueryEngine, QueryRequest};
use tracing::debug;

#[derive(Parser)]
#[command(name = "registrar")]
#[command(author, version, about = "Access-scoped query template engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the data partitions a role may query
    Partitions {
        /// Caller role
        #[arg(short, long)]
        role: String,
        /// Restrict to partitions whose path contains this token (repeatable)
        #[arg(short, long = "assign")]
        assign: Vec<String>,
        /// Data root (defaults to access.data_root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Turn a query and its plan into a reusable template
    Delex {
        /// Natural-language query
        query: String,
        /// Query plan as a JSON object
        #[arg(short, long)]
        plan: Option<String>,
    },

    /// Resolve partitions, delexicalize, and look up a cached plan
    Prepare {
        /// Natural-language query
        query: String,
        /// Caller role
        #[arg(short, long)]
        role: String,
        /// Restrict to partitions whose path contains this token (repeatable)
        #[arg(short, long = "assign")]
        assign: Vec<String>,
        /// Query plan as a JSON object
        #[arg(short, long)]
        plan: Option<String>,
    },

    /// Show the role matrix
    Roles,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registrar=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Partitions { role, assign, root } => {
            cmd_partitions(&role, &assign, root, cli.format, cli.quiet)
        }

        Commands::Delex { query, plan } => cmd_delex(&query, plan.as_deref(), cli.format),

        Commands::Prepare {
            query,
            role,
            assign,
            plan,
        } => cmd_prepare(query, &role, &assign, plan.as_deref(), cli.format, cli.quiet).await,

        Commands::Roles => cmd_roles(cli.format),

        Commands::Config { action } => cmd_config(action, cli.format, cli.quiet),
    }
}

/// Print an error with its code and suggestion when it came from the core
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<registrar_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Suggestion: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

fn load_engine(root: Option<PathBuf>) -> anyhow::Result<QueryEngine> {
    let mut config = Config::load()?;
    if let Some(root) = root {
        config.access.data_root = root;
    }
    debug!(data_root = %config.access.data_root.display(), "Building query engine");
    Ok(QueryEngine::from_config(&config)?)
}

fn parse_plan(raw: Option<&str>) -> anyhow::Result<QueryPlan> {
    match raw {
        Some(raw) => Ok(QueryPlan::from_json_str(raw)?),
        None => Ok(QueryPlan::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_partitions(partitions: &[Partition]) {
    for partition in partitions {
        if partition.is_guest {
            println!("  {} (guest)", partition.relative_path.display());
        } else {
            println!(
                "  {} [{}]",
                partition.relative_path.display(),
                partition.role_folder
            );
        }
    }
}

fn print_delexicalized(result: &DelexicalizedResult) -> anyhow::Result<()> {
    println!("Template: {}", result.template);
    if !result.parameters.is_empty() {
        println!(
            "Parameters: {}",
            serde_json::to_string(&result.parameters)?
        );
    }
    Ok(())
}

fn cmd_partitions(
    role: &str,
    assign: &[String],
    root: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let engine = load_engine(root)?;
    let role = Role::new(role);
    let assignment = AccessAssignment::new(assign);
    let partitions = engine.accessible_partitions(&role, assignment.as_ref())?;

    if format == OutputFormat::Json {
        return print_json(&partitions);
    }

    if quiet {
        for partition in &partitions {
            println!("{}", partition.path.display());
        }
        return Ok(());
    }

    if partitions.is_empty() {
        println!("No partitions accessible to role '{}'.", role);
    } else {
        println!(
            "Partitions accessible to role '{}' ({}):",
            role,
            partitions.len()
        );
        print_partitions(&partitions);
    }
    Ok(())
}

fn cmd_delex(query: &str, plan: Option<&str>, format: OutputFormat) -> anyhow::Result<()> {
    let plan = parse_plan(plan)?;
    let engine = load_engine(None)?;
    let result = engine.delexicalize(query, &plan);

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => print_delexicalized(&result),
    }
}

async fn cmd_prepare(
    query: String,
    role: &str,
    assign: &[String],
    plan: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let plan = parse_plan(plan)?;
    let engine = load_engine(None)?;
    let request = QueryRequest::new(role, query)
        .with_assignment(assign)
        .with_plan(plan);

    let prepared: PreparedQuery = engine.prepare_async(request.clone()).await?;
    let execution_plan = engine.rehydrate(&prepared, &request);

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "partitions": prepared.partitions,
            "delexicalized": prepared.delexicalized,
            "cached": prepared.cached,
            "execution_plan": execution_plan,
        }));
    }

    print_delexicalized(&prepared.delexicalized)?;
    if quiet {
        return Ok(());
    }

    match (&prepared.cached, &execution_plan) {
        (Some(cached), Some(plan)) => {
            println!("Cached plan: {} (hits: {})", cached.plan, cached.hits);
            println!("Execution plan: {}", plan);
        }
        _ => println!("Cached plan: none"),
    }
    println!("Partitions ({}):", prepared.partitions.len());
    print_partitions(&prepared.partitions);
    Ok(())
}

fn cmd_roles(format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let matrix = config.access.role_matrix();

    if format == OutputFormat::Json {
        return print_json(&config.access.roles);
    }

    for (role, excluded) in matrix.iter() {
        if excluded.is_empty() {
            println!("{}: sees all folders", role);
        } else {
            let names: Vec<&str> = excluded.iter().map(Role::as_str).collect();
            println!("{}: excludes {}", role, names.join(", "));
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let path = Config::config_path()?;

    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?.get(&key)?;
            match format {
                OutputFormat::Json => {
                    let mut map = serde_json::Map::new();
                    map.insert(key, serde_json::Value::String(value));
                    print_json(&map)?;
                }
                OutputFormat::Text => println!("{}", value),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            debug!(key = %key, path = %path.display(), "Configuration updated");
            if !quiet {
                println!("Set {} = {} in {}", key, config.get(&key)?, path.display());
            }
        }
        ConfigAction::List => {
            let items = Config::load()?.list()?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = items
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect();
                    print_json(&map)?;
                }
                OutputFormat::Text => {
                    for (key, value) in items {
                        println!("{} = {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Reset => {
            let existed = path.exists();
            Config::reset()?;
            if !quiet {
                if existed {
                    println!("Removed {}; using defaults.", path.display());
                } else {
                    println!("No config file at {}; already using defaults.", path.display());
                }
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_partitions_with_assignments() {
        let cli = Cli::try_parse_from([
            "registrar",
            "partitions",
            "--role",
            "faculty",
            "--assign",
            "bsit",
            "--assign",
            "grades",
            "--format",
            "json",
        ])
        .unwrap();

        assert!(cli.format == OutputFormat::Json);
        match cli.command {
            Commands::Partitions { role, assign, root } => {
                assert_eq!(role, "faculty");
                assert_eq!(assign, vec!["bsit", "grades"]);
                assert!(root.is_none());
            }
            _ => panic!("expected partitions command"),
        }
    }

    #[test]
    fn test_prepare_requires_role() {
        assert!(Cli::try_parse_from(["registrar", "prepare", "List students"]).is_err());
    }

    #[test]
    fn test_parse_plan() {
        assert!(parse_plan(None).unwrap().is_empty());
        let plan = parse_plan(Some(r#"{"program": "Nursing"}"#)).unwrap();
        assert_eq!(plan.get_str("program"), Some("Nursing"));
        assert!(parse_plan(Some("[1, 2]")).is_err());
    }
}
