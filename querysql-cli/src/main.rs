//! `querysql-cli` - compile a query-builder filter tree into SQL.
//!
//! ```text
//! echo '{"field":"a","type":"less","filter":1}' | querysql-cli --dialect mysql
//! a < ?
//! -- values: [1]
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use querysql::{CompiledFilter, ConfigFile, FilterNode, MySql, Postgres, SqlConfig, compile};
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DialectKind {
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "querysql-cli", version, about = "Compile filter trees into parameterized SQL")]
struct Cli {
    /// Filter tree as JSON; reads stdin when omitted or `-`
    input: Option<PathBuf>,

    /// Target SQL dialect
    #[arg(short, long, value_enum, default_value_t = DialectKind::Postgres)]
    dialect: DialectKind,

    /// TOML file with whitelist and aliases
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log compilation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let filter = read_input(cli.input.as_deref())?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SqlConfig::default(),
    };

    let compiled = run(&filter, &config, cli.dialect)?;
    println!("{}", render(&compiled, cli.format)?);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read filter from {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read filter from stdin")?;
            Ok(buf)
        },
    }
}

fn load_config(path: &Path) -> Result<SqlConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let file = parse_config(&text).with_context(|| format!("invalid config {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(file.into_config())
}

fn parse_config(text: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(text)?)
}

fn run(filter: &str, config: &SqlConfig, dialect: DialectKind) -> Result<CompiledFilter> {
    let node = FilterNode::from_json(filter).context("failed to decode filter tree")?;
    let compiled = match dialect {
        DialectKind::Postgres => compile(&node, config, &mut Postgres::new()),
        DialectKind::Mysql => compile(&node, config, &mut MySql),
    }
    .context("failed to compile filter tree")?;
    Ok(compiled)
}

fn render(compiled: &CompiledFilter, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(compiled)?),
        OutputFormat::Text => {
            let values = serde_json::to_string(&compiled.values)?;
            Ok(format!("{}\n-- values: {values}", compiled.sql))
        },
    }
}
