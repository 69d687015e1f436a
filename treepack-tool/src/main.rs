use anyhow::{Context, bail};
use clap::Parser;
use std::{collections::HashMap, env, fs};
use tracing_subscriber::{EnvFilter, fmt};
use treepack_lib::Config;

mod fs_utils;
mod naming;
mod process;
mod sink;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pack a directory tree into a reproducible ZIP archive",
    long_about = None
)]
pub struct Cli {
    /// Root directory the listed paths are relative to
    #[arg()]
    pub base_path: Option<String>,

    /// Subdirectory of the base path to pack (default: everything)
    #[arg(short, long)]
    pub target_dir: Option<String>,

    /// Output file, directory or http(s) URL (can be defined via config/env)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Pack exactly these relative paths instead of walking the tree
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Glob patterns to skip (can be specified multiple times)
    #[arg(short, long)]
    pub skip: Vec<String>,

    /// Dry run (just list entries and parameters)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Print the entry list and exit
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub list: bool,

    /// Max total size of packed files, e.g. 512Mi or 1GB (0 = unlimited)
    #[arg(short, long)]
    pub max_size: Option<String>,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = run(cli) {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Step 1: Read environment
    let env_config = read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = read_config_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = merge_configs(env_config, file_config, cli_to_config(&cli));

    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    if merged.base_path.as_deref().unwrap_or("").is_empty() {
        bail!("base path (argument, config:base_path or TREEPACK_BASE_PATH) is required");
    }
    if !merged.list.unwrap_or(false) && merged.output.as_deref().unwrap_or("").is_empty() {
        bail!("output (--output, config:output or TREEPACK_OUTPUT) is required");
    }

    process::run(&merged)
}

/// Reads environment variables prefixed with TREEPACK_
fn read_env() -> Config {
    let vars: HashMap<String, String> = env::vars().collect();
    config_from_vars(&vars)
}

fn config_from_vars(vars: &HashMap<String, String>) -> Config {
    let mut cfg = Config::default();

    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("TREEPACK_{}", $key)).cloned()
        };
    }

    let flag = |v: String| v == "true" || v == "1" || v.eq_ignore_ascii_case("yes");
    let split_list = |v: String| -> Vec<String> {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };

    cfg.output = get_env!("OUTPUT");
    cfg.config = get_env!("CONFIG");
    cfg.base_path = get_env!("BASE_PATH");
    cfg.target_dir = get_env!("TARGET_DIR");
    cfg.max_size = get_env!("MAX_SIZE");
    cfg.dry = get_env!("DRY").map(flag);
    cfg.list = get_env!("LIST").map(flag);
    cfg.include = get_env!("INCLUDE").map(split_list);
    cfg.skip = get_env!("SKIP").map(split_list);
    cfg
}

/// Reads YAML or JSON config from file
fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
    let cfg = if path.to_lowercase().ends_with(".json") {
        serde_json::from_str(&content).with_context(|| format!("parsing JSON config {path}"))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parsing YAML config {path}"))?
    };
    Ok(cfg)
}

/// Converts CLI struct into Config. Unset flags stay `None` so lower layers apply.
fn cli_to_config(cli: &Cli) -> Config {
    let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());

    Config {
        output: cli.output.clone(),
        config: cli.config.clone(),
        base_path: cli.base_path.clone(),
        target_dir: cli.target_dir.clone(),
        include: non_empty(&cli.include),
        skip: non_empty(&cli.skip),
        dry: cli.dry.then_some(true),
        list: cli.list.then_some(true),
        max_size: cli.max_size.clone(),
    }
}

/// Merge configs by priority: env < file < cli
fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        output: pick(env.output, file.output, cli.output),
        config: pick(env.config, file.config, cli.config),
        base_path: pick(env.base_path, file.base_path, cli.base_path),
        target_dir: pick(env.target_dir, file.target_dir, cli.target_dir),
        include: pick(env.include, file.include, cli.include),
        skip: pick(env.skip, file.skip, cli.skip),
        dry: pick(env.dry, file.dry, cli.dry),
        list: pick(env.list, file.list, cli.list),
        max_size: pick(env.max_size, file.max_size, cli.max_size),
    }
}
