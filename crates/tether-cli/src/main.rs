//! tether CLI
//!
//! Connects to a remote host, runs commands one after another on the same
//! connection, and reports each result.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_core::{AsyncClient, SyncClient};
use tether_exec::{ExecError, ExecOutput};

mod config;
mod report;

use config::{Config, LogConfig};
use report::OutputFormat;

#[derive(Parser)]
#[command(name = "tether", version)]
#[command(about = "Run commands on a remote host over SSH", long_about = None)]
struct Cli {
    /// Config file (defaults to TETHER_CONFIG, ./tether.toml, /etc/tether/tether.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, run each command in order, then close
    Exec(ExecArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct ExecArgs {
    /// Remote host
    #[arg(long)]
    host: String,

    /// Remote port
    #[arg(short, long, default_value_t = 22)]
    port: u16,

    /// Login user
    #[arg(short, long, default_value = "root")]
    user: String,

    /// Login password
    #[arg(long, env = "TETHER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Connect timeout in seconds, 0 to wait indefinitely
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Per-command timeout in seconds, 0 or less to wait indefinitely
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    timeout: i64,

    /// Run calls through the non-blocking client
    #[arg(long = "async")]
    use_async: bool,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Commands to run
    #[arg(required = true)]
    commands: Vec<String>,
}

/// Everything one `exec` invocation produced
struct Run {
    connect: Result<(), ExecError>,
    outputs: Vec<(String, ExecOutput)>,
}

fn init_logging(log: &LogConfig, level_override: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_override.unwrap_or(log.level.as_str())));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn run_blocking(config: &Config, args: &ExecArgs) -> Result<Run> {
    let client = SyncClient::new(&config.client)?;
    if let Some(seconds) = args.connect_timeout {
        client.set_timeout(seconds);
    }

    let connect = client.connect(&args.host, args.port, &args.user, &args.password);
    let mut outputs = Vec::new();
    if connect.is_ok() {
        for command in &args.commands {
            outputs.push((command.clone(), client.exec(command, args.timeout)));
        }
    }
    client.close();

    Ok(Run { connect, outputs })
}

async fn run_async(config: &Config, args: &ExecArgs) -> Run {
    let client = AsyncClient::new(&config.client);
    if let Some(seconds) = args.connect_timeout {
        client.set_timeout(seconds).await;
    }

    let connect = client
        .connect(&args.host, args.port, &args.user, &args.password)
        .await;
    let mut outputs = Vec::new();
    if connect.is_ok() {
        for command in &args.commands {
            let output = client.exec(command, args.timeout).await;
            outputs.push((command.clone(), output));
        }
    }
    client.close().await;

    Run { connect, outputs }
}

fn exec(config: &Config, args: &ExecArgs) -> Result<ExitCode> {
    info!(
        host = %args.host,
        port = args.port,
        user = %args.user,
        commands = args.commands.len(),
        nonblocking = args.use_async,
        "running commands"
    );

    let run = if args.use_async {
        tokio::runtime::Runtime::new()?.block_on(run_async(config, args))
    } else {
        run_blocking(config, args)?
    };

    if let Err(e) = &run.connect {
        eprintln!("tether: {}:{}: {e}", args.host, args.port);
        return Ok(ExitCode::FAILURE);
    }

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let mut failed = false;
    for (command, output) in &run.outputs {
        report::write_output(args.format, command, output, &mut stdout, &mut stderr)?;
        failed |= !output.success();
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    init_logging(&config.log, cli.log_level.as_deref());

    match &cli.command {
        Commands::Exec(args) => exec(&config, args),
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec() {
        let cli = Cli::try_parse_from([
            "tether",
            "exec",
            "--host",
            "10.0.0.2",
            "--password",
            "secret",
            "--timeout",
            "-1",
            "--async",
            "uname -a",
            "uptime",
        ])
        .unwrap();

        let Commands::Exec(args) = cli.command else {
            panic!("expected exec subcommand");
        };
        assert_eq!(args.port, 22);
        assert_eq!(args.user, "root");
        assert_eq!(args.timeout, -1);
        assert!(args.use_async);
        assert_eq!(args.commands, vec!["uname -a", "uptime"]);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn test_exec_requires_a_command() {
        let result = Cli::try_parse_from([
            "tether",
            "exec",
            "--host",
            "10.0.0.2",
            "--password",
            "secret",
        ]);
        assert!(result.is_err());
    }
}
