mod clock;
mod config;
mod report;
mod schedule;
mod supervisor;
mod timeout;

use clap::Parser;
use config::{ConfigError, WaitConfig};
use report::ConsoleReporter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use supervisor::Supervisor;

/// Exit code for an unusable timeout. Matches clap's usage-error code, which
/// is what a bad `--timeout` on the command line produces.
const EXIT_INVALID_TIMEOUT: u8 = 2;

/// Run a command under a deadline, printing a status line at least once a
/// minute so CI runners don't kill it for being silent.
#[derive(Parser, Debug)]
#[command(name = "travis-wait", version, about)]
pub struct Cli {
    /// Maximum runtime: `<n>s`, `<n>m`, or bare `<n>` minutes [default: 20m]
    #[arg(short, long, value_name = "SPEC", value_parser = timeout::parse_timeout)]
    timeout: Option<Duration>,

    /// Config file path (default: travis-wait.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable colored status lines
    #[arg(long)]
    no_color: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Command to run; tokens are joined with spaces and handed to the shell
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

impl Cli {
    fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "travis_wait=debug"
    } else {
        "travis_wait=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("TRAVIS_WAIT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn config_failure(e: &ConfigError) -> ExitCode {
    eprintln!("travis-wait: {e}");
    match e {
        ConfigError::Timeout { .. } => ExitCode::from(EXIT_INVALID_TIMEOUT),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(?cli, "parsed CLI arguments");

    let cwd = std::env::current_dir().unwrap_or_default();
    let config = match WaitConfig::load(cli.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => return config_failure(&e),
    };

    let timeout = match cli.timeout {
        Some(timeout) => timeout,
        None => match config.timeout() {
            Ok(timeout) => timeout,
            Err(e) => return config_failure(&e),
        },
    };
    let schedule = match config.sleep_schedule() {
        Ok(schedule) => schedule,
        Err(e) => return config_failure(&e),
    };

    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let mut reporter = ConsoleReporter::stdout(color);
    let supervisor = Supervisor::new(config.supervisor.shell, schedule);

    match supervisor
        .run(&cli.command_line(), timeout, &mut reporter)
        .await
    {
        Ok(outcome) => {
            tracing::debug!(code = outcome.code, killed = outcome.killed, "supervision finished");
            u8::try_from(outcome.code)
                .map(ExitCode::from)
                .unwrap_or(ExitCode::FAILURE)
        }
        Err(e) => {
            tracing::error!(error = %e, "supervision failed");
            eprintln!("travis-wait: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_timeout_parsed_by_cli() {
        let cli = Cli::try_parse_from(["travis-wait", "--timeout=5s", "sleep", "3"]).unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cli.command_line(), "sleep 3");
    }

    #[test]
    fn test_timeout_defaults_to_none_for_config_fallback() {
        let cli = Cli::try_parse_from(["travis-wait", "true"]).unwrap();
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn test_short_timeout_flag() {
        let cli = Cli::try_parse_from(["travis-wait", "-t", "2", "true"]).unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_invalid_timeout_is_usage_error() {
        let err = Cli::try_parse_from(["travis-wait", "--timeout=yourmom", "exit", "1"]).unwrap_err();
        assert_eq!(err.exit_code(), i32::from(EXIT_INVALID_TIMEOUT));
    }

    #[test]
    fn test_child_flags_pass_through_verbatim() {
        let cli = Cli::try_parse_from([
            "travis-wait",
            "--timeout=2",
            "echo",
            "--something",
            "more",
            "complicated",
        ])
        .unwrap();
        assert_eq!(cli.command_line(), "echo --something more complicated");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_supervisor_options_after_command_belong_to_child() {
        let cli = Cli::try_parse_from(["travis-wait", "echo", "--timeout=1s", "-v"]).unwrap();
        assert_eq!(cli.timeout, None);
        assert!(!cli.verbose);
        assert_eq!(cli.command_line(), "echo --timeout=1s -v");
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["travis-wait", "--timeout=1m"]).is_err());
    }
}
