use clap::Parser;
use radauth::{AuthOrchestrator, AuthOutcome, CancelHandle, Config, UdpTransport};
use std::io::{self, BufRead};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

const EXIT_ACCEPTED: i32 = 0;
const EXIT_REJECTED: i32 = 1;
const EXIT_INDETERMINATE: i32 = 2;
const EXIT_CONFIG: i32 = 3;

/// radauth - authenticate a user against RADIUS servers with failover
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radauth")]
struct Cli {
    /// User to authenticate
    #[arg(value_name = "USERNAME", required_unless_present_any = ["validate", "write_example"])]
    username: Option<String>,

    /// Server list: JSON when the name ends in .json, server blocks otherwise
    #[arg(short, long, value_name = "PATH", default_value = "/etc/radauth.conf")]
    config: String,

    /// Rounds over the server list (overrides the config file)
    #[arg(short, long)]
    retries: Option<u32>,

    /// Password; read from the first line of stdin when omitted
    #[arg(short, long)]
    password: Option<String>,

    /// Give up after this many milliseconds in total
    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Write an example JSON configuration to the config path and exit
    #[arg(long)]
    write_example: bool,

    /// Log filter, e.g. "debug" or "radauth=trace" (default: config file, then "warn")
    #[arg(long)]
    log_level: Option<String>,
}

/// RUST_LOG wins over `level`
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install logging; the returned handle swaps the filter once the config is read
fn init_logging(level: &str) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(log_filter(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    handle
}

fn read_password() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let logging = init_logging(cli.log_level.as_deref().unwrap_or("warn"));

    if cli.write_example {
        if let Err(e) = Config::example().to_file(&cli.config) {
            error!("Error creating example config: {}", e);
            process::exit(EXIT_CONFIG);
        }
        println!("Wrote example configuration to {}", cli.config);
        process::exit(0);
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load {}: {}", cli.config, e);
            process::exit(EXIT_CONFIG);
        }
    };

    if cli.log_level.is_none()
        && let Some(ref level) = config.log_level
        && let Err(e) = logging.reload(log_filter(level))
    {
        warn!("Could not apply log_level '{}': {}", level, e);
    }

    if cli.validate {
        let registry = match radauth::ServerRegistry::load(&config) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(EXIT_CONFIG);
            }
        };
        println!("Configuration validated successfully");
        println!("  Rounds: {}", config.retries);
        println!(
            "  NAS-Identifier: {}",
            config.nas_identifier.as_deref().unwrap_or("(none)")
        );
        println!("  Servers:");
        for server in registry.servers() {
            println!(
                "    {} {}:{} priority={} timeout={}ms method={}",
                server.name,
                server.host,
                server.port,
                server.priority,
                server.timeout.as_millis(),
                server.method
            );
        }
        process::exit(0);
    }

    let Some(username) = cli.username else {
        error!("a username is required");
        process::exit(EXIT_CONFIG);
    };

    let password = match cli.password {
        Some(password) => password,
        None => match read_password() {
            Ok(password) => password,
            Err(e) => {
                error!("Could not read password from stdin: {}", e);
                process::exit(EXIT_CONFIG);
            }
        },
    };

    let cancel = CancelHandle::new();
    if let Some(ms) = cli.deadline_ms {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            debug!(deadline_ms = ms, "deadline reached");
            cancel.cancel();
        });
    }
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let rounds = cli.retries.unwrap_or(config.retries);
    let orchestrator = AuthOrchestrator::new(Arc::new(UdpTransport))
        .with_nas_identifier(config.nas_identifier.clone());

    let outcome = match orchestrator
        .authenticate_until(&username, &password, rounds, &config, &cancel.token())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            process::exit(EXIT_CONFIG);
        }
    };

    if let Some(reply) = outcome.reply() {
        for message in &reply.reply_messages {
            println!("{}", message);
        }
    }
    info!(user = %username, "{}", outcome);

    let code = match outcome {
        AuthOutcome::Accepted(_) => EXIT_ACCEPTED,
        AuthOutcome::Rejected(_) => EXIT_REJECTED,
        AuthOutcome::Indeterminate(_) => EXIT_INDETERMINATE,
    };
    process::exit(code);
}
