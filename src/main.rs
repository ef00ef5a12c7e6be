//! packetcmd - Serial Command Dispatch and Packet Queueing
//!
//! This is the main entry point for the packetcmd device loop.
//! It opens the transport, builds the device, and answers commands until the
//! stream ends or Ctrl+C is pressed.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use packetcmd::commands::{Device, DeviceConfig, DEFAULT_MAX_COMMANDS};
use packetcmd::connection::{handle_session, SessionStats};
use packetcmd::protocol::{
    FramingConfig, FramingMode, DEFAULT_FRAME_SIZE, DEFAULT_INPUT_BUFFER_SIZE,
};
use packetcmd::queue::DEFAULT_QUEUE_CAPACITY;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Device configuration
#[derive(Parser, Debug)]
#[command(name = "packetcmd")]
#[command(author, version, about, long_about = None)]
struct Config {
    /// Serial device node to open read/write (e.g. /dev/ttyACM0)
    #[arg(short = 'd', long = "device", value_name = "PATH", conflicts_with = "listen")]
    device: Option<PathBuf>,

    /// Address to accept stream clients on when no device is given
    #[arg(
        short = 'l',
        long = "listen",
        value_name = "ADDR",
        default_value = packetcmd::DEFAULT_LISTEN_ADDR
    )]
    listen: String,

    /// Framing used on the stream
    #[arg(long = "framing", value_enum, default_value = "ascii")]
    framing: Framing,

    /// Binary frame length in bytes, type id included
    #[arg(long = "frame-size", value_name = "BYTES", default_value_t = DEFAULT_FRAME_SIZE)]
    frame_size: usize,

    /// Packet queue slots
    #[arg(long = "queue-capacity", value_name = "NUM", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Dispatch table slots
    #[arg(long = "max-commands", value_name = "NUM", default_value_t = DEFAULT_MAX_COMMANDS)]
    max_commands: usize,

    /// Largest amount of unframed input held before an overrun
    #[arg(long = "input-buffer", value_name = "BYTES", default_value_t = DEFAULT_INPUT_BUFFER_SIZE)]
    input_buffer: usize,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    /// Newline-terminated command lines
    Ascii,
    /// Fixed-length binary frames
    Binary,
}

impl Config {
    fn framing_config(&self) -> FramingConfig {
        let mode = match self.framing {
            Framing::Ascii => FramingMode::Ascii,
            Framing::Binary => FramingMode::Binary {
                frame_size: self.frame_size,
            },
        };
        FramingConfig {
            mode,
            input_buffer_size: self.input_buffer,
        }
    }

    fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            queue_capacity: self.queue_capacity,
            max_commands: self.max_commands,
        }
    }

    /// Human-readable transport description
    fn transport(&self) -> String {
        match &self.device {
            Some(path) => format!("device {}", path.display()),
            None => format!("listener {}", self.listen),
        }
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn print_banner(config: &Config) {
    println!(
        r#"
packetcmd v{} - Serial Command Dispatch and Packet Queueing
──────────────────────────────────────────────────────────────
Transport:  {}
Framing:    {:?}
Queue:      {} slots
Commands:   {} slots

Use Ctrl+C to shutdown.
"#,
        packetcmd::VERSION,
        config.transport(),
        config.framing_config().mode,
        config.queue_capacity,
        config.max_commands,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let framing = config.framing_config();
    framing.validate().with_context(|| {
        format!(
            "--frame-size {} must be between 1 and --input-buffer {}",
            config.frame_size, config.input_buffer
        )
    })?;

    init_logging(&config.log_level);
    print_banner(&config);

    let mut device = Device::new(config.device_config());
    let stats = Arc::new(SessionStats::new());

    tokio::select! {
        result = serve(&config, &mut device, framing, Arc::clone(&stats)) => result?,
        result = signal::ctrl_c() => {
            result.context("failed to install Ctrl+C handler")?;
            info!("Shutdown signal received, stopping");
        }
    }

    info!(
        sessions = stats.sessions_opened.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        framing_errors = stats.framing_errors.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        "shutdown complete"
    );
    Ok(())
}

/// Runs sessions on the configured transport.
///
/// A device node gets one session that lasts until the node reports end of
/// stream. The listener serves clients one at a time against the same
/// device state.
async fn serve(
    config: &Config,
    device: &mut Device,
    framing: FramingConfig,
    stats: Arc<SessionStats>,
) -> anyhow::Result<()> {
    if let Some(path) = &config.device {
        let node = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open device {}", path.display()))?;
        info!(device = %path.display(), "device node opened");

        handle_session(node, path.display().to_string(), device, framing, stats).await?;
        return Ok(());
    }

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "listening");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let result =
                    handle_session(stream, addr.to_string(), device, framing, Arc::clone(&stats))
                        .await;
                if let Err(e) = result {
                    warn!(peer = %addr, error = %e, "session ended with error");
                }
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}
