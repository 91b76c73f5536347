//! `pikvm`: drive a PiKVM-compatible KVM appliance from the shell.
//!
//! # Usage
//!
//! ```text
//! pikvm --host comet.local --password hunter2 info
//! pikvm --config ~/.config/pikvm.toml shortcut ControlLeft AltLeft Delete
//! pikvm mouse click --x 640 --y 360
//! pikvm mouse drag 100 100 400 300 --steps 20
//! pikvm msd upload debian.iso && pikvm msd set-image debian.iso && pikvm msd connect
//! pikvm atx power-long
//! pikvm screenshot shot.jpg
//! ```
//!
//! Commands that return device state print it as pretty JSON on stdout.  Logs
//! go to stderr (`RUST_LOG` or `--verbose`).
//!
//! # Environment variable overrides
//!
//! | Variable           | Flag            |
//! |--------------------|-----------------|
//! | `PIKVM_CONFIG`     | `--config`      |
//! | `PIKVM_HOST`       | `--host`        |
//! | `PIKVM_PORT`       | `--port`        |
//! | `PIKVM_USER`       | `--user`        |
//! | `PIKVM_PASSWORD`   | `--password`    |
//! | `PIKVM_VERIFY_TLS` | `--verify-tls`  |
//!
//! Flags take precedence over the environment, and both take precedence over
//! the config file.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pikvm_client::{AsyncKvmClient, DeviceConfig, DriveMode, MouseButton, Point, Scheme};
use pikvm_core::domain::pacing::{DEFAULT_DRAG_STEPS, DEFAULT_KEYMAP};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "pikvm", about = "Remote control for PiKVM-compatible KVM appliances", version)]
struct Cli {
    /// TOML file with device settings (host, username, password, ...).
    #[arg(long, env = "PIKVM_CONFIG")]
    config: Option<PathBuf>,

    /// Hostname or IP address of the device.
    #[arg(long, env = "PIKVM_HOST")]
    host: Option<String>,

    #[arg(long, env = "PIKVM_PORT")]
    port: Option<u16>,

    #[arg(long, short = 'u', env = "PIKVM_USER")]
    user: Option<String>,

    #[arg(long, env = "PIKVM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Verify the device's TLS certificate (off by default: devices ship
    /// self-signed certificates).
    #[arg(long, env = "PIKVM_VERIFY_TLS")]
    verify_tls: bool,

    /// Use plain http:// and ws:// instead of https:// and wss://.
    #[arg(long)]
    insecure_http: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Device information.
    Info,
    /// Video streamer state.
    Streamer,
    /// Save a JPEG snapshot of the screen.
    Screenshot { output: PathBuf },
    /// Check that the credentials are accepted by the login endpoint.
    Login,
    /// Type text on the target.
    Type {
        text: String,
        #[arg(long, default_value = DEFAULT_KEYMAP)]
        keymap: String,
    },
    /// Single key events.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Press a key combination, e.g. `ControlLeft AltLeft Delete`.
    Shortcut {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    Mouse {
        #[command(subcommand)]
        action: MouseAction,
    },
    /// Virtual media.
    Msd {
        #[command(subcommand)]
        action: MsdAction,
    },
    /// Power and reset buttons.
    Atx {
        #[command(subcommand)]
        action: AtxAction,
    },
}

#[derive(Debug, Subcommand)]
enum KeyAction {
    Press { key: String },
    Hold { key: String },
    Release { key: String },
}

#[derive(Debug, Subcommand)]
enum MouseAction {
    Move {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },
    Click {
        #[arg(long, requires = "y")]
        x: Option<i32>,
        #[arg(long, requires = "x")]
        y: Option<i32>,
        #[arg(long, default_value_t = MouseButton::Left)]
        button: MouseButton,
        /// Click twice (left button only).
        #[arg(long)]
        double: bool,
    },
    Scroll {
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
    Drag {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        #[arg(long, default_value_t = MouseButton::Left)]
        button: MouseButton,
        #[arg(long, default_value_t = DEFAULT_DRAG_STEPS)]
        steps: u32,
    },
    Relative {
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
}

#[derive(Debug, Subcommand)]
enum MsdAction {
    Status,
    /// List stored images.
    List,
    Upload {
        path: PathBuf,
        /// Name on the device; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Let the device download an image itself.
    UploadUrl {
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    SetImage {
        name: String,
        /// Present as a flash drive instead of a CD-ROM.
        #[arg(long)]
        flash: bool,
    },
    Connect,
    Disconnect,
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
enum AtxAction {
    Status,
    Power,
    PowerLong,
    Reset,
}

impl Cli {
    /// Builds the device settings: config file first, then flags and
    /// environment on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or no host is
    /// given anywhere.
    fn device_config(&self) -> anyhow::Result<DeviceConfig> {
        let mut config = match (&self.config, &self.host) {
            (Some(path), _) => DeviceConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            (None, Some(host)) => DeviceConfig::new(host.clone()),
            (None, None) => bail!("no device given: pass --host or --config"),
        };

        if let (Some(_), Some(host)) = (&self.config, &self.host) {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(user) = &self.user {
            config.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if self.verify_tls {
            config.verify_tls = true;
        }
        if self.insecure_http {
            config.scheme = Scheme::Http;
        }

        Ok(config)
    }
}

// ── Command execution ─────────────────────────────────────────────────────────

/// Runs one command; returns the JSON to print, if any.
async fn execute(kvm: &AsyncKvmClient, command: Command) -> pikvm_client::Result<Option<Value>> {
    debug!(?command, "executing");
    let output = match command {
        Command::Info => Some(kvm.info().await?),
        Command::Streamer => Some(kvm.streamer_info().await?),
        Command::Screenshot { output } => {
            let jpeg = kvm.screenshot(Some(&output)).await?;
            Some(json!({ "path": output.display().to_string(), "bytes": jpeg.len() }))
        }
        Command::Login => {
            kvm.token().await?;
            None
        }
        Command::Type { text, keymap } => {
            kvm.keyboard().type_text(&text, &keymap).await?;
            None
        }
        Command::Key { action } => {
            let keyboard = kvm.keyboard();
            match action {
                KeyAction::Press { key } => keyboard.press(&key).await?,
                KeyAction::Hold { key } => keyboard.hold(&key).await?,
                KeyAction::Release { key } => keyboard.release(&key).await?,
            }
            None
        }
        Command::Shortcut { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            kvm.keyboard().shortcut(&keys).await?;
            None
        }
        Command::Mouse { action } => {
            let mouse = kvm.mouse();
            match action {
                MouseAction::Move { x, y } => mouse.move_to(x, y).await?,
                MouseAction::Click { x, y, button, double } => {
                    let at = x.zip(y).map(|(x, y)| Point::new(x, y));
                    if double {
                        mouse.double_click(at).await?;
                    } else {
                        mouse.click(at, button).await?;
                    }
                }
                MouseAction::Scroll { dx, dy } => mouse.scroll(dx, dy).await?,
                MouseAction::Drag {
                    x1,
                    y1,
                    x2,
                    y2,
                    button,
                    steps,
                } => {
                    mouse
                        .drag(Point::new(x1, y1), Point::new(x2, y2), button, steps)
                        .await?
                }
                MouseAction::Relative { dx, dy } => mouse.relative_move(dx, dy).await?,
            }
            None
        }
        Command::Msd { action } => {
            let msd = kvm.msd();
            Some(match action {
                MsdAction::Status => msd.status().await?,
                MsdAction::List => msd.list_images().await?,
                MsdAction::Upload { path, name } => msd.upload(&path, name.as_deref()).await?,
                MsdAction::UploadUrl { url, name } => msd.upload_url(&url, name.as_deref()).await?,
                MsdAction::SetImage { name, flash } => {
                    let mode = if flash { DriveMode::Flash } else { DriveMode::Cdrom };
                    msd.set_image(&name, mode).await?
                }
                MsdAction::Connect => msd.connect().await?,
                MsdAction::Disconnect => msd.disconnect().await?,
                MsdAction::Remove { name } => msd.remove_image(&name).await?,
            })
        }
        Command::Atx { action } => {
            let atx = kvm.atx();
            Some(match action {
                AtxAction::Status => atx.status().await?,
                AtxAction::Power => atx.power().await?,
                AtxAction::PowerLong => atx.power_long().await?,
                AtxAction::Reset => atx.reset().await?,
            })
        }
    };
    Ok(output)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.device_config()?;
    let host = config.host.clone();
    let command = cli.command;

    let output = AsyncKvmClient::scoped(config, |kvm| async move { execute(&kvm, command).await })
        .await
        .with_context(|| format!("command against {host} failed"))?;

    if let Some(value) = output {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
