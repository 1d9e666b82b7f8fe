//! `quadlink` – command-line remote control for the robot.
//!
//! Every command subcommand opens a session (heartbeat running), sends its
//! command, keeps the heartbeat up for `--settle-ms`, then shuts the session
//! down.  `listen` prints telemetry until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! quadlink [OPTIONS] <COMMAND>
//!
//! Commands:
//!   stand | lie-down | estop
//!   gait <walk|trot>
//!   height <low|medium|high>
//!   mode <manual|navigation|assistant>
//!   power <DEVICE> <on|off>
//!   power-status
//!   charge <start|stop>
//!   drive --left-x N --left-y N --right-x N --right-y N --duration-ms MS
//!   legacy-axis <left-x|left-y|right-x> --value N --duration-ms MS
//!   listen [--json]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Description                          |
//! |-----------------------|--------------------------------------|
//! | `QUADLINK_CONFIG`     | Path of the TOML config file         |
//! | `QUADLINK_ROBOT_ADDR` | Robot command address                |
//! | `RUST_LOG`            | Log filter, wins over `log_level`    |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use quadlink_core::protocol::{Gait, HeightTier, LegacyAxis, MotionMode, PowerDevice};
use quadlink_core::AxisVector;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quadlink_controller::application::{FrameSink, Session};
use quadlink_controller::config::{load_config, ControllerConfig};
use quadlink_controller::infrastructure::{CommandChannel, TelemetryEvent, TelemetryReceiver};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "quadlink", about = "UDP remote control for a legged robot", version)]
struct Cli {
    /// TOML config file.  Missing files fall back to built-in defaults.
    #[arg(long, default_value = "quadlink.toml", env = "QUADLINK_CONFIG")]
    config: PathBuf,

    /// Robot command address, overriding `link.robot_addr`.
    #[arg(long, env = "QUADLINK_ROBOT_ADDR")]
    robot_addr: Option<SocketAddr>,

    /// Telemetry listen address, overriding `link.telemetry_bind_addr`.
    #[arg(long)]
    telemetry_addr: Option<SocketAddr>,

    /// How long to keep the heartbeat running after the command.
    #[arg(long, global = true, default_value_t = 500)]
    settle_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stand up.
    Stand,
    /// Lie down.
    LieDown,
    /// Emergency stop.
    Estop,
    /// Select the gait.
    Gait { gait: GaitArg },
    /// Select the body height.
    Height { tier: HeightArg },
    /// Select the motion mode.
    Mode { mode: ModeArg },
    /// Switch a power rail.
    Power { device: DeviceArg, switch: SwitchArg },
    /// Ask the robot to report its power rail state.
    PowerStatus,
    /// Start or stop autonomous charging.
    Charge { action: ChargeArg },
    /// Stream a stick position, then stop.
    Drive {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        left_x: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        left_y: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        right_x: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        right_y: i32,
        #[arg(long)]
        duration_ms: u64,
    },
    /// Hold one stick axis with the older per-axis commands, then recentre.
    LegacyAxis {
        axis: AxisArg,
        #[arg(long, allow_negative_numbers = true)]
        value: i32,
        #[arg(long)]
        duration_ms: u64,
    },
    /// Print telemetry until Ctrl+C.
    Listen {
        /// One JSON object per line instead of debug output.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GaitArg {
    Walk,
    Trot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeightArg {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Manual,
    Navigation,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceArg {
    DriveMotor,
    LidarFrontUpper,
    LidarFrontLower,
    LidarBackUpper,
    LidarBackLower,
    Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SwitchArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChargeArg {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AxisArg {
    LeftX,
    LeftY,
    RightX,
}

impl From<GaitArg> for Gait {
    fn from(arg: GaitArg) -> Self {
        match arg {
            GaitArg::Walk => Gait::Walk,
            GaitArg::Trot => Gait::Trot,
        }
    }
}

impl From<HeightArg> for HeightTier {
    fn from(arg: HeightArg) -> Self {
        match arg {
            HeightArg::Low => HeightTier::Low,
            HeightArg::Medium => HeightTier::Medium,
            HeightArg::High => HeightTier::High,
        }
    }
}

impl From<ModeArg> for MotionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Manual => MotionMode::Manual,
            ModeArg::Navigation => MotionMode::Navigation,
            ModeArg::Assistant => MotionMode::Assistant,
        }
    }
}

impl From<DeviceArg> for PowerDevice {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::DriveMotor => PowerDevice::DriveMotor,
            DeviceArg::LidarFrontUpper => PowerDevice::LidarFrontUpper,
            DeviceArg::LidarFrontLower => PowerDevice::LidarFrontLower,
            DeviceArg::LidarBackUpper => PowerDevice::LidarBackUpper,
            DeviceArg::LidarBackLower => PowerDevice::LidarBackLower,
            DeviceArg::Payload => PowerDevice::Payload,
        }
    }
}

impl From<AxisArg> for LegacyAxis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::LeftX => LegacyAxis::LeftX,
            AxisArg::LeftY => LegacyAxis::LeftY,
            AxisArg::RightX => LegacyAxis::RightX,
        }
    }
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<ControllerConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;
        if let Some(addr) = self.robot_addr {
            config.link.robot_addr = addr;
        }
        if let Some(addr) = self.telemetry_addr {
            config.link.telemetry_bind_addr = addr;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .init();

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                on_signal.cancel();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    match cli.command {
        Command::Listen { json } => listen(&config, json, shutdown).await,
        command => {
            run_command(
                command,
                &config,
                Duration::from_millis(cli.settle_ms),
                shutdown,
            )
            .await
        }
    }
}

/// Opens a session, issues `command`, lets the heartbeat run for `settle`,
/// then shuts down.
async fn run_command(
    command: Command,
    config: &ControllerConfig,
    settle: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let channel = CommandChannel::open(config.link.command_bind_addr, config.link.robot_addr)
        .await
        .context("opening command channel")?;
    let sink: Arc<dyn FrameSink> = Arc::new(channel);

    let session = Session::start(sink, config.timing.session_options()).await;
    let session_token = session.cancellation_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        session_token.cancel();
    });

    let robot = session.robot();
    let outcome = match command {
        Command::Stand => robot.stand_up().await,
        Command::LieDown => robot.lie_down().await,
        Command::Estop => robot.emergency_stop().await,
        Command::Gait { gait } => robot.set_gait(gait.into()).await,
        Command::Height { tier } => robot.set_height(tier.into()).await,
        Command::Mode { mode } => robot.set_motion_mode(mode.into()).await,
        Command::Power { device, switch } => {
            robot.set_power(device.into(), switch == SwitchArg::On).await
        }
        Command::PowerStatus => robot.query_power_status().await,
        Command::Charge { action } => match action {
            ChargeArg::Start => robot.start_auto_charge().await,
            ChargeArg::Stop => robot.stop_auto_charge().await,
        },
        Command::Drive {
            left_x,
            left_y,
            right_x,
            right_y,
            duration_ms,
        } => {
            let axis = AxisVector::from_signed(left_x, left_y, right_x, right_y);
            let report = session
                .drive(axis, Duration::from_millis(duration_ms))
                .await;
            info!(
                frames = report.frames_sent,
                failures = report.send_failures,
                cancelled = report.cancelled,
                stop_sent = report.stop_sent,
                "drive finished"
            );
            Ok(())
        }
        Command::LegacyAxis {
            axis,
            value,
            duration_ms,
        } => {
            let report = session
                .hold_legacy_axis(axis.into(), value, Duration::from_millis(duration_ms))
                .await;
            if !report.stop_sent {
                warn!("recentring command was not delivered");
            }
            Ok(())
        }
        Command::Listen { .. } => unreachable!("listen is dispatched before a session opens"),
    };

    if outcome.is_ok() {
        session.idle(settle).await;
    }
    session.shutdown().await;
    outcome.context("sending command")
}

/// Prints telemetry events until Ctrl+C.
async fn listen(
    config: &ControllerConfig,
    json: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let receiver = TelemetryReceiver::bind(config.link.telemetry_bind_addr)
        .await
        .context("binding telemetry socket")?;
    let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(256);
    let handle = receiver.spawn(tx, shutdown.child_token());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) if json => {
                    println!("{}", serde_json::to_string(&event).context("encoding event")?);
                }
                Some(event) => println!("{event:?}"),
                None => break,
            },
        }
    }

    let summary = handle.stop().await;
    info!(
        total = summary.total_packets,
        battery = summary.battery,
        imu = summary.imu,
        joints = summary.joints,
        unknown = summary.unknown,
        decode_errors = summary.decode_errors,
        short = summary.short_datagrams,
        dropped = summary.events_dropped,
        "listen finished"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
