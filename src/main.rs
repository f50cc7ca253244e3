//! Aura Companion CLI
//!
//! Privacy-first wellbeing companion for delivery riders.

use anyhow::{bail, Context, Result};
use aura_companion::{
    camera::{check_permission, CameraDevice, Facing, ReplayCamera, UnavailableCamera},
    config::{Config, TelemetryConfig},
    core::{
        scan_suggestions, AffectLabel, CaptureSession, CaptureState, StoreOptions, WellbeingStore,
        WellnessField, INJURY_TYPES,
    },
    storage::FileStore,
    telemetry::{LogSink, TelemetryDispatcher},
    transparency::{create_shared_log_with_persistence, SharedTransparencyLog},
    PRIVACY_DECLARATION, VERSION,
};
use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use std::thread;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "gateway")]
use aura_companion::telemetry::{GatewayConfig, GatewaySink};

#[derive(Parser)]
#[command(name = "aura")]
#[command(author = "Aura")]
#[command(version = VERSION)]
#[command(about = "Privacy-first wellbeing companion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record how stressed you feel right now (1 = relaxed, 5 = overwhelmed)
    CheckIn {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        level: u8,
    },

    /// File an incident report
    Incident {
        /// Kind of injury or damage (e.g. "Road rash")
        #[arg(long = "type")]
        injury_type: String,

        /// What happened
        #[arg(long)]
        description: String,
    },

    /// Run a one-shot emotion scan
    Scan {
        /// Binary PPM image to use as the camera frame
        #[arg(long)]
        frame: Option<PathBuf>,

        /// Camera to use (user or environment)
        #[arg(long)]
        facing: Option<Facing>,
    },

    /// Show the weekly wellbeing summary
    Summary,

    /// Show recent check-ins, scans and incidents
    History {
        /// Number of entries per section
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Toggle a daily habit
    Habit { name: String },

    /// Set a daily wellness value (water, sleep, steps, mindful)
    Wellness { field: WellnessField, value: f64 },

    /// Complete onboarding
    Onboard,

    /// Show capture statistics
    Status,

    /// Display privacy declaration
    Privacy,

    /// Delete all wellbeing data
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show configuration
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckIn { level } => with_app(|app| cmd_check_in(app, level)),
        Commands::Incident {
            injury_type,
            description,
        } => with_app(|app| cmd_incident(app, &injury_type, &description)),
        Commands::Scan { frame, facing } => with_app(|app| cmd_scan(app, frame, facing)),
        Commands::Summary => with_app(cmd_summary),
        Commands::History { limit } => with_app(|app| cmd_history(app, limit)),
        Commands::Habit { name } => with_app(|app| cmd_habit(app, &name)),
        Commands::Wellness { field, value } => with_app(|app| cmd_wellness(app, field, value)),
        Commands::Onboard => with_app(cmd_onboard),
        Commands::Status => cmd_status(),
        Commands::Privacy => {
            cmd_privacy();
            Ok(())
        }
        Commands::Reset { yes } => with_app(|app| cmd_reset(app, yes)),
        Commands::Config => cmd_config(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything a data command needs.
struct App {
    config: Config,
    store: WellbeingStore,
    transparency: SharedTransparencyLog,
}

/// Open the store, run `f`, then flush telemetry and transparency stats.
fn with_app(f: impl FnOnce(&App) -> Result<()>) -> Result<()> {
    let config = Config::load().context("could not load configuration")?;
    config
        .ensure_directories()
        .context("could not create data directory")?;

    let options = StoreOptions {
        key: config.store_key.clone(),
        timezone: config.tz()?,
        window_days: config.window_days,
        ..Default::default()
    };
    let transparency = create_shared_log_with_persistence(config.transparency_path());

    let mut store = WellbeingStore::open_with(FileStore::new(&config.data_path), options)
        .with_transparency(transparency.clone());
    if let Some(dispatcher) = build_telemetry(&config.telemetry) {
        store = store.with_telemetry(dispatcher);
    }

    let mut app = App {
        config,
        store,
        transparency,
    };
    let result = f(&app);

    if let Some(dispatcher) = app.store.take_telemetry() {
        dispatcher.shutdown();
    }
    if app.store.save_failures() > 0 {
        eprintln!("Warning: some changes could not be saved to disk");
    }
    if let Err(e) = app.transparency.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }
    result
}

fn build_telemetry(config: &TelemetryConfig) -> Option<TelemetryDispatcher> {
    if !config.enabled {
        return None;
    }

    #[cfg(feature = "gateway")]
    {
        let gateway = GatewayConfig::new(config.host.clone(), config.port, config.token.clone());
        match GatewaySink::new(gateway) {
            Ok(sink) => Some(TelemetryDispatcher::spawn(sink)),
            Err(e) => {
                warn!("Gateway initialization failed, logging telemetry locally: {e}");
                Some(TelemetryDispatcher::spawn(LogSink))
            }
        }
    }

    #[cfg(not(feature = "gateway"))]
    {
        warn!("Telemetry enabled but gateway support is not compiled in, logging locally");
        Some(TelemetryDispatcher::spawn(LogSink))
    }
}

fn cmd_check_in(app: &App, level: u8) -> Result<()> {
    let sample = app.store.append_stress(level)?;
    println!("Check-in recorded: stress {}/5 on {}", sample.level, sample.date);

    let assessment = app.store.assess();
    if assessment.streak > 0 {
        println!("High-stress streak: {}", assessment.streak);
    }
    println!("Risk level: {}", assessment.tier.label());
    Ok(())
}

fn cmd_incident(app: &App, injury_type: &str, description: &str) -> Result<()> {
    let Some(known) = INJURY_TYPES
        .iter()
        .find(|t| t.eq_ignore_ascii_case(injury_type.trim()))
    else {
        bail!(
            "unknown injury type '{injury_type}', expected one of: {}",
            INJURY_TYPES.join(", ")
        );
    };

    let report = app.store.append_incident(description, known)?;
    println!("Incident filed");
    println!("  ID: {}", report.id);
    println!("  Date: {}", report.date);
    println!("  Type: {}", report.injury_type);
    println!("  Status: {}", report.status);
    Ok(())
}

fn cmd_scan(app: &App, frame: Option<PathBuf>, facing: Option<Facing>) -> Result<()> {
    let facing = facing.unwrap_or(app.config.camera_facing);

    match frame {
        Some(path) => {
            let camera = ReplayCamera::from_ppm_file(&path)
                .with_context(|| format!("could not load frame from {path:?}"))?;
            run_scan(app, &camera, facing)
        }
        None => run_scan(app, &UnavailableCamera::new(), facing),
    }
}

enum ScanInput {
    Capture,
    Cancel,
}

fn run_scan<C: CameraDevice>(app: &App, camera: &C, facing: Facing) -> Result<()> {
    let mut session = CaptureSession::new(camera, &app.store, facing)
        .with_transparency(app.transparency.clone());

    if session.start()? == CaptureState::Released {
        println!("Camera unavailable, recorded a neutral scan.");
        print_scan_result(AffectLabel::Neutral);
        return Ok(());
    }

    println!("Camera ready ({facing}).");
    println!("Press Enter to capture, Ctrl+C to cancel.");

    let (tx, rx) = unbounded();
    let cancel_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = cancel_tx.send(ScanInput::Cancel);
    })
    .context("could not install Ctrl+C handler")?;

    thread::spawn(move || {
        let mut line = String::new();
        let input = match std::io::stdin().read_line(&mut line) {
            Ok(n) if n > 0 => ScanInput::Capture,
            _ => ScanInput::Cancel,
        };
        let _ = tx.send(input);
    });

    match rx.recv().unwrap_or(ScanInput::Cancel) {
        ScanInput::Capture => {
            let scan = session.capture()?;
            println!("Scan recorded on {}.", scan.date);
            print_scan_result(scan.result);
        }
        ScanInput::Cancel => {
            session.cancel()?;
            println!("Scan cancelled. Nothing was recorded.");
        }
    }
    Ok(())
}

fn print_scan_result(label: AffectLabel) {
    println!();
    println!("Result: {label}");
    println!("  {}", label.message());

    let suggestions = scan_suggestions(label);
    if !suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in suggestions {
            println!("  - {suggestion}");
        }
    }
}

fn cmd_summary(app: &App) -> Result<()> {
    println!("Weekly Wellbeing Summary");
    println!("========================");
    println!();
    print!("{}", app.store.summary());
    Ok(())
}

fn cmd_history(app: &App, limit: usize) -> Result<()> {
    let recent = app.store.recent_stress();
    println!("Stress check-ins (last {} days):", app.config.window_days);
    if recent.is_empty() {
        println!("  none");
    }
    for sample in recent.iter().rev().take(limit) {
        println!(
            "  {}  {}  level {}",
            sample.date,
            sample.captured_at.format("%H:%M"),
            sample.level
        );
    }
    println!();

    let scans = app.store.recent_scans(limit);
    println!("Emotion scans:");
    if scans.is_empty() {
        println!("  none");
    }
    for scan in scans {
        println!("  {}  {}", scan.date, scan.result);
    }
    println!();

    let incidents = app.store.recent_incidents(limit);
    println!("Incidents:");
    if incidents.is_empty() {
        println!("  none");
    }
    for report in incidents {
        println!(
            "  {}  {}  [{}]  {}",
            report.date, report.injury_type, report.status, report.description
        );
    }
    Ok(())
}

fn cmd_habit(app: &App, name: &str) -> Result<()> {
    let done = app.store.toggle_habit(name)?;
    println!(
        "{}: {}",
        name.trim(),
        if done { "done ✓" } else { "not done" }
    );
    Ok(())
}

fn cmd_wellness(app: &App, field: WellnessField, value: f64) -> Result<()> {
    app.store.update_wellness(field, value)?;
    let metrics = app.store.snapshot().wellness;
    println!("Today's wellness:");
    for each in WellnessField::ALL {
        let marker = if each == field { " (updated)" } else { "" };
        println!("  {}: {}{marker}", each.label(), metrics.get(each));
    }
    Ok(())
}

fn cmd_onboard(app: &App) -> Result<()> {
    if app.store.snapshot().onboarding_complete {
        println!("Onboarding already complete.");
        return Ok(());
    }
    println!("{PRIVACY_DECLARATION}");
    app.store.complete_onboarding();
    println!("Onboarding complete. Start with `aura check-in <level>`.");
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Aura Companion Status");
    println!("=====================");
    println!();
    println!(
        "Built-in camera: {}",
        if check_permission() {
            "Available ✓"
        } else {
            "Not available ✗ (use `aura scan --frame <ppm>`)"
        }
    );
    println!("Data directory: {:?}", config.data_path);
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        let log = create_shared_log_with_persistence(stats_path);
        println!("{}", log.summary());
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}

fn cmd_reset(app: &App, yes: bool) -> Result<()> {
    if !yes {
        bail!("this deletes every check-in, scan and incident; rerun with --yes to confirm");
    }
    app.store.reset();
    app.transparency.reset();
    println!("All wellbeing data and capture statistics deleted.");
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("could not load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
