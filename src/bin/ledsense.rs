use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use ledsense::analysis::color_report::analyse_table;
use ledsense::analysis::probe::{run_speed_probe, ProbeSettings};
use ledsense::audio::AudioBackend;
use ledsense::calibration::{run_analysis, run_session, session_file_name, LogPrompt};
use ledsense::config::AppConfig;
use ledsense::engine::diagnostics::{run_classification, run_detect, run_dump, run_stable};
use ledsense::engine::{install_interrupt_handler, DetectionPipeline, LightMode, Orchestrator};
use ledsense::error::{ConfigError, SensingError};
use ledsense::sensor::{FixedPattern, SensorHandle, SimulatedRig, SystemTimeSource};
use ledsense::signals::ExitSignal;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ledsense", about = "Color cube detector with audio playback")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write log output to this file
    #[arg(short = 'l', long, global = true)]
    log_file: Option<PathBuf>,

    /// Drive a simulated sensor rig instead of hardware
    #[arg(long, global = true)]
    simulate: bool,

    /// Seed of the simulated rig
    #[arg(long, global = true, default_value_t = 7)]
    seed: u64,

    /// Station pattern as comma separated bits, e.g. 1,1,0 (first configured station if omitted)
    #[arg(long, global = true, value_delimiter = ',')]
    station_pattern: Option<Vec<u8>>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify cubes and play the mapped audio resource
    Run {
        /// Stop after this many cubes
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Classify cubes without audio
    Classify {
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Measure every configured color and write a calibration artifact
    Calibrate {
        /// Samples per color
        #[arg(long, default_value_t = 5)]
        cycles: usize,
        /// Output directory (overrides calibration.output_dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compare calibration artifacts and write the combined result
    CalAnalysis {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print raw RGBC readings
    Dump {
        #[arg(long, value_enum, default_value_t = LightArg::On)]
        light: LightArg,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Analyse the configured color table
    ColorAnalysis,
    /// Measure how fast readings settle after toggling the light
    Probe {
        #[arg(long, default_value_t = 10)]
        series: u32,
        #[arg(long, default_value_t = 20)]
        cycles: u32,
    },
    /// Print stabilized RGB values
    Stable {
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Log cube placement and removal
    Detect {
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Write the default configuration
    SaveDefault { path: PathBuf },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LightArg {
    On,
    Off,
    Toggle,
}

impl From<LightArg> for LightMode {
    fn from(arg: LightArg) -> Self {
        match arg {
            LightArg::On => LightMode::On,
            LightArg::Off => LightMode::Off,
            LightArg::Toggle => LightMode::Toggle,
        }
    }
}

fn init_logging(global: &GlobalArgs) -> Result<()> {
    let level = if global.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let writer = match &global.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(global.log_file.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))
}

fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(&cli.global)?;
    let config = load_config(cli.global.config.as_deref())?;

    match cli.command {
        Commands::SaveDefault { path } => {
            AppConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Default configuration written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ColorAnalysis => {
            println!("{}", analyse_table(&config.colors).render());
            Ok(ExitCode::SUCCESS)
        }
        Commands::CalAnalysis { files, output } => {
            let out_dir = output.unwrap_or_else(|| config.calibration.output_dir.clone());
            let (report, path) =
                run_analysis(&files, &out_dir).context("calibration analysis failed")?;
            println!("{}", report.render());
            println!("Combined calibration written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        command => run_sensing(&cli.global, &config, command),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).with_context(|| match path {
        Some(p) => format!("failed to load configuration {}", p.display()),
        None => "failed to load default configuration".to_string(),
    })?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Modes that need the sensor.
fn run_sensing(global: &GlobalArgs, config: &AppConfig, command: Commands) -> Result<ExitCode> {
    if !global.simulate {
        bail!("no hardware sensor driver is built in; pass --simulate to use the simulated rig");
    }

    let exit = ExitSignal::new();
    install_interrupt_handler(exit.clone()).context("failed to install Ctrl-C handler")?;

    let cubes = config.colors.iter().map(|c| c.rgb).collect();
    let rig = SimulatedRig::new(cubes, global.seed);
    let mut sensor = SensorHandle::new(
        Box::new(rig.source()),
        Box::new(rig.light()),
        Arc::new(SystemTimeSource::default()),
        config.light_holdoff(),
    );
    let mut pattern = FixedPattern(station_pattern(global, config)?);
    let print = |line: String| println!("{}", line);

    let outcome = match command {
        Commands::Run { cycles } => {
            run_playback(config, &mut sensor, &mut pattern, exit, cycles)?;
            Ok(())
        }
        Commands::Classify { cycles } => {
            let mut pipeline = DetectionPipeline::from_config(config, exit);
            run_classification(&mut pipeline, &config.classifier(), &mut sensor, cycles, print)
                .map(|_| ())
        }
        Commands::Calibrate { cycles, output } => {
            let artifact = run_session(config, &mut sensor, &mut pattern, &mut LogPrompt, cycles, exit)
                .context("calibration failed")?;
            let station = artifact.station.unwrap_or_default();
            let dir = output.unwrap_or_else(|| config.calibration.output_dir.clone());
            let path = artifact.write(&dir, &session_file_name(&chrono::Local::now(), station))?;
            println!("Calibration written to {}", path.display());
            Ok(())
        }
        Commands::Dump { light, limit } => {
            run_dump(&mut sensor, light.into(), limit, &exit, print);
            Ok(())
        }
        Commands::Probe { series, cycles } => {
            let settings = ProbeSettings {
                series,
                cycles,
                ..ProbeSettings::default()
            };
            run_speed_probe(&mut sensor, &settings, &exit).map(|summaries| {
                for s in summaries {
                    println!(
                        "Holdoff: {:7.2} ms, count: {:4}, good: {:5.1} %, bad dev: {:6.3}, avg: {:7.2} ms",
                        s.holdoff_ms, s.count, s.good_percent, s.bad_deviation, s.avg_measurement_ms
                    );
                }
            })
        }
        Commands::Stable { limit } => {
            let mut pipeline = DetectionPipeline::from_config(config, exit);
            run_stable(&mut pipeline, &mut sensor, limit, print).map(|_| ())
        }
        Commands::Detect { limit } => {
            let pipeline = DetectionPipeline::from_config(config, exit);
            run_detect(&pipeline, &mut sensor, limit, print).map(|_| ())
        }
        Commands::SaveDefault { .. } | Commands::ColorAnalysis | Commands::CalAnalysis { .. } => {
            Ok(())
        }
    };

    sensor.set_light(false);
    match outcome {
        Ok(()) | Err(SensingError::Cancelled) => Ok(ExitCode::SUCCESS),
        Err(err) => Err(err.into()),
    }
}

fn station_pattern(global: &GlobalArgs, config: &AppConfig) -> Result<Vec<u8>> {
    match (&global.station_pattern, config.stations.first()) {
        (Some(pattern), _) => Ok(pattern.clone()),
        (None, Some(first)) => Ok(first.pattern.clone()),
        (None, None) => Err(ConfigError::Invalid {
            reason: "no stations configured".to_string(),
        }
        .into()),
    }
}

fn run_playback(
    config: &AppConfig,
    sensor: &mut SensorHandle,
    pattern: &mut FixedPattern,
    exit: ExitSignal,
    cycles: Option<u64>,
) -> Result<()> {
    let station = config
        .station_resolver()
        .read_station(pattern)
        .context("failed to resolve station")?;

    let backend = audio_backend();
    let mut orchestrator = Orchestrator::new(config, station, exit);
    let summary = orchestrator
        .run(sensor, backend, cycles)
        .context("playback run failed")?;
    println!(
        "Cycles: {}, matches: {}, rejections: {}, dispatched: {}",
        summary.cycles,
        summary.matches,
        summary.rejections,
        summary.dispatched.len()
    );
    Ok(())
}

#[cfg(feature = "speaker")]
fn audio_backend() -> Box<dyn AudioBackend> {
    Box::new(ledsense::audio::SpeakerBackend::new())
}

#[cfg(not(feature = "speaker"))]
fn audio_backend() -> Box<dyn AudioBackend> {
    Box::new(ledsense::audio::SimulatedPlayer::new(Arc::new(
        SystemTimeSource::default(),
    )))
}
