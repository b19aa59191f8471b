// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug};
use std::io::Write;
use std::path::PathBuf;

use danmu2ass::app_config::{self, Config, Preset};
use danmu2ass::app_controller::{ConvertRequest, Controller};

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// CLI Wrapper for Preset to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPreset {
    #[value(name = "720p")]
    P720,
    #[value(name = "1080p")]
    P1080,
    #[value(name = "2k")]
    K2,
    #[value(name = "4k")]
    K4,
    #[value(name = "8k")]
    K8,
}

impl From<CliPreset> for Preset {
    fn from(cli_preset: CliPreset) -> Self {
        match cli_preset {
            CliPreset::P720 => Preset::P720,
            CliPreset::P1080 => Preset::P1080,
            CliPreset::K2 => Preset::K2,
            CliPreset::K4 => Preset::K4,
            CliPreset::K8 => Preset::K8,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for danmu2ass
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// danmu2ass - Bahamut anime danmaku to ASS converter
///
/// Downloads the danmaku of an anime episode and writes them as an ASS
/// subtitle file, optionally merged into an existing subtitle.
#[derive(Parser, Debug)]
#[command(name = "danmu2ass")]
#[command(version)]
#[command(about = "Convert Bahamut anime danmaku into ASS subtitles")]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
#[command(long_about = "danmu2ass fetches the danmaku of an anime episode and converts them into an ASS subtitle file.

EXAMPLES:
    danmu2ass 12345                                   # Fetch video 12345 into danmaku.ass
    danmu2ass 'https://ani.gamer.com.tw/animeVideo.php?sn=12345'
    danmu2ass 12345 -o ep1.ass -t -90                 # Shift every danmaku 90s earlier
    danmu2ass 12345 --preset 4k                       # Font size and resolution for 4K
    danmu2ass 12345 --merge ep1.zh.ass -o ep1.ass     # Add danmaku to an existing subtitle
    danmu2ass --input-json danmu.json -o ep1.ass      # Convert a saved API response
    danmu2ass completions bash > danmu2ass.bash       # Generate bash completions

CONFIGURATION:
    Settings are read from config.json by default; a missing default file means
    built-in defaults. The file holds `default_settings` and named `presets`.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Video serial number or anime page URL
    #[arg(value_name = "REFERENCE", required_unless_present = "input_json")]
    reference: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "danmaku.ass")]
    output: PathBuf,

    /// Seconds added to every danmaku, negative to shift earlier
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    time_offset: f64,

    /// Font size and resolution preset
    #[arg(long, value_enum)]
    preset: Option<CliPreset>,

    /// Configuration file path [default: config.json]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Existing ASS file to merge the danmaku into
    #[arg(long, value_name = "ASS_FILE")]
    merge: Option<PathBuf>,

    /// Convert a saved danmu API response instead of fetching
    #[arg(long, value_name = "JSON_FILE")]
    input_json: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Filtering happens through max_level so it can change after init
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Short tag for log level
    fn tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::tag_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config file has been read
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "danmu2ass", &mut std::io::stdout());
        return Ok(());
    }

    run_convert(cli).await
}

async fn run_convert(options: CommandLineOptions) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    // The default path may be absent; a path given on the command line may not
    let config_path = options.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path, options.config.is_some())
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;

    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    let settings = config
        .settings(options.preset.map(Preset::from))
        .context("Configuration validation failed")?;
    debug!("Resolved settings: {:?}", settings);

    let controller = Controller::with_settings(settings)?;
    let request = ConvertRequest {
        reference: options.reference,
        output: options.output,
        time_offset: options.time_offset,
        merge: options.merge,
        input_json: options.input_json,
    };

    controller.run(&request).await?;
    Ok(())
}
