//! Firmware Panic Analysis - Main Entry Point

use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use panic_analysis::{
    build,
    config::{Args, LoggingConfig, OutputFormat},
    parse, profile_for,
    symbols::{Addr2Line, ElfImage, SymbolResolver, Toolchain},
    AnalysisError, Config, Result,
};

fn main() -> ExitCode {
    let args = Args::parse();

    if args.generate_config {
        return match Config::default().to_toml() {
            Ok(toml) => {
                println!("{}", toml);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    let mut config = match Config::load(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };
    config.merge_args(&args);

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("*** Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }
    debug!("Command line args: {:?}", args);

    if let Err(e) = config.validate() {
        return fail(&e);
    }

    if args.show_config {
        return match config.to_toml() {
            Ok(toml) => {
                println!("{}", toml);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    match run(&args, &config) {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(degraded)) => {
            warn!("Report produced without source lines: {}", degraded);
            ExitCode::from(degraded.exit_code() as u8)
        }
        Err(e) => fail(&e),
    }
}

fn fail(e: &AnalysisError) -> ExitCode {
    eprintln!("*** [{}] {}", e.stage(), e);
    ExitCode::from(e.exit_code() as u8)
}

/// Parse, resolve and emit one report. A returned error inside `Ok` marks a
/// report that was printed in degraded form.
fn run(args: &Args, config: &Config) -> Result<Option<AnalysisError>> {
    let log_path = args.log.as_ref().ok_or(AnalysisError::LogNotSpecified)?;
    if !log_path.exists() {
        return Err(AnalysisError::LogNotFound(log_path.clone()));
    }
    let raw_log = std::fs::read_to_string(log_path).map_err(|source| AnalysisError::LogUnreadable {
        path: log_path.clone(),
        source,
    })?;

    let profile = profile_for(&config.report.default_cpu)?;
    info!("CPU: {} ({})", config.report.default_cpu, profile);

    let record = parse(&raw_log, profile)?;

    let elf_path = args.elf.clone().or_else(|| config.resolver.default_elf_path());
    let image = match elf_path {
        Some(path) => match ElfImage::load(&path) {
            Ok(image) => {
                info!("ELF: {}", path.display());
                Some(image)
            }
            Err(e) => {
                warn!("{}", e);
                warn!("No ELF file found! Showing raw addresses only");
                None
            }
        },
        None => {
            warn!("No ELF file given and no .defconfig in {}", config.resolver.sdk_root.display());
            None
        }
    };

    let mut degraded = None;
    let resolver: Option<Box<dyn SymbolResolver>> = match image {
        Some(image) => match Toolchain::locate(
            profile.toolchain_prefix(),
            &config.resolver.toolchain_dir(),
            config.resolver.use_path,
        ) {
            Ok(toolchain) => Some(Box::new(Addr2Line::new(
                toolchain,
                image,
                config.resolver.source_root(),
            )) as Box<dyn SymbolResolver>),
            Err(e) => {
                warn!("{}, falling back to the ELF symbol table", e);
                degraded = Some(e);
                Some(Box::new(image) as Box<dyn SymbolResolver>)
            }
        },
        None => None,
    };

    let report = build(&record, profile, resolver.as_deref());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match config.report.format {
        OutputFormat::Text => write!(out, "{}", report)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    Ok(degraded)
}

/// Initialize logging system
fn init_logging(logging: &LoggingConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Configure output destination
    let writer = match &logging.file {
        Some(log_file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_file(false)
        .with_line_number(false);

    if logging.verbose {
        subscriber.with_target(true).init();
    } else {
        subscriber.without_time().with_target(false).init();
    }

    debug!("Logging initialized with level: {}", logging.level);
    Ok(())
}
