//! Configuration management for the panic analyzer

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::arch::{profile_for, DEFAULT_ARCHITECTURE};
use crate::error::{AnalysisError, Result};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "panic-analysis")]
#[command(about = "Analyze a firmware panic log against its ELF image")]
#[command(version)]
pub struct Args {
    /// The name of the CPU IP (RISC-V, C906, E906, E907, CK802, ...)
    #[arg(short, long)]
    pub cpu: Option<String>,

    /// The firmware ELF file (default: derived from <sdk-root>/.defconfig)
    #[arg(short, long)]
    pub elf: Option<PathBuf>,

    /// The panic log file
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Verbose diagnostics (timestamps, debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Report output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SDK root directory; stripped from source paths in the report
    #[arg(long, env = "PANIC_ANALYSIS_SDK_ROOT")]
    pub sdk_root: Option<PathBuf>,

    /// Directory holding <prefix>-addr2line (default: <sdk-root>/toolchain/bin)
    #[arg(long)]
    pub toolchain_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Generate default configuration file
    #[arg(long)]
    pub generate_config: bool,

    /// Show current configuration and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| AnalysisError::InvalidConfig(format!("Failed to read config file: {}", e)))?;
            let config = Self::from_toml(&content)?;
            config.validate()?;
            // A bad `-c` is reported later as an unknown CPU, a bad file value here
            if profile_for(&config.report.default_cpu).is_err() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "report.default_cpu '{}' is not a known CPU",
                    config.report.default_cpu
                )));
            }
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AnalysisError::InvalidConfig(format!("Invalid TOML syntax: {}", e)))
    }

    /// Merge command line arguments into configuration
    pub fn merge_args(&mut self, args: &Args) {
        if let Some(cpu) = &args.cpu {
            self.report.default_cpu = cpu.clone();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(sdk_root) = &args.sdk_root {
            self.resolver.sdk_root = sdk_root.clone();
        }
        if let Some(dir) = &args.toolchain_dir {
            self.resolver.toolchain_dir = Some(dir.clone());
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.verbose {
            self.logging.level = "debug".to_string();
            self.logging.verbose = true;
        }
        if args.log_file.is_some() {
            self.logging.file = args.log_file.clone();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.resolver.sdk_root.as_os_str().is_empty() {
            return Err(AnalysisError::InvalidConfig("resolver.sdk_root must not be empty".to_string()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Generate TOML configuration string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AnalysisError::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub sdk_root: PathBuf,
    pub toolchain_dir: Option<PathBuf>,
    /// Also look for addr2line on PATH
    pub use_path: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sdk_root: PathBuf::from("."),
            toolchain_dir: None,
            use_path: true,
        }
    }
}

impl ResolverConfig {
    pub fn toolchain_dir(&self) -> PathBuf {
        self.toolchain_dir
            .clone()
            .unwrap_or_else(|| self.sdk_root.join("toolchain").join("bin"))
    }

    /// Absolute SDK root, stripped from source paths in the report.
    pub fn source_root(&self) -> Option<PathBuf> {
        std::fs::canonicalize(&self.sdk_root).ok()
    }

    /// ELF image of the configured board: `output/<defconfig>/images/<soc>.elf`
    /// where `<soc>` is the defconfig name up to the first `_`.
    pub fn default_elf_path(&self) -> Option<PathBuf> {
        let defconfig_file = self.sdk_root.join(".defconfig");
        let defconfig = std::fs::read_to_string(&defconfig_file).ok()?;
        let elf = elf_path_for_defconfig(&self.sdk_root, defconfig.trim());
        debug!("Derived ELF path {:?} from {}", elf, defconfig_file.display());
        elf
    }
}

fn elf_path_for_defconfig(sdk_root: &Path, defconfig: &str) -> Option<PathBuf> {
    if defconfig.is_empty() {
        return None;
    }
    let soc = defconfig.split('_').next().unwrap_or(defconfig);
    Some(
        sdk_root
            .join("output")
            .join(defconfig)
            .join("images")
            .join(format!("{}.elf", soc)),
    )
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub default_cpu: String,
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_cpu: DEFAULT_ARCHITECTURE.to_string(),
            format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    /// Timestamps and targets on diagnostics
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            verbose: false,
        }
    }
}
