//! Firmware Panic Analysis
//!
//! Turns a raw panic log captured from an embedded target into a crash report:
//! the exception cause, an annotated register dump and a call stack resolved
//! against the firmware ELF image.

pub mod config;
pub mod error;
pub mod arch;
pub mod parser;
pub mod symbols;
pub mod report;

pub use error::{AnalysisError, Result};
pub use config::Config;
pub use arch::{profile_for, ArchitectureProfile, DEFAULT_ARCHITECTURE};
pub use parser::{parse, FaultRecord};
pub use symbols::{ResolvedLocation, SymbolResolver, TextBounds};
pub use report::{build, CrashReport};
