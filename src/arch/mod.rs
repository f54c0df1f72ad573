//! Architecture profiles: exception tables, register aliases and toolchain
//! prefixes for the CPU families found in panic logs.

mod csky;
mod riscv;

use crate::error::{AnalysisError, Result};

/// Identifier used when the caller does not name a CPU.
pub const DEFAULT_ARCHITECTURE: &str = "risc-v";

/// Name returned for exception codes missing from a profile's table.
pub const UNKNOWN_EXCEPTION: &str = "Unknown";

/// A CPU family the analyzer knows how to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchitectureProfile {
    RiscV,
    CSky,
}

/// Static description backing one profile variant.
struct ProfileTables {
    name: &'static str,
    identifiers: &'static [&'static str],
    toolchain_prefix: &'static str,
    exceptions: &'static [(u32, &'static str)],
    register_aliases: &'static [(&'static str, &'static str)],
    special_registers: &'static [&'static str],
    fault_pc_register: &'static str,
}

const PROFILES: [ArchitectureProfile; 2] = [ArchitectureProfile::RiscV, ArchitectureProfile::CSky];

/// Select the profile for a CPU identifier (case-insensitive, core names
/// such as `C906` or `CK802` resolve to their family).
pub fn profile_for(identifier: &str) -> Result<ArchitectureProfile> {
    let wanted = identifier.trim().to_ascii_lowercase();
    PROFILES
        .iter()
        .copied()
        .find(|profile| profile.tables().identifiers.iter().any(|id| *id == wanted))
        .ok_or_else(|| AnalysisError::UnknownArchitecture(identifier.to_string()))
}

impl ArchitectureProfile {
    /// All registered profiles.
    pub fn all() -> &'static [ArchitectureProfile] {
        &PROFILES
    }

    fn tables(&self) -> &'static ProfileTables {
        match self {
            ArchitectureProfile::RiscV => &riscv::TABLES,
            ArchitectureProfile::CSky => &csky::TABLES,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tables().name
    }

    /// Human-readable exception name, `"Unknown"` for unlisted codes.
    pub fn exception_name(&self, code: u32) -> &'static str {
        self.tables()
            .exceptions
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .unwrap_or(UNKNOWN_EXCEPTION)
    }

    /// ABI alias of a raw register name, or `""` when there is none.
    pub fn register_alias(&self, register: &str) -> &'static str {
        self.tables()
            .register_aliases
            .iter()
            .find(|(raw, _)| *raw == register)
            .map(|(_, alias)| *alias)
            .unwrap_or("")
    }

    pub fn toolchain_prefix(&self) -> &'static str {
        self.tables().toolchain_prefix
    }

    /// Registers the firmware prints on a line of their own
    /// (`mcause : 0x0000000b`).
    pub fn special_registers(&self) -> &'static [&'static str] {
        self.tables().special_registers
    }

    /// Register holding the program counter of the faulting instruction.
    pub fn fault_pc_register(&self) -> &'static str {
        self.tables().fault_pc_register
    }
}

impl std::fmt::Display for ArchitectureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
