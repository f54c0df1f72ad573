//! Address to source location resolution against a firmware ELF image

pub mod addr2line;
pub mod elf;
pub mod resolver;

use serde::Serialize;

pub use addr2line::{Addr2Line, Toolchain};
pub use elf::ElfImage;
pub use resolver::{ResolvedSymbol, SymbolTable};

/// Symbol marking the first byte of the executable code region.
pub const TEXT_START_SYMBOL: &str = "__stext";
/// Symbol marking the end of the executable code region.
pub const TEXT_END_SYMBOL: &str = "__etext";

/// Inclusive address range holding executable code.
///
/// `(0, 0)` means the bounds are unknown; nothing is classified as code then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextBounds {
    pub start: u64,
    pub end: u64,
}

impl TextBounds {
    pub const UNKNOWN: TextBounds = TextBounds { start: 0, end: 0 };

    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }

    /// True when `address` lies in `[start, end]`.
    pub fn contains(&self, address: u64) -> bool {
        self.is_known() && self.start <= address && address <= self.end
    }

    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Where an address lives in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedLocation {
    Resolved {
        function: String,
        file: Option<String>,
        line: Option<u32>,
    },
    Unresolved,
}

impl ResolvedLocation {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedLocation::Resolved { .. })
    }
}

impl std::fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedLocation::Resolved { function, file: Some(file), line: Some(line) } => {
                write!(f, "{} at {}:{}", function, file, line)
            }
            ResolvedLocation::Resolved { function, file: Some(file), line: None } => {
                write!(f, "{} at {}", function, file)
            }
            ResolvedLocation::Resolved { function, .. } => write!(f, "{}", function),
            ResolvedLocation::Unresolved => write!(f, "??"),
        }
    }
}

/// Capability the report builder needs from a firmware binary.
///
/// Implementations never fail: anything that cannot be resolved comes back
/// as [`ResolvedLocation::Unresolved`].
pub trait SymbolResolver {
    /// Bounds of the code region, from the `__stext`/`__etext` symbols.
    fn text_bounds(&self) -> TextBounds;

    fn resolve(&self, address: u64) -> ResolvedLocation;

    /// Resolve several addresses at once. Output order matches input order.
    fn resolve_batch(&self, addresses: &[u64]) -> Vec<ResolvedLocation> {
        addresses.iter().map(|&address| self.resolve(address)).collect()
    }
}
