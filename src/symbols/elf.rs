//! Firmware ELF image loading: header check, code bounds and function symbols

use anyhow::Context;
use goblin::elf::Elf;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ResolvedLocation, SymbolResolver, SymbolTable, TextBounds, TEXT_END_SYMBOL, TEXT_START_SYMBOL};
use crate::error::ElfError;

const ELFMAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// A firmware image accepted for symbol resolution.
#[derive(Debug)]
pub struct ElfImage {
    path: PathBuf,
    text_bounds: TextBounds,
    symbols: SymbolTable,
}

/// True when `data` starts with the ELF magic bytes.
pub fn has_elf_magic(data: &[u8]) -> bool {
    data.len() >= ELFMAG.len() && data[..ELFMAG.len()] == ELFMAG
}

impl ElfImage {
    /// Read and validate an ELF image from disk.
    pub fn load(path: &Path) -> Result<Self, ElfError> {
        debug!("Loading ELF file: {}", path.display());
        let data = std::fs::read(path).map_err(|source| ElfError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &data)
    }

    /// Validate and index an in-memory ELF image. `path` is kept for the
    /// external resolver and for diagnostics.
    pub fn from_bytes(path: &Path, data: &[u8]) -> Result<Self, ElfError> {
        if !has_elf_magic(data) {
            return Err(ElfError::InvalidMagic(path.to_path_buf()));
        }

        let (text_bounds, symbols) = index_elf(data).map_err(|e| ElfError::ParseFailed {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        if text_bounds.is_known() {
            info!(
                "Text section: 0x{:08x} - 0x{:08x}, size: {} Bytes",
                text_bounds.start,
                text_bounds.end,
                text_bounds.size()
            );
        } else {
            warn!(
                "{} / {} not found in {}, no address will be treated as code",
                TEXT_START_SYMBOL,
                TEXT_END_SYMBOL,
                path.display()
            );
        }
        debug!("{} function symbols indexed", symbols.symbol_count());

        Ok(Self {
            path: path.to_path_buf(),
            text_bounds,
            symbols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Symbol-table lookup: `function+0xoff` without file or line.
    pub fn lookup(&self, address: u64) -> ResolvedLocation {
        match self.symbols.resolve(address) {
            Some(symbol) => ResolvedLocation::Resolved {
                function: symbol.to_string(),
                file: None,
                line: None,
            },
            None => ResolvedLocation::Unresolved,
        }
    }
}

impl SymbolResolver for ElfImage {
    fn text_bounds(&self) -> TextBounds {
        self.text_bounds
    }

    fn resolve(&self, address: u64) -> ResolvedLocation {
        self.lookup(address)
    }
}

fn index_elf(data: &[u8]) -> anyhow::Result<(TextBounds, SymbolTable)> {
    let elf = Elf::parse(data).context("malformed ELF structure")?;
    debug!("ELF info - entry: 0x{:08X}, symbols: {}", elf.entry, elf.syms.len());

    let start = find_symbol(&elf, TEXT_START_SYMBOL);
    let end = find_symbol(&elf, TEXT_END_SYMBOL);
    let bounds = match (start, end) {
        (Some(start), Some(end)) => TextBounds::new(start, end),
        _ => TextBounds::UNKNOWN,
    };

    Ok((bounds, SymbolTable::from_elf(&elf)))
}

fn find_symbol(elf: &Elf<'_>, wanted: &str) -> Option<u64> {
    elf.syms.iter().find_map(|sym| {
        let name = elf.strtab.get_at(sym.st_name)?;
        (name == wanted).then_some(sym.st_value)
    })
}
