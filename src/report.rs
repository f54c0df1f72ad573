//! Crash report assembly and rendering

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::arch::{ArchitectureProfile, UNKNOWN_EXCEPTION};
use crate::parser::{FaultRecord, StackBounds};
use crate::symbols::{ResolvedLocation, SymbolResolver, TextBounds};

const SECTION_RULE: &str = "---------------------------------------------------------------";

/// One register line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterEntry {
    pub name: String,
    /// ABI alias, empty when the register has none.
    pub alias: String,
    pub value: u64,
    /// Present only for values inside the code region.
    pub location: Option<ResolvedLocation>,
}

/// One call-stack line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    /// Dense over the frames kept, not over raw stack words.
    pub index: usize,
    pub address: u64,
    pub location: ResolvedLocation,
}

/// The finished crash analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrashReport {
    pub architecture: String,
    pub exception_code: Option<u32>,
    pub exception_name: String,
    pub symbols_available: bool,
    pub text_bounds: TextBounds,
    pub stack_bounds: StackBounds,
    pub fault_pc: Option<RegisterEntry>,
    pub registers: Vec<RegisterEntry>,
    /// False when the log carried no stack dump at all.
    pub stack_captured: bool,
    pub call_stack: Vec<StackFrame>,
}

/// Combine a parsed log, the CPU profile and an optional resolver into a
/// report. Addresses outside the code region are never resolved.
pub fn build(
    record: &FaultRecord,
    profile: ArchitectureProfile,
    resolver: Option<&dyn SymbolResolver>,
) -> CrashReport {
    let text_bounds = resolver.map_or(TextBounds::UNKNOWN, |r| r.text_bounds());

    if record.log_text_hint.is_known() && text_bounds.is_known() && record.log_text_hint != text_bounds {
        warn!(
            "Log reports text 0x{:08x} - 0x{:08x} but ELF has 0x{:08x} - 0x{:08x}; the ELF may not match the crashed firmware",
            record.log_text_hint.start,
            record.log_text_hint.end,
            text_bounds.start,
            text_bounds.end
        );
    }

    let exception_name = record
        .exception_code
        .map_or(UNKNOWN_EXCEPTION, |code| profile.exception_name(code));

    let frame_addresses: Vec<u64> = record
        .stack_words
        .iter()
        .flatten()
        .copied()
        .filter(|&word| text_bounds.contains(word))
        .collect();

    let locations = match resolver {
        Some(resolver) => resolve_code_addresses(record, &frame_addresses, text_bounds, resolver),
        None => HashMap::new(),
    };

    let registers: Vec<RegisterEntry> = record
        .registers
        .iter()
        .map(|register| RegisterEntry {
            name: register.name.clone(),
            alias: profile.register_alias(&register.name).to_string(),
            value: register.value,
            location: locations.get(&register.value).cloned(),
        })
        .collect();

    let call_stack = frame_addresses
        .iter()
        .enumerate()
        .map(|(index, &address)| StackFrame {
            index,
            address,
            location: locations
                .get(&address)
                .cloned()
                .unwrap_or(ResolvedLocation::Unresolved),
        })
        .collect();

    let fault_pc = registers
        .iter()
        .find(|entry| entry.name == profile.fault_pc_register())
        .cloned();

    CrashReport {
        architecture: profile.name().to_string(),
        exception_code: record.exception_code,
        exception_name: exception_name.to_string(),
        symbols_available: resolver.is_some(),
        text_bounds,
        stack_bounds: record.stack_bounds,
        fault_pc,
        registers,
        stack_captured: record.stack_words.is_some(),
        call_stack,
    }
}

/// Resolve every code address of the report in one batch.
fn resolve_code_addresses(
    record: &FaultRecord,
    frame_addresses: &[u64],
    text_bounds: TextBounds,
    resolver: &dyn SymbolResolver,
) -> HashMap<u64, ResolvedLocation> {
    let mut addresses: Vec<u64> = record
        .registers
        .iter()
        .map(|r| r.value)
        .filter(|&value| text_bounds.contains(value))
        .chain(frame_addresses.iter().copied())
        .collect();
    addresses.sort_unstable();
    addresses.dedup();

    debug!("Resolving {} code addresses", addresses.len());
    let resolved = resolver.resolve_batch(&addresses);
    addresses.into_iter().zip(resolved).collect()
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", SECTION_RULE)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", SECTION_RULE)
}

impl fmt::Display for RegisterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alias.is_empty() {
            write!(f, "{}: 0x{:08x}", self.name, self.value)?;
        } else {
            write!(f, "{} ({}): 0x{:08x}", self.name, self.alias, self.value)?;
        }
        if let Some(location) = &self.location {
            write!(f, " {}", location)?;
        }
        Ok(())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:2}: [0x{:08x}] {}", self.index, self.address, self.location)
    }
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "CPU Registers:")?;
        writeln!(f, "CPU: {}", self.architecture)?;
        match self.exception_code {
            Some(code) => writeln!(f, "CPU Exception: {} ({})", code, self.exception_name)?,
            None => writeln!(f, "CPU Exception: ? ({})", self.exception_name)?,
        }
        if let Some(pc) = &self.fault_pc {
            match &pc.location {
                Some(location) => writeln!(f, "Fault PC: 0x{:08x} {}", pc.value, location)?,
                None => writeln!(f, "Fault PC: 0x{:08x}", pc.value)?,
            }
        }

        if !self.symbols_available {
            writeln!(f, "No ELF file, showing raw addresses only")?;
        } else if self.text_bounds.is_known() {
            writeln!(
                f,
                "Text section: 0x{:08x} - 0x{:08x}, size: {} Bytes",
                self.text_bounds.start,
                self.text_bounds.end,
                self.text_bounds.size()
            )?;
        } else {
            writeln!(f, "Text section: unknown, showing raw addresses only")?;
        }

        if self.registers.is_empty() {
            writeln!(f, "No CPU registers found")?;
        }
        for register in &self.registers {
            writeln!(f, "{}", register)?;
        }

        write_section(f, "Call Stack:")?;
        if !self.stack_captured {
            return writeln!(f, "No call stack found");
        }
        writeln!(
            f,
            "Stack section: 0x{:08x} - 0x{:08x}, size: {} Bytes",
            self.stack_bounds.start,
            self.stack_bounds.end,
            self.stack_bounds.size()
        )?;
        for frame in &self.call_stack {
            writeln!(f, "{}", frame)?;
        }
        Ok(())
    }
}
