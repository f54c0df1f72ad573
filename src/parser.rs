//! Panic log parsing
//!
//! The firmware trap handler prints something like:
//!
//! ```text
//! CPU Exception: NO.2
//! x1: 400123a4    x2: 40087f10    x3: 40090800    x4: 00000000
//! ...
//! mcause : 0x00000002
//! mtval  : 0x00000000
//! mepc   : 0x40012400
//! mstatus: 0x00001880
//! __stext:0x40000000 __etext:0x40080000,stack:
//! stack_addr:0x40087000 stack_addr_end:0x40088000
//! 0x00000000 0x400123a4 0x40087f40 0x40011002
//! ```
//!
//! Other builds (D21x) print the ABI name next to each register and pad the
//! values to 64 bits:
//!
//! ```text
//! x1(ra)   : 0000000040012345    x2(sp)   : 0000000040087f10
//! x8(s0/fp): 0000000040087f30
//! mcause   : 0000000000000002
//! ```
//!
//! The format varies between firmware builds, so everything except the
//! exception marker is optional and malformed lines are skipped.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, trace};

use crate::arch::ArchitectureProfile;
use crate::error::{AnalysisError, Result};
use crate::symbols::TextBounds;

/// Literal tag printed by the trap handler before the exception code.
pub const EXCEPTION_TAG: &str = "CPU Exception:";

/// Marker opening the raw stack dump.
pub const STACK_MARKER: &str = "stack:";

/// One register as printed in the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Register {
    pub name: String,
    pub value: u64,
}

/// Stack region of the faulting thread, as reported by the firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StackBounds {
    pub start: u64,
    pub end: u64,
}

impl StackBounds {
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Everything extracted from one panic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    /// `None` when the marker was found but carried no readable code.
    pub exception_code: Option<u32>,
    /// Registers in dump order.
    pub registers: Vec<Register>,
    /// Words after the stack marker, `None` when the log has no stack dump.
    pub stack_words: Option<Vec<u64>>,
    pub stack_bounds: StackBounds,
    /// Code bounds printed by the firmware itself (`__stext:`/`__etext:`).
    /// Only used to detect a log/ELF mismatch; the ELF is authoritative.
    pub log_text_hint: TextBounds,
}

impl FaultRecord {
    pub fn register(&self, name: &str) -> Option<u64> {
        self.registers.iter().find(|r| r.name == name).map(|r| r.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingException,
    ReadingRegisters,
    Done,
}

struct Patterns {
    exception_code: Regex,
    register_pair: Regex,
    hex_literal: Regex,
    stack_start: Regex,
    stack_end: Regex,
    text_start: Regex,
    text_end: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        exception_code: Regex::new(r"CPU Exception:\s*NO\.(\d+)").expect("valid regex"),
        // `x1: 4001`, `x1:4001` and `x8(s0/fp): 4001` all name `x1`/`x8`
        register_pair: Regex::new(
            r"\b([A-Za-z_][A-Za-z0-9_]*)(?:\([^)\s]*\))?\s*:\s*(?:0[xX])?([0-9a-fA-F]+)\b",
        )
        .expect("valid regex"),
        hex_literal: Regex::new(r"0[xX][0-9a-fA-F]+").expect("valid regex"),
        stack_start: Regex::new(r"stack_addr:0[xX]([0-9a-fA-F]+)").expect("valid regex"),
        stack_end: Regex::new(r"stack_addr_end:0[xX]([0-9a-fA-F]+)").expect("valid regex"),
        text_start: Regex::new(r"__stext:\s*0[xX]([0-9a-fA-F]+)").expect("valid regex"),
        text_end: Regex::new(r"__etext:\s*0[xX]([0-9a-fA-F]+)").expect("valid regex"),
    })
}

/// Parse a hex number with or without a `0x` prefix.
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a raw panic log into a [`FaultRecord`].
///
/// Fails only when the exception marker is missing.
pub fn parse(raw_text: &str, profile: ArchitectureProfile) -> Result<FaultRecord> {
    let patterns = patterns();
    let mut state = State::SeekingException;
    let mut exception_code = None;
    let mut registers: Vec<Register> = Vec::new();

    for line in raw_text.lines() {
        match state {
            State::SeekingException => {
                if line.contains(EXCEPTION_TAG) {
                    exception_code = patterns
                        .exception_code
                        .captures(line)
                        .and_then(|caps| caps[1].parse::<u32>().ok());
                    debug!("Exception marker found, code: {:?}", exception_code);
                    state = State::ReadingRegisters;
                }
            }
            State::ReadingRegisters => {
                if line.contains(STACK_MARKER) {
                    state = State::Done;
                    continue;
                }
                read_register_line(line, profile, &mut registers);
            }
            State::Done => break,
        }
    }

    if state == State::SeekingException {
        return Err(AnalysisError::ExceptionMarkerNotFound);
    }

    let stack_words = raw_text.find(STACK_MARKER).map(|pos| {
        patterns
            .hex_literal
            .find_iter(&raw_text[pos + STACK_MARKER.len()..])
            .filter_map(|m| parse_hex(m.as_str()))
            .collect::<Vec<_>>()
    });

    let capture_hex = |re: &Regex| {
        re.captures(raw_text)
            .and_then(|caps| u64::from_str_radix(&caps[1], 16).ok())
            .unwrap_or(0)
    };
    let stack_bounds = StackBounds {
        start: capture_hex(&patterns.stack_start),
        end: capture_hex(&patterns.stack_end),
    };
    let log_text_hint = TextBounds::new(capture_hex(&patterns.text_start), capture_hex(&patterns.text_end));

    debug!(
        "Parsed {} registers, {} stack words",
        registers.len(),
        stack_words.as_ref().map_or(0, Vec::len)
    );

    Ok(FaultRecord {
        exception_code,
        registers,
        stack_words,
        stack_bounds,
        log_text_hint,
    })
}

fn read_register_line(line: &str, profile: ArchitectureProfile, registers: &mut Vec<Register>) {
    let trimmed = line.trim();
    if trimmed.len() < 2 {
        return;
    }

    // `mcause : 0x00000002` style lines carry exactly one register
    if let Some((name, value)) = trimmed.split_once(':') {
        let name = name.trim();
        if profile.special_registers().iter().any(|special| *special == name) {
            match parse_hex(value) {
                Some(value) => record(registers, name, value),
                None => trace!("Skipping unreadable {} value: {:?}", name, value),
            }
            return;
        }
    }

    for caps in patterns().register_pair.captures_iter(trimmed) {
        match parse_hex(&caps[2]) {
            Some(value) => record(registers, &caps[1], value),
            None => trace!("Skipping unreadable register {}", &caps[1]),
        }
    }
}

/// Insert a register, or update it in place when the dump repeats a name.
fn record(registers: &mut Vec<Register>, name: &str, value: u64) {
    match registers.iter_mut().find(|r| r.name == name) {
        Some(existing) => existing.value = value,
        None => registers.push(Register {
            name: name.to_string(),
            value,
        }),
    }
}
