//! Source line resolution through the target toolchain's `addr2line`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use super::{ElfImage, ResolvedLocation, SymbolResolver, TextBounds};
use crate::error::{AnalysisError, Result};

/// Located cross toolchain binaries.
#[derive(Debug, Clone)]
pub struct Toolchain {
    addr2line: PathBuf,
}

impl Toolchain {
    /// Find `<prefix>-addr2line` in `toolchain_dir`, then on `PATH` when
    /// `use_path` is set.
    pub fn locate(prefix: &str, toolchain_dir: &Path, use_path: bool) -> Result<Self> {
        let tool = format!("{}-addr2line{}", prefix, std::env::consts::EXE_SUFFIX);

        let candidate = toolchain_dir.join(&tool);
        if candidate.is_file() {
            info!("Toolchain: {} ({})", prefix, toolchain_dir.display());
            return Ok(Self { addr2line: candidate });
        }

        if use_path {
            if let Some(found) = std::env::var_os("PATH").and_then(|paths| {
                std::env::split_paths(&paths)
                    .map(|dir| dir.join(&tool))
                    .find(|path| path.is_file())
            }) {
                info!("Toolchain: {} (from PATH: {})", prefix, found.display());
                return Ok(Self { addr2line: found });
            }
        }

        Err(AnalysisError::ToolchainNotFound {
            tool,
            searched: toolchain_dir.to_path_buf(),
        })
    }

    pub fn addr2line(&self) -> &Path {
        &self.addr2line
    }
}

/// Resolver that asks `addr2line` for function, file and line, falling back
/// to the ELF symbol table for addresses it cannot place.
pub struct Addr2Line {
    toolchain: Toolchain,
    image: ElfImage,
    source_root: Option<PathBuf>,
}

impl Addr2Line {
    /// `source_root` is stripped from reported file paths so locations read
    /// relative to the SDK checkout.
    pub fn new(toolchain: Toolchain, image: ElfImage, source_root: Option<PathBuf>) -> Self {
        Self {
            toolchain,
            image,
            source_root,
        }
    }

    fn run(&self, addresses: &[u64]) -> std::io::Result<Vec<String>> {
        let mut cmd = Command::new(self.toolchain.addr2line());
        cmd.arg("-e")
            .arg(self.image.path())
            .args(["-f", "-p"])
            .args(addresses.iter().map(|address| format!("0x{:x}", address)));

        debug!("Running: {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "addr2line exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

impl SymbolResolver for Addr2Line {
    fn text_bounds(&self) -> TextBounds {
        self.image.text_bounds()
    }

    fn resolve(&self, address: u64) -> ResolvedLocation {
        self.resolve_batch(&[address])
            .pop()
            .unwrap_or(ResolvedLocation::Unresolved)
    }

    fn resolve_batch(&self, addresses: &[u64]) -> Vec<ResolvedLocation> {
        if addresses.is_empty() {
            return Vec::new();
        }

        let mut unique: Vec<u64> = addresses.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let lines = match self.run(&unique) {
            Ok(lines) if lines.len() == unique.len() => lines,
            Ok(lines) => {
                warn!(
                    "addr2line returned {} lines for {} addresses, using symbol table",
                    lines.len(),
                    unique.len()
                );
                return addresses.iter().map(|&a| self.image.lookup(a)).collect();
            }
            Err(e) => {
                warn!("addr2line failed ({}), using symbol table", e);
                return addresses.iter().map(|&a| self.image.lookup(a)).collect();
            }
        };

        let resolved: HashMap<u64, ResolvedLocation> = unique
            .iter()
            .zip(lines.iter())
            .map(|(&address, line)| {
                let location = parse_addr2line_output(line, self.source_root.as_deref())
                    .unwrap_or_else(|| self.image.lookup(address));
                (address, location)
            })
            .collect();

        addresses
            .iter()
            .map(|address| resolved.get(address).cloned().unwrap_or(ResolvedLocation::Unresolved))
            .collect()
    }
}

/// Parse one `addr2line -f -p` line (`func at /sdk/path/file.c:123`).
/// Returns `None` when the tool could not name the function.
pub fn parse_addr2line_output(line: &str, source_root: Option<&Path>) -> Option<ResolvedLocation> {
    let line = line.trim();
    let line = match line.find(" (discriminator") {
        Some(pos) => &line[..pos],
        None => line,
    };

    let (function, location) = line.split_once(" at ")?;
    let function = function.trim();
    if function.is_empty() || function == "??" {
        return None;
    }

    let (file, line_no) = match location.rsplit_once(':') {
        Some((file, line_no)) => (file, line_no.parse::<u32>().ok().filter(|&n| n > 0)),
        None => (location, None),
    };

    let file = match file.trim() {
        "" | "??" => None,
        file => Some(relative_to(file, source_root)),
    };

    Some(ResolvedLocation::Resolved {
        function: function.to_string(),
        file,
        line: line_no,
    })
}

fn relative_to(file: &str, source_root: Option<&Path>) -> String {
    source_root
        .and_then(|root| Path::new(file).strip_prefix(root).ok())
        .map(|relative| relative.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_location() {
        let location = parse_addr2line_output(
            "aic_gpio_init at /home/user/luban-lite/bsp/artinchip/drv/gpio/drv_gpio.c:120",
            Some(Path::new("/home/user/luban-lite")),
        )
        .unwrap();
        assert_eq!(
            location,
            ResolvedLocation::Resolved {
                function: "aic_gpio_init".into(),
                file: Some("bsp/artinchip/drv/gpio/drv_gpio.c".into()),
                line: Some(120),
            }
        );
    }

    #[test]
    fn test_parse_keeps_path_outside_root() {
        let location = parse_addr2line_output(
            "memcpy at /opt/toolchain/newlib/memcpy.c:33",
            Some(Path::new("/home/user/luban-lite")),
        )
        .unwrap();
        match location {
            ResolvedLocation::Resolved { file, .. } => {
                assert_eq!(file.as_deref(), Some("/opt/toolchain/newlib/memcpy.c"))
            }
            ResolvedLocation::Unresolved => panic!("expected a location"),
        }
    }

    #[test]
    fn test_parse_discriminator_suffix() {
        let location = parse_addr2line_output("main at app/main.c:57 (discriminator 3)", None).unwrap();
        assert_eq!(location.to_string(), "main at app/main.c:57");
    }

    #[test]
    fn test_parse_function_without_line_info() {
        let location = parse_addr2line_output("trap_entry at ??:?", None).unwrap();
        assert_eq!(
            location,
            ResolvedLocation::Resolved {
                function: "trap_entry".into(),
                file: None,
                line: None,
            }
        );
    }

    #[test]
    fn test_parse_unknown_function() {
        assert!(parse_addr2line_output("?? ??:0", None).is_none());
        assert!(parse_addr2line_output("?? at ??:0", None).is_none());
        assert!(parse_addr2line_output("", None).is_none());
    }

    #[test]
    fn test_locate_missing_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let result = Toolchain::locate("riscv64-unknown-elf", dir.path(), false);
        match result {
            Err(AnalysisError::ToolchainNotFound { tool, searched }) => {
                assert!(tool.starts_with("riscv64-unknown-elf-addr2line"));
                assert_eq!(searched, dir.path());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_locate_in_toolchain_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir
            .path()
            .join(format!("csky-elf-noneabiv2-addr2line{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(&tool, b"").unwrap();

        let toolchain = Toolchain::locate("csky-elf-noneabiv2", dir.path(), false).unwrap();
        assert_eq!(toolchain.addr2line(), tool.as_path());
    }
}
