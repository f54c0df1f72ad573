/// A function symbol and the offset of the looked-up address inside it.
#[derive(Debug, Clone)]
pub struct ResolvedSymbol {
    pub name: String,
    pub offset: u64,
}

/// Sorted table of function symbols from a firmware image.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
struct Symbol {
    name: String,
    address: u64,
    size: u64,
}

/// Maximum offset heuristic for symbols with size=0 (hand-written assembly
/// entry points such as trap vectors usually carry no size).
const MAX_ZERO_SIZE_OFFSET: u64 = 4096;

impl SymbolTable {
    /// Collect function symbols from a parsed ELF, sorted by address.
    pub fn from_elf(elf: &goblin::elf::Elf<'_>) -> Self {
        let mut symbols = Vec::new();

        for sym in &elf.syms {
            if sym.is_function() && sym.st_value != 0 {
                if let Some(name) = elf.strtab.get_at(sym.st_name) {
                    if !name.is_empty() {
                        symbols.push(Symbol {
                            name: name.to_string(),
                            address: sym.st_value,
                            size: sym.st_size,
                        });
                    }
                }
            }
        }

        Self::sorted(symbols)
    }

    /// Build a SymbolTable directly from (name, address, size) tuples.
    pub fn from_entries(entries: Vec<(&str, u64, u64)>) -> Self {
        let symbols = entries
            .into_iter()
            .map(|(name, address, size)| Symbol {
                name: name.to_string(),
                address,
                size,
            })
            .collect();
        Self::sorted(symbols)
    }

    fn sorted(mut symbols: Vec<Symbol>) -> Self {
        symbols.sort_by_key(|s| s.address);
        // Aliases share an address; keep the first
        symbols.dedup_by_key(|s| s.address);
        Self { symbols }
    }

    /// Resolve an address to the containing function symbol.
    pub fn resolve(&self, addr: u64) -> Option<ResolvedSymbol> {
        // Binary search: find the last symbol with address <= addr
        let idx = match self.symbols.binary_search_by_key(&addr, |s| s.address) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };

        let sym = &self.symbols[idx];
        let offset = addr - sym.address;

        let limit_ok = if sym.size > 0 {
            offset < sym.size
        } else {
            offset <= MAX_ZERO_SIZE_OFFSET
        };

        limit_ok.then(|| ResolvedSymbol {
            name: sym.name.clone(),
            offset,
        })
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl std::fmt::Display for ResolvedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}+0x{:x}", self.name, self.offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Luban-Lite style image: RT-Thread kernel, a driver and the trap vector.
    fn firmware_table() -> SymbolTable {
        SymbolTable::from_entries(vec![
            ("rt_thread_entry", 0x4000_0400, 0x100),
            ("trap_entry", 0x4000_0000, 0),
            ("aic_gpio_init", 0x4000_0200, 0x40),
            ("rt_hw_context_switch", 0x4000_0300, 0x80),
        ])
    }

    #[test]
    fn test_unsorted_entries_resolve() {
        let table = firmware_table();
        assert_eq!(table.symbol_count(), 4);
        assert_eq!(table.resolve(0x4000_0410).unwrap().to_string(), "rt_thread_entry+0x10");
        assert_eq!(table.resolve(0x4000_0200).unwrap().to_string(), "aic_gpio_init");
    }

    #[test]
    fn test_gap_after_sized_function() {
        let table = firmware_table();
        // aic_gpio_init ends at 0x40000240, next symbol starts at 0x40000300
        assert!(table.resolve(0x4000_0240).is_none());
        assert_eq!(table.resolve(0x4000_023e).unwrap().offset, 0x3e);
    }

    #[test]
    fn test_trap_vector_without_size() {
        let table = SymbolTable::from_entries(vec![("trap_entry", 0x4000_0000, 0)]);
        assert_eq!(table.resolve(0x4000_0000 + MAX_ZERO_SIZE_OFFSET).unwrap().offset, MAX_ZERO_SIZE_OFFSET);
        assert!(table.resolve(0x4000_0000 + MAX_ZERO_SIZE_OFFSET + 2).is_none());
    }

    #[test]
    fn test_rv64_addresses_above_4gib() {
        let table = SymbolTable::from_entries(vec![
            ("rt_thread_entry", 0x8_0000_0400, 0x100),
            ("truncated_alias", 0x0000_0400, 0x100),
        ]);
        let resolved = table.resolve(0x8_0000_0420).unwrap();
        assert_eq!(resolved.name, "rt_thread_entry");
        assert_eq!(resolved.offset, 0x20);
        // the low 32 bits alone must not match the far symbol
        assert_eq!(table.resolve(0x0000_0420).unwrap().name, "truncated_alias");
    }

    #[test]
    fn test_compressed_instruction_offsets_are_not_masked() {
        // RVC and C-SKY 16-bit code sits on 2-byte boundaries; odd words still
        // resolve by range
        let table = firmware_table();
        assert_eq!(table.resolve(0x4000_0302).unwrap().to_string(), "rt_hw_context_switch+0x2");
        assert_eq!(table.resolve(0x4000_0301).unwrap().offset, 1);
    }

    #[test]
    fn test_address_below_text() {
        let table = firmware_table();
        assert!(table.resolve(0x3fff_fffe).is_none());
        assert!(table.resolve(0).is_none());
    }

    #[test]
    fn test_weak_alias_at_same_address_keeps_first() {
        let table = SymbolTable::from_entries(vec![
            ("rt_hw_interrupt_handler", 0x4000_0100, 16),
            ("default_irq_handler", 0x4000_0100, 16),
        ]);
        assert_eq!(table.symbol_count(), 1);
        assert_eq!(table.resolve(0x4000_0104).unwrap().name, "rt_hw_interrupt_handler");
    }

    #[test]
    fn test_empty_table() {
        let table = SymbolTable::default();
        assert!(table.is_empty());
        assert!(table.resolve(0x4000_0100).is_none());
    }
}
