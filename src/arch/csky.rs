use super::ProfileTables;

pub(super) static TABLES: ProfileTables = ProfileTables {
    name: "C-SKY",
    identifiers: &["c-sky", "csky", "ck802"],
    toolchain_prefix: "csky-elf-noneabiv2",
    exceptions: &[
        (0, "Reset Fault"),
        (1, "Instruction Address Misaligned"),
        (2, "Instruction Access Fault"),
        (4, "Illegal Instruction"),
        (5, "Privileged Instruction"),
        (7, "Breakpoint Fault"),
        (8, "Unrecoverable Fault"),
        (16, "TRAP0 Fault"),
        (17, "TRAP1 Fault"),
        (18, "TRAP2 Fault"),
        (19, "TRAP3 Fault"),
        (22, "Tspend interrupt"),
    ],
    register_aliases: &[
        ("r14", "sp"),
        ("r15", "lr"),
        ("r23", "fp"),
        ("r24", "top"),
        ("r25", "bsp"),
        ("r30", "svbr"),
    ],
    special_registers: &["epsr", "epc"],
    fault_pc_register: "epc",
};
