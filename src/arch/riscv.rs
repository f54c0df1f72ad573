use super::ProfileTables;

pub(super) static TABLES: ProfileTables = ProfileTables {
    name: "RISC-V",
    identifiers: &["risc-v", "riscv", "rv32", "rv64", "c906", "e906", "e907"],
    toolchain_prefix: "riscv64-unknown-elf",
    exceptions: &[
        (0, "Reserved"),
        (1, "Fetch Instruction Access Fault"),
        (2, "Illegal Instruction"),
        (3, "Breakpoint Fault"),
        (4, "Load Instruction Address Misaligned"),
        (5, "Load Instruction Access Fault"),
        (6, "Store/AMO Address Misaligned"),
        (7, "Store/AMO Access Fault"),
        (8, "Environment Call from U-Mode"),
        (9, "Environment Call from S-Mode"),
        (11, "Environment Call from M-Mode"),
        (12, "Fetch Instruction page error"),
        (13, "Load Instruction page error"),
        (15, "Store/AMO Instruction page error"),
        (24, "NMI"),
    ],
    register_aliases: &[
        ("x0", "zero"),
        ("x1", "ra"),
        ("x2", "sp"),
        ("x3", "gp"),
        ("x4", "tp"),
        ("x5", "t0"),
        ("x6", "t1"),
        ("x7", "t2"),
        ("x8", "s0/fp"),
        ("x9", "s1"),
        ("x10", "a0"),
        ("x11", "a1"),
        ("x12", "a2"),
        ("x13", "a3"),
        ("x14", "a4"),
        ("x15", "a5"),
        ("x16", "a6"),
        ("x17", "a7"),
        ("x18", "s2"),
        ("x19", "s3"),
        ("x20", "s4"),
        ("x21", "s5"),
        ("x22", "s6"),
        ("x23", "s7"),
        ("x24", "s8"),
        ("x25", "s9"),
        ("x26", "s10"),
        ("x27", "s11"),
        ("x28", "t3"),
        ("x29", "t4"),
        ("x30", "t5"),
        ("x31", "t6"),
    ],
    special_registers: &["mcause", "mtval", "mepc", "mstatus"],
    fault_pc_register: "mepc",
};
