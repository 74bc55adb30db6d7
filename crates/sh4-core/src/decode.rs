//! Instruction word decoding.
//!
//! Every instruction is a 16-bit word. [`decode`] matches a word against
//! [`OPCODES`], a mask/pattern table ordered from most to least specific;
//! the first matching row wins and the final row catches everything that
//! has no dedicated translation. Operand fields are extracted by the free
//! helper functions below, which fold the architectural displacement
//! scaling and pipeline offsets into their results.

use crate::timing::ExecutionGroup;

/// Translation strategy selected for a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionKind {
    /// `rts`: return through the procedure register, delayed.
    Rts,
    /// `rte`: return from an exception handler, delayed.
    Rte,
    /// `braf`: branch far to PC-relative register offset, delayed.
    Braf,
    /// `bsrf`: branch far and link, delayed.
    Bsrf,
    /// `bra`: branch to a 12-bit displacement, delayed.
    Bra,
    /// `bsr`: branch to a 12-bit displacement and link, delayed.
    Bsr,
    /// `jmp`: jump to a register target, delayed.
    Jmp,
    /// `jsr`: jump to a register target and link, delayed.
    Jsr,
    /// `bf`: branch when the T flag is clear, no delay slot.
    BranchIfFalse,
    /// `bf/s`: branch when the T flag is clear, delayed.
    BranchIfFalseDelayed,
    /// `bt`: branch when the T flag is set, no delay slot.
    BranchIfTrue,
    /// `bt/s`: branch when the T flag is set, delayed.
    BranchIfTrueDelayed,
    /// `mov rm,rn`: register-to-register copy.
    MoveRegister,
    /// `mov #imm,rn`: load a sign-extended immediate.
    MoveImmediate,
    /// `mov.w @(disp,pc),rn`: load a sign-extended word from a
    /// PC-relative slot.
    MoveWordPcRelative,
    /// No dedicated translation; the instruction word is carried through
    /// verbatim for the execution backend to interpret.
    Fallback,
}

impl InstructionKind {
    /// Returns `true` for the control-flow kinds that terminate a block.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Self::Rts
                | Self::Rte
                | Self::Braf
                | Self::Bsrf
                | Self::Bra
                | Self::Bsr
                | Self::Jmp
                | Self::Jsr
                | Self::BranchIfFalse
                | Self::BranchIfFalseDelayed
                | Self::BranchIfTrue
                | Self::BranchIfTrueDelayed
        )
    }

    /// Returns `true` for the delayed branches that execute the following
    /// word before the jump commits.
    #[must_use]
    pub const fn has_delay_slot(self) -> bool {
        matches!(
            self,
            Self::Rts
                | Self::Rte
                | Self::Braf
                | Self::Bsrf
                | Self::Bra
                | Self::Bsr
                | Self::Jmp
                | Self::Jsr
                | Self::BranchIfFalseDelayed
                | Self::BranchIfTrueDelayed
        )
    }
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    name: &'static str,
    mask: u16,
    pattern: u16,
    kind: InstructionKind,
    group: ExecutionGroup,
    issue_cycles: u32,
    references_pc: bool,
}

impl Opcode {
    const fn new(
        name: &'static str,
        mask: u16,
        pattern: u16,
        kind: InstructionKind,
        group: ExecutionGroup,
        issue_cycles: u32,
        references_pc: bool,
    ) -> Self {
        Self {
            name,
            mask,
            pattern,
            kind,
            group,
            issue_cycles,
            references_pc,
        }
    }

    /// Mnemonic used in listings and trace output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Bits of the instruction word that identify this row.
    #[must_use]
    pub const fn mask(&self) -> u16 {
        self.mask
    }

    /// Required value of the masked bits.
    #[must_use]
    pub const fn pattern(&self) -> u16 {
        self.pattern
    }

    /// Translation strategy for this row.
    #[must_use]
    pub const fn kind(&self) -> InstructionKind {
        self.kind
    }

    /// Pipeline group used for issue pairing.
    #[must_use]
    pub const fn group(&self) -> ExecutionGroup {
        self.group
    }

    /// Base issue cost in cycles.
    #[must_use]
    pub const fn issue_cycles(&self) -> u32 {
        self.issue_cycles
    }

    /// Returns `true` when the instruction reads the program counter and
    /// therefore cannot sit in a delay slot.
    #[must_use]
    pub const fn references_pc(&self) -> bool {
        self.references_pc
    }
}

/// Decode table, ordered from most to least specific row.
///
/// The final row has an empty mask and matches every word.
pub const OPCODES: &[Opcode] = &[
    Opcode::new(
        "rts",
        0xFFFF,
        0x000B,
        InstructionKind::Rts,
        ExecutionGroup::Co,
        2,
        true,
    ),
    Opcode::new(
        "rte",
        0xFFFF,
        0x002B,
        InstructionKind::Rte,
        ExecutionGroup::Co,
        5,
        true,
    ),
    Opcode::new(
        "nop",
        0xFFFF,
        0x0009,
        InstructionKind::Fallback,
        ExecutionGroup::Mt,
        1,
        false,
    ),
    Opcode::new(
        "braf rn",
        0xF0FF,
        0x0023,
        InstructionKind::Braf,
        ExecutionGroup::Co,
        2,
        true,
    ),
    Opcode::new(
        "bsrf rn",
        0xF0FF,
        0x0003,
        InstructionKind::Bsrf,
        ExecutionGroup::Co,
        2,
        true,
    ),
    Opcode::new(
        "jmp @rn",
        0xF0FF,
        0x402B,
        InstructionKind::Jmp,
        ExecutionGroup::Co,
        2,
        true,
    ),
    Opcode::new(
        "jsr @rn",
        0xF0FF,
        0x400B,
        InstructionKind::Jsr,
        ExecutionGroup::Co,
        2,
        true,
    ),
    Opcode::new(
        "mov rm,rn",
        0xF00F,
        0x6003,
        InstructionKind::MoveRegister,
        ExecutionGroup::Mt,
        1,
        false,
    ),
    Opcode::new(
        "bf",
        0xFF00,
        0x8B00,
        InstructionKind::BranchIfFalse,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "bf/s",
        0xFF00,
        0x8F00,
        InstructionKind::BranchIfFalseDelayed,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "bt",
        0xFF00,
        0x8900,
        InstructionKind::BranchIfTrue,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "bt/s",
        0xFF00,
        0x8D00,
        InstructionKind::BranchIfTrueDelayed,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "mova @(disp,pc),r0",
        0xFF00,
        0xC700,
        InstructionKind::Fallback,
        ExecutionGroup::Ex,
        1,
        true,
    ),
    Opcode::new(
        "bra",
        0xF000,
        0xA000,
        InstructionKind::Bra,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "bsr",
        0xF000,
        0xB000,
        InstructionKind::Bsr,
        ExecutionGroup::Br,
        1,
        true,
    ),
    Opcode::new(
        "mov #imm,rn",
        0xF000,
        0xE000,
        InstructionKind::MoveImmediate,
        ExecutionGroup::Ex,
        1,
        false,
    ),
    Opcode::new(
        "mov.w @(disp,pc),rn",
        0xF000,
        0x9000,
        InstructionKind::MoveWordPcRelative,
        ExecutionGroup::Ls,
        1,
        true,
    ),
    Opcode::new(
        "mov.l @(disp,pc),rn",
        0xF000,
        0xD000,
        InstructionKind::Fallback,
        ExecutionGroup::Ls,
        1,
        true,
    ),
    Opcode::new(
        "unhandled",
        0x0000,
        0x0000,
        InstructionKind::Fallback,
        ExecutionGroup::Co,
        1,
        false,
    ),
];

const CATCH_ALL: &Opcode = &OPCODES[OPCODES.len() - 1];

const fn assert_patterns_lie_within_masks() {
    let mut index = 0;
    while index < OPCODES.len() {
        assert!(
            OPCODES[index].pattern & !OPCODES[index].mask == 0,
            "opcode pattern sets bits outside its mask",
        );
        index += 1;
    }
}

const fn assert_table_ends_with_catch_all() {
    assert!(CATCH_ALL.mask == 0, "final opcode row must match every word");
    let mut index = 0;
    while index < OPCODES.len() - 1 {
        assert!(
            OPCODES[index].mask != 0,
            "only the final opcode row may have an empty mask",
        );
        index += 1;
    }
}

const _: () = assert_patterns_lie_within_masks();
const _: () = assert_table_ends_with_catch_all();

/// Decodes one instruction word against [`OPCODES`].
#[must_use]
pub fn decode(raw: u16) -> &'static Opcode {
    OPCODES
        .iter()
        .find(|opcode| raw & opcode.mask() == opcode.pattern())
        .unwrap_or(CATCH_ALL)
}

/// Destination register index encoded in bits 8..=11.
#[must_use]
pub const fn field_rn(raw: u16) -> usize {
    ((raw >> 8) & 0xF) as usize
}

/// Source register index encoded in bits 4..=7.
#[must_use]
pub const fn field_rm(raw: u16) -> usize {
    ((raw >> 4) & 0xF) as usize
}

/// Jump offset of a conditional branch, relative to its own address.
///
/// The 8-bit displacement is sign-extended, scaled to words and biased by
/// the architectural `pc + 4` fetch offset.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn cond_branch_offset(raw: u16) -> u32 {
    let displacement = (raw & 0xFF) as u8 as i8;
    (displacement as i32 * 2 + 4) as u32
}

/// Jump offset of `bra`/`bsr`, relative to the branch's own address.
///
/// The 12-bit displacement is sign-extended, scaled to words and biased by
/// the architectural `pc + 4` fetch offset.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn far_branch_offset(raw: u16) -> u32 {
    let displacement = (((raw & 0x0FFF) << 4) as i16) >> 4;
    (displacement as i32 * 2 + 4) as u32
}

/// Sign-extended immediate of `mov #imm,rn`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn move_immediate(raw: u16) -> u32 {
    (raw & 0xFF) as u8 as i8 as i32 as u32
}

/// Byte offset of a PC-relative word load, relative to its own address.
///
/// The 8-bit displacement is zero-extended, scaled to words and biased by
/// the architectural `pc + 4` fetch offset.
#[must_use]
pub const fn pc_word_displacement(raw: u16) -> u32 {
    (raw & 0xFF) as u32 * 2 + 4
}
