//! Intermediate-language operations and the block container they fill.
//!
//! A translated block is an append-only list of [`IlOp`] values together
//! with the issue-cycle total accumulated while it was built. Branches use
//! a prepare/commit split: the jump target (and, for conditional branches,
//! the fall-through target and T-flag polarity) is latched first, any delay
//! slot work is appended, and a final commit op performs the transfer. The
//! latched state survives the slot untouched even if the slot writes the
//! registers the target was computed from.

use crate::state::Sh4Register;
use crate::timing::{ExecutionGroup, IssuePipeline};

/// One intermediate-language operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IlOp {
    /// Hand the raw instruction word to the execution backend unchanged.
    Fallback {
        /// Instruction word to interpret.
        raw: u16,
    },
    /// Latch the jump target as `base + offset`, read at this point.
    PrepareJump {
        /// Register supplying the base address.
        base: Sh4Register,
        /// Constant added to the base.
        offset: u32,
    },
    /// Latch the fall-through target of a conditional branch.
    PrepareAltJump {
        /// Address executed when the branch is not taken.
        target: u32,
    },
    /// Latch the branch condition from the current T flag.
    SetCondFromT {
        /// T-flag value that takes the branch.
        expected: bool,
    },
    /// Transfer control to the latched jump target.
    CommitJump,
    /// Transfer control to the latched jump target when the latched
    /// condition held, otherwise to the latched fall-through target.
    CommitJumpConditional,
    /// Copy one register into another.
    CopyReg {
        /// Source register.
        src: Sh4Register,
        /// Destination register.
        dst: Sh4Register,
    },
    /// Copy a register into the status register, applying the mode and
    /// bank side effects a status write implies.
    RestoreStatus {
        /// Register holding the saved status value.
        src: Sh4Register,
    },
    /// Add a constant to a register in place.
    AddConst {
        /// Register updated in place.
        reg: Sh4Register,
        /// Constant added.
        value: u32,
    },
    /// Overwrite a register with a constant.
    SetConst {
        /// Register written.
        reg: Sh4Register,
        /// Value stored.
        value: u32,
    },
    /// Load a 16-bit value from a constant address into a register.
    LoadConstAddr16 {
        /// Guest address read at run time.
        addr: u32,
        /// Register receiving the zero-extended value.
        reg: Sh4Register,
    },
    /// Sign-extend the low 16 bits of a register in place.
    SignExtend16 {
        /// Register updated in place.
        reg: Sh4Register,
    },
}

impl core::fmt::Display for IlOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fallback { raw } => write!(f, "fallback {raw:#06x}"),
            Self::PrepareJump { base, offset } => {
                write!(f, "prepare_jump {base}, {offset:#x}")
            }
            Self::PrepareAltJump { target } => {
                write!(f, "prepare_alt_jump {target:#010x}")
            }
            Self::SetCondFromT { expected } => write!(f, "set_cond_from_t {expected}"),
            Self::CommitJump => write!(f, "jump"),
            Self::CommitJumpConditional => write!(f, "jump_cond"),
            Self::CopyReg { src, dst } => write!(f, "copy {src}, {dst}"),
            Self::RestoreStatus { src } => write!(f, "restore_sr {src}"),
            Self::AddConst { reg, value } => write!(f, "add {value:#x}, {reg}"),
            Self::SetConst { reg, value } => write!(f, "set {value:#x}, {reg}"),
            Self::LoadConstAddr16 { addr, reg } => {
                write!(f, "load16 @{addr:#010x}, {reg}")
            }
            Self::SignExtend16 { reg } => write!(f, "exts16 {reg}"),
        }
    }
}

/// Append-only container for one translated block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CodeBlock {
    base_pc: u32,
    ops: Vec<IlOp>,
    cycle_count: u32,
    instruction_count: usize,
    pipeline: IssuePipeline,
}

impl CodeBlock {
    /// Creates an empty block starting at `base_pc`.
    #[must_use]
    pub const fn new(base_pc: u32) -> Self {
        Self {
            base_pc,
            ops: Vec::new(),
            cycle_count: 0,
            instruction_count: 0,
            pipeline: IssuePipeline::new(),
        }
    }

    /// Guest address of the block's first instruction.
    #[must_use]
    pub const fn base_pc(&self) -> u32 {
        self.base_pc
    }

    /// Operations appended so far, in emission order.
    #[must_use]
    pub fn ops(&self) -> &[IlOp] {
        &self.ops
    }

    /// Issue cycles accumulated so far.
    #[must_use]
    pub const fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Guest instructions charged so far, delay slots included.
    #[must_use]
    pub const fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Number of operations appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` while no operation has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Appends one operation.
    pub fn push(&mut self, op: IlOp) {
        self.ops.push(op);
    }

    /// Charges one guest instruction against the block's cycle total,
    /// applying the dual-issue pairing credit.
    pub fn charge(&mut self, group: ExecutionGroup, issue_cycles: u32) {
        let cost = self.pipeline.charge(group, issue_cycles);
        self.cycle_count = self.cycle_count.saturating_add(cost);
        self.instruction_count += 1;
    }
}
