//! Priority-based exception and interrupt vectoring.
//!
//! Every recognized CPU event is a member of the closed [`ExceptionCode`]
//! enumeration; its priority level, tie-break order, and vector target come
//! from [`ExceptionCode::meta`], a total function, so an unknown code is
//! unrepresentable rather than a runtime integrity check. Selection between
//! simultaneously pending codes and the architectural entry sequence both
//! live here; latching and acceptance policy belong to the core facade.

use crate::state::{CpuContext, StatusRegister, RESET_PC};

/// Number of members of the closed exception-code enumeration.
pub const EXCEPTION_CODE_COUNT: usize = 63;

/// Handler-address displacement for user breaks and general CPU faults.
pub const VECTOR_OFFSET_GENERAL: u32 = 0x100;
/// Handler-address displacement for the TLB-miss exception classes.
pub const VECTOR_OFFSET_TLB_MISS: u32 = 0x400;
/// Handler-address displacement for NMI and all peripheral interrupts.
pub const VECTOR_OFFSET_INTERRUPT: u32 = 0x600;

/// Closed enumeration of every exception and interrupt source.
///
/// Declaration order is the canonical table order used as the final
/// tie-break between codes with equal priority level and order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ExceptionCode {
    // Resets and TLB multiple hits (level 1).
    PowerOnReset,
    ManualReset,
    HudiReset,
    InstTlbMultiHit,
    DataTlbMultiHit,
    // General CPU exceptions (level 2).
    UserBreakBefore,
    InstAddrError,
    InstTlbMiss,
    InstTlbProtViolation,
    GeneralIllegalInst,
    SlotIllegalInst,
    GeneralFpuDisable,
    SlotFpuDisable,
    DataAddrErrorRead,
    DataAddrErrorWrite,
    DataTlbMissRead,
    DataTlbMissWrite,
    DataTlbProtViolationRead,
    DataTlbProtViolationWrite,
    FpuException,
    InitialPageWrite,
    UnconditionalTrap,
    UserBreakAfter,
    // Non-maskable interrupt (level 3, single source).
    Nmi,
    // External interrupt request lines (level 4).
    Irl0,
    Irl1,
    Irl2,
    Irl3,
    Irl4,
    Irl5,
    Irl6,
    Irl7,
    Irl8,
    Irl9,
    Irl10,
    Irl11,
    Irl12,
    Irl13,
    Irl14,
    // On-chip peripheral interrupts (level 4).
    Tmu0Underflow,
    Tmu1Underflow,
    Tmu2Underflow,
    Tmu2InputCapture,
    RtcAlarm,
    RtcPeriodic,
    RtcCarry,
    SciReceiveError,
    SciReceiveFull,
    SciTransmitEmpty,
    SciTransmitEnd,
    WatchdogInterval,
    RefreshCompare,
    RefreshOverflow,
    GpioInterrupt,
    DmacTransferEnd0,
    DmacTransferEnd1,
    DmacTransferEnd2,
    DmacTransferEnd3,
    DmacAddressError,
    ScifReceiveError,
    ScifReceiveFull,
    ScifBreak,
    ScifTransmitEmpty,
}

/// Where the program counter vectors on entry for one exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorTarget {
    /// Fixed absolute entry address in uncached boot ROM (reset classes).
    Reset,
    /// Displacement added to the vector base register.
    Offset(u32),
}

/// Priority and vectoring metadata for one exception code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionMeta {
    level: u8,
    order: u8,
    target: VectorTarget,
}

impl ExceptionMeta {
    const fn new(level: u8, order: u8, target: VectorTarget) -> Self {
        Self {
            level,
            order,
            target,
        }
    }

    /// Priority level, `1..=4`, where 1 is the most urgent.
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Tie-break order within one priority level (lower wins).
    #[must_use]
    pub const fn order(&self) -> u8 {
        self.order
    }

    /// Vector target selecting the handler entry address.
    #[must_use]
    pub const fn target(&self) -> VectorTarget {
        self.target
    }
}

impl ExceptionCode {
    /// Every exception code in canonical table order.
    pub const ALL: [Self; EXCEPTION_CODE_COUNT] = [
        Self::PowerOnReset,
        Self::ManualReset,
        Self::HudiReset,
        Self::InstTlbMultiHit,
        Self::DataTlbMultiHit,
        Self::UserBreakBefore,
        Self::InstAddrError,
        Self::InstTlbMiss,
        Self::InstTlbProtViolation,
        Self::GeneralIllegalInst,
        Self::SlotIllegalInst,
        Self::GeneralFpuDisable,
        Self::SlotFpuDisable,
        Self::DataAddrErrorRead,
        Self::DataAddrErrorWrite,
        Self::DataTlbMissRead,
        Self::DataTlbMissWrite,
        Self::DataTlbProtViolationRead,
        Self::DataTlbProtViolationWrite,
        Self::FpuException,
        Self::InitialPageWrite,
        Self::UnconditionalTrap,
        Self::UserBreakAfter,
        Self::Nmi,
        Self::Irl0,
        Self::Irl1,
        Self::Irl2,
        Self::Irl3,
        Self::Irl4,
        Self::Irl5,
        Self::Irl6,
        Self::Irl7,
        Self::Irl8,
        Self::Irl9,
        Self::Irl10,
        Self::Irl11,
        Self::Irl12,
        Self::Irl13,
        Self::Irl14,
        Self::Tmu0Underflow,
        Self::Tmu1Underflow,
        Self::Tmu2Underflow,
        Self::Tmu2InputCapture,
        Self::RtcAlarm,
        Self::RtcPeriodic,
        Self::RtcCarry,
        Self::SciReceiveError,
        Self::SciReceiveFull,
        Self::SciTransmitEmpty,
        Self::SciTransmitEnd,
        Self::WatchdogInterval,
        Self::RefreshCompare,
        Self::RefreshOverflow,
        Self::GpioInterrupt,
        Self::DmacTransferEnd0,
        Self::DmacTransferEnd1,
        Self::DmacTransferEnd2,
        Self::DmacTransferEnd3,
        Self::DmacAddressError,
        Self::ScifReceiveError,
        Self::ScifReceiveFull,
        Self::ScifBreak,
        Self::ScifTransmitEmpty,
    ];

    /// Priority and vectoring metadata for this code.
    ///
    /// Total over the enumeration: every code has an entry, so "unknown
    /// exception code" is not a reachable state.
    #[must_use]
    pub const fn meta(self) -> ExceptionMeta {
        match self {
            Self::PowerOnReset | Self::HudiReset => ExceptionMeta::new(1, 1, VectorTarget::Reset),
            Self::ManualReset => ExceptionMeta::new(1, 2, VectorTarget::Reset),
            Self::InstTlbMultiHit => ExceptionMeta::new(1, 3, VectorTarget::Reset),
            Self::DataTlbMultiHit => ExceptionMeta::new(1, 4, VectorTarget::Reset),
            Self::UserBreakBefore => {
                ExceptionMeta::new(2, 0, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::InstAddrError => {
                ExceptionMeta::new(2, 1, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::InstTlbMiss => {
                ExceptionMeta::new(2, 2, VectorTarget::Offset(VECTOR_OFFSET_TLB_MISS))
            }
            Self::InstTlbProtViolation => {
                ExceptionMeta::new(2, 3, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::GeneralIllegalInst
            | Self::SlotIllegalInst
            | Self::GeneralFpuDisable
            | Self::SlotFpuDisable
            | Self::UnconditionalTrap => {
                ExceptionMeta::new(2, 4, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::DataAddrErrorRead | Self::DataAddrErrorWrite => {
                ExceptionMeta::new(2, 5, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::DataTlbMissRead | Self::DataTlbMissWrite => {
                ExceptionMeta::new(2, 6, VectorTarget::Offset(VECTOR_OFFSET_TLB_MISS))
            }
            Self::DataTlbProtViolationRead | Self::DataTlbProtViolationWrite => {
                ExceptionMeta::new(2, 7, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::FpuException => {
                ExceptionMeta::new(2, 8, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::InitialPageWrite => {
                ExceptionMeta::new(2, 9, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            Self::UserBreakAfter => {
                ExceptionMeta::new(2, 10, VectorTarget::Offset(VECTOR_OFFSET_GENERAL))
            }
            // The non-maskable interrupt has no secondary tie-break; it is the
            // only source at its level.
            Self::Nmi => ExceptionMeta::new(3, 0, VectorTarget::Offset(VECTOR_OFFSET_INTERRUPT)),
            // Every maskable peripheral source shares one level and order; the
            // canonical table position is the remaining tie-break.
            _ => ExceptionMeta::new(4, 2, VectorTarget::Offset(VECTOR_OFFSET_INTERRUPT)),
        }
    }

    /// Architectural event code latched into `EXPEVT`/`INTEVT` on entry.
    ///
    /// Distinct enumeration members may share one event code (the handler
    /// disambiguates through other registers), so this is not injective.
    #[must_use]
    pub const fn event_code(self) -> u16 {
        match self {
            Self::PowerOnReset | Self::HudiReset => 0x000,
            Self::ManualReset => 0x020,
            Self::InstTlbMiss | Self::DataTlbMissRead => 0x040,
            Self::DataTlbMissWrite => 0x060,
            Self::InitialPageWrite => 0x080,
            Self::InstTlbProtViolation | Self::DataTlbProtViolationRead => 0x0A0,
            Self::DataTlbProtViolationWrite => 0x0C0,
            Self::InstAddrError | Self::DataAddrErrorRead => 0x0E0,
            Self::DataAddrErrorWrite => 0x100,
            Self::FpuException => 0x120,
            Self::InstTlbMultiHit | Self::DataTlbMultiHit => 0x140,
            Self::UnconditionalTrap => 0x160,
            Self::GeneralIllegalInst => 0x180,
            Self::SlotIllegalInst => 0x1A0,
            Self::Nmi => 0x1C0,
            Self::UserBreakBefore | Self::UserBreakAfter => 0x1E0,
            Self::GeneralFpuDisable => 0x800,
            Self::SlotFpuDisable => 0x820,
            Self::Irl0 => 0x200,
            Self::Irl1 => 0x220,
            Self::Irl2 => 0x240,
            Self::Irl3 => 0x260,
            Self::Irl4 => 0x280,
            Self::Irl5 => 0x2A0,
            Self::Irl6 => 0x2C0,
            Self::Irl7 => 0x2E0,
            Self::Irl8 => 0x300,
            Self::Irl9 => 0x320,
            Self::Irl10 => 0x340,
            Self::Irl11 => 0x360,
            Self::Irl12 => 0x380,
            Self::Irl13 => 0x3A0,
            Self::Irl14 => 0x3C0,
            Self::Tmu0Underflow => 0x400,
            Self::Tmu1Underflow => 0x420,
            Self::Tmu2Underflow => 0x440,
            Self::Tmu2InputCapture => 0x460,
            Self::RtcAlarm => 0x480,
            Self::RtcPeriodic => 0x4A0,
            Self::RtcCarry => 0x4C0,
            Self::SciReceiveError => 0x4E0,
            Self::SciReceiveFull => 0x500,
            Self::SciTransmitEmpty => 0x520,
            Self::SciTransmitEnd => 0x540,
            Self::WatchdogInterval => 0x560,
            Self::RefreshCompare => 0x580,
            Self::RefreshOverflow => 0x5A0,
            Self::GpioInterrupt => 0x620,
            Self::DmacTransferEnd0 => 0x640,
            Self::DmacTransferEnd1 => 0x660,
            Self::DmacTransferEnd2 => 0x680,
            Self::DmacTransferEnd3 => 0x6A0,
            Self::DmacAddressError => 0x6C0,
            Self::ScifReceiveError => 0x700,
            Self::ScifReceiveFull => 0x720,
            Self::ScifBreak => 0x740,
            Self::ScifTransmitEmpty => 0x760,
        }
    }

    /// Returns `true` for reset-class codes, which vector to the fixed boot
    /// address and are accepted even while exceptions are blocked.
    #[must_use]
    pub const fn is_reset(self) -> bool {
        matches!(self.meta().target(), VectorTarget::Reset)
    }

    /// Returns `true` for interrupt-class codes (NMI and maskable sources).
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        self.meta().level() >= 3
    }

    /// Selects the most urgent of the given pending codes.
    ///
    /// Lowest priority level wins; within one level the lowest tie-break
    /// order wins; remaining ties resolve to the earliest code in canonical
    /// table order, so the result does not depend on `pending`'s ordering.
    #[must_use]
    pub fn highest_priority(pending: &[Self]) -> Option<Self> {
        pending.iter().copied().min_by_key(|code| {
            let meta = code.meta();
            (meta.level(), meta.order(), *code as u8)
        })
    }
}

/// Runs the architectural exception entry sequence on `context`.
///
/// As one indivisible unit: saves the program counter, status register, and
/// general register 7 into their shadow registers; sets the exception-block,
/// privileged-mode, and alternate-bank bits while clearing the FPU-disable
/// bit; then vectors the program counter to the handler address, which is
/// also returned.
pub fn enter(context: &mut CpuContext, code: ExceptionCode) -> u32 {
    context.set_spc(context.pc());
    context.set_ssr(context.sr());
    context.set_sgr(context.gpr(7));

    let mut sr = context.sr();
    sr.set_exceptions_blocked(true);
    sr.set_privileged(true);
    sr.set_alternate_bank(true);
    sr.set_fpu_disabled(false);
    context.set_sr(sr);

    let handler = match code.meta().target() {
        VectorTarget::Reset => RESET_PC,
        VectorTarget::Offset(offset) => context.vbr().wrapping_add(offset),
    };
    context.set_pc(handler);
    handler
}

/// Returns `true` when `context` currently refuses non-reset exception entry.
#[must_use]
pub const fn entry_blocked(sr: StatusRegister, code: ExceptionCode) -> bool {
    sr.exceptions_blocked() && !code.is_reset()
}

const fn assert_canonical_order_is_declaration_order() {
    let mut index = 0;
    while index < EXCEPTION_CODE_COUNT {
        assert!(
            ExceptionCode::ALL[index] as usize == index,
            "canonical table order must match declaration order"
        );
        index += 1;
    }
}

const fn assert_meta_table_is_well_formed() {
    let mut index = 0;
    while index < EXCEPTION_CODE_COUNT {
        let code = ExceptionCode::ALL[index];
        let meta = code.meta();
        assert!(
            meta.level() >= 1 && meta.level() <= 4,
            "priority levels span 1..=4"
        );
        match meta.target() {
            VectorTarget::Reset => {
                assert!(meta.level() == 1, "only level-1 codes vector to reset");
            }
            VectorTarget::Offset(offset) => {
                assert!(
                    offset == VECTOR_OFFSET_GENERAL
                        || offset == VECTOR_OFFSET_TLB_MISS
                        || offset == VECTOR_OFFSET_INTERRUPT,
                    "vector offsets are limited to the three architectural displacements"
                );
                assert!(meta.level() != 1, "level-1 codes never use an offset");
            }
        }
        if meta.level() >= 3 {
            match meta.target() {
                VectorTarget::Offset(offset) => {
                    assert!(
                        offset == VECTOR_OFFSET_INTERRUPT,
                        "interrupt-class codes vector through the interrupt displacement"
                    );
                }
                VectorTarget::Reset => panic!("interrupt-class codes never vector to reset"),
            }
        }
        index += 1;
    }
}

const _: () = assert_canonical_order_is_declaration_order();
const _: () = assert_meta_table_is_well_formed();
