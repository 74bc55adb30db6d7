/// Number of architecturally visible general-purpose registers (`R0..R15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;

/// Program-counter value loaded by every reset-class vector (uncached boot ROM base).
pub const RESET_PC: u32 = 0xA000_0000;

/// `SR` bit for the comparison/test flag (`T`).
pub const SR_T: u32 = 1 << 0;
/// `SR` bit disabling the floating-point unit (`FD`).
pub const SR_FD: u32 = 1 << 15;
/// `SR` bit blocking exception and interrupt acceptance (`BL`).
pub const SR_BL: u32 = 1 << 28;
/// `SR` bit selecting the alternate general-register bank (`RB`).
pub const SR_RB: u32 = 1 << 29;
/// `SR` bit for privileged processor mode (`MD`).
pub const SR_MD: u32 = 1 << 30;
/// Shift of the 4-bit interrupt-mask field (`IMASK`) within `SR`.
pub const SR_IMASK_SHIFT: u32 = 4;
/// Mask of the 4-bit interrupt-mask field (`IMASK`) within `SR`.
pub const SR_IMASK: u32 = 0xF << SR_IMASK_SHIFT;

/// Architecturally visible register identifier for IL operands and context access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Sh4Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
    Pc,
    Pr,
    Sr,
    Ssr,
    Spc,
    Sgr,
    Gbr,
    Vbr,
}

impl Sh4Register {
    /// Ordered list of the general-purpose registers (`R0..R15`).
    pub const GENERAL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    /// Decodes a 4-bit instruction register field into a general-purpose register.
    #[must_use]
    pub const fn general(bits: u8) -> Option<Self> {
        if (bits as usize) < GENERAL_REGISTER_COUNT {
            Some(Self::GENERAL[bits as usize])
        } else {
            None
        }
    }

    /// Returns the general-register file slot for this register, if it is one.
    #[must_use]
    pub const fn general_slot(self) -> Option<usize> {
        let ordinal = self as usize;
        if ordinal < GENERAL_REGISTER_COUNT {
            Some(ordinal)
        } else {
            None
        }
    }
}

impl core::fmt::Display for Sh4Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(slot) = self.general_slot() {
            return write!(f, "r{slot}");
        }
        let name = match self {
            Self::Pc => "pc",
            Self::Pr => "pr",
            Self::Sr => "sr",
            Self::Ssr => "ssr",
            Self::Spc => "spc",
            Self::Sgr => "sgr",
            Self::Gbr => "gbr",
            Self::Vbr => "vbr",
            _ => unreachable!(),
        };
        f.write_str(name)
    }
}

/// The `SR` status register as a typed 32-bit word.
///
/// Carries the processor mode bits consulted and rewritten by the exception
/// entry sequence: privileged mode (`MD`), exception blocking (`BL`), the
/// register-bank select (`RB`), and the FPU-disable bit (`FD`), plus the
/// interrupt-mask field and the `T` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusRegister(u32);

impl StatusRegister {
    /// Power-on value: privileged, alternate bank, exceptions blocked, all
    /// interrupt levels masked.
    pub const POWER_ON: Self = Self(SR_MD | SR_RB | SR_BL | SR_IMASK);

    /// Wraps a raw 32-bit `SR` value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw 32-bit `SR` value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when the processor is in privileged mode (`MD`).
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        (self.0 & SR_MD) != 0
    }

    /// Sets or clears privileged mode (`MD`).
    pub const fn set_privileged(&mut self, enabled: bool) {
        self.write_bit(SR_MD, enabled);
    }

    /// Returns `true` when exception and interrupt acceptance is blocked (`BL`).
    #[must_use]
    pub const fn exceptions_blocked(self) -> bool {
        (self.0 & SR_BL) != 0
    }

    /// Sets or clears the exception-block bit (`BL`).
    pub const fn set_exceptions_blocked(&mut self, enabled: bool) {
        self.write_bit(SR_BL, enabled);
    }

    /// Returns `true` when the alternate general-register bank is selected (`RB`).
    #[must_use]
    pub const fn alternate_bank(self) -> bool {
        (self.0 & SR_RB) != 0
    }

    /// Sets or clears the register-bank select bit (`RB`).
    pub const fn set_alternate_bank(&mut self, enabled: bool) {
        self.write_bit(SR_RB, enabled);
    }

    /// Returns `true` when the floating-point unit is disabled (`FD`).
    #[must_use]
    pub const fn fpu_disabled(self) -> bool {
        (self.0 & SR_FD) != 0
    }

    /// Sets or clears the FPU-disable bit (`FD`).
    pub const fn set_fpu_disabled(&mut self, enabled: bool) {
        self.write_bit(SR_FD, enabled);
    }

    /// Reads the 4-bit interrupt-mask field (`IMASK`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn interrupt_mask(self) -> u8 {
        ((self.0 & SR_IMASK) >> SR_IMASK_SHIFT) as u8
    }

    /// Writes the 4-bit interrupt-mask field (`IMASK`); upper bits are ignored.
    pub const fn set_interrupt_mask(&mut self, level: u8) {
        self.0 = (self.0 & !SR_IMASK) | (((level & 0xF) as u32) << SR_IMASK_SHIFT);
    }

    /// Returns the comparison/test flag (`T`).
    #[must_use]
    pub const fn t_flag(self) -> bool {
        (self.0 & SR_T) != 0
    }

    /// Sets or clears the comparison/test flag (`T`).
    pub const fn set_t_flag(&mut self, enabled: bool) {
        self.write_bit(SR_T, enabled);
    }

    const fn write_bit(&mut self, mask: u32, enabled: bool) {
        if enabled {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

impl Default for StatusRegister {
    fn default() -> Self {
        Self::POWER_ON
    }
}

/// Full architectural register context for one SH4-class CPU.
///
/// Owned exclusively by a single core instance; every field is reachable only
/// through accessors so invariants such as the reset values stay in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuContext {
    gpr: [u32; GENERAL_REGISTER_COUNT],
    pc: u32,
    pr: u32,
    sr: StatusRegister,
    ssr: StatusRegister,
    spc: u32,
    sgr: u32,
    gbr: u32,
    vbr: u32,
    expevt: u32,
    intevt: u32,
}

impl Default for CpuContext {
    fn default() -> Self {
        Self {
            gpr: [0; GENERAL_REGISTER_COUNT],
            pc: RESET_PC,
            pr: 0,
            sr: StatusRegister::POWER_ON,
            ssr: StatusRegister::POWER_ON,
            spc: 0,
            sgr: 0,
            gbr: 0,
            vbr: 0,
            expevt: 0,
            intevt: 0,
        }
    }
}

impl CpuContext {
    /// Restores the power-on register state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reads a general-purpose register by file slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= GENERAL_REGISTER_COUNT`.
    #[must_use]
    pub const fn gpr(&self, slot: usize) -> u32 {
        self.gpr[slot]
    }

    /// Writes a general-purpose register by file slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= GENERAL_REGISTER_COUNT`.
    pub const fn set_gpr(&mut self, slot: usize, value: u32) {
        self.gpr[slot] = value;
    }

    /// Reads any architecturally named register as its raw 32-bit value.
    #[must_use]
    pub const fn register(&self, reg: Sh4Register) -> u32 {
        if let Some(slot) = reg.general_slot() {
            return self.gpr[slot];
        }
        match reg {
            Sh4Register::Pc => self.pc,
            Sh4Register::Pr => self.pr,
            Sh4Register::Sr => self.sr.bits(),
            Sh4Register::Ssr => self.ssr.bits(),
            Sh4Register::Spc => self.spc,
            Sh4Register::Sgr => self.sgr,
            Sh4Register::Gbr => self.gbr,
            Sh4Register::Vbr => self.vbr,
            _ => unreachable!(),
        }
    }

    /// Writes any architecturally named register from a raw 32-bit value.
    pub const fn set_register(&mut self, reg: Sh4Register, value: u32) {
        if let Some(slot) = reg.general_slot() {
            self.gpr[slot] = value;
            return;
        }
        match reg {
            Sh4Register::Pc => self.pc = value,
            Sh4Register::Pr => self.pr = value,
            Sh4Register::Sr => self.sr = StatusRegister::from_bits(value),
            Sh4Register::Ssr => self.ssr = StatusRegister::from_bits(value),
            Sh4Register::Spc => self.spc = value,
            Sh4Register::Sgr => self.sgr = value,
            Sh4Register::Gbr => self.gbr = value,
            Sh4Register::Vbr => self.vbr = value,
            _ => unreachable!(),
        }
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Reads the procedure link register (`PR`).
    #[must_use]
    pub const fn pr(&self) -> u32 {
        self.pr
    }

    /// Writes the procedure link register (`PR`).
    pub const fn set_pr(&mut self, value: u32) {
        self.pr = value;
    }

    /// Reads the status register (`SR`).
    #[must_use]
    pub const fn sr(&self) -> StatusRegister {
        self.sr
    }

    /// Writes the status register (`SR`).
    pub const fn set_sr(&mut self, value: StatusRegister) {
        self.sr = value;
    }

    /// Mutable access to the status register (`SR`).
    pub const fn sr_mut(&mut self) -> &mut StatusRegister {
        &mut self.sr
    }

    /// Reads the saved status register (`SSR`).
    #[must_use]
    pub const fn ssr(&self) -> StatusRegister {
        self.ssr
    }

    /// Writes the saved status register (`SSR`).
    pub const fn set_ssr(&mut self, value: StatusRegister) {
        self.ssr = value;
    }

    /// Reads the saved program counter (`SPC`).
    #[must_use]
    pub const fn spc(&self) -> u32 {
        self.spc
    }

    /// Writes the saved program counter (`SPC`).
    pub const fn set_spc(&mut self, value: u32) {
        self.spc = value;
    }

    /// Reads the saved general register (`SGR`).
    #[must_use]
    pub const fn sgr(&self) -> u32 {
        self.sgr
    }

    /// Writes the saved general register (`SGR`).
    pub const fn set_sgr(&mut self, value: u32) {
        self.sgr = value;
    }

    /// Reads the global base register (`GBR`).
    #[must_use]
    pub const fn gbr(&self) -> u32 {
        self.gbr
    }

    /// Writes the global base register (`GBR`).
    pub const fn set_gbr(&mut self, value: u32) {
        self.gbr = value;
    }

    /// Reads the vector base register (`VBR`).
    #[must_use]
    pub const fn vbr(&self) -> u32 {
        self.vbr
    }

    /// Writes the vector base register (`VBR`).
    pub const fn set_vbr(&mut self, value: u32) {
        self.vbr = value;
    }

    /// Reads the exception event register (`EXPEVT`).
    #[must_use]
    pub const fn expevt(&self) -> u32 {
        self.expevt
    }

    /// Writes the exception event register (`EXPEVT`).
    pub const fn set_expevt(&mut self, value: u32) {
        self.expevt = value;
    }

    /// Reads the interrupt event register (`INTEVT`).
    #[must_use]
    pub const fn intevt(&self) -> u32 {
        self.intevt
    }

    /// Writes the interrupt event register (`INTEVT`).
    pub const fn set_intevt(&mut self, value: u32) {
        self.intevt = value;
    }
}
