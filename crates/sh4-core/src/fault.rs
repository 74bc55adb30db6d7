use thiserror::Error;

use crate::exception::ExceptionCode;
use crate::memory::AccessWidth;

/// Access kind that produced a translation miss.
///
/// Each kind vectors through a distinct exception code, so the translation
/// unit must report which side of the pipeline missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TlbMissKind {
    /// Data-side load missed in the second-level table.
    DataRead,
    /// Data-side store missed in the second-level table.
    DataWrite,
    /// Instruction fetch missed in both translation levels.
    Instruction,
}

impl TlbMissKind {
    /// Exception code this miss kind vectors through.
    #[must_use]
    pub const fn exception_code(self) -> ExceptionCode {
        match self {
            Self::DataRead => ExceptionCode::DataTlbMissRead,
            Self::DataWrite => ExceptionCode::DataTlbMissWrite,
            Self::Instruction => ExceptionCode::InstTlbMiss,
        }
    }
}

impl core::fmt::Display for TlbMissKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::DataRead => "data-read",
            Self::DataWrite => "data-write",
            Self::Instruction => "instruction",
        };
        f.write_str(name)
    }
}

/// Fault taxonomy raised by the dispatcher, translation unit, exception
/// controller, and translator.
///
/// Every fault propagates synchronously to the calling driver; nothing in
/// the core catches one silently. `TlbMiss` is the only guest-recoverable
/// kind; the facade vectors the exception controller before handing the
/// fault back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Fault {
    /// Unmapped address, unhandled sub-window, or an intentionally
    /// simplified hardware corner case.
    #[error("unimplemented feature: {feature} at address {addr:#010x}")]
    Unimplemented {
        /// Names the missing capability.
        feature: &'static str,
        /// Faulting guest address (or delay-slot address for translator
        /// faults).
        addr: u32,
        /// Access width, when the fault came from a sized access.
        width: Option<AccessWidth>,
        /// Value being written, when the fault came from a store.
        value: Option<u64>,
    },
    /// A state that must be unreachable given correct inputs: duplicate TLB
    /// hits, a second refill miss, a malformed region table.
    #[error("integrity violation: {detail}")]
    Integrity {
        /// Names the broken invariant.
        detail: &'static str,
    },
    /// Byte range exceeds a narrower sub-region's legal window even though
    /// the outer region matched.
    #[error("address {addr:#010x} out of bounds for {width} access")]
    OutOfBounds {
        /// Region-local faulting address.
        addr: u32,
        /// Width of the overrunning access.
        width: AccessWidth,
    },
    /// Expected, guest-recoverable translation miss.
    #[error("{kind} TLB miss at virtual address {vaddr:#010x}")]
    TlbMiss {
        /// Which access kind missed.
        kind: TlbMissKind,
        /// Virtual address that failed to translate.
        vaddr: u32,
    },
}

impl Fault {
    /// Fault for an access no region claims (or one that straddles two).
    #[must_use]
    pub const fn unmapped(addr: u32, width: AccessWidth) -> Self {
        Self::Unimplemented {
            feature: "memory map has no region for this access",
            addr,
            width: Some(width),
            value: None,
        }
    }

    /// Fault for a read a claimed window cannot serve.
    #[must_use]
    pub const fn unimplemented_read(feature: &'static str, addr: u32, width: AccessWidth) -> Self {
        Self::Unimplemented {
            feature,
            addr,
            width: Some(width),
            value: None,
        }
    }

    /// Fault for a write a claimed window cannot accept; keeps the value for
    /// the diagnostic.
    #[must_use]
    pub const fn unimplemented_write(
        feature: &'static str,
        addr: u32,
        width: AccessWidth,
        value: u64,
    ) -> Self {
        Self::Unimplemented {
            feature,
            addr,
            width: Some(width),
            value: Some(value),
        }
    }

    /// Fault for an instruction form the translator declines to handle.
    #[must_use]
    pub const fn unimplemented_instruction(feature: &'static str, addr: u32) -> Self {
        Self::Unimplemented {
            feature,
            addr,
            width: None,
            value: None,
        }
    }

    /// Fault for a translation miss of the given kind.
    #[must_use]
    pub const fn tlb_miss(kind: TlbMissKind, vaddr: u32) -> Self {
        Self::TlbMiss { kind, vaddr }
    }

    /// `true` for faults the guest is expected to handle and resume from.
    ///
    /// Everything else halts forward progress of the emulated run.
    #[must_use]
    pub const fn is_guest_recoverable(&self) -> bool {
        matches!(self, Self::TlbMiss { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, TlbMissKind};
    use crate::exception::ExceptionCode;
    use crate::memory::AccessWidth;

    #[test]
    fn miss_kinds_map_to_their_exception_codes() {
        assert_eq!(
            TlbMissKind::DataRead.exception_code(),
            ExceptionCode::DataTlbMissRead
        );
        assert_eq!(
            TlbMissKind::DataWrite.exception_code(),
            ExceptionCode::DataTlbMissWrite
        );
        assert_eq!(
            TlbMissKind::Instruction.exception_code(),
            ExceptionCode::InstTlbMiss
        );
    }

    #[test]
    fn only_tlb_misses_are_guest_recoverable() {
        assert!(Fault::tlb_miss(TlbMissKind::DataRead, 0x0c00_0000).is_guest_recoverable());
        assert!(!Fault::unmapped(0x2000_0000, AccessWidth::U32).is_guest_recoverable());
        assert!(!Fault::Integrity {
            detail: "duplicate hit",
        }
        .is_guest_recoverable());
        assert!(!Fault::OutOfBounds {
            addr: 0x0100_0000,
            width: AccessWidth::U8,
        }
        .is_guest_recoverable());
    }

    #[test]
    fn diagnostics_name_the_address_and_kind() {
        let unmapped = Fault::unmapped(0x2000_0000, AccessWidth::U32).to_string();
        assert!(unmapped.contains("0x20000000"));
        assert!(unmapped.contains("unimplemented"));

        let miss = Fault::tlb_miss(TlbMissKind::Instruction, 0x0040_1000).to_string();
        assert!(miss.contains("instruction"));
        assert!(miss.contains("0x00401000"));

        let oob = Fault::OutOfBounds {
            addr: 0x00ff_fffe,
            width: AccessWidth::F64,
        }
        .to_string();
        assert!(oob.contains("double"));
        assert!(oob.contains("out of bounds"));
    }

    #[test]
    fn write_faults_keep_the_value() {
        let fault =
            Fault::unimplemented_write("boot ROM is read-only", 0x0000_0010, AccessWidth::U32, 7);
        assert_eq!(
            fault,
            Fault::Unimplemented {
                feature: "boot ROM is read-only",
                addr: 0x0000_0010,
                width: Some(AccessWidth::U32),
                value: Some(7),
            }
        );
    }
}
