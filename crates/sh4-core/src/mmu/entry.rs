//! Typed key and entry records shared by both translation levels.

/// Page size held by one translation entry (2-bit `SZ` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum PageSize {
    /// 1 KiB page, 22 significant virtual-page-number bits.
    OneKiB = 0,
    /// 4 KiB page, 20 significant virtual-page-number bits.
    FourKiB = 1,
    /// 64 KiB page, 16 significant virtual-page-number bits.
    SixtyFourKiB = 2,
    /// 1 MiB page, 12 significant virtual-page-number bits.
    OneMiB = 3,
}

impl PageSize {
    /// Decodes a 2-bit `SZ` field; upper bits are ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::OneKiB,
            1 => Self::FourKiB,
            2 => Self::SixtyFourKiB,
            _ => Self::OneMiB,
        }
    }

    /// Returns the raw 2-bit `SZ` encoding.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Mask selecting the significant virtual-page-number bits for this size.
    #[must_use]
    pub const fn vpn_mask(self) -> u32 {
        match self {
            Self::OneKiB => 0xFFFF_FC00,
            Self::FourKiB => 0xFFFF_F000,
            Self::SixtyFourKiB => 0xFFFF_0000,
            Self::OneMiB => 0xFFF0_0000,
        }
    }

    /// Mask selecting the in-page offset bits for this size.
    #[must_use]
    pub const fn offset_mask(self) -> u32 {
        !self.vpn_mask()
    }

    /// Page length in bytes.
    #[must_use]
    pub const fn byte_len(self) -> u32 {
        self.offset_mask() + 1
    }
}

/// 2-bit second-level protection field (`PR`).
///
/// The upper bit grants user-mode access, the lower bit grants writes. The
/// first-level table keeps only the upper bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Protection {
    /// Readable in privileged mode only.
    PrivilegedReadOnly = 0,
    /// Readable and writable in privileged mode only.
    PrivilegedReadWrite = 1,
    /// Readable in both modes.
    ReadOnly = 2,
    /// Readable and writable in both modes.
    ReadWrite = 3,
}

impl Protection {
    /// Decodes a 2-bit `PR` field; upper bits are ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::PrivilegedReadOnly,
            1 => Self::PrivilegedReadWrite,
            2 => Self::ReadOnly,
            _ => Self::ReadWrite,
        }
    }

    /// Returns the raw 2-bit `PR` encoding.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns `true` when user-mode accesses are permitted (upper bit).
    #[must_use]
    pub const fn user_accessible(self) -> bool {
        (self.bits() & 2) != 0
    }

    /// Returns `true` when writes are permitted (lower bit).
    #[must_use]
    pub const fn writable(self) -> bool {
        (self.bits() & 1) != 0
    }
}

/// Lookup key shared by both translation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TlbKey {
    /// Virtual page number; masked to the entry's page-size width on compare.
    pub vpn: u32,
    /// Address-space identifier the mapping belongs to.
    pub asid: u8,
    /// Entry participates in lookups only while set.
    pub valid: bool,
}

impl TlbKey {
    /// Key that never matches any lookup.
    pub const INVALID: Self = Self {
        vpn: 0,
        asid: 0,
        valid: false,
    };

    /// Builds a valid key for the given page and address space.
    #[must_use]
    pub const fn valid(vpn: u32, asid: u8) -> Self {
        Self {
            vpn,
            asid,
            valid: true,
        }
    }

    /// Returns `true` when this key is valid and its page, at `size`
    /// granularity, contains `vaddr`. Address-space visibility is judged
    /// separately by the owning table.
    #[must_use]
    pub const fn covers(&self, size: PageSize, vaddr: u32) -> bool {
        self.valid && (self.vpn & size.vpn_mask()) == (vaddr & size.vpn_mask())
    }
}

/// Payload of one second-level (unified) translation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UtlbData {
    /// Physical page number; masked to the page-size width on use.
    pub ppn: u32,
    /// Page size governing both compare and compose masks.
    pub size: PageSize,
    /// Shared mappings match regardless of address-space identifier.
    pub shared: bool,
    /// Cacheability attribute, carried for the owning core's cache model.
    pub cacheable: bool,
    /// Two-bit protection field.
    pub protection: Protection,
    /// Three-bit space attribute, carried through refill unchanged.
    pub space_attr: u8,
    /// Timing-class bit, carried through refill unchanged.
    pub timing_class: bool,
    /// Set once the page has been written.
    pub dirty: bool,
}

impl UtlbData {
    /// Composes the physical address for `vaddr` under this mapping.
    #[must_use]
    pub const fn physical_address(&self, vaddr: u32) -> u32 {
        (self.ppn & self.size.vpn_mask()) | (vaddr & self.size.offset_mask())
    }
}

/// Payload of one first-level (instruction-only) translation entry.
///
/// The reduced shape a refill derives from a second-level hit: same page
/// fields, but only the upper protection bit survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ItlbData {
    /// Physical page number; masked to the page-size width on use.
    pub ppn: u32,
    /// Page size governing both compare and compose masks.
    pub size: PageSize,
    /// Shared mappings match regardless of address-space identifier.
    pub shared: bool,
    /// Cacheability attribute, carried for the owning core's cache model.
    pub cacheable: bool,
    /// Single-bit protection: user-mode fetches permitted.
    pub user_accessible: bool,
    /// Three-bit space attribute copied from the second level.
    pub space_attr: u8,
    /// Timing-class bit copied from the second level.
    pub timing_class: bool,
}

impl ItlbData {
    /// Re-encodes a second-level payload into the first-level shape.
    #[must_use]
    pub const fn from_utlb(data: &UtlbData) -> Self {
        Self {
            ppn: data.ppn,
            size: data.size,
            shared: data.shared,
            cacheable: data.cacheable,
            user_accessible: data.protection.user_accessible(),
            space_attr: data.space_attr,
            timing_class: data.timing_class,
        }
    }

    /// Composes the physical address for `vaddr` under this mapping.
    #[must_use]
    pub const fn physical_address(&self, vaddr: u32) -> u32 {
        (self.ppn & self.size.vpn_mask()) | (vaddr & self.size.offset_mask())
    }
}

/// One second-level table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UtlbEntry {
    /// Lookup key.
    pub key: TlbKey,
    /// Translation payload.
    pub data: UtlbData,
}

impl UtlbEntry {
    /// Entry that never matches any lookup.
    pub const INVALID: Self = Self {
        key: TlbKey::INVALID,
        data: UtlbData {
            ppn: 0,
            size: PageSize::OneKiB,
            shared: false,
            cacheable: false,
            protection: Protection::PrivilegedReadOnly,
            space_attr: 0,
            timing_class: false,
            dirty: false,
        },
    };
}

/// One first-level table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ItlbEntry {
    /// Lookup key.
    pub key: TlbKey,
    /// Translation payload.
    pub data: ItlbData,
}

impl ItlbEntry {
    /// Entry that never matches any lookup.
    pub const INVALID: Self = Self {
        key: TlbKey::INVALID,
        data: ItlbData {
            ppn: 0,
            size: PageSize::OneKiB,
            shared: false,
            cacheable: false,
            user_accessible: false,
            space_attr: 0,
            timing_class: false,
        },
    };
}
