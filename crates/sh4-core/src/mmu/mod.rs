//! Two-level virtual-address translation.
//!
//! A 64-entry second-level (unified) table backs a 4-entry first-level table
//! used only by instruction fetches. Data accesses probe the second level
//! directly; fetches probe the first level and, on a miss, refill one
//! direct-mapped slot from a second-level hit before retrying exactly once.
//! Segments with fixed mappings (`P1`, `P2`, `P4`) and all accesses while
//! translation is disabled bypass both tables.

/// Typed key and entry records shared by both translation levels.
pub mod entry;

pub use entry::{ItlbData, ItlbEntry, PageSize, Protection, TlbKey, UtlbData, UtlbEntry};

use crate::fault::{Fault, TlbMissKind};
use crate::trace::{TraceEvent, TraceSink};

/// Number of second-level (unified) translation entries.
pub const UTLB_ENTRY_COUNT: usize = 64;
/// Number of first-level (instruction-only) translation entries.
pub const ITLB_ENTRY_COUNT: usize = 4;

const UTLB_MULTIPLE_HIT: &str = "second-level TLB matched more than one entry";
const ITLB_MULTIPLE_HIT: &str = "first-level TLB matched more than one entry";
const REFILL_DID_NOT_HIT: &str = "first-level lookup missed again after refill";
const UTLB_SLOT_RANGE: &str = "second-level TLB slot index out of range";
const ITLB_SLOT_RANGE: &str = "first-level TLB slot index out of range";

/// Virtual-address segment selected by the top three address bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Segment {
    /// `0x0000_0000..=0x7FFF_FFFF`, translatable user space.
    P0,
    /// `0x8000_0000..=0x9FFF_FFFF`, fixed cached window onto external space.
    P1,
    /// `0xA000_0000..=0xBFFF_FFFF`, fixed uncached window onto external space.
    P2,
    /// `0xC000_0000..=0xDFFF_FFFF`, translatable privileged space.
    P3,
    /// `0xE000_0000..=0xFFFF_FFFF`, on-chip control space, never translated.
    P4,
}

impl Segment {
    /// Classifies a virtual address by its top three bits.
    #[must_use]
    pub const fn of(vaddr: u32) -> Self {
        match vaddr >> 29 {
            0..=3 => Self::P0,
            4 => Self::P1,
            5 => Self::P2,
            6 => Self::P3,
            _ => Self::P4,
        }
    }

    /// Returns `true` when addresses here consult the TLB while translation
    /// is enabled.
    #[must_use]
    pub const fn translated(self) -> bool {
        matches!(self, Self::P0 | Self::P3)
    }

    /// Default cacheability attribute for bypassed accesses.
    #[must_use]
    pub const fn default_cacheable(self) -> bool {
        !matches!(self, Self::P2 | Self::P4)
    }

    const fn user_accessible(self) -> bool {
        matches!(self, Self::P0)
    }
}

/// Direction of a data access, selecting the miss fault kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DataAccessKind {
    /// Load from memory.
    Read,
    /// Store to memory.
    Write,
}

impl DataAccessKind {
    /// Miss-fault kind reported when no entry matches this access.
    #[must_use]
    pub const fn miss_kind(self) -> TlbMissKind {
        match self {
            Self::Read => TlbMissKind::DataRead,
            Self::Write => TlbMissKind::DataWrite,
        }
    }
}

/// Result of translating a data access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DataTranslation {
    /// Physical address to hand to the dispatcher.
    pub physical: u32,
    /// Protection bits of the matched mapping.
    pub protection: Protection,
    /// Cacheability attribute of the matched mapping.
    pub cacheable: bool,
}

/// Result of translating an instruction fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FetchTranslation {
    /// Physical address to hand to the dispatcher.
    pub physical: u32,
    /// User-mode fetches permitted through the matched mapping.
    pub user_accessible: bool,
    /// Cacheability attribute of the matched mapping.
    pub cacheable: bool,
}

#[allow(clippy::cast_possible_truncation)]
const fn refill_slot(vaddr: u32) -> usize {
    (vaddr as usize) & (ITLB_ENTRY_COUNT - 1)
}

/// The translation unit: both lookup tables plus the control state that
/// governs matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mmu {
    utlb: [UtlbEntry; UTLB_ENTRY_COUNT],
    itlb: [ItlbEntry; ITLB_ENTRY_COUNT],
    asid: u8,
    address_translation: bool,
    single_virtual_space: bool,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu {
    /// Creates a translation unit with every entry invalid and address
    /// translation disabled, the power-on state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            utlb: [UtlbEntry::INVALID; UTLB_ENTRY_COUNT],
            itlb: [ItlbEntry::INVALID; ITLB_ENTRY_COUNT],
            asid: 0,
            address_translation: false,
            single_virtual_space: false,
        }
    }

    /// Currently active address-space identifier.
    #[must_use]
    pub const fn asid(&self) -> u8 {
        self.asid
    }

    /// Switches the active address-space identifier. Entries are not
    /// invalidated; non-shared mappings of other spaces simply stop matching.
    pub const fn set_asid(&mut self, asid: u8) {
        self.asid = asid;
    }

    /// Returns `true` while virtual accesses consult the lookup tables.
    #[must_use]
    pub const fn address_translation(&self) -> bool {
        self.address_translation
    }

    /// Enables or disables address translation.
    pub const fn set_address_translation(&mut self, enabled: bool) {
        self.address_translation = enabled;
    }

    /// Returns `true` in single-virtual-space mode, where privileged
    /// accesses match entries of every address space.
    #[must_use]
    pub const fn single_virtual_space(&self) -> bool {
        self.single_virtual_space
    }

    /// Enables or disables single-virtual-space mode.
    pub const fn set_single_virtual_space(&mut self, enabled: bool) {
        self.single_virtual_space = enabled;
    }

    /// Installs one second-level entry.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Integrity`] when `slot` is outside the table.
    pub const fn install_utlb(
        &mut self,
        slot: usize,
        key: TlbKey,
        data: UtlbData,
    ) -> Result<(), Fault> {
        if slot >= UTLB_ENTRY_COUNT {
            return Err(Fault::Integrity {
                detail: UTLB_SLOT_RANGE,
            });
        }
        self.utlb[slot] = UtlbEntry { key, data };
        Ok(())
    }

    /// Installs one first-level entry directly, bypassing the refill path.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Integrity`] when `slot` is outside the table.
    pub const fn install_itlb(
        &mut self,
        slot: usize,
        key: TlbKey,
        data: ItlbData,
    ) -> Result<(), Fault> {
        if slot >= ITLB_ENTRY_COUNT {
            return Err(Fault::Integrity {
                detail: ITLB_SLOT_RANGE,
            });
        }
        self.itlb[slot] = ItlbEntry { key, data };
        Ok(())
    }

    /// Invalidates every entry in both tables.
    pub fn invalidate_all(&mut self) {
        for entry in &mut self.utlb {
            entry.key.valid = false;
        }
        for entry in &mut self.itlb {
            entry.key.valid = false;
        }
    }

    /// Reads back one second-level entry, mainly for inspection and tests.
    #[must_use]
    pub fn utlb_entry(&self, slot: usize) -> Option<&UtlbEntry> {
        self.utlb.get(slot)
    }

    /// Reads back one first-level entry, mainly for inspection and tests.
    #[must_use]
    pub fn itlb_entry(&self, slot: usize) -> Option<&ItlbEntry> {
        self.itlb.get(slot)
    }

    const fn visible(&self, asid: u8, shared: bool, privileged: bool) -> bool {
        shared || (self.single_virtual_space && privileged) || asid == self.asid
    }

    /// Finds the second-level entry covering `vaddr`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Integrity`] when more than one entry matches; that
    /// state is unreachable from well-formed installs and has no recovery.
    pub fn utlb_probe(&self, vaddr: u32, privileged: bool) -> Result<Option<usize>, Fault> {
        let mut hit = None;
        for (index, entry) in self.utlb.iter().enumerate() {
            if !entry.key.covers(entry.data.size, vaddr)
                || !self.visible(entry.key.asid, entry.data.shared, privileged)
            {
                continue;
            }
            if hit.is_some() {
                return Err(Fault::Integrity {
                    detail: UTLB_MULTIPLE_HIT,
                });
            }
            hit = Some(index);
        }
        Ok(hit)
    }

    /// Finds the first-level entry covering `vaddr`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Integrity`] when more than one entry matches.
    pub fn itlb_probe(&self, vaddr: u32, privileged: bool) -> Result<Option<usize>, Fault> {
        let mut hit = None;
        for (index, entry) in self.itlb.iter().enumerate() {
            if !entry.key.covers(entry.data.size, vaddr)
                || !self.visible(entry.key.asid, entry.data.shared, privileged)
            {
                continue;
            }
            if hit.is_some() {
                return Err(Fault::Integrity {
                    detail: ITLB_MULTIPLE_HIT,
                });
            }
            hit = Some(index);
        }
        Ok(hit)
    }

    /// Translates a data access to a physical address.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::TlbMiss`] with the read or write data-miss kind when
    /// no entry covers `vaddr`, and [`Fault::Integrity`] on a multiple hit.
    pub fn translate_data(
        &self,
        vaddr: u32,
        kind: DataAccessKind,
        privileged: bool,
    ) -> Result<DataTranslation, Fault> {
        let segment = Segment::of(vaddr);
        if !self.address_translation || !segment.translated() {
            return Ok(DataTranslation {
                physical: vaddr,
                protection: Protection::ReadWrite,
                cacheable: segment.default_cacheable(),
            });
        }

        match self.utlb_probe(vaddr, privileged)? {
            Some(index) => {
                let entry = &self.utlb[index];
                Ok(DataTranslation {
                    physical: entry.data.physical_address(vaddr),
                    protection: entry.data.protection,
                    cacheable: entry.data.cacheable,
                })
            }
            None => Err(Fault::tlb_miss(kind.miss_kind(), vaddr)),
        }
    }

    /// Translates an instruction fetch to a physical address.
    ///
    /// On a first-level miss with a second-level hit, refills the
    /// direct-mapped slot selected by the low address bits and retries the
    /// first-level lookup exactly once, reporting the refill to `trace`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::TlbMiss`] with the instruction kind when neither
    /// level covers `vaddr`, and [`Fault::Integrity`] on a multiple hit or
    /// when the bounded retry misses again.
    pub fn translate_fetch(
        &mut self,
        vaddr: u32,
        privileged: bool,
        trace: &mut dyn TraceSink,
    ) -> Result<FetchTranslation, Fault> {
        let segment = Segment::of(vaddr);
        if !self.address_translation || !segment.translated() {
            return Ok(FetchTranslation {
                physical: vaddr,
                user_accessible: segment.user_accessible(),
                cacheable: segment.default_cacheable(),
            });
        }

        if let Some(index) = self.itlb_probe(vaddr, privileged)? {
            return Ok(Self::fetch_hit(&self.itlb[index], vaddr));
        }

        let Some(source_index) = self.utlb_probe(vaddr, privileged)? else {
            return Err(Fault::tlb_miss(TlbMissKind::Instruction, vaddr));
        };

        let source = self.utlb[source_index];
        let slot = refill_slot(vaddr);
        self.itlb[slot] = ItlbEntry {
            key: source.key,
            data: ItlbData::from_utlb(&source.data),
        };
        trace.record(TraceEvent::ItlbRefilled {
            slot,
            vpn: source.key.vpn & source.data.size.vpn_mask(),
        });

        // One refill cycle exactly; the copied entry must cover the address.
        match self.itlb_probe(vaddr, privileged)? {
            Some(index) => Ok(Self::fetch_hit(&self.itlb[index], vaddr)),
            None => Err(Fault::Integrity {
                detail: REFILL_DID_NOT_HIT,
            }),
        }
    }

    const fn fetch_hit(entry: &ItlbEntry, vaddr: u32) -> FetchTranslation {
        FetchTranslation {
            physical: entry.data.physical_address(vaddr),
            user_accessible: entry.data.user_accessible,
            cacheable: entry.data.cacheable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::entry::{ItlbData, PageSize, Protection, TlbKey, UtlbData};
    use super::{DataAccessKind, Fault, Mmu, Segment, TlbMissKind};
    use crate::trace::{NoopSink, RecordingSink, TraceEvent};

    const PAGE: UtlbData = UtlbData {
        ppn: 0x1C25_4000,
        size: PageSize::FourKiB,
        shared: false,
        cacheable: true,
        protection: Protection::ReadWrite,
        space_attr: 0,
        timing_class: false,
        dirty: false,
    };

    fn mmu_with_page(slot: usize, vpn: u32, asid: u8) -> Mmu {
        let mut mmu = Mmu::new();
        mmu.set_address_translation(true);
        mmu.install_utlb(slot, TlbKey::valid(vpn, asid), PAGE)
            .expect("slot within table");
        mmu
    }

    #[test]
    fn segments_split_on_the_top_three_bits() {
        assert_eq!(Segment::of(0x0000_0000), Segment::P0);
        assert_eq!(Segment::of(0x7FFF_FFFF), Segment::P0);
        assert_eq!(Segment::of(0x8C00_0000), Segment::P1);
        assert_eq!(Segment::of(0xA000_0000), Segment::P2);
        assert_eq!(Segment::of(0xC000_0000), Segment::P3);
        assert_eq!(Segment::of(0xE000_0000), Segment::P4);
        assert!(Segment::P3.translated());
        assert!(!Segment::P2.translated());
    }

    #[test]
    fn disabled_translation_passes_addresses_through() {
        let mmu = Mmu::new();

        let out = mmu
            .translate_data(0x0C12_3456, DataAccessKind::Read, true)
            .expect("bypass never faults");
        assert_eq!(out.physical, 0x0C12_3456);
        assert!(out.cacheable);
    }

    #[test]
    fn fixed_segments_bypass_even_with_translation_enabled() {
        let mmu = mmu_with_page(0, 0x0C25_4000, 0);

        let p2 = mmu
            .translate_data(0xA05F_8004, DataAccessKind::Write, true)
            .expect("fixed segment never faults");
        assert_eq!(p2.physical, 0xA05F_8004);
        assert!(!p2.cacheable);
    }

    #[test]
    fn data_hit_composes_physical_from_page_and_offset() {
        let mmu = mmu_with_page(9, 0x0C25_4000, 0);

        let out = mmu
            .translate_data(0x0C25_4A54, DataAccessKind::Read, false)
            .expect("entry covers this page");
        assert_eq!(out.physical, 0x1C25_4A54);
        assert_eq!(out.protection, Protection::ReadWrite);
    }

    #[test]
    fn data_miss_kind_follows_the_access_direction() {
        let mmu = mmu_with_page(0, 0x0C25_4000, 0);

        assert_eq!(
            mmu.translate_data(0x0C40_0000, DataAccessKind::Read, true),
            Err(Fault::tlb_miss(TlbMissKind::DataRead, 0x0C40_0000))
        );
        assert_eq!(
            mmu.translate_data(0x0C40_0000, DataAccessKind::Write, true),
            Err(Fault::tlb_miss(TlbMissKind::DataWrite, 0x0C40_0000))
        );
    }

    #[test]
    fn foreign_address_space_entries_stay_invisible() {
        let mut mmu = mmu_with_page(3, 0x0C25_4000, 7);
        mmu.set_asid(1);

        assert_eq!(mmu.utlb_probe(0x0C25_4000, true), Ok(None));

        mmu.set_asid(7);
        assert_eq!(mmu.utlb_probe(0x0C25_4000, false), Ok(Some(3)));
    }

    #[test]
    fn shared_entries_match_across_address_spaces() {
        let mut mmu = Mmu::new();
        mmu.set_address_translation(true);
        mmu.install_utlb(
            0,
            TlbKey::valid(0x0C25_4000, 9),
            UtlbData {
                shared: true,
                ..PAGE
            },
        )
        .expect("slot within table");
        mmu.set_asid(1);

        assert_eq!(mmu.utlb_probe(0x0C25_4000, false), Ok(Some(0)));
    }

    #[test]
    fn single_virtual_space_ignores_asid_only_when_privileged() {
        let mut mmu = mmu_with_page(4, 0x0C25_4000, 9);
        mmu.set_asid(1);
        mmu.set_single_virtual_space(true);

        assert_eq!(mmu.utlb_probe(0x0C25_4000, true), Ok(Some(4)));
        assert_eq!(mmu.utlb_probe(0x0C25_4000, false), Ok(None));
    }

    #[test]
    fn overlapping_valid_entries_are_an_integrity_violation() {
        let mut mmu = mmu_with_page(0, 0x0C25_4000, 0);
        mmu.install_utlb(1, TlbKey::valid(0x0C25_4000, 0), PAGE)
            .expect("slot within table");

        assert!(matches!(
            mmu.utlb_probe(0x0C25_4000, true),
            Err(Fault::Integrity { .. })
        ));
        assert!(matches!(
            mmu.translate_data(0x0C25_4000, DataAccessKind::Read, true),
            Err(Fault::Integrity { .. })
        ));
    }

    #[test]
    fn fetch_miss_reports_the_instruction_kind() {
        let mut mmu = Mmu::new();
        mmu.set_address_translation(true);

        assert_eq!(
            mmu.translate_fetch(0x0C25_4000, true, &mut NoopSink),
            Err(Fault::tlb_miss(TlbMissKind::Instruction, 0x0C25_4000))
        );
    }

    #[test]
    fn fetch_refills_the_direct_mapped_slot_and_retries() {
        let mut mmu = mmu_with_page(17, 0x0C25_4000, 0);
        let mut sink = RecordingSink::new();
        let vaddr = 0x0C25_4A02;

        let out = mmu
            .translate_fetch(vaddr, true, &mut sink)
            .expect("second level covers this page");
        assert_eq!(out.physical, 0x1C25_4A02);

        // Low two bits of the fetch address select the slot.
        let slot = 2;
        let refilled = mmu.itlb_entry(slot).expect("slot within table");
        assert!(refilled.key.valid);
        assert_eq!(refilled.key.vpn, 0x0C25_4000);
        assert_eq!(refilled.data, ItlbData::from_utlb(&PAGE));
        assert_eq!(
            sink.events(),
            [TraceEvent::ItlbRefilled {
                slot,
                vpn: 0x0C25_4000,
            }]
        );

        // Second fetch of the same page hits the first level directly.
        let again = mmu
            .translate_fetch(vaddr, true, &mut sink)
            .expect("first level now covers this page");
        assert_eq!(again.physical, out.physical);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn install_rejects_out_of_range_slots() {
        let mut mmu = Mmu::new();

        assert!(matches!(
            mmu.install_utlb(64, TlbKey::INVALID, PAGE),
            Err(Fault::Integrity { .. })
        ));
        assert!(matches!(
            mmu.install_itlb(4, TlbKey::INVALID, ItlbData::from_utlb(&PAGE)),
            Err(Fault::Integrity { .. })
        ));
    }

    #[test]
    fn invalidate_all_clears_both_levels() {
        let mut mmu = mmu_with_page(0, 0x0C25_4000, 0);
        mmu.translate_fetch(0x0C25_4000, true, &mut NoopSink)
            .expect("refill succeeds");

        mmu.invalidate_all();

        assert_eq!(mmu.utlb_probe(0x0C25_4000, true), Ok(None));
        assert_eq!(mmu.itlb_probe(0x0C25_4000, true), Ok(None));
    }
}
