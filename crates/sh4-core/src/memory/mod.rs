//! Physical memory model: region capability, ordered dispatcher, and the
//! canonical region layout.

/// Composite sub-dispatching handler for the area-0 window.
pub mod area0;
/// Guest physical-map address constants.
pub mod areas;
/// Ordered first-match region table and width-generic dispatch.
pub mod map;
/// Access widths, the region capability trait, and backing stores.
pub mod region;

pub use area0::{Area0, Area0Buses, Area0Window, UnmappedBus};
pub use areas::{
    AREA0_FIRST, AREA0_LAST, AREA0_MASK, AREA3_FIRST, AREA3_LAST, AREA3_MASK, AREA_P4_FIRST,
    AREA_P4_LAST, EXTERNAL_SPACE_MASK, OC_RAM_BYTES, OC_RAM_FIRST, OC_RAM_LAST, OC_RAM_MASK,
    SYSTEM_RAM_BYTES, TA_FIFO_POLY_FIRST, TA_FIFO_POLY_LAST, TEX32_FIRST, TEX32_LAST, TEX64_FIRST,
    TEX64_LAST,
};
pub use map::{MemoryMap, MemoryMapBuilder, RegionMapping, ResolvedAccess};
pub use region::{AccessWidth, BusData, Ram, RegionHandler, Rom};

use crate::fault::Fault;

/// Injected handlers for the canonical region layout.
///
/// The privileged on-chip window, both texture windows, and the
/// tile-accelerator FIFO belong to external collaborators and arrive as
/// boxed capabilities; system RAM and the operand-cache RAM are plain
/// in-core backing stores.
pub struct StandardRegions {
    /// Privileged on-chip window handler (store queues, mapped registers).
    pub on_chip: Box<dyn RegionHandler>,
    /// Area-0 composite window.
    pub area0: Area0,
    /// System RAM backing store.
    pub system_ram: Ram,
    /// 64-bit texture memory window handler.
    pub tex64: Box<dyn RegionHandler>,
    /// 32-bit texture memory window handler.
    pub tex32: Box<dyn RegionHandler>,
    /// Tile-accelerator polygon FIFO handler.
    pub ta_fifo: Box<dyn RegionHandler>,
}

/// Builds the canonical region table in its fixed priority order.
///
/// The privileged on-chip window leads the table: it is the only region
/// whose addresses are distinguished purely by the top three address bits,
/// and under the 29-bit folding mask those same addresses would alias into
/// the general windows behind it.
///
/// # Errors
///
/// Returns [`Fault::Integrity`] if the table fails builder validation
/// (cannot happen for the canonical constants; kept because construction
/// is fallible).
pub fn standard_map(regions: StandardRegions) -> Result<MemoryMap, Fault> {
    MemoryMap::builder()
        .region(RegionMapping::new(
            "on-chip",
            AREA_P4_FIRST,
            AREA_P4_LAST,
            0xFFFF_FFFF,
            0xFFFF_FFFF,
            regions.on_chip,
        ))
        .region(RegionMapping::new(
            "system-ram",
            AREA3_FIRST,
            AREA3_LAST,
            AREA3_MASK,
            EXTERNAL_SPACE_MASK,
            Box::new(regions.system_ram),
        ))
        .region(RegionMapping::new(
            "texture-32",
            TEX32_FIRST,
            TEX32_LAST,
            EXTERNAL_SPACE_MASK,
            EXTERNAL_SPACE_MASK,
            regions.tex32,
        ))
        .region(RegionMapping::new(
            "texture-64",
            TEX64_FIRST,
            TEX64_LAST,
            EXTERNAL_SPACE_MASK,
            EXTERNAL_SPACE_MASK,
            regions.tex64,
        ))
        .region(RegionMapping::new(
            "area-0",
            AREA0_FIRST,
            AREA0_LAST,
            EXTERNAL_SPACE_MASK,
            EXTERNAL_SPACE_MASK,
            Box::new(regions.area0),
        ))
        .region(RegionMapping::new(
            "ta-fifo",
            TA_FIFO_POLY_FIRST,
            TA_FIFO_POLY_LAST,
            EXTERNAL_SPACE_MASK,
            EXTERNAL_SPACE_MASK,
            regions.ta_fifo,
        ))
        .region(RegionMapping::new(
            "oc-ram",
            OC_RAM_FIRST,
            OC_RAM_LAST,
            OC_RAM_MASK,
            0xFFFF_FFFF,
            Box::new(Ram::new(OC_RAM_BYTES)),
        ))
        .build()
}
