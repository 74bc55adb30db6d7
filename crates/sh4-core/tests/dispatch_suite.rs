//! Physical dispatch suite: routing, mirror folding, and boundary faults
//! across the canonical region table.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]

use proptest::prelude::*;
use rstest as _;
use sh4_core::{
    standard_map, AccessWidth, Area0, Area0Buses, Fault, MemoryMap, Ram, Rom, Sh4,
    StandardRegions, UnmappedBus,
};
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const WIDTHS: [AccessWidth; 5] = [
    AccessWidth::U8,
    AccessWidth::U16,
    AccessWidth::U32,
    AccessWidth::F32,
    AccessWidth::F64,
];

fn map() -> MemoryMap {
    let mut bios_image = vec![0_u8; 0x1000];
    for (index, byte) in bios_image.iter_mut().enumerate() {
        *byte = index as u8;
    }
    let area0 = Area0::new(
        Rom::from_image(bios_image),
        Ram::new(0x2_0000),
        Area0Buses::default(),
    );
    standard_map(StandardRegions {
        on_chip: Box::new(UnmappedBus),
        area0,
        system_ram: Ram::new(0x10_0000),
        tex64: Box::new(UnmappedBus),
        tex32: Box::new(UnmappedBus),
        ta_fifo: Box::new(UnmappedBus),
    })
    .expect("canonical table is well formed")
}

fn region_of(map: &MemoryMap, addr: u32) -> &'static str {
    let hit = map.resolve(addr, AccessWidth::U8).expect("address is mapped");
    map.region_name(hit.region_index).expect("index from resolve")
}

#[test]
fn every_canonical_region_answers_a_probe() {
    let map = map();
    assert_eq!(map.region_count(), 7);

    assert_eq!(region_of(&map, 0xFF00_0000), "on-chip");
    assert_eq!(region_of(&map, 0x0C00_0000), "system-ram");
    assert_eq!(region_of(&map, 0x0500_0000), "texture-32");
    assert_eq!(region_of(&map, 0x0400_0000), "texture-64");
    assert_eq!(region_of(&map, 0x0000_0000), "area-0");
    assert_eq!(region_of(&map, 0x1000_0000), "ta-fifo");
    assert_eq!(region_of(&map, 0x7C00_0000), "oc-ram");
}

#[test]
fn all_five_widths_share_one_backing_store() {
    let mut cpu = Sh4::new(map());

    cpu.write_phys::<f64>(0x0C00_1000, -2.5).unwrap();
    // The cached view reads the very same bytes back.
    let bits = (-2.5_f64).to_bits();
    assert_eq!(
        cpu.read_phys::<u32>(0x8C00_1000).unwrap(),
        (bits & 0xFFFF_FFFF) as u32
    );
    assert_eq!(
        cpu.read_phys::<u32>(0x8C00_1004).unwrap(),
        (bits >> 32) as u32
    );

    cpu.write_phys::<u16>(0xAC00_1010, 0xBEEF).unwrap();
    assert_eq!(cpu.read_phys::<u8>(0x0C00_1010).unwrap(), 0xEF);
    assert!((cpu.read_phys::<f64>(0x0D00_1000).unwrap() - -2.5).abs() < f64::EPSILON);
}

#[test]
fn accesses_never_tear_across_a_region_edge() {
    let mut map = map();

    // Last byte would land one past the 32-bit texture window's end.
    assert_eq!(
        map.resolve(0x057F_FFFD, AccessWidth::U32),
        Err(Fault::unmapped(0x057F_FFFD, AccessWidth::U32))
    );
    assert!(map.resolve(0x057F_FFFC, AccessWidth::U32).is_ok());

    // Two adjacent mapped regions do not stitch a double together.
    assert!(map.resolve(0x0FFF_FFFC, AccessWidth::F64).is_err());
    assert!(map.resolve(0x0FFF_FFF8, AccessWidth::F64).is_ok());

    // A rejected write leaves the in-region bytes untouched.
    assert!(map.write_u32(0x0FFF_FFFE, 0xFFFF_FFFF).is_err());
    assert_eq!(map.read_u16(0x0FFF_FFFE).unwrap(), 0);
}

#[test]
fn wrapping_accesses_fault_instead_of_folding() {
    let map = map();
    assert_eq!(
        map.resolve(0xFFFF_FFFE, AccessWidth::U32),
        Err(Fault::unmapped(0xFFFF_FFFE, AccessWidth::U32))
    );
    assert!(map.resolve(0xFFFF_FFFE, AccessWidth::U16).is_ok());
}

#[test]
fn operand_cache_area_ends_where_the_uncached_alias_begins() {
    let map = map();
    assert!(map.resolve(0x7FFF_FFFC, AccessWidth::U32).is_ok());
    assert!(map.resolve(0x7FFF_FFFE, AccessWidth::U32).is_err());
}

#[test]
fn area0_routes_sub_windows_end_to_end() {
    let mut cpu = Sh4::new(map());

    // Boot ROM pattern byte through the uncached view.
    assert_eq!(cpu.read_phys::<u8>(0xA000_0010).unwrap(), 0x10);

    // Flash round-trips across views.
    cpu.write_phys::<u16>(0x0020_0004, 0x5AA5).unwrap();
    assert_eq!(cpu.read_phys::<u16>(0x8020_0004).unwrap(), 0x5AA5);

    // An unwired peripheral bus faults without routing elsewhere.
    let fault = cpu.read_phys::<u32>(0x005F_7800).unwrap_err();
    assert!(matches!(fault, Fault::Unimplemented { .. }));

    // Writes into the boot ROM fault and keep the offending value.
    let fault = cpu.write_phys::<u32>(0xA000_0010, 0xDEAD_BEEF).unwrap_err();
    assert_eq!(
        fault,
        Fault::Unimplemented {
            feature: "boot ROM is read-only",
            addr: 0x0000_0010,
            width: Some(AccessWidth::U32),
            value: Some(0xDEAD_BEEF),
        }
    );
}

#[test]
fn out_of_image_reads_surface_out_of_bounds() {
    let mut map = map();
    // The boot ROM sub-window is larger than this test's image; reads past
    // the image fault without being rerouted.
    assert_eq!(
        map.read_u16(0x0000_1000),
        Err(Fault::OutOfBounds {
            addr: 0x1000,
            width: AccessWidth::U16,
        })
    );
}

proptest! {
    #[test]
    fn dispatch_claims_at_most_one_region(addr in any::<u32>(), width_index in 0_usize..5) {
        let map = map();
        let width = WIDTHS[width_index];
        match map.resolve(addr, width) {
            Ok(hit) => {
                prop_assert!(hit.region_index < map.region_count());
                // Routing is a pure function of the table.
                prop_assert_eq!(map.resolve(addr, width), Ok(hit));
            }
            Err(fault) => {
                prop_assert_eq!(fault, Fault::unmapped(addr, width));
            }
        }
    }

    #[test]
    fn privileged_window_always_wins_the_scan(low in any::<u32>()) {
        let map = map();
        let addr = low | 0xE000_0000;
        // Under the 29-bit folding mask these addresses would alias into the
        // general windows; priority order must keep them on-chip.
        let hit = map.resolve(addr, AccessWidth::U8).unwrap();
        prop_assert_eq!(map.region_name(hit.region_index), Some("on-chip"));
    }
}
