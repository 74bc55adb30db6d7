//! Translation listing and fingerprint generator used for cross-host
//! comparison of translator output.

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use sh4_core::{
    standard_map, Area0, Area0Buses, CodeBlock, MemoryMap, Ram, Rom, Sh4, StandardRegions,
    UnmappedBus,
};
use thiserror as _;

fn map() -> MemoryMap {
    let area0 = Area0::new(
        Rom::from_image(vec![0_u8; 0x1000]),
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

fn load_words(cpu: &mut Sh4, base: u32, words: &[u16]) {
    for (index, word) in words.iter().enumerate() {
        let addr = base + u32::try_from(index).expect("program fits its window") * 2;
        cpu.write_phys::<u16>(addr, *word)
            .expect("program window is mapped RAM");
    }
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn render(block: &CodeBlock) -> String {
    let mut listing = format!(
        "block {:#010x}: {} instructions, {} cycles\n",
        block.base_pc(),
        block.instruction_count(),
        block.cycle_count(),
    );
    for (index, op) in block.ops().iter().enumerate() {
        listing.push_str(&format!("  {index:>2}: {op}\n"));
    }
    listing
}

fn listings() -> Vec<String> {
    let mut cpu = Sh4::new(map());

    // Leaf call: load, copy, call through r11 with a linked return address.
    load_words(&mut cpu, 0x0C00_0100, &[0xE10A, 0x6213, 0x4B0B, 0x0009]);
    // Poll loop: pc-relative word load, then branch back while T is clear.
    load_words(&mut cpu, 0x0C00_0200, &[0x9103, 0x8FFD, 0x0009]);
    // Handler exit: restore the saved status and return to the saved pc.
    load_words(&mut cpu, 0x0C00_0300, &[0x002B, 0x0009]);

    [0x8C00_0100_u32, 0x8C00_0200, 0x8C00_0300]
        .iter()
        .map(|base_pc| {
            let block = cpu
                .translate_block(*base_pc)
                .expect("demo programs translate cleanly");
            render(&block)
        })
        .collect()
}

fn main() {
    let listings = listings();

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for listing in &listings {
        print!("{listing}");
        hash_bytes(&mut hash, listing.as_bytes());
    }
    println!("fingerprint {hash:016x}");
}
