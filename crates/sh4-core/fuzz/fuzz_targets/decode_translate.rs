#![no_main]

use libfuzzer_sys::fuzz_target;
use sh4_core::{decode, translate_block, AccessWidth, Fault, InstructionFetcher};

struct WordRom {
    base: u32,
    words: Vec<u16>,
}

impl InstructionFetcher for WordRom {
    fn fetch_word(&mut self, vaddr: u32) -> Result<u16, Fault> {
        let index = usize::try_from(vaddr.wrapping_sub(self.base) / 2)
            .map_err(|_| Fault::unmapped(vaddr, AccessWidth::U16))?;
        self.words
            .get(index)
            .copied()
            .ok_or(Fault::unmapped(vaddr, AccessWidth::U16))
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    for &word in &words {
        let _ = decode(word);
    }

    let mut fetcher = WordRom {
        base: 0x8C00_0000,
        words,
    };
    let _ = translate_block(&mut fetcher, 0x8C00_0000);
});
