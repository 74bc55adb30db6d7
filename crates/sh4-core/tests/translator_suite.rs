//! Translator suite: prepare/slot/commit ordering across every delayed
//! branch form, slot violations, and whole-block translation through the
//! fetch-translation path.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use rstest as _;
use sh4_core::{
    standard_map, translate_one, AccessWidth, Area0, Area0Buses, CodeBlock, Fault, IlOp,
    InstructionFetcher, MemoryMap, PageSize, Protection, Ram, Rom, Sh4, StandardRegions, TlbKey,
    TraceEvent, TraceSink, UnmappedBus, UtlbData,
};
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const NOP: u16 = 0x0009;
const BASE: u32 = 0x8C01_0000;

/// Every delayed-branch encoding the decoder recognizes, register forms
/// pointed at `r10`.
const DELAYED_BRANCHES: [u16; 10] = [
    0x000B, // rts
    0x002B, // rte
    0x0A23, // braf r10
    0x0A03, // bsrf r10
    0x4A2B, // jmp @r10
    0x4A0B, // jsr @r10
    0xA010, // bra
    0xB010, // bsr
    0x8F03, // bf/s
    0x8D03, // bt/s
];

struct WordRom {
    base: u32,
    words: Vec<u16>,
}

impl WordRom {
    fn new(base: u32, words: &[u16]) -> Self {
        Self {
            base,
            words: words.to_vec(),
        }
    }
}

impl InstructionFetcher for WordRom {
    fn fetch_word(&mut self, vaddr: u32) -> Result<u16, Fault> {
        let index = usize::try_from(vaddr.wrapping_sub(self.base) / 2).unwrap();
        self.words
            .get(index)
            .copied()
            .ok_or(Fault::unmapped(vaddr, AccessWidth::U16))
    }
}

#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<TraceEvent>>>);

impl SharedSink {
    fn events(&self) -> Vec<TraceEvent> {
        self.0.borrow().clone()
    }
}

impl TraceSink for SharedSink {
    fn record(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

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
        cpu.write_phys::<u16>(base + (index as u32) * 2, *word)
            .unwrap();
    }
}

fn is_commit(op: &IlOp) -> bool {
    matches!(op, IlOp::CommitJump | IlOp::CommitJumpConditional)
}

#[test]
fn every_delayed_branch_orders_prepare_slot_commit() {
    for word in DELAYED_BRANCHES {
        let mut rom = WordRom::new(BASE, &[word, NOP]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();
        assert!(!continues, "{word:#06x}");

        let ops = block.ops();
        assert!(
            matches!(ops[0], IlOp::PrepareJump { .. }),
            "{word:#06x} must latch its target first"
        );
        let slot = ops
            .iter()
            .position(|op| matches!(op, IlOp::Fallback { raw } if *raw == NOP))
            .unwrap_or_else(|| panic!("{word:#06x} dropped its slot instruction"));
        let commit = ops
            .iter()
            .position(is_commit)
            .unwrap_or_else(|| panic!("{word:#06x} never committed"));
        assert!(slot < commit, "{word:#06x}");
        assert_eq!(commit, ops.len() - 1, "{word:#06x}");
        assert_eq!(block.instruction_count(), 2, "{word:#06x}");
    }
}

#[test]
fn immediate_conditional_branches_skip_the_slot() {
    for (word, expected) in [(0x8B03_u16, false), (0x8903_u16, true)] {
        // One mapped word: a slot fetch would fault, proving none happens.
        let mut rom = WordRom::new(BASE, &[word]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();
        assert!(!continues);

        let ops = block.ops();
        assert!(ops.iter().all(|op| !matches!(op, IlOp::Fallback { .. })));
        assert_eq!(ops.last(), Some(&IlOp::CommitJumpConditional));
        assert!(ops
            .iter()
            .any(|op| matches!(op, IlOp::PrepareAltJump { target } if *target == BASE + 2)));
        assert!(ops
            .iter()
            .any(|op| matches!(op, IlOp::SetCondFromT { expected: e } if *e == expected)));
    }
}

#[test]
fn control_transfer_in_a_slot_faults_at_the_slot_address_without_commit() {
    // Real hardware raises the dedicated slot-illegal exception here; the
    // translator reports the generic unimplemented-feature fault tagged with
    // the slot address and leaves the vectoring decision to the host.
    for slot_word in [0xA005_u16, 0x000B, 0x4A2B, 0xC701] {
        let mut rom = WordRom::new(BASE, &[0x000B, slot_word]);
        let mut block = CodeBlock::new(BASE);

        let fault = translate_one(&mut rom, &mut block, BASE).unwrap_err();
        assert_eq!(
            fault,
            Fault::unimplemented_instruction(
                "pc-relative instruction in a delay slot",
                BASE + 2,
            ),
            "{slot_word:#06x}"
        );
        assert!(!block.ops().iter().any(is_commit), "{slot_word:#06x}");
        // The enclosing branch was already charged when the slot aborted.
        assert_eq!(block.instruction_count(), 1, "{slot_word:#06x}");
    }
}

#[test]
fn blocks_end_exactly_at_the_first_control_transfer() {
    let sink = SharedSink::default();
    let mut cpu = Sh4::with_trace_sink(map(), Box::new(sink.clone()));
    // mov #1,r1; mov r1,r2; rts; nop
    load_words(&mut cpu, 0x0C00_0100, &[0xE101, 0x6213, 0x000B, NOP]);

    let block = cpu.translate_block(0x8C00_0100).unwrap();

    assert_eq!(block.base_pc(), 0x8C00_0100);
    assert_eq!(block.instruction_count(), 4);
    // The register move pairs with the immediate load; the return and its
    // slot issue separately.
    assert_eq!(block.cycle_count(), 4);
    assert_eq!(block.ops().last(), Some(&IlOp::CommitJump));
    assert_eq!(
        sink.events(),
        [TraceEvent::BlockTranslated {
            base_pc: 0x8C00_0100,
            instruction_count: 4,
            cycle_count: 4,
        }]
    );
}

#[test]
fn translation_faults_propagate_with_the_faulting_address() {
    let mut cpu = Sh4::new(map());
    // Uncached view of a hole in the physical map.
    let fault = cpu.translate_block(0x9800_0000).unwrap_err();
    assert_eq!(fault, Fault::unmapped(0x9800_0000, AccessWidth::U16));
}

#[test]
fn straight_line_code_ends_when_the_fetch_runs_off_the_map() {
    let mut cpu = Sh4::new(map());
    // The test ROM image holds zero words, which translate as fallbacks;
    // the fetch one past the image faults and the partial block is
    // discarded along the way.
    let fault = cpu.translate_block(0x8000_0FFC).unwrap_err();
    assert_eq!(
        fault,
        Fault::OutOfBounds {
            addr: 0x1000,
            width: AccessWidth::U16,
        }
    );
}

#[test]
fn fetches_translate_through_the_first_level_during_block_building() {
    let sink = SharedSink::default();
    let mut cpu = Sh4::with_trace_sink(map(), Box::new(sink.clone()));
    cpu.mmu_mut().set_address_translation(true);
    cpu.mmu_mut().set_asid(9);
    // mov #5,r0; rts; nop, reachable only through the mapping below.
    load_words(&mut cpu, 0x0C00_3000, &[0xE005, 0x000B, NOP]);
    cpu.mmu_mut()
        .install_utlb(
            30,
            TlbKey::valid(0x0040_3000, 9),
            UtlbData {
                ppn: 0x0C00_3000,
                size: PageSize::FourKiB,
                shared: false,
                cacheable: true,
                protection: Protection::ReadWrite,
                space_attr: 0,
                timing_class: false,
                dirty: true,
            },
        )
        .unwrap();

    let block = cpu.translate_block(0x0040_3000).unwrap();

    assert_eq!(block.instruction_count(), 3);
    assert_eq!(block.cycle_count(), 4);
    assert!(cpu.mmu().itlb_entry(0).unwrap().key.valid);
    assert_eq!(
        sink.events(),
        [
            TraceEvent::ItlbRefilled {
                slot: 0,
                vpn: 0x0040_3000,
            },
            TraceEvent::BlockTranslated {
                base_pc: 0x0040_3000,
                instruction_count: 3,
                cycle_count: 4,
            },
        ]
    );
}

proptest! {
    #[test]
    fn any_single_word_translates_and_terminates_consistently(word in any::<u16>()) {
        let mut rom = WordRom::new(BASE, &[word, NOP, NOP]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        let has_commit = block.ops().iter().any(is_commit);
        prop_assert_eq!(continues, !has_commit);
        // One instruction, or two when a delay slot rode along.
        prop_assert!(matches!(block.instruction_count(), 1 | 2));
        if block.instruction_count() == 2 {
            prop_assert!(!continues);
        }
        prop_assert!(block.cycle_count() >= 1);
    }
}
