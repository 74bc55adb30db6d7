//! Guest-instruction translation into IL blocks.
//!
//! [`translate_one`] decodes the word at `pc`, charges its issue cost,
//! appends the matching IL and reports whether the block continues past it.
//! Delayed branches translate their slot instruction between the prepare
//! and commit ops, so the latched target always reflects pre-branch
//! register state. A slot instruction that itself reads the program counter
//! aborts translation with a fault tagged with the slot's address.
//!
//! The ops assume the execution backend keeps the architectural program
//! counter current while a block runs; fallback interpretation requires
//! that anyway.

use crate::decode::{self, InstructionKind, Opcode};
use crate::fault::Fault;
use crate::jit::il::{CodeBlock, IlOp};
use crate::state::Sh4Register;

const SLOT_ENDED_BLOCK: &str = "delay-slot instruction ended the enclosing block";

/// Source of instruction words for the translator.
///
/// The facade implements this over the fetch translation path; tests
/// implement it over plain word arrays.
pub trait InstructionFetcher {
    /// Fetches the 16-bit instruction word at `vaddr`.
    ///
    /// # Errors
    ///
    /// Returns whatever fault the fetch path raises: a translation miss,
    /// an unmapped address, or an out-of-range sub-window access.
    fn fetch_word(&mut self, vaddr: u32) -> Result<u16, Fault>;
}

/// Translates the instruction at `pc`, appending its IL to `block`.
///
/// Returns `true` while the block continues past this instruction and
/// `false` once a control transfer ends it.
///
/// # Errors
///
/// Propagates fetch faults for `pc` and for a delay slot at `pc + 2`, and
/// raises [`Fault::Unimplemented`] tagged with the slot address when a
/// delay slot holds a PC-relative or control-transfer instruction.
pub fn translate_one(
    fetcher: &mut dyn InstructionFetcher,
    block: &mut CodeBlock,
    pc: u32,
) -> Result<bool, Fault> {
    let raw = fetcher.fetch_word(pc)?;
    let opcode = decode::decode(raw);
    block.charge(opcode.group(), opcode.issue_cycles());
    emit_instruction(fetcher, block, pc, raw, opcode)
}

/// Translates instructions from `base_pc` until a control transfer ends
/// the block.
///
/// # Errors
///
/// Propagates the first fault [`translate_one`] raises; the partial block
/// is discarded.
pub fn translate_block(
    fetcher: &mut dyn InstructionFetcher,
    base_pc: u32,
) -> Result<CodeBlock, Fault> {
    let mut block = CodeBlock::new(base_pc);
    let mut pc = base_pc;
    while translate_one(fetcher, &mut block, pc)? {
        pc = pc.wrapping_add(2);
    }
    Ok(block)
}

fn emit_instruction(
    fetcher: &mut dyn InstructionFetcher,
    block: &mut CodeBlock,
    pc: u32,
    raw: u16,
    opcode: &Opcode,
) -> Result<bool, Fault> {
    match opcode.kind() {
        InstructionKind::Rts => {
            block.push(IlOp::PrepareJump {
                base: Sh4Register::Pr,
                offset: 0,
            });
            translate_delay_slot(fetcher, block, pc.wrapping_add(2))?;
            block.push(IlOp::CommitJump);
            Ok(false)
        }
        InstructionKind::Rte => {
            block.push(IlOp::PrepareJump {
                base: Sh4Register::Spc,
                offset: 0,
            });
            block.push(IlOp::RestoreStatus {
                src: Sh4Register::Ssr,
            });
            translate_delay_slot(fetcher, block, pc.wrapping_add(2))?;
            block.push(IlOp::CommitJump);
            Ok(false)
        }
        InstructionKind::Braf => {
            let base = Sh4Register::GENERAL[decode::field_rn(raw)];
            emit_register_branch(fetcher, block, pc, base, pc.wrapping_add(4), false)
        }
        InstructionKind::Bsrf => {
            let base = Sh4Register::GENERAL[decode::field_rn(raw)];
            emit_register_branch(fetcher, block, pc, base, pc.wrapping_add(4), true)
        }
        InstructionKind::Jmp => {
            let base = Sh4Register::GENERAL[decode::field_rn(raw)];
            emit_register_branch(fetcher, block, pc, base, 0, false)
        }
        InstructionKind::Jsr => {
            let base = Sh4Register::GENERAL[decode::field_rn(raw)];
            emit_register_branch(fetcher, block, pc, base, 0, true)
        }
        InstructionKind::Bra => {
            let offset = decode::far_branch_offset(raw);
            emit_register_branch(fetcher, block, pc, Sh4Register::Pc, offset, false)
        }
        InstructionKind::Bsr => {
            let offset = decode::far_branch_offset(raw);
            emit_register_branch(fetcher, block, pc, Sh4Register::Pc, offset, true)
        }
        InstructionKind::BranchIfFalse => {
            emit_conditional_branch(fetcher, block, pc, raw, false, false)
        }
        InstructionKind::BranchIfFalseDelayed => {
            emit_conditional_branch(fetcher, block, pc, raw, false, true)
        }
        InstructionKind::BranchIfTrue => {
            emit_conditional_branch(fetcher, block, pc, raw, true, false)
        }
        InstructionKind::BranchIfTrueDelayed => {
            emit_conditional_branch(fetcher, block, pc, raw, true, true)
        }
        InstructionKind::MoveRegister => {
            block.push(IlOp::CopyReg {
                src: Sh4Register::GENERAL[decode::field_rm(raw)],
                dst: Sh4Register::GENERAL[decode::field_rn(raw)],
            });
            Ok(true)
        }
        InstructionKind::MoveImmediate => {
            block.push(IlOp::SetConst {
                reg: Sh4Register::GENERAL[decode::field_rn(raw)],
                value: decode::move_immediate(raw),
            });
            Ok(true)
        }
        InstructionKind::MoveWordPcRelative => {
            let reg = Sh4Register::GENERAL[decode::field_rn(raw)];
            block.push(IlOp::LoadConstAddr16 {
                addr: pc.wrapping_add(decode::pc_word_displacement(raw)),
                reg,
            });
            block.push(IlOp::SignExtend16 { reg });
            Ok(true)
        }
        InstructionKind::Fallback => {
            block.push(IlOp::Fallback { raw });
            Ok(true)
        }
    }
}

/// Emits a delayed branch whose target is `base + offset`, linking the
/// return address first when `link` is set.
fn emit_register_branch(
    fetcher: &mut dyn InstructionFetcher,
    block: &mut CodeBlock,
    pc: u32,
    base: Sh4Register,
    offset: u32,
    link: bool,
) -> Result<bool, Fault> {
    block.push(IlOp::PrepareJump { base, offset });
    if link {
        push_link_ops(block);
    }
    translate_delay_slot(fetcher, block, pc.wrapping_add(2))?;
    block.push(IlOp::CommitJump);
    Ok(false)
}

fn emit_conditional_branch(
    fetcher: &mut dyn InstructionFetcher,
    block: &mut CodeBlock,
    pc: u32,
    raw: u16,
    expected: bool,
    delayed: bool,
) -> Result<bool, Fault> {
    block.push(IlOp::PrepareJump {
        base: Sh4Register::Pc,
        offset: decode::cond_branch_offset(raw),
    });
    let fall_through = if delayed { 4 } else { 2 };
    block.push(IlOp::PrepareAltJump {
        target: pc.wrapping_add(fall_through),
    });
    block.push(IlOp::SetCondFromT { expected });
    if delayed {
        translate_delay_slot(fetcher, block, pc.wrapping_add(2))?;
    }
    block.push(IlOp::CommitJumpConditional);
    Ok(false)
}

/// Links the return address: the slot still sees the pre-call value of
/// the procedure register only after these ops, so they run before it.
fn push_link_ops(block: &mut CodeBlock) {
    block.push(IlOp::CopyReg {
        src: Sh4Register::Pc,
        dst: Sh4Register::Pr,
    });
    block.push(IlOp::AddConst {
        reg: Sh4Register::Pr,
        value: 4,
    });
}

fn translate_delay_slot(
    fetcher: &mut dyn InstructionFetcher,
    block: &mut CodeBlock,
    slot_pc: u32,
) -> Result<(), Fault> {
    let raw = fetcher.fetch_word(slot_pc)?;
    let opcode = decode::decode(raw);
    if opcode.references_pc() {
        return Err(Fault::unimplemented_instruction(
            "pc-relative instruction in a delay slot",
            slot_pc,
        ));
    }

    let continues = emit_instruction(fetcher, block, slot_pc, raw, opcode)?;
    if !continues {
        return Err(Fault::Integrity {
            detail: SLOT_ENDED_BLOCK,
        });
    }
    block.charge(opcode.group(), opcode.issue_cycles());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{translate_block, translate_one, InstructionFetcher};
    use crate::fault::Fault;
    use crate::jit::il::{CodeBlock, IlOp};
    use crate::memory::AccessWidth;
    use crate::state::Sh4Register;

    /// Fetcher backed by a flat array of instruction words.
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

    const NOP: u16 = 0x0009;
    const BASE: u32 = 0x8C01_0000;

    #[test]
    fn return_emits_prepare_then_slot_then_commit() {
        let mut rom = WordRom::new(BASE, &[0x000B, NOP]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        assert!(!continues);
        assert_eq!(
            block.ops(),
            [
                IlOp::PrepareJump {
                    base: Sh4Register::Pr,
                    offset: 0,
                },
                IlOp::Fallback { raw: NOP },
                IlOp::CommitJump,
            ],
        );
        // Serializing return plus an unpaired slot word.
        assert_eq!(block.cycle_count(), 3);
        assert_eq!(block.instruction_count(), 2);
    }

    #[test]
    fn exception_return_restores_status_before_the_slot() {
        let mut rom = WordRom::new(BASE, &[0x002B, NOP]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        assert!(!continues);
        assert_eq!(
            block.ops(),
            [
                IlOp::PrepareJump {
                    base: Sh4Register::Spc,
                    offset: 0,
                },
                IlOp::RestoreStatus {
                    src: Sh4Register::Ssr,
                },
                IlOp::Fallback { raw: NOP },
                IlOp::CommitJump,
            ],
        );
    }

    #[test]
    fn calls_link_the_return_address_before_the_slot() {
        // jsr @r10
        let mut rom = WordRom::new(BASE, &[0x4A0B, NOP]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops(),
            [
                IlOp::PrepareJump {
                    base: Sh4Register::R10,
                    offset: 0,
                },
                IlOp::CopyReg {
                    src: Sh4Register::Pc,
                    dst: Sh4Register::Pr,
                },
                IlOp::AddConst {
                    reg: Sh4Register::Pr,
                    value: 4,
                },
                IlOp::Fallback { raw: NOP },
                IlOp::CommitJump,
            ],
        );
    }

    #[test]
    fn far_register_branches_bias_the_base_by_the_fetch_offset() {
        // braf r10
        let mut rom = WordRom::new(BASE, &[0x0A23, NOP]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops()[0],
            IlOp::PrepareJump {
                base: Sh4Register::R10,
                offset: BASE.wrapping_add(4),
            },
        );
    }

    #[test]
    fn displacement_branches_latch_a_pc_relative_target() {
        // bra +0x10 words
        let mut rom = WordRom::new(BASE, &[0xA010, NOP]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops()[0],
            IlOp::PrepareJump {
                base: Sh4Register::Pc,
                offset: 0x10 * 2 + 4,
            },
        );
    }

    #[test]
    fn plain_conditional_branches_commit_without_a_slot() {
        // bf +3 words, deliberately with no following word mapped
        let mut rom = WordRom::new(BASE, &[0x8B03]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        assert!(!continues);
        assert_eq!(
            block.ops(),
            [
                IlOp::PrepareJump {
                    base: Sh4Register::Pc,
                    offset: 3 * 2 + 4,
                },
                IlOp::PrepareAltJump {
                    target: BASE.wrapping_add(2),
                },
                IlOp::SetCondFromT { expected: false },
                IlOp::CommitJumpConditional,
            ],
        );
    }

    #[test]
    fn delayed_conditional_branches_put_the_slot_before_the_commit() {
        // bt/s +3 words
        let mut rom = WordRom::new(BASE, &[0x8D03, NOP]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops(),
            [
                IlOp::PrepareJump {
                    base: Sh4Register::Pc,
                    offset: 3 * 2 + 4,
                },
                IlOp::PrepareAltJump {
                    target: BASE.wrapping_add(4),
                },
                IlOp::SetCondFromT { expected: true },
                IlOp::Fallback { raw: NOP },
                IlOp::CommitJumpConditional,
            ],
        );
    }

    #[test]
    fn pc_relative_slots_abort_without_a_commit() {
        // rts; bra: the slot may not re-read the pc
        let mut rom = WordRom::new(BASE, &[0x000B, 0xA010]);
        let mut block = CodeBlock::new(BASE);

        let fault = translate_one(&mut rom, &mut block, BASE).unwrap_err();

        assert_eq!(
            fault,
            Fault::unimplemented_instruction(
                "pc-relative instruction in a delay slot",
                BASE.wrapping_add(2),
            ),
        );
        assert!(!block.ops().contains(&IlOp::CommitJump));
        assert!(!block.ops().contains(&IlOp::CommitJumpConditional));
    }

    #[test]
    fn register_moves_translate_to_copies() {
        // mov r11,r10
        let mut rom = WordRom::new(BASE, &[0x6AB3]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        assert!(continues);
        assert_eq!(
            block.ops(),
            [IlOp::CopyReg {
                src: Sh4Register::R11,
                dst: Sh4Register::R10,
            }],
        );
    }

    #[test]
    fn immediates_translate_to_sign_extended_stores() {
        // mov #-1,r7
        let mut rom = WordRom::new(BASE, &[0xE7FF]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops(),
            [IlOp::SetConst {
                reg: Sh4Register::R7,
                value: 0xFFFF_FFFF,
            }],
        );
    }

    #[test]
    fn pc_relative_word_loads_bake_the_address_at_translation_time() {
        // mov.w @(2,pc),r1
        let mut rom = WordRom::new(BASE, &[0x9102]);
        let mut block = CodeBlock::new(BASE);

        translate_one(&mut rom, &mut block, BASE).unwrap();

        assert_eq!(
            block.ops(),
            [
                IlOp::LoadConstAddr16 {
                    addr: BASE + 2 * 2 + 4,
                    reg: Sh4Register::R1,
                },
                IlOp::SignExtend16 {
                    reg: Sh4Register::R1,
                },
            ],
        );
    }

    #[test]
    fn unhandled_words_carry_through_verbatim() {
        // clrt has no dedicated emitter
        let mut rom = WordRom::new(BASE, &[0x0008]);
        let mut block = CodeBlock::new(BASE);

        let continues = translate_one(&mut rom, &mut block, BASE).unwrap();

        assert!(continues);
        assert_eq!(block.ops(), [IlOp::Fallback { raw: 0x0008 }]);
    }

    #[test]
    fn blocks_run_to_their_terminating_branch() {
        // mov #1,r0; mov r0,r1; rts; nop
        let mut rom = WordRom::new(BASE, &[0xE001, 0x6103, 0x000B, NOP]);

        let block = translate_block(&mut rom, BASE).unwrap();

        assert_eq!(block.base_pc(), BASE);
        assert_eq!(block.instruction_count(), 4);
        assert_eq!(
            block.ops(),
            [
                IlOp::SetConst {
                    reg: Sh4Register::R0,
                    value: 1,
                },
                IlOp::CopyReg {
                    src: Sh4Register::R0,
                    dst: Sh4Register::R1,
                },
                IlOp::PrepareJump {
                    base: Sh4Register::Pr,
                    offset: 0,
                },
                IlOp::Fallback { raw: NOP },
                IlOp::CommitJump,
            ],
        );
        // The register move pairs with the immediate load; the return and
        // its slot issue separately.
        assert_eq!(block.cycle_count(), 1 + 2 + 1);
    }

    #[test]
    fn blocks_propagate_fetch_faults() {
        // straight-line code that runs off the mapped words
        let mut rom = WordRom::new(BASE, &[0xE001, 0x6103]);

        let fault = translate_block(&mut rom, BASE).unwrap_err();

        assert_eq!(fault, Fault::unmapped(BASE + 4, AccessWidth::U16));
    }
}
