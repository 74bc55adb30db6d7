//! Processor facade.
//!
//! [`Sh4`] owns the dispatcher's region table, the translation unit, the
//! architectural register file and the pending-interrupt set, and wires
//! them together: virtual accesses translate first and dispatch second, a
//! translation miss vectors the exception controller before the fault
//! propagates, and the block translator fetches through the same path the
//! guest does.

use crate::exception::{self, ExceptionCode};
use crate::fault::Fault;
use crate::jit::{self, CodeBlock, InstructionFetcher};
use crate::memory::{BusData, MemoryMap};
use crate::mmu::{DataAccessKind, Mmu};
use crate::state::CpuContext;
use crate::trace::{NoopSink, TraceEvent, TraceSink};

/// One emulated CPU: register file, translation unit, physical memory
/// dispatcher, and pending-interrupt state.
pub struct Sh4 {
    map: MemoryMap,
    mmu: Mmu,
    context: CpuContext,
    pending: Vec<ExceptionCode>,
    sink: Box<dyn TraceSink>,
}

impl Sh4 {
    /// Creates a CPU over the injected region table, with tracing disabled.
    ///
    /// The register file starts in the power-on configuration: privileged,
    /// exceptions blocked, program counter at the reset vector.
    #[must_use]
    pub fn new(map: MemoryMap) -> Self {
        Self::with_trace_sink(map, Box::new(NoopSink))
    }

    /// Creates a CPU that reports core transitions to `sink`.
    #[must_use]
    pub fn with_trace_sink(map: MemoryMap, sink: Box<dyn TraceSink>) -> Self {
        Self {
            map,
            mmu: Mmu::new(),
            context: CpuContext::default(),
            pending: Vec::new(),
            sink,
        }
    }

    /// Architectural register file.
    #[must_use]
    pub const fn registers(&self) -> &CpuContext {
        &self.context
    }

    /// Mutable architectural register file.
    pub const fn registers_mut(&mut self) -> &mut CpuContext {
        &mut self.context
    }

    /// Translation unit.
    #[must_use]
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// Mutable translation unit, for guest-driven entry installs.
    pub const fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    /// Physical memory dispatcher.
    #[must_use]
    pub const fn memory(&self) -> &MemoryMap {
        &self.map
    }

    /// Mutable physical memory dispatcher.
    pub const fn memory_mut(&mut self) -> &mut MemoryMap {
        &mut self.map
    }

    /// Interrupts latched but not yet serviced, in latch order.
    #[must_use]
    pub fn pending(&self) -> &[ExceptionCode] {
        &self.pending
    }

    /// Reads a physical address through the dispatcher, bypassing
    /// translation.
    ///
    /// # Errors
    ///
    /// Routing faults and whatever fault the owning region raises.
    pub fn read_phys<T: BusData>(&mut self, addr: u32) -> Result<T, Fault> {
        self.map.read(addr)
    }

    /// Writes a physical address through the dispatcher, bypassing
    /// translation.
    ///
    /// # Errors
    ///
    /// Routing faults and whatever fault the owning region raises.
    pub fn write_phys<T: BusData>(&mut self, addr: u32, value: T) -> Result<(), Fault> {
        self.map.write(addr, value)
    }

    /// Reads a virtual address: translates, then dispatches.
    ///
    /// # Errors
    ///
    /// A translation miss vectors the exception controller and then
    /// propagates as [`Fault::TlbMiss`]; dispatch faults propagate
    /// unchanged.
    pub fn read_virt<T: BusData>(&mut self, vaddr: u32) -> Result<T, Fault> {
        let privileged = self.context.sr().is_privileged();
        let translation = self
            .mmu
            .translate_data(vaddr, DataAccessKind::Read, privileged)
            .map_err(|fault| self.vector_guest_fault(fault))?;
        self.map.read(translation.physical)
    }

    /// Writes a virtual address: translates, then dispatches.
    ///
    /// # Errors
    ///
    /// A translation miss vectors the exception controller and then
    /// propagates as [`Fault::TlbMiss`]; dispatch faults propagate
    /// unchanged.
    pub fn write_virt<T: BusData>(&mut self, vaddr: u32, value: T) -> Result<(), Fault> {
        let privileged = self.context.sr().is_privileged();
        let translation = self
            .mmu
            .translate_data(vaddr, DataAccessKind::Write, privileged)
            .map_err(|fault| self.vector_guest_fault(fault))?;
        self.map.write(translation.physical, value)
    }

    /// Fetches one instruction word through the fetch translation path,
    /// refilling the first-level table as a side effect.
    ///
    /// # Errors
    ///
    /// An instruction translation miss vectors the exception controller
    /// and then propagates as [`Fault::TlbMiss`]; dispatch faults
    /// propagate unchanged.
    pub fn fetch_word(&mut self, vaddr: u32) -> Result<u16, Fault> {
        let privileged = self.context.sr().is_privileged();
        let translation = match self
            .mmu
            .translate_fetch(vaddr, privileged, self.sink.as_mut())
        {
            Ok(translation) => translation,
            Err(fault) => return Err(self.vector_guest_fault(fault)),
        };
        self.map.read_u16(translation.physical)
    }

    /// Runs the entry sequence for a synchronous exception, recording its
    /// event code in the exception-event register first.
    pub fn set_exception(&mut self, code: ExceptionCode) {
        self.context.set_expevt(u32::from(code.event_code()));
        self.enter_exception(code);
    }

    /// Runs the entry sequence for an interrupt, recording its event code
    /// in the interrupt-event register first.
    pub fn set_interrupt(&mut self, code: ExceptionCode) {
        self.context.set_intevt(u32::from(code.event_code()));
        self.enter_exception(code);
    }

    /// Latches an interrupt as pending without vectoring yet.
    ///
    /// A code that is already pending stays latched once; a pending line
    /// is a level, not a queue.
    pub fn latch_interrupt(&mut self, code: ExceptionCode) {
        if self.pending.contains(&code) {
            return;
        }
        self.pending.push(code);
        self.sink.record(TraceEvent::InterruptLatched { code });
    }

    /// Services the highest-priority pending interrupt, if entry is
    /// currently allowed.
    ///
    /// Selection follows the static priority table: lowest level first,
    /// then lowest tie-break order, then canonical table position. While
    /// the status register blocks exceptions every latched interrupt stays
    /// pending. Returns the serviced code.
    pub fn service_pending(&mut self) -> Option<ExceptionCode> {
        let code = ExceptionCode::highest_priority(&self.pending)?;
        if exception::entry_blocked(self.context.sr(), code) {
            return None;
        }
        if let Some(index) = self.pending.iter().position(|&pending| pending == code) {
            self.pending.swap_remove(index);
        }
        self.set_interrupt(code);
        Some(code)
    }

    /// Translates the instruction at `pc`, appending IL to `block`.
    ///
    /// Returns `true` while the block continues past this instruction.
    ///
    /// # Errors
    ///
    /// See [`jit::translate_one`]; fetch faults vector the controller the
    /// same way guest fetches do.
    pub fn translate_one(&mut self, block: &mut CodeBlock, pc: u32) -> Result<bool, Fault> {
        jit::translate_one(self, block, pc)
    }

    /// Translates one whole block starting at `base_pc` and reports it to
    /// the trace sink.
    ///
    /// # Errors
    ///
    /// Propagates the first fault raised while translating; no partial
    /// block is reported.
    pub fn translate_block(&mut self, base_pc: u32) -> Result<CodeBlock, Fault> {
        let block = jit::translate_block(self, base_pc)?;
        self.sink.record(TraceEvent::BlockTranslated {
            base_pc,
            instruction_count: block.instruction_count(),
            cycle_count: block.cycle_count(),
        });
        Ok(block)
    }

    fn enter_exception(&mut self, code: ExceptionCode) {
        let previous_pc = self.context.pc();
        let handler_pc = exception::enter(&mut self.context, code);
        self.sink.record(TraceEvent::ExceptionEntered {
            code,
            previous_pc,
            handler_pc,
        });
    }

    /// Vectors the controller for guest-recoverable faults, then hands the
    /// fault back for propagation.
    fn vector_guest_fault(&mut self, fault: Fault) -> Fault {
        if let Fault::TlbMiss { kind, .. } = fault {
            self.set_exception(kind.exception_code());
        }
        fault
    }
}

impl InstructionFetcher for Sh4 {
    fn fetch_word(&mut self, vaddr: u32) -> Result<u16, Fault> {
        Self::fetch_word(self, vaddr)
    }
}

impl core::fmt::Debug for Sh4 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sh4")
            .field("context", &self.context)
            .field("mmu", &self.mmu)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
