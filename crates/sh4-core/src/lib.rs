//! SH4-class CPU core: address-space dispatch, two-level address
//! translation, priority exception vectoring, and basic-block IL
//! translation.

/// Physical memory model: region capability, ordered dispatcher, and the
/// canonical region layout.
pub mod memory;
pub use memory::{
    standard_map, AccessWidth, Area0, Area0Buses, Area0Window, BusData, MemoryMap,
    MemoryMapBuilder, Ram, RegionHandler, RegionMapping, ResolvedAccess, Rom, StandardRegions,
    UnmappedBus,
};

/// Fault taxonomy raised across the core.
pub mod fault;
pub use fault::{Fault, TlbMissKind};

/// Architectural register file and status-register bit model.
pub mod state;
pub use state::{CpuContext, Sh4Register, StatusRegister, GENERAL_REGISTER_COUNT, RESET_PC};

/// Two-level TLB translation unit.
pub mod mmu;
pub use mmu::{
    DataAccessKind, DataTranslation, FetchTranslation, ItlbData, ItlbEntry, Mmu, PageSize,
    Protection, Segment, TlbKey, UtlbData, UtlbEntry, ITLB_ENTRY_COUNT, UTLB_ENTRY_COUNT,
};

/// Static exception table, priority selection, and the entry sequence.
pub mod exception;
pub use exception::{
    ExceptionCode, ExceptionMeta, VectorTarget, EXCEPTION_CODE_COUNT, VECTOR_OFFSET_GENERAL,
    VECTOR_OFFSET_INTERRUPT, VECTOR_OFFSET_TLB_MISS,
};

/// Instruction word decode table and field helpers.
pub mod decode;
pub use decode::{
    cond_branch_offset, decode, far_branch_offset, field_rm, field_rn, move_immediate,
    pc_word_displacement, InstructionKind, Opcode, OPCODES,
};

/// Issue-cycle accounting and dual-issue pairing.
pub mod timing;
pub use timing::{ExecutionGroup, IssuePipeline};

/// Block translation front end producing IL.
pub mod jit;
pub use jit::{translate_block, translate_one, CodeBlock, IlOp, InstructionFetcher};

/// Core transition tracing.
pub mod trace;
pub use trace::{NoopSink, RecordingSink, TraceEvent, TraceSink};

/// Processor facade wiring the components together.
pub mod cpu;
pub use cpu::Sh4;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
