//! Architectural CPU context model primitives.

/// Architectural register file types and status-register bit model.
pub mod registers;

pub use registers::{CpuContext, Sh4Register, StatusRegister, GENERAL_REGISTER_COUNT, RESET_PC};
