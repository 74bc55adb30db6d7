//! Block translation front end.
//!
//! Guest code is translated one basic block at a time into a small
//! intermediate language. [`translate_one`] drives the per-instruction
//! emitters; [`CodeBlock`] collects the resulting ops and the block's
//! issue-cycle total. Execution of the produced blocks belongs to a
//! backend outside this crate.

pub mod il;
pub mod translate;

pub use il::{CodeBlock, IlOp};
pub use translate::{translate_block, translate_one, InstructionFetcher};
