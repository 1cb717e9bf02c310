//! binlift: the decoding front end of a machine-code lifter.
//!
//! Starting from an image's entry point, the [`decoder::Decoder`] follows
//! every discovered control transfer and builds an arena IR graph of
//! functions and basic blocks.

pub mod config;
/// Core data types module
pub mod core;
pub mod decoder;
pub mod disasm;
pub mod error;
pub mod image;
pub mod ir;
pub mod logging;
pub mod translator;

pub use config::{Budgets, DecoderConfig};
pub use decoder::{DecodeOutput, DecodeStats, Decoder, JumpTarget, JumpTargetKind};
pub use error::{LiftError, Result};
pub use image::{ByteImage, MemoryImage, ObjectImage};
pub use ir::{Destination, Module};
pub use translator::{DisasmTranslator, InstructionTranslator};
