//! Core data types for binlift.
//!
//! Plain data shared by the engines, the image providers and the decoder:
//! architectures, address ranges, segments, decoded instructions and the
//! disassembler contract.

pub mod address_range;
pub mod binary;
pub mod disassembler;
pub mod instruction;
pub mod segment;
