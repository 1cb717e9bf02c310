//! Address-ordered lookups over the decoded graph.

use std::collections::BTreeMap;

use crate::ir::{BlockId, FunctionId, InstId, Module};

/// Maps addresses to functions, blocks and machine-instruction markers.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    functions: BTreeMap<u64, FunctionId>,
    blocks: BTreeMap<u64, BlockId>,
    instructions: BTreeMap<u64, InstId>,
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_function(&mut self, address: u64, id: FunctionId) {
        self.functions.insert(address, id);
    }

    pub fn insert_block(&mut self, address: u64, id: BlockId) {
        self.blocks.insert(address, id);
    }

    pub fn insert_instruction(&mut self, address: u64, id: InstId) {
        self.instructions.insert(address, id);
    }

    pub fn function_at(&self, address: u64) -> Option<FunctionId> {
        self.functions.get(&address).copied()
    }

    /// Nearest function whose entry is at or before `address`.
    pub fn function_before(&self, address: u64) -> Option<FunctionId> {
        self.functions
            .range(..=address)
            .next_back()
            .map(|(_, &f)| f)
    }

    /// [`Self::function_before`], but only if `address` is below that
    /// function's end address.
    pub fn function_containing(&self, address: u64, module: &Module) -> Option<FunctionId> {
        let f = self.function_before(address)?;
        (address < module.function_end_address(f)).then_some(f)
    }

    pub fn block_at(&self, address: u64) -> Option<BlockId> {
        self.blocks.get(&address).copied()
    }

    /// Nearest block starting at or before `address`, in any function.
    pub fn block_before(&self, address: u64) -> Option<BlockId> {
        self.blocks.range(..=address).next_back().map(|(_, &b)| b)
    }

    pub fn instruction_at(&self, address: u64) -> Option<InstId> {
        self.instructions.get(&address).copied()
    }
}
