use super::{
    AsmMarker, BlockId, FlowKind, InstId, Instruction, Module, Placeholder, PlaceholderId, Value,
};

/// Emission position: instructions go into `block` before index `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub block: BlockId,
    pub pos: usize,
}

/// Inserts instructions at a cursor, advancing past each one.
pub struct IrBuilder<'m> {
    module: &'m mut Module,
    cursor: Cursor,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m mut Module, cursor: Cursor) -> Self {
        Self { module, cursor }
    }

    pub fn at_end(module: &'m mut Module, block: BlockId) -> Self {
        let pos = module.block(block).insts.len();
        Self::new(module, Cursor { block, pos })
    }

    /// Right after `inst`, in its block.
    pub fn after(module: &'m mut Module, inst: InstId) -> Self {
        let block = module.inst_block(inst);
        let pos = module
            .block(block)
            .insts
            .iter()
            .position(|&i| i == inst)
            .map_or(module.block(block).insts.len(), |p| p + 1);
        Self::new(module, Cursor { block, pos })
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn block(&self) -> BlockId {
        self.cursor.block
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    pub fn emit(&mut self, inst: Instruction) -> InstId {
        let id = self
            .module
            .insert_inst(self.cursor.block, self.cursor.pos, inst);
        self.cursor.pos += 1;
        id
    }

    pub fn emit_asm(&mut self, address: u64, size: usize, text: impl Into<String>) -> InstId {
        self.emit(Instruction::Asm(AsmMarker {
            address,
            size,
            text: text.into(),
        }))
    }

    pub fn emit_intrinsic(&mut self, name: impl Into<String>, args: Vec<Value>) -> InstId {
        self.emit(Instruction::Intrinsic {
            name: name.into(),
            args,
        })
    }

    /// Emit a provisional control transfer for the machine instruction at
    /// `address`.
    pub fn emit_placeholder(
        &mut self,
        kind: FlowKind,
        address: u64,
        next_address: u64,
        target: Value,
        cond: Value,
    ) -> PlaceholderId {
        // The placeholder id is known before the instruction exists.
        let id = PlaceholderId::from_index(self.module.placeholder_count());
        let inst = self.emit(Instruction::Placeholder(id));
        self.module.new_placeholder(Placeholder {
            kind,
            inst,
            address,
            next_address,
            target,
            cond,
        })
    }
}
