//! Arena IR produced by the decoder.
//!
//! A [`Module`] owns every function, basic block, instruction and
//! control-transfer placeholder. Everything refers to everything else
//! through small integer handles; address lookups live in the decoder's
//! graph index.

mod builder;

pub use builder::{Cursor, IrBuilder};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

macro_rules! arena_id {
    ($(#[$m:meta])* $name:ident, $prefix:literal) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(i: usize) -> Self {
                $name(i as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle of a function in a [`Module`]
    FunctionId,
    "fn"
);
arena_id!(
    /// Handle of a basic block in a [`Module`]
    BlockId,
    "bb"
);
arena_id!(
    /// Handle of an instruction in a [`Module`]
    InstId,
    "i"
);
arena_id!(
    /// Handle into the placeholder table of a [`Module`]
    PlaceholderId,
    "ph"
);

/// An operand of a control-transfer instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Const(u64),
    Register(String),
    #[default]
    Unknown,
}

impl Value {
    pub fn as_const(&self) -> Option<u64> {
        match self {
            Value::Const(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(c) => write!(f, "{:#x}", c),
            Value::Register(r) => write!(f, "%{}", r),
            Value::Unknown => write!(f, "undef"),
        }
    }
}

/// Where a call or branch goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    Block(BlockId),
    /// Transfer to a function entry (a call, or a tail branch)
    Function(FunctionId),
    /// Known address that is not decodable code
    External(u64),
    /// Computed at run time
    Indirect(Value),
}

/// Kind of control transfer a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    Call,
    Return,
    Branch,
    CondBranch,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowKind::Call => "call",
            FlowKind::Return => "return",
            FlowKind::Branch => "branch",
            FlowKind::CondBranch => "cond_branch",
        };
        f.write_str(s)
    }
}

/// Marker tying the following IR to one machine instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmMarker {
    pub address: u64,
    pub size: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Asm(AsmMarker),
    /// Call of a named frontend helper (e.g. FPU register stack access)
    Intrinsic { name: String, args: Vec<Value> },
    /// Provisional control transfer; see [`Module::placeholder`]
    Placeholder(PlaceholderId),
    Call { callee: Destination },
    Branch { target: Destination },
    CondBranch {
        cond: Value,
        if_true: Destination,
        if_false: Destination,
    },
    Return,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. } | Instruction::CondBranch { .. } | Instruction::Return
        )
    }

    pub fn asm_address(&self) -> Option<u64> {
        match self {
            Instruction::Asm(m) => Some(m.address),
            _ => None,
        }
    }
}

/// A control transfer whose destination is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub kind: FlowKind,
    pub inst: InstId,
    /// Address of the machine instruction it was emitted for
    pub address: u64,
    /// Address right after that machine instruction
    pub next_address: u64,
    /// Call/branch/return target operand (taken target for cond branches)
    pub target: Value,
    pub cond: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub entry_address: u64,
    /// Blocks in address order; the first is the entry block
    pub blocks: Vec<BlockId>,
}

impl Function {
    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    pub start_address: u64,
    pub function: FunctionId,
    pub insts: Vec<InstId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstSlot {
    inst: Instruction,
    block: BlockId,
}

/// Owner of the whole decoded graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    functions: Vec<Function>,
    /// Function handles sorted by entry address
    order: Vec<FunctionId>,
    blocks: Vec<BasicBlock>,
    insts: Vec<InstSlot>,
    placeholders: Vec<Placeholder>,
    names: HashSet<String>,
    name_counter: u64,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base` if still free, otherwise `base.N` with a module-wide counter.
    pub fn unique_name(&mut self, base: &str) -> String {
        if self.names.insert(base.to_string()) {
            return base.to_string();
        }
        loop {
            self.name_counter += 1;
            let candidate = format!("{}.{}", base, self.name_counter);
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Create a function with an empty entry block at `entry`.
    pub fn add_function(&mut self, entry: u64, name: Option<&str>) -> FunctionId {
        let base = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("function_{:x}", entry),
        };
        let name = self.unique_name(&base);
        let id = FunctionId::from_index(self.functions.len());
        self.functions.push(Function {
            name,
            entry_address: entry,
            blocks: Vec::new(),
        });
        let functions = &self.functions;
        let pos = self
            .order
            .partition_point(|f| functions[f.index()].entry_address <= entry);
        self.order.insert(pos, id);
        self.add_block(id, entry, None);
        id
    }

    /// Create an empty block in `function`, kept in address order.
    pub fn add_block(&mut self, function: FunctionId, start: u64, name: Option<&str>) -> BlockId {
        let base = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("bb_{:x}", start),
        };
        let name = self.unique_name(&base);
        let id = BlockId::from_index(self.blocks.len());
        self.blocks.push(BasicBlock {
            name,
            start_address: start,
            function,
            insts: Vec::new(),
        });
        let blocks = &self.blocks;
        let order = &self.functions[function.index()].blocks;
        let pos = order.partition_point(|b| blocks[b.index()].start_address <= start);
        self.functions[function.index()].blocks.insert(pos, id);
        id
    }

    /// Move `at` and every instruction after it into a new block starting
    /// at `start`. The old block falls through into the new one. Returns
    /// the new block.
    pub fn split_block(&mut self, at: InstId, start: u64, name: Option<&str>) -> BlockId {
        let old = self.insts[at.index()].block;
        let function = self.blocks[old.index()].function;
        let new = self.add_block(function, start, name);
        let old_insts = &mut self.blocks[old.index()].insts;
        let pos = old_insts.iter().position(|&i| i == at).unwrap_or(old_insts.len());
        let moved: Vec<InstId> = old_insts.drain(pos..).collect();
        for &i in &moved {
            self.insts[i.index()].block = new;
        }
        self.blocks[new.index()].insts = moved;
        let end = self.blocks[old.index()].insts.len();
        self.insert_inst(
            old,
            end,
            Instruction::Branch {
                target: Destination::Block(new),
            },
        );
        new
    }

    pub(crate) fn insert_inst(&mut self, block: BlockId, pos: usize, inst: Instruction) -> InstId {
        let id = InstId::from_index(self.insts.len());
        self.insts.push(InstSlot { inst, block });
        let list = &mut self.blocks[block.index()].insts;
        let pos = pos.min(list.len());
        list.insert(pos, id);
        id
    }

    pub(crate) fn new_placeholder(&mut self, placeholder: Placeholder) -> PlaceholderId {
        let id = PlaceholderId::from_index(self.placeholders.len());
        self.placeholders.push(placeholder);
        id
    }

    /// Rewrite an instruction in place, keeping its position.
    pub fn replace_inst(&mut self, id: InstId, inst: Instruction) {
        self.insts[id.index()].inst = inst;
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.index()].inst
    }

    pub fn inst_block(&self, id: InstId) -> BlockId {
        self.insts[id.index()].block
    }

    pub fn inst_function(&self, id: InstId) -> FunctionId {
        self.block(self.inst_block(id)).function
    }

    pub fn placeholder(&self, id: PlaceholderId) -> &Placeholder {
        &self.placeholders[id.index()]
    }

    /// Whether the placeholder instruction has not been rewritten yet.
    pub fn is_placeholder_pending(&self, id: PlaceholderId) -> bool {
        let p = self.placeholder(id);
        matches!(self.inst(p.inst), Instruction::Placeholder(x) if *x == id)
    }

    pub fn pending_placeholders(&self) -> impl Iterator<Item = PlaceholderId> + '_ {
        (0..self.placeholders.len())
            .map(PlaceholderId::from_index)
            .filter(|&p| self.is_placeholder_pending(p))
    }

    /// Functions in entry-address order.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.order.iter().map(|&id| (id, &self.functions[id.index()]))
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockId::from_index(i), b))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions().find(|(_, f)| f.name == name).map(|(id, _)| id)
    }

    /// Machine instruction markers of a block, in order.
    pub fn block_asm(&self, id: BlockId) -> impl Iterator<Item = &AsmMarker> {
        self.block(id).insts.iter().filter_map(|&i| match self.inst(i) {
            Instruction::Asm(m) => Some(m),
            _ => None,
        })
    }

    /// Address of the function's last machine instruction, or its entry
    /// address when nothing has been decoded into it.
    pub fn function_end_address(&self, id: FunctionId) -> u64 {
        let f = self.function(id);
        f.blocks
            .iter()
            .rev()
            .find_map(|&b| self.block_asm(b).last().map(|m| m.address))
            .unwrap_or(f.entry_address)
    }

    pub fn terminator(&self, id: BlockId) -> Option<&Instruction> {
        let last = *self.block(id).insts.last()?;
        let inst = self.inst(last);
        inst.is_terminator().then_some(inst)
    }

    /// Control-transfer destinations leaving a block (calls included).
    pub fn successors(&self, id: BlockId) -> Vec<Destination> {
        let mut out = Vec::new();
        for &i in &self.block(id).insts {
            match self.inst(i) {
                Instruction::Call { callee } => out.push(callee.clone()),
                Instruction::Branch { target } => out.push(target.clone()),
                Instruction::CondBranch {
                    if_true, if_false, ..
                } => {
                    out.push(if_true.clone());
                    out.push(if_false.clone());
                }
                _ => {}
            }
        }
        out
    }

    /// Check handle consistency of the whole graph.
    pub fn validate(&self) -> Result<(), String> {
        let check = |d: &Destination| -> Result<(), String> {
            match d {
                Destination::Block(b) if b.index() >= self.blocks.len() => {
                    Err(format!("dangling block {}", b))
                }
                Destination::Function(f) if f.index() >= self.functions.len() => {
                    Err(format!("dangling function {}", f))
                }
                _ => Ok(()),
            }
        };
        for (fid, f) in self.functions() {
            if f.blocks.is_empty() {
                return Err(format!("function {} has no blocks", f.name));
            }
            for &b in &f.blocks {
                if self.block(b).function != fid {
                    return Err(format!("block {} listed in wrong function", b));
                }
            }
        }
        for (bid, b) in self.blocks() {
            for &i in &b.insts {
                if self.inst_block(i) != bid {
                    return Err(format!("instruction {} has stale block link", i));
                }
                if let Instruction::Placeholder(p) = self.inst(i) {
                    return Err(format!("unresolved placeholder {}", p));
                }
            }
            for d in self.successors(bid) {
                check(&d)?;
            }
        }
        Ok(())
    }

    fn fmt_destination(&self, d: &Destination) -> String {
        match d {
            Destination::Block(b) => format!("%{}", self.block(*b).name),
            Destination::Function(f) => format!("@{}", self.function(*f).name),
            Destination::External(a) => format!("external {:#x}", a),
            Destination::Indirect(v) => format!("indirect {}", v),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, func) in self.functions() {
            writeln!(f, "function @{} {:#x}", func.name, func.entry_address)?;
            for &b in &func.blocks {
                writeln!(f, "{}:", self.block(b).name)?;
                for &i in &self.block(b).insts {
                    match self.inst(i) {
                        Instruction::Asm(m) => writeln!(f, "  ; {:#x}: {}", m.address, m.text)?,
                        Instruction::Intrinsic { name, args } => {
                            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                            writeln!(f, "  call @{}({})", name, args.join(", "))?
                        }
                        Instruction::Placeholder(p) => {
                            let p = self.placeholder(*p);
                            writeln!(f, "  pseudo {} {}", p.kind, p.target)?
                        }
                        Instruction::Call { callee } => {
                            writeln!(f, "  call {}", self.fmt_destination(callee))?
                        }
                        Instruction::Branch { target } => {
                            writeln!(f, "  br {}", self.fmt_destination(target))?
                        }
                        Instruction::CondBranch {
                            cond,
                            if_true,
                            if_false,
                        } => writeln!(
                            f,
                            "  br {}, {}, {}",
                            cond,
                            self.fmt_destination(if_true),
                            self.fmt_destination(if_false)
                        )?,
                        Instruction::Return => writeln!(f, "  ret")?,
                    }
                }
            }
        }
        Ok(())
    }
}
