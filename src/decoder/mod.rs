//! Control-flow recovery by iterative decoding.
//!
//! The [`Decoder`] pops jump targets in priority order, translates a
//! straight run of instructions at each one, classifies the run's
//! terminator and queues its successors. Every control transfer is first
//! emitted as a placeholder and rewritten once its destination exists.

pub mod graph_index;
pub mod jump_targets;
pub mod pending;
pub mod ranges;

pub use graph_index::GraphIndex;
pub use jump_targets::{JumpOrigin, JumpTarget, JumpTargetKind, JumpTargetQueue};
pub use pending::{EdgeRole, PendingEdgePatcher};
pub use ranges::DecodeRanges;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::DecoderConfig;
use crate::core::address_range::{AddressRange, AddressRangeSet};
use crate::core::disassembler::ArchMode;
use crate::error::{LiftError, Result};
use crate::image::ByteImage;
use crate::ir::{
    BlockId, Cursor, Destination, FlowKind, FunctionId, InstId, Instruction, IrBuilder, Module,
    PlaceholderId, Value,
};
use crate::translator::{
    DefaultModeResolver, DisasmTranslator, InstructionTranslator, ModeResolver, PseudoFunctions,
    TranslationResult, X87Features,
};

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub popped: usize,
    pub popped_by_kind: BTreeMap<JumpTargetKind, usize>,
    /// Targets that produced a run of at least one instruction
    pub decoded_runs: usize,
    pub instructions: usize,
    pub failed_translations: usize,
    /// Targets with no decodable bytes behind them
    pub unreachable: usize,
    /// Targets bound to code that already existed
    pub already_owned: usize,
    pub dropped_seeds: usize,
    pub block_splits: usize,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct DecodeOutput {
    pub module: Module,
    pub index: GraphIndex,
    /// Ranges still undecoded when the run ended
    pub allowed: AddressRangeSet,
    pub alternative: AddressRangeSet,
    pub decoded: AddressRangeSet,
    pub stats: DecodeStats,
    pub pseudo_functions: PseudoFunctions,
    pub x87: Option<X87Features>,
}

/// What already exists at an address.
#[derive(Debug, Clone, Copy)]
enum Owner {
    FunctionEntry(FunctionId, BlockId),
    BlockStart(BlockId),
    /// An instruction in the middle of a block
    Inside(InstId),
}

pub struct Decoder<'a, T> {
    image: &'a dyn ByteImage,
    translator: T,
    resolver: Box<dyn ModeResolver + 'a>,
    config: DecoderConfig,
    module: Module,
    index: GraphIndex,
    queue: JumpTargetQueue,
    patcher: PendingEdgePatcher,
    ranges: DecodeRanges,
    decoded: AddressRangeSet,
    stats: DecodeStats,
    started: Instant,
    seeded: bool,
}

impl<'a> Decoder<'a, DisasmTranslator> {
    /// Decoder using the default disassembly engine for the image's
    /// architecture.
    pub fn for_image(image: &'a dyn ByteImage, config: DecoderConfig) -> Result<Self> {
        let translator = DisasmTranslator::for_arch(image.arch(), image.endianness())?;
        Self::new(image, translator, config)
    }
}

impl<'a, T: InstructionTranslator> Decoder<'a, T> {
    pub fn new(image: &'a dyn ByteImage, translator: T, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let ranges = DecodeRanges::for_image(image, &config);
        let resolver = Box::new(DefaultModeResolver::new(translator.arch()));
        Ok(Self {
            image,
            translator,
            resolver,
            config,
            module: Module::new(),
            index: GraphIndex::new(),
            queue: JumpTargetQueue::new(),
            patcher: PendingEdgePatcher::new(),
            ranges,
            decoded: AddressRangeSet::new(),
            stats: DecodeStats::default(),
            started: Instant::now(),
            seeded: false,
        })
    }

    pub fn with_mode_resolver(mut self, resolver: impl ModeResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    pub fn queue(&self) -> &JumpTargetQueue {
        &self.queue
    }

    pub fn patcher(&self) -> &PendingEdgePatcher {
        &self.patcher
    }

    pub fn allowed(&self) -> &AddressRangeSet {
        &self.ranges.allowed
    }

    pub fn alternative(&self) -> &AddressRangeSet {
        &self.ranges.alternative
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Decode everything reachable from the seeds.
    pub fn run(mut self) -> Result<DecodeOutput> {
        let span = info_span!("decode", arch = %self.translator.arch());
        let _guard = span.enter();

        self.seed();
        debug!(allowed = %self.ranges.allowed, "allowed ranges");
        debug!(alternative = %self.ranges.alternative, "alternative ranges");
        debug!(targets = %self.queue, "jump targets");

        self.finish()
    }

    /// Queue the entry point and, if enabled, symbol seeds. Runs once.
    pub fn seed(&mut self) {
        if self.seeded {
            return;
        }
        self.seeded = true;
        self.started = Instant::now();

        let basic = self.translator.basic_mode();
        let entry = self.image.entry_point().map(|ep| self.resolver.resolve(ep, basic));
        if let Some((address, mode)) = entry {
            let t = JumpTarget::new(address, JumpTargetKind::EntryPoint, mode, JumpOrigin::None)
                .with_name(self.config.entry_point_name.clone());
            self.queue.push(t);
        }

        if self.config.seed_symbols {
            let image = self.image;
            for sym in image.symbols() {
                let (address, mode) = self.resolver.resolve(sym.address, basic);
                if entry.is_some_and(|(ep, _)| ep == address)
                    || !self.ranges.allowed.contains(address)
                {
                    continue;
                }
                let mut t =
                    JumpTarget::new(address, JumpTargetKind::EntryPoint, mode, JumpOrigin::None);
                if !sym.name.is_empty() {
                    t.set_name(sym.name.clone());
                }
                self.queue.push(t);
            }
        }
    }

    /// Process the next queued target. Returns it, or `None` once the queue
    /// is empty.
    pub fn step(&mut self) -> Result<Option<JumpTarget>> {
        let Some(address) = self.queue.peek().map(|t| t.address) else {
            return Ok(None);
        };
        self.check_timeout()?;
        let seen = self.queue.was_already_popped(address);
        let Some(jt) = self.queue.pop() else {
            return Ok(None);
        };
        self.stats.popped += 1;
        *self.stats.popped_by_kind.entry(jt.kind).or_default() += 1;
        debug!(target = %jt, already_popped = seen, "processing jump target");

        match self.owner_at(jt.address) {
            Some(owner) => {
                self.stats.already_owned += 1;
                self.bind_owned(&jt, owner)?;
            }
            None => self.decode_jump_target(&jt)?,
        }
        Ok(Some(jt))
    }

    /// Drain the queue, bind edges left over from collapsed duplicate
    /// targets and check that no placeholder survived.
    pub fn finish(mut self) -> Result<DecodeOutput> {
        while self.step()?.is_some() {}
        self.bind_leftovers()?;
        let count = self.module.pending_placeholders().count();
        if count > 0 {
            let e = LiftError::UnresolvedEdges { count };
            return Err(crate::log_error!(e));
        }
        info!(
            functions = self.module.function_count(),
            blocks = self.module.block_count(),
            instructions = self.stats.instructions,
            popped = self.stats.popped,
            failed = self.stats.failed_translations,
            "decode finished"
        );
        let pseudo_functions = self.translator.pseudo_functions();
        let x87 = self.translator.x87_features().cloned();
        Ok(DecodeOutput {
            module: self.module,
            index: self.index,
            allowed: self.ranges.allowed,
            alternative: self.ranges.alternative,
            decoded: self.decoded,
            stats: self.stats,
            pseudo_functions,
            x87,
        })
    }

    fn owner_at(&self, address: u64) -> Option<Owner> {
        if let Some(f) = self.index.function_at(address) {
            let entry = self.module.function(f).entry_block()?;
            return Some(Owner::FunctionEntry(f, entry));
        }
        if let Some(b) = self.index.block_at(address) {
            return Some(Owner::BlockStart(b));
        }
        self.index.instruction_at(address).map(Owner::Inside)
    }

    fn origin_placeholder(&self, jt: &JumpTarget) -> Result<PlaceholderId> {
        jt.placeholder().ok_or_else(|| {
            LiftError::structural(
                jt.address,
                format!("{} target without an originating placeholder", jt.kind),
            )
        })
    }

    /// Destination for an edge from `origin` to code that already exists.
    fn destination_for(
        &mut self,
        owner: Owner,
        address: u64,
        is_call: bool,
        origin: Option<FunctionId>,
        name: Option<&str>,
    ) -> Result<Destination> {
        match owner {
            Owner::FunctionEntry(f, entry) => {
                if !is_call && origin == Some(f) {
                    Ok(Destination::Block(entry))
                } else {
                    Ok(Destination::Function(f))
                }
            }
            Owner::BlockStart(b) => {
                self.check_local(b, address, origin)?;
                Ok(Destination::Block(b))
            }
            Owner::Inside(inst) => {
                let b = self.module.inst_block(inst);
                self.check_local(b, address, origin)?;
                self.check_block_budget()?;
                let new = self.module.split_block(inst, address, name);
                self.index.insert_block(address, new);
                self.stats.block_splits += 1;
                debug!(
                    address = format_args!("{:#x}", address),
                    block = %self.module.block(new).name,
                    "block split"
                );
                Ok(Destination::Block(new))
            }
        }
    }

    /// Landing past the entry of a function is only valid from inside it.
    fn check_local(&self, block: BlockId, address: u64, origin: Option<FunctionId>) -> Result<()> {
        let f = self.module.block(block).function;
        if origin != Some(f) {
            return Err(LiftError::structural(
                address,
                format!(
                    "edge lands inside a different function {}",
                    self.module.function(f).name
                ),
            ));
        }
        Ok(())
    }

    /// The target's address is already decoded.
    fn bind_owned(&mut self, jt: &JumpTarget, owner: Owner) -> Result<()> {
        let address = jt.address;
        match jt.kind {
            JumpTargetKind::EntryPoint
            | JumpTargetKind::ReturnTarget
            | JumpTargetKind::Unknown => {
                if !matches!(owner, Owner::FunctionEntry(..)) {
                    warn!(target = %jt, "seed lands inside decoded code; dropped");
                    self.stats.dropped_seeds += 1;
                }
                Ok(())
            }
            JumpTargetKind::CallReturnSite => {
                let p = self.origin_placeholder(jt)?;
                let call = self.module.placeholder(p).inst;
                let origin = self.module.inst_function(call);
                let dest =
                    self.destination_for(owner, address, false, Some(origin), jt.name())?;
                let mut irb = IrBuilder::after(&mut self.module, call);
                irb.emit(Instruction::Branch { target: dest });
                Ok(())
            }
            kind => {
                let p = self.origin_placeholder(jt)?;
                if !self.patcher.is_pending(p) {
                    return Ok(());
                }
                let origin = self.module.inst_function(self.module.placeholder(p).inst);
                let is_call = kind == JumpTargetKind::CallTarget;
                let dest =
                    self.destination_for(owner, address, is_call, Some(origin), jt.name())?;
                let role = Self::role_of(kind);
                self.patcher.resolve(&mut self.module, p, role, dest)
            }
        }
    }

    fn role_of(kind: JumpTargetKind) -> EdgeRole {
        match kind {
            JumpTargetKind::CondBranchTaken => EdgeRole::True,
            JumpTargetKind::CondBranchFallthrough => EdgeRole::False,
            _ => EdgeRole::Target,
        }
    }

    /// Bytes to decode for `jt`: bounded by the range that holds it.
    fn fetch(&self, jt: &JumpTarget) -> Option<(AddressRange, &'a [u8])> {
        let range = self.ranges.allowed.range_containing(jt.address).or_else(|| {
            let seeded = jt.kind == JumpTargetKind::EntryPoint;
            (seeded && self.config.use_alternative_ranges)
                .then(|| self.ranges.alternative.range_containing(jt.address))
                .flatten()
        })?;
        let image = self.image;
        let bytes = image.raw_bytes_at(jt.address)?;
        let len = bytes.len().min((range.end - jt.address) as usize);
        (len > 0).then(|| (range, &bytes[..len]))
    }

    fn decode_jump_target(&mut self, jt: &JumpTarget) -> Result<()> {
        let Some((range, bytes)) = self.fetch(jt) else {
            return self.drop_unreachable(jt);
        };
        let Some(mut cursor) = self.materialize(jt)? else {
            return Ok(());
        };

        let mode = if jt.is_known_mode() {
            jt.mode
        } else {
            self.translator.current_mode()
        };
        if mode != self.translator.current_mode() {
            let arch = self.translator.arch();
            self.translator
                .set_mode(mode)
                .map_err(|e| LiftError::Translator {
                    arch: arch.to_string(),
                    message: e.to_string(),
                })?;
        }

        let start = jt.address;
        let end = start + bytes.len() as u64;
        let mut address = start;
        let mut terminated = false;
        while address < end {
            self.check_instruction_budget()?;
            let offset = (address - start) as usize;
            let mut irb = IrBuilder::new(&mut self.module, cursor);
            let res = self.translator.translate_one(&bytes[offset..], address, &mut irb);
            cursor = irb.cursor();
            if res.failed() {
                warn!(
                    address = format_args!("{:#x}", address),
                    "translation failed; block left open"
                );
                self.stats.failed_translations += 1;
                break;
            }
            if let Some(asm) = res.asm_inst {
                self.index.insert_instruction(address, asm);
            }
            self.stats.instructions += 1;
            address += res.size as u64;
            if res.flow.is_some() {
                self.classify(&res, mode)?;
                terminated = true;
                break;
            }
        }

        if !terminated && address == end && address > start {
            self.link_fallthrough(cursor, end)?;
        }
        if address > start {
            self.ranges.allowed.remove(start, address);
            self.ranges.alternative.remove(start, address);
            self.decoded.insert(start, address);
            self.stats.decoded_runs += 1;
        }
        debug!(
            start = format_args!("{:#x}", start),
            end = format_args!("{:#x}", address),
            range = %range,
            "decoded run"
        );
        Ok(())
    }

    /// A run that hit the end of its range right where decoded code
    /// begins falls through into it.
    fn link_fallthrough(&mut self, cursor: Cursor, next: u64) -> Result<()> {
        let Some(owner) = self.owner_at(next) else {
            return Ok(());
        };
        let origin = self.module.block(cursor.block).function;
        let dest = self.destination_for(owner, next, false, Some(origin), None)?;
        IrBuilder::new(&mut self.module, cursor).emit(Instruction::Branch { target: dest });
        Ok(())
    }

    /// Nothing can be decoded at the target. Edges depending on it leave
    /// the decoded graph.
    fn drop_unreachable(&mut self, jt: &JumpTarget) -> Result<()> {
        self.stats.unreachable += 1;
        debug!(target = %jt, "no decodable bytes; skipped");
        let Some(p) = jt.placeholder() else {
            return Ok(());
        };
        if jt.kind == JumpTargetKind::CallReturnSite || !self.patcher.is_pending(p) {
            return Ok(());
        }
        let role = Self::role_of(jt.kind);
        self.patcher
            .resolve(&mut self.module, p, role, Destination::External(jt.address))
    }

    /// Where the run for a fresh target goes. `None` drops the target.
    fn materialize(&mut self, jt: &JumpTarget) -> Result<Option<Cursor>> {
        let address = jt.address;
        match jt.kind {
            JumpTargetKind::EntryPoint
            | JumpTargetKind::ReturnTarget
            | JumpTargetKind::Unknown => {
                let first = self.module.function_count() == 0;
                if !first && self.index.function_containing(address, &self.module).is_some() {
                    warn!(target = %jt, "seed lands inside an existing function; dropped");
                    self.stats.dropped_seeds += 1;
                    return Ok(None);
                }
                let f = self.create_function(address, jt.name())?;
                Ok(Some(self.entry_cursor(f)?))
            }
            JumpTargetKind::CallReturnSite => {
                let p = self.origin_placeholder(jt)?;
                let call = self.module.placeholder(p).inst;
                Ok(Some(IrBuilder::after(&mut self.module, call).cursor()))
            }
            JumpTargetKind::CondBranchFallthrough => {
                let p = self.origin_placeholder(jt)?;
                let f = self.module.inst_function(self.module.placeholder(p).inst);
                let b = self.create_block(f, address, jt.name())?;
                self.patcher
                    .resolve_false(&mut self.module, p, Destination::Block(b))?;
                Ok(Some(self.end_cursor(b)))
            }
            JumpTargetKind::CondBranchTaken | JumpTargetKind::BranchTarget => {
                let p = self.origin_placeholder(jt)?;
                let origin = self.module.inst_function(self.module.placeholder(p).inst);
                let role = Self::role_of(jt.kind);
                match self.index.function_before(address) {
                    Some(f) if f == origin => {
                        let b = self.create_block(f, address, jt.name())?;
                        self.patcher
                            .resolve(&mut self.module, p, role, Destination::Block(b))?;
                        Ok(Some(self.end_cursor(b)))
                    }
                    before => {
                        if let Some(other) = before {
                            if self.index.function_containing(address, &self.module).is_some() {
                                return Err(LiftError::structural(
                                    address,
                                    format!(
                                        "branch target lies inside function {}",
                                        self.module.function(other).name
                                    ),
                                ));
                            }
                        }
                        // Branch to code outside the function: tail transfer.
                        let f = self.create_function(address, jt.name())?;
                        self.patcher
                            .resolve(&mut self.module, p, role, Destination::Function(f))?;
                        Ok(Some(self.entry_cursor(f)?))
                    }
                }
            }
            JumpTargetKind::CallTarget => {
                let p = self.origin_placeholder(jt)?;
                let origin = self.module.inst_function(self.module.placeholder(p).inst);
                if let Some(f) = self.index.function_containing(address, &self.module) {
                    if f != origin {
                        return Err(LiftError::structural(
                            address,
                            format!(
                                "call target lies inside function {}",
                                self.module.function(f).name
                            ),
                        ));
                    }
                    // Call into the caller's own body.
                    let b = self.create_block(f, address, jt.name())?;
                    self.patcher
                        .resolve_target(&mut self.module, p, Destination::Block(b))?;
                    return Ok(Some(self.end_cursor(b)));
                }
                let f = self.create_function(address, jt.name())?;
                self.patcher
                    .resolve_target(&mut self.module, p, Destination::Function(f))?;
                Ok(Some(self.entry_cursor(f)?))
            }
        }
    }

    /// Push successors of a terminator and register its pending edge.
    fn classify(&mut self, res: &TranslationResult, mode: ArchMode) -> Result<()> {
        let Some(flow) = res.flow else {
            return Ok(());
        };
        let p = res.placeholder.ok_or_else(|| {
            let address = res
                .asm_inst
                .and_then(|i| self.module.inst(i).asm_address())
                .unwrap_or_default();
            LiftError::structural(address, format!("{} reported without a placeholder", flow))
        })?;
        let ph = self.module.placeholder(p).clone();
        let origin = JumpOrigin::Placeholder(p);
        let target = res.target.as_const().map(|t| self.resolver.resolve(t, mode));

        match flow {
            FlowKind::Call => {
                self.patcher.register_call(p);
                match target {
                    Some((t, m)) => {
                        self.queue
                            .push(JumpTarget::new(t, JumpTargetKind::CallTarget, m, origin));
                    }
                    None => self.resolve_indirect(p, EdgeRole::Target, &res.target)?,
                }
                self.queue.push(JumpTarget::new(
                    ph.next_address,
                    JumpTargetKind::CallReturnSite,
                    mode,
                    origin,
                ));
            }
            FlowKind::Return => {
                if let Some((t, m)) = target {
                    self.queue.push(JumpTarget::new(
                        t,
                        JumpTargetKind::ReturnTarget,
                        m,
                        JumpOrigin::Address(ph.address),
                    ));
                }
                self.patcher.resolve_return(&mut self.module, p);
            }
            FlowKind::Branch => {
                self.patcher.register_branch(p);
                match target {
                    Some((t, m)) => {
                        self.queue
                            .push(JumpTarget::new(t, JumpTargetKind::BranchTarget, m, origin));
                    }
                    None => self.resolve_indirect(p, EdgeRole::Target, &res.target)?,
                }
            }
            FlowKind::CondBranch => {
                self.patcher.register_cond_branch(p);
                match target {
                    Some((t, m)) => {
                        self.queue.push(JumpTarget::new(
                            t,
                            JumpTargetKind::CondBranchTaken,
                            m,
                            origin,
                        ));
                    }
                    None => self.resolve_indirect(p, EdgeRole::True, &res.target)?,
                }
                self.queue.push(JumpTarget::new(
                    ph.next_address,
                    JumpTargetKind::CondBranchFallthrough,
                    mode,
                    origin,
                ));
            }
        }
        Ok(())
    }

    fn resolve_indirect(&mut self, p: PlaceholderId, role: EdgeRole, target: &Value) -> Result<()> {
        let dest = Destination::Indirect(target.clone());
        self.patcher.resolve(&mut self.module, p, role, dest)
    }

    fn bind_leftovers(&mut self) -> Result<()> {
        let leftovers: Vec<PlaceholderId> = self.patcher.pending().collect();
        let mode = self.translator.current_mode();
        for p in leftovers {
            let ph = self.module.placeholder(p).clone();
            let origin = self.module.inst_function(ph.inst);
            for role in self.patcher.missing_roles(p) {
                let address = match role {
                    EdgeRole::False => ph.next_address,
                    _ => match ph.target.as_const() {
                        Some(t) => self.resolver.resolve(t, mode).0,
                        None => {
                            self.resolve_indirect(p, role, &ph.target)?;
                            continue;
                        }
                    },
                };
                let is_call = ph.kind == FlowKind::Call;
                let dest = match self.owner_at(address) {
                    Some(owner) => {
                        self.destination_for(owner, address, is_call, Some(origin), None)?
                    }
                    None => Destination::External(address),
                };
                debug!(
                    placeholder = %p,
                    address = format_args!("{:#x}", address),
                    "late-bound edge"
                );
                self.patcher.resolve(&mut self.module, p, role, dest)?;
            }
        }
        Ok(())
    }

    fn create_function(&mut self, address: u64, name: Option<&str>) -> Result<FunctionId> {
        let limit = self.config.budgets.max_functions;
        let used = self.module.function_count();
        if limit > 0 && used >= limit {
            return Err(LiftError::ResourceExhausted {
                resource: "functions".to_string(),
                used,
                limit,
            });
        }
        self.check_block_budget()?;
        let f = self.module.add_function(address, name);
        self.index.insert_function(address, f);
        if let Some(entry) = self.module.function(f).entry_block() {
            self.index.insert_block(address, entry);
        }
        debug!(
            address = format_args!("{:#x}", address),
            name = %self.module.function(f).name,
            "function created"
        );
        Ok(f)
    }

    fn create_block(&mut self, f: FunctionId, address: u64, name: Option<&str>) -> Result<BlockId> {
        self.check_block_budget()?;
        let b = self.module.add_block(f, address, name);
        self.index.insert_block(address, b);
        Ok(b)
    }

    fn entry_cursor(&self, f: FunctionId) -> Result<Cursor> {
        let entry = self.module.function(f).entry_block().ok_or_else(|| {
            LiftError::structural(
                self.module.function(f).entry_address,
                "function has no entry block",
            )
        })?;
        Ok(self.end_cursor(entry))
    }

    fn end_cursor(&self, block: BlockId) -> Cursor {
        Cursor {
            block,
            pos: self.module.block(block).insts.len(),
        }
    }

    fn check_block_budget(&self) -> Result<()> {
        let limit = self.config.budgets.max_blocks;
        let used = self.module.block_count();
        if limit > 0 && used >= limit {
            return Err(LiftError::ResourceExhausted {
                resource: "blocks".to_string(),
                used,
                limit,
            });
        }
        Ok(())
    }

    fn check_instruction_budget(&self) -> Result<()> {
        let limit = self.config.budgets.max_instructions;
        let used = self.stats.instructions;
        if limit > 0 && used >= limit {
            return Err(LiftError::ResourceExhausted {
                resource: "instructions".to_string(),
                used,
                limit,
            });
        }
        Ok(())
    }

    fn check_timeout(&self) -> Result<()> {
        let millis = self.config.budgets.timeout_ms;
        if millis > 0 && self.started.elapsed().as_millis() > u128::from(millis) {
            return Err(LiftError::Timeout { millis });
        }
        Ok(())
    }
}
