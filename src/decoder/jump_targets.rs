//! Jump targets and the priority worklist that drives decoding.
//!
//! Targets are ordered by kind rank first and address second. The queue
//! treats two targets with the same kind and address as the same target,
//! whatever their origin.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::core::disassembler::ArchMode;
use crate::ir::PlaceholderId;

/// Why an address was queued. Declaration order is pop priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JumpTargetKind {
    /// Instruction after a call
    CallReturnSite,
    CondBranchFallthrough,
    CondBranchTaken,
    BranchTarget,
    CallTarget,
    ReturnTarget,
    EntryPoint,
    Unknown,
}

impl JumpTargetKind {
    pub const ALL: [JumpTargetKind; 8] = [
        JumpTargetKind::CallReturnSite,
        JumpTargetKind::CondBranchFallthrough,
        JumpTargetKind::CondBranchTaken,
        JumpTargetKind::BranchTarget,
        JumpTargetKind::CallTarget,
        JumpTargetKind::ReturnTarget,
        JumpTargetKind::EntryPoint,
        JumpTargetKind::Unknown,
    ];

    /// Lower is popped first.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JumpTargetKind::CallReturnSite => "CALL_RETURN_SITE",
            JumpTargetKind::CondBranchFallthrough => "COND_BRANCH_FALLTHROUGH",
            JumpTargetKind::CondBranchTaken => "COND_BRANCH_TAKEN",
            JumpTargetKind::BranchTarget => "BRANCH_TARGET",
            JumpTargetKind::CallTarget => "CALL_TARGET",
            JumpTargetKind::ReturnTarget => "RETURN_TARGET",
            JumpTargetKind::EntryPoint => "ENTRY_POINT",
            JumpTargetKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JumpTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced a jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpOrigin {
    /// Seeded from outside (entry point, symbols)
    None,
    Address(u64),
    /// The control-transfer placeholder whose edge this target resolves
    Placeholder(PlaceholderId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpTarget {
    pub address: u64,
    pub kind: JumpTargetKind,
    pub origin: JumpOrigin,
    pub mode: ArchMode,
    name: Option<String>,
}

impl JumpTarget {
    pub fn new(address: u64, kind: JumpTargetKind, mode: ArchMode, origin: JumpOrigin) -> Self {
        Self {
            address,
            kind,
            origin,
            mode,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Entry points and call targets start functions.
    pub fn creates_function(&self) -> bool {
        matches!(
            self.kind,
            JumpTargetKind::EntryPoint | JumpTargetKind::CallTarget
        )
    }

    /// Code after a call is only a guess: the callee may not return.
    pub fn is_dry_run_candidate(&self) -> bool {
        self.kind == JumpTargetKind::CallReturnSite
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn is_known_mode(&self) -> bool {
        self.mode.is_known()
    }

    pub fn placeholder(&self) -> Option<PlaceholderId> {
        match self.origin {
            JumpOrigin::Placeholder(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for JumpTarget {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.address == other.address
    }
}

impl Eq for JumpTarget {}

impl PartialOrd for JumpTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JumpTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind, self.address).cmp(&(other.kind, other.address))
    }
}

impl fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} ({})", self.address, self.kind)?;
        if let Some(name) = self.name() {
            write!(f, ", name = {}", name)?;
        }
        Ok(())
    }
}

/// Ordered worklist plus the set of addresses already handed out.
#[derive(Debug, Default)]
pub struct JumpTargetQueue {
    data: BTreeSet<JumpTarget>,
    popped: HashSet<u64>,
}

impl JumpTargetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if an equal target was already queued.
    pub fn push(&mut self, target: JumpTarget) -> bool {
        self.data.insert(target)
    }

    /// Push only when the address is defined.
    pub fn push_maybe(
        &mut self,
        address: Option<u64>,
        kind: JumpTargetKind,
        mode: ArchMode,
        origin: JumpOrigin,
    ) -> bool {
        match address {
            Some(a) => self.push(JumpTarget::new(a, kind, mode, origin)),
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<JumpTarget> {
        let t = self.data.pop_first()?;
        self.popped.insert(t.address);
        Some(t)
    }

    pub fn peek(&self) -> Option<&JumpTarget> {
        self.data.first()
    }

    /// Whether any target at `address` was ever popped, of any kind.
    pub fn was_already_popped(&self, address: u64) -> bool {
        self.popped.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.popped.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &JumpTarget> {
        self.data.iter()
    }
}

impl fmt::Display for JumpTargetQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.data {
            writeln!(f, "{}", t)?;
        }
        Ok(())
    }
}
