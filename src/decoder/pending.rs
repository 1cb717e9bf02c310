//! Deferred rewriting of control-transfer placeholders.
//!
//! Calls and branches need one destination, conditional branches need
//! both arms. A placeholder is rewritten the moment its last missing
//! destination arrives; returns are rewritten on registration.

use std::collections::BTreeMap;

use crate::error::{LiftError, Result};
use crate::ir::{Destination, FlowKind, Instruction, Module, PlaceholderId};

/// Which destination of a placeholder is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRole {
    /// The single destination of a call or branch
    Target,
    True,
    False,
}

#[derive(Debug, Clone)]
struct PendingEdge {
    kind: FlowKind,
    if_true: Option<Destination>,
    if_false: Option<Destination>,
}

#[derive(Debug, Default)]
pub struct PendingEdgePatcher {
    pending: BTreeMap<PlaceholderId, PendingEdge>,
}

impl PendingEdgePatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, placeholder: PlaceholderId, kind: FlowKind) {
        self.pending.insert(
            placeholder,
            PendingEdge {
                kind,
                if_true: None,
                if_false: None,
            },
        );
    }

    pub fn register_call(&mut self, placeholder: PlaceholderId) {
        self.register(placeholder, FlowKind::Call);
    }

    pub fn register_branch(&mut self, placeholder: PlaceholderId) {
        self.register(placeholder, FlowKind::Branch);
    }

    pub fn register_cond_branch(&mut self, placeholder: PlaceholderId) {
        self.register(placeholder, FlowKind::CondBranch);
    }

    /// Returns need no destination; rewrite right away.
    pub fn resolve_return(&mut self, module: &mut Module, placeholder: PlaceholderId) {
        let inst = module.placeholder(placeholder).inst;
        module.replace_inst(inst, Instruction::Return);
    }

    fn entry(&mut self, module: &Module, placeholder: PlaceholderId) -> Result<&mut PendingEdge> {
        let address = module.placeholder(placeholder).address;
        self.pending.get_mut(&placeholder).ok_or_else(|| {
            LiftError::structural(address, format!("placeholder {} is not pending", placeholder))
        })
    }

    /// Resolve a call or branch.
    pub fn resolve_target(
        &mut self,
        module: &mut Module,
        placeholder: PlaceholderId,
        destination: Destination,
    ) -> Result<()> {
        let kind = self.entry(module, placeholder)?.kind;
        let inst = match kind {
            FlowKind::Call => Instruction::Call {
                callee: destination,
            },
            FlowKind::Branch => Instruction::Branch {
                target: destination,
            },
            other => {
                return Err(LiftError::structural(
                    module.placeholder(placeholder).address,
                    format!("{} placeholder resolved with a single target", other),
                ))
            }
        };
        module.replace_inst(module.placeholder(placeholder).inst, inst);
        self.pending.remove(&placeholder);
        Ok(())
    }

    pub fn resolve_true(
        &mut self,
        module: &mut Module,
        placeholder: PlaceholderId,
        destination: Destination,
    ) -> Result<()> {
        self.resolve_arm(module, placeholder, destination, EdgeRole::True)
    }

    pub fn resolve_false(
        &mut self,
        module: &mut Module,
        placeholder: PlaceholderId,
        destination: Destination,
    ) -> Result<()> {
        self.resolve_arm(module, placeholder, destination, EdgeRole::False)
    }

    /// Resolve whichever role is given.
    pub fn resolve(
        &mut self,
        module: &mut Module,
        placeholder: PlaceholderId,
        role: EdgeRole,
        destination: Destination,
    ) -> Result<()> {
        match role {
            EdgeRole::Target => self.resolve_target(module, placeholder, destination),
            arm => self.resolve_arm(module, placeholder, destination, arm),
        }
    }

    fn resolve_arm(
        &mut self,
        module: &mut Module,
        placeholder: PlaceholderId,
        destination: Destination,
        role: EdgeRole,
    ) -> Result<()> {
        let edge = self.entry(module, placeholder)?;
        if edge.kind != FlowKind::CondBranch {
            // A plain branch takes its destination as the true arm.
            if edge.kind == FlowKind::Branch && role == EdgeRole::True {
                return self.resolve_target(module, placeholder, destination);
            }
            return Err(LiftError::structural(
                module.placeholder(placeholder).address,
                format!("{} placeholder has no {:?} arm", edge.kind, role),
            ));
        }
        match role {
            EdgeRole::True => edge.if_true = Some(destination),
            _ => edge.if_false = Some(destination),
        }
        if let (Some(t), Some(f)) = (&edge.if_true, &edge.if_false) {
            let p = module.placeholder(placeholder);
            let inst = Instruction::CondBranch {
                cond: p.cond.clone(),
                if_true: t.clone(),
                if_false: f.clone(),
            };
            let id = p.inst;
            module.replace_inst(id, inst);
            self.pending.remove(&placeholder);
        }
        Ok(())
    }

    pub fn is_pending(&self, placeholder: PlaceholderId) -> bool {
        self.pending.contains_key(&placeholder)
    }

    /// Roles still missing for a pending placeholder.
    pub fn missing_roles(&self, placeholder: PlaceholderId) -> Vec<EdgeRole> {
        match self.pending.get(&placeholder) {
            None => Vec::new(),
            Some(e) if e.kind == FlowKind::CondBranch => {
                let mut roles = Vec::new();
                if e.if_true.is_none() {
                    roles.push(EdgeRole::True);
                }
                if e.if_false.is_none() {
                    roles.push(EdgeRole::False);
                }
                roles
            }
            Some(_) => vec![EdgeRole::Target],
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = PlaceholderId> + '_ {
        self.pending.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
