use super::types::{Breakpoint, BreakpointKind};
use crate::sut::protocol::Command;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub breakpoint: Breakpoint,
    /// Installed by the step predictor rather than the user. Never sent to
    /// the SUT.
    pub synthetic: bool,
}

/// Client-side view of the SUT's breakpoint list.
///
/// The SUT owns the list; this registry only mirrors it and remembers which
/// PC addresses belong to the current synthetic batch, so entries coming
/// back from the SUT can be tagged by the path that created them.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    last: Vec<Breakpoint>,
    entries: Vec<RegistryEntry>,
    synthetic_batch: BTreeSet<u16>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mirrored list with the SUT's authoritative one.
    ///
    /// Returns `false` when the list is identical to the previous one, order
    /// included. The SUT resends the list on unrelated events and those must
    /// not cause churn downstream. Tags are still refreshed in that case: the
    /// same list can come back after a step reinstalled one of its entries.
    pub fn replace_all(&mut self, list: Vec<Breakpoint>) -> bool {
        if list == self.last {
            self.retag();
            return false;
        }
        self.entries = list
            .iter()
            .map(|bp| RegistryEntry {
                breakpoint: *bp,
                synthetic: self.is_synthetic(bp),
            })
            .collect();
        self.last = list;
        true
    }

    fn retag(&mut self) {
        let batch = &self.synthetic_batch;
        for entry in self.entries.iter_mut() {
            entry.synthetic = entry.breakpoint.kind == BreakpointKind::ProgramCounter
                && batch.contains(&entry.breakpoint.address);
        }
    }

    pub fn add_real(&mut self, address: u16, kind: BreakpointKind) -> Command {
        if kind == BreakpointKind::ProgramCounter {
            self.synthetic_batch.remove(&address);
        }
        Command::AddBreakpoint { kind, address }
    }

    pub fn add_synthetic(&mut self, address: u16) -> Command {
        self.synthetic_batch.insert(address);
        Command::AddBreakpoint {
            kind: BreakpointKind::ProgramCounter,
            address,
        }
    }

    pub fn remove(&self, id: i64) -> Command {
        Command::RemoveBreakpoint { id }
    }

    /// Forgets the synthetic batch and yields `clear_breakpoints`.
    ///
    /// The SUT has no notion of synthetic breakpoints, so this clears every
    /// breakpoint on the SUT, the user's included. Real breakpoints set
    /// before an alt-step are lost.
    pub fn clear_synthetic(&mut self) -> Command {
        if self.entries.iter().any(|e| !e.synthetic) {
            log::warn!(
                "Clearing all SUT breakpoints for alt-step; {} user breakpoint(s) will be dropped",
                self.user_breakpoints().count()
            );
        }
        self.synthetic_batch.clear();
        Command::ClearBreakpoints
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn user_breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries
            .iter()
            .filter(|e| !e.synthetic)
            .map(|e| &e.breakpoint)
    }

    pub fn synthetic_breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries
            .iter()
            .filter(|e| e.synthetic)
            .map(|e| &e.breakpoint)
    }

    /// PC addresses of the synthetic batch not yet cleared.
    pub fn pending_synthetic(&self) -> impl Iterator<Item = u16> + '_ {
        self.synthetic_batch.iter().copied()
    }

    pub fn find(&self, address: u16, kind: BreakpointKind) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.breakpoint.address == address && e.breakpoint.kind == kind)
    }

    fn is_synthetic(&self, bp: &Breakpoint) -> bool {
        bp.kind == BreakpointKind::ProgramCounter && self.synthetic_batch.contains(&bp.address)
    }
}
