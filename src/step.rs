//! Instruction stepping, including the alternate mode for emulators that
//! only offer breakpoints and continue.
//!
//! In alternate mode a step is simulated: the possible successors of the
//! instruction at PC are predicted statically, a synthetic PC breakpoint is
//! installed on each, and the SUT is continued. Whichever successor the CPU
//! actually reaches halts it again, and the next register update reports
//! the new PC. Nothing is tracked between requests.

use crate::disassembler::Disassembler;
use crate::state::{BreakpointRegistry, MemoryImage, Registers, SutContext};
use crate::sut::protocol::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Native,
    Alternate,
}

impl StepMode {
    pub fn for_context(context: &SutContext) -> Self {
        if context.alt_single_step_mode {
            StepMode::Alternate
        } else {
            StepMode::Native
        }
    }
}

pub struct StepPredictor<D: Disassembler> {
    disassembler: D,
}

impl<D: Disassembler> StepPredictor<D> {
    pub fn new(disassembler: D) -> Self {
        Self { disassembler }
    }

    pub fn disassembler(&self) -> &D {
        &self.disassembler
    }

    /// The ordered command burst for one step request. Empty while the SUT
    /// is running: stepping only makes sense from a halted CPU.
    ///
    /// The burst is sent without waiting for acknowledgements, so it relies
    /// on the channel preserving command order.
    pub fn plan_step(
        &self,
        context: &SutContext,
        registers: &Registers,
        memory: &MemoryImage,
        breakpoints: &mut BreakpointRegistry,
    ) -> Vec<Command> {
        if context.running {
            log::debug!("Ignoring step request while SUT is running");
            return Vec::new();
        }

        match StepMode::for_context(context) {
            StepMode::Native => vec![Command::Step],
            StepMode::Alternate => {
                let candidates = self.disassembler.predict_next_pc(memory, registers);
                if candidates.is_empty() {
                    log::warn!(
                        "No successor predicted for ${:04X}, not stepping",
                        registers.pc
                    );
                    return Vec::new();
                }
                log::debug!(
                    "Alt-step from ${:04X}: breakpoints at {}",
                    registers.pc,
                    candidates
                        .iter()
                        .map(|a| format!("${:04X}", a))
                        .collect::<Vec<_>>()
                        .join(", ")
                );

                let mut commands = Vec::with_capacity(candidates.len() + 2);
                commands.push(breakpoints.clear_synthetic());
                commands.extend(candidates.into_iter().map(|a| breakpoints.add_synthetic(a)));
                commands.push(Command::Continue);
                commands
            }
        }
    }
}
