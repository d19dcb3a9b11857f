use super::protocol::{InboundFrame, StateUpdate};
use crate::state::{Breakpoint, Registers, SutContext};

/// Receivers of routed frame parts. Implemented by the session; tests use
/// recording sinks.
pub trait FrameSink {
    fn on_context(&mut self, context: SutContext);
    fn on_breakpoints(&mut self, breakpoints: Vec<Breakpoint>);
    fn on_registers(&mut self, registers: Registers);
    fn on_memory_block(&mut self, block: &[u8]);
}

/// Dispatches one decoded frame. Structured parts are delivered in the order
/// context, breakpoints, registers, so a register update already sees the
/// context and breakpoints it arrived with.
pub fn route<S: FrameSink + ?Sized>(frame: InboundFrame, sink: &mut S) {
    match frame {
        InboundFrame::Update(update) => route_update(update, sink),
        InboundFrame::MemoryBlock(block) => sink.on_memory_block(&block),
    }
}

fn route_update<S: FrameSink + ?Sized>(update: StateUpdate, sink: &mut S) {
    if update.is_empty() {
        log::debug!("Structured frame without context, breakpoints or registers");
        return;
    }
    if let Some(context) = update.context {
        sink.on_context(context);
    }
    if let Some(breakpoints) = update.breakpoints {
        sink.on_breakpoints(breakpoints);
    }
    if let Some(registers) = update.registers {
        sink.on_registers(registers);
    }
}
