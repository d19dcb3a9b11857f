use crate::cpu::Instruction;
use crate::disassembler::Disassembler;
use crate::error::{Result, XrayError};
use crate::parser::trs80gp;
use crate::state::{
    Breakpoint, BreakpointKind, BreakpointRegistry, MEMORY_SIZE, MemoryImage, Registers,
    SutContext, VIDEO_RAM_END, VIDEO_RAM_START,
};
use crate::step::StepPredictor;
use crate::sut::connection::{ConnectionManager, Connector, LinkHealth, Tick};
use crate::sut::protocol::{Command, InboundFrame};
use crate::sut::router::{FrameSink, route};
use crate::utils::{parse_address_fields, parse_hex_value};

/// Frame used by [`Session::insert_test_data`].
pub const TEST_FRAME: &str = r#"{"context":{"system_name":"sdlTRS","model":3,"running":true,"alt_single_step_mode":false},"breakpoints":[{"id":0,"address":4656,"type":0},{"id":1,"address":6163,"type":0},{"id":2,"address":9545,"type":0}],"registers":{"pc":2,"sp":65535,"af":68,"bc":0,"de":0,"hl":0,"af_prime":0,"bc_prime":0,"de_prime":0,"hl_prime":0,"ix":0,"iy":0,"i":0,"r_1":0,"r_2":2,"z80_t_state_counter":8,"z80_clockspeed":2.0299999713897705,"z80_iff1":0,"z80_iff2":0,"z80_interrupt_mode":0}}"#;

/// State changes pushed to subscribers (the presentation layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ContextChanged,
    RegistersChanged,
    BreakpointsChanged,
    MemoryUpdated {
        start: u16,
        len: usize,
        changed: usize,
    },
    SelectionChanged(Option<u16>),
    HealthChanged(LinkHealth),
    DisassemblyUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Fetch the whole address space after control commands, rather than
    /// only video RAM.
    pub full_memory_update: bool,
    /// Instructions listed from PC after each update.
    pub disassembly_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            full_memory_update: true,
            disassembly_window: 32,
        }
    }
}

type Observer = Box<dyn FnMut(&Notification)>;

/// The debug session: local view of the SUT kept in sync with the remote
/// emulator, and the entry point for every user command.
///
/// Single-threaded. Each inbound frame is applied completely before the
/// next one is looked at.
pub struct Session<C: Connector, D: Disassembler> {
    context: SutContext,
    registers: Registers,
    memory: MemoryImage,
    breakpoints: BreakpointRegistry,
    selection: Option<u16>,
    disassembly: Vec<Instruction>,
    settings: SessionSettings,
    connection: ConnectionManager<C>,
    stepper: StepPredictor<D>,
    observers: Vec<Observer>,
}

impl<C: Connector, D: Disassembler> Session<C, D> {
    pub fn new(
        connection: ConnectionManager<C>,
        disassembler: D,
        settings: SessionSettings,
    ) -> Self {
        Self {
            context: SutContext::default(),
            registers: Registers::default(),
            memory: MemoryImage::new(),
            breakpoints: BreakpointRegistry::new(),
            selection: None,
            disassembly: Vec::new(),
            settings,
            connection,
            stepper: StepPredictor::new(disassembler),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&Notification) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, notification: Notification) {
        for observer in self.observers.iter_mut() {
            observer(&notification);
        }
    }

    // --- Queries ---

    pub fn context(&self) -> &SutContext {
        &self.context
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.breakpoints
    }

    pub fn selection(&self) -> Option<u16> {
        self.selection
    }

    pub fn selected_value(&self) -> Option<u8> {
        self.selection.map(|addr| self.memory.read(addr))
    }

    pub fn disassembly(&self) -> &[Instruction] {
        &self.disassembly
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn health(&self) -> LinkHealth {
        self.connection.health()
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    // --- Channel side ---

    /// Runs one liveness check. The caller schedules the next one after
    /// `Tick::next_check`; `None` means offline and nothing to schedule.
    pub fn tick(&mut self) -> Option<Tick> {
        let tick = self.connection.tick()?;
        if tick.health_changed {
            self.notify(Notification::HealthChanged(tick.health));
        }
        Some(tick)
    }

    /// A channel just opened. Nothing is assumed to have survived a
    /// disconnect, so everything is requested again.
    pub fn on_channel_open(&mut self) {
        log::info!("Channel to SUT opened");
        self.force_refresh();
    }

    pub fn handle_text_frame(&mut self, text: &str) -> Result<()> {
        let frame = InboundFrame::from_text(text)?;
        self.handle_frame(frame);
        Ok(())
    }

    pub fn handle_binary_frame(&mut self, bytes: Vec<u8>) {
        self.handle_frame(InboundFrame::from_binary(bytes));
    }

    pub fn handle_frame(&mut self, frame: InboundFrame) {
        route(frame, self);
    }

    fn send(&self, command: &Command) {
        self.connection.send_command(command);
    }

    fn send_all(&self, commands: &[Command]) {
        for command in commands {
            self.send(command);
        }
    }

    // --- Control commands ---

    /// Single-steps one instruction, natively or through predicted
    /// breakpoints depending on the SUT's mode. Ignored while running.
    pub fn step(&mut self) {
        let commands = self.stepper.plan_step(
            &self.context,
            &self.registers,
            &self.memory,
            &mut self.breakpoints,
        );
        self.send_all(&commands);
        if commands == [Command::Step] {
            self.request_memory_update();
        }
    }

    pub fn continue_execution(&mut self) {
        self.send(&Command::Continue);
        self.request_memory_update();
    }

    pub fn stop(&mut self) {
        self.send(&Command::Stop);
        self.request_memory_update();
    }

    pub fn soft_reset(&mut self) {
        self.send(&Command::SoftReset);
        self.request_memory_update();
    }

    pub fn hard_reset(&mut self) {
        self.send(&Command::HardReset);
        self.request_memory_update();
    }

    pub fn inject_demo(&mut self) {
        self.send(&Command::InjectDemo);
    }

    pub fn force_refresh(&mut self) {
        self.send(&Command::Refresh);
        self.send(&Command::ForceMemoryUpdate);
    }

    pub fn request_memory_update(&mut self) {
        let command = if self.settings.full_memory_update {
            Command::GetMemory {
                start: 0,
                length: MEMORY_SIZE as u32,
            }
        } else {
            Command::GetMemory {
                start: VIDEO_RAM_START,
                length: (VIDEO_RAM_END - VIDEO_RAM_START) as u32 + 1,
            }
        };
        self.send(&command);
    }

    pub fn toggle_full_memory_update(&mut self) -> bool {
        self.settings.full_memory_update = !self.settings.full_memory_update;
        self.settings.full_memory_update
    }

    pub fn send_key(&mut self, pressed: bool, shift: bool, key: &str) {
        self.send(&Command::KeyEvent {
            pressed,
            shift,
            key: key.to_string(),
        });
    }

    // --- Breakpoints ---

    pub fn add_breakpoint(&mut self, kind: BreakpointKind, address: u16) {
        let command = self.breakpoints.add_real(address, kind);
        self.send(&command);
    }

    /// Adds a breakpoint at the address typed into the two hex fields.
    pub fn add_breakpoint_from_fields(
        &mut self,
        kind: BreakpointKind,
        hi: &str,
        lo: &str,
    ) -> Result<u16> {
        let address = parse_address_fields(hi, lo)?;
        self.add_breakpoint(kind, address);
        Ok(address)
    }

    pub fn remove_breakpoint(&mut self, id: i64) {
        let command = self.breakpoints.remove(id);
        self.send(&command);
    }

    // --- Selection ---

    pub fn select(&mut self, address: u16) {
        self.set_selection(Some(address));
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    /// Selects the address typed into the two hex fields. Invalid input
    /// leaves the selection as it was.
    pub fn select_from_fields(&mut self, hi: &str, lo: &str) -> Result<u16> {
        let address = parse_address_fields(hi, lo)?;
        self.select(address);
        Ok(address)
    }

    /// Asks the SUT to write `value_text` (hex) at the selected address. The
    /// local image only changes once the SUT sends the memory back.
    pub fn write_selected(&mut self, value_text: &str) -> Result<()> {
        let address = self.selection.ok_or(XrayError::NoSelection)?;
        let value = parse_hex_value(value_text)?;
        self.send(&Command::SetMemory { address, value });
        Ok(())
    }

    fn set_selection(&mut self, selection: Option<u16>) {
        if self.selection != selection {
            self.selection = selection;
            self.notify(Notification::SelectionChanged(selection));
        }
    }

    // --- Memory view ---

    pub fn increase_byte_size(&mut self) {
        self.memory.increase_byte_size();
    }

    pub fn decrease_byte_size(&mut self) {
        self.memory.decrease_byte_size();
    }

    // --- Offline sources ---

    /// Loads a trs80gp dump. On a parse error nothing in the session changes.
    pub fn import_trs80gp(&mut self, content: &str) -> Result<()> {
        let snapshot = trs80gp::parse_trs80gp(content)?;
        self.on_context(snapshot.context);
        self.on_registers(snapshot.registers);
        // Applied twice: the first pass loads the image, the second leaves
        // the changed-map all clear.
        self.on_memory_block(&snapshot.memory_block);
        self.on_memory_block(&snapshot.memory_block);
        log::info!(
            "Imported trs80gp dump: {} byte(s), PC=${:04X}",
            snapshot.memory_block.len().saturating_sub(2),
            self.registers.pc
        );
        Ok(())
    }

    /// Routes a canned frame as if the SUT had sent it.
    pub fn insert_test_data(&mut self) -> Result<()> {
        log::info!("Inserting test data");
        self.handle_text_frame(TEST_FRAME)
    }

    fn update_disassembly(&mut self) {
        self.disassembly = self.stepper.disassembler().disassemble(
            &self.memory,
            self.registers.pc,
            self.settings.disassembly_window,
        );
        self.notify(Notification::DisassemblyUpdated);
    }
}

impl<C: Connector, D: Disassembler> FrameSink for Session<C, D> {
    fn on_context(&mut self, context: SutContext) {
        self.context = context;
        self.notify(Notification::ContextChanged);
    }

    fn on_breakpoints(&mut self, breakpoints: Vec<Breakpoint>) {
        if self.breakpoints.replace_all(breakpoints) {
            self.notify(Notification::BreakpointsChanged);
        }
    }

    fn on_registers(&mut self, registers: Registers) {
        self.registers = registers;
        self.notify(Notification::RegistersChanged);
        self.update_disassembly();
    }

    fn on_memory_block(&mut self, block: &[u8]) {
        let Some(update) = self.memory.apply_update(block) else {
            return;
        };
        // Addresses may mean something else after an update.
        self.set_selection(None);
        self.notify(Notification::MemoryUpdated {
            start: update.start,
            len: update.len,
            changed: update.changed,
        });
        self.update_disassembly();
    }
}
