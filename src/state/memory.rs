pub const MEMORY_SIZE: usize = 0x10000;

/// TRS-80 video RAM window, the sub-range fetched when full memory updates
/// are disabled.
pub const VIDEO_RAM_START: u16 = 0x3C00;
pub const VIDEO_RAM_END: u16 = 0x3FFF;

pub const MIN_BYTE_SIZE: u8 = 1;
pub const MAX_BYTE_SIZE: u8 = 8;

/// Summary of one `apply_update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUpdate {
    pub start: u16,
    /// Number of addresses written by this block.
    pub len: usize,
    /// Number of those addresses whose byte differs from before.
    pub changed: usize,
}

/// Local mirror of the SUT's 64K address space plus the changed-map of the
/// most recent update.
///
/// The image is only mutated through [`MemoryImage::apply_update`]. The
/// changed-map is scoped to the addresses a block touches: flags outside the
/// block keep whatever the previous update left there, so partial updates of
/// a sub-window (video RAM) don't wipe deltas elsewhere.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Box<[u8]>,
    changed: Box<[bool]>,
    byte_size: u8,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
            changed: vec![false; MEMORY_SIZE].into_boxed_slice(),
            byte_size: MIN_BYTE_SIZE,
        }
    }

    /// Applies an offset-prefixed block: `[start_hi, start_lo, byte...]`.
    ///
    /// Returns `None` when the block is too short to carry a start offset.
    /// Bytes that would land past 0xFFFF are dropped.
    pub fn apply_update(&mut self, block: &[u8]) -> Option<MemoryUpdate> {
        let (header, payload) = match block {
            [hi, lo, rest @ ..] => (u16::from_be_bytes([*hi, *lo]), rest),
            _ => {
                log::warn!("Ignoring memory block of {} byte(s)", block.len());
                return None;
            }
        };

        let start = header as usize;
        let room = MEMORY_SIZE - start;
        if payload.len() > room {
            log::warn!(
                "Memory block at ${:04X} overruns address space by {} byte(s)",
                header,
                payload.len() - room
            );
        }
        let payload = &payload[..payload.len().min(room)];

        let mut changed = 0;
        for (offset, &value) in payload.iter().enumerate() {
            let addr = start + offset;
            if self.data[addr] != value {
                self.data[addr] = value;
                self.changed[addr] = true;
                changed += 1;
            } else {
                self.changed[addr] = false;
            }
        }

        Some(MemoryUpdate {
            start: header,
            len: payload.len(),
            changed,
        })
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    /// Little-endian word at `addr`, wrapping at the top of memory.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// `len` bytes starting at `start`, clamped to the end of memory.
    pub fn window(&self, start: u16, len: usize) -> &[u8] {
        let start = start as usize;
        let end = start.saturating_add(len).min(MEMORY_SIZE);
        &self.data[start..end]
    }

    pub fn is_changed(&self, addr: u16) -> bool {
        self.changed[addr as usize]
    }

    pub fn changed_map(&self) -> &[bool] {
        &self.changed
    }

    pub fn changed_count(&self) -> usize {
        self.changed.iter().filter(|c| **c).count()
    }

    /// Display grouping width of the memory view. Pure view state: it never
    /// touches the image or the changed-map.
    pub fn byte_size(&self) -> u8 {
        self.byte_size
    }

    pub fn increase_byte_size(&mut self) {
        self.byte_size = (self.byte_size + 1).min(MAX_BYTE_SIZE);
    }

    pub fn decrease_byte_size(&mut self) {
        self.byte_size = self.byte_size.saturating_sub(1).max(MIN_BYTE_SIZE);
    }
}

/// Builds a memory block addressed at `start`.
pub fn make_block(start: u16, bytes: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(bytes.len() + 2);
    block.extend_from_slice(&start.to_be_bytes());
    block.extend_from_slice(bytes);
    block
}
