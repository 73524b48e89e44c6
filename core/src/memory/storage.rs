/// Handle to a block owned by [`Memory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Contents are fixed at configuration time; bus writes are ignored.
    Rom,
    /// Contents are restored to their power-on image on reset.
    Ram,
}

/// A contiguous byte array backing one or more address regions.
pub struct MemoryBlock {
    name: String,
    kind: BlockKind,
    data: Vec<u8>,
    power_on: Vec<u8>,
}

impl MemoryBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view for loaders and debuggers. Bus writes go through
    /// [`Memory::write`] instead, which refuses ROM blocks.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// All storage blocks of one board instance.
#[derive(Default)]
pub struct Memory {
    blocks: Vec<MemoryBlock>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ROM block holding `data`.
    pub fn add_rom(&mut self, name: &str, data: Vec<u8>) -> BlockId {
        self.push(name, BlockKind::Rom, data)
    }

    /// Add a RAM block of `size` bytes filled with `fill`.
    pub fn add_ram(&mut self, name: &str, size: usize, fill: u8) -> BlockId {
        self.push(name, BlockKind::Ram, vec![fill; size])
    }

    /// Add a RAM block with explicit power-on contents.
    pub fn add_ram_with(&mut self, name: &str, data: Vec<u8>) -> BlockId {
        self.push(name, BlockKind::Ram, data)
    }

    fn push(&mut self, name: &str, kind: BlockKind, data: Vec<u8>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(MemoryBlock {
            name: name.to_string(),
            kind,
            power_on: data.clone(),
            data,
        });
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.blocks.get(id.0)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut MemoryBlock> {
        self.blocks.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<BlockId> {
        self.blocks.iter().position(|b| b.name == name).map(BlockId)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Read a byte; out-of-range offsets wrap within the block.
    pub fn read(&self, id: BlockId, offset: usize) -> u8 {
        match self.blocks.get(id.0) {
            Some(block) if !block.data.is_empty() => block.data[offset % block.data.len()],
            _ => 0xFF,
        }
    }

    /// Write a byte to a RAM block. Writes to ROM blocks are dropped.
    pub fn write(&mut self, id: BlockId, offset: usize, value: u8) {
        if let Some(block) = self.blocks.get_mut(id.0)
            && block.kind == BlockKind::Ram
            && !block.data.is_empty()
        {
            let len = block.data.len();
            block.data[offset % len] = value;
        }
    }

    /// Restore every RAM block to its power-on image. ROM is untouched.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            if block.kind == BlockKind::Ram {
                block.data.copy_from_slice(&block.power_on);
            }
        }
    }
}
