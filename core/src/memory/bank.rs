use crate::error::{Error, Result};
use crate::memory::storage::{BlockId, Memory};

/// Handle to a bank owned by a [`BankSwitch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BankId(pub usize);

/// How an out-of-range page selection is handled. Boards differ: some
/// ignore the unused high bits of the bank register (`Wrap`), some decode
/// them into nothing (`Ignore`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BankPolicy {
    /// Index modulo page count.
    #[default]
    Wrap,
    /// Saturate at the last page.
    Clamp,
    /// Keep the current page.
    Ignore,
    /// Refuse with [`Error::InvalidBankIndex`].
    Reject,
}

/// One switchable window: `pages` pages of `page_size` bytes starting at
/// `base` inside `block`. Exactly one page is selected at any time.
#[derive(Clone, Debug)]
pub struct Bank {
    name: String,
    block: BlockId,
    base: usize,
    page_size: usize,
    pages: usize,
    selected: usize,
    initial: usize,
    policy: BankPolicy,
}

impl Bank {
    pub fn new(name: &str, block: BlockId, page_size: usize, pages: usize) -> Self {
        Self {
            name: name.to_string(),
            block,
            base: 0,
            page_size,
            pages,
            selected: 0,
            initial: 0,
            policy: BankPolicy::default(),
        }
    }

    pub fn with_base(mut self, base: usize) -> Self {
        self.base = base;
        self
    }

    pub fn with_policy(mut self, policy: BankPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Page selected at power-on and after reset.
    pub fn with_initial(mut self, page: usize) -> Self {
        self.initial = page;
        self.selected = page;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn policy(&self) -> BankPolicy {
        self.policy
    }

    /// Byte offset into the backing block for `offset` within the window.
    pub fn physical(&self, offset: usize) -> usize {
        self.base + self.selected * self.page_size + offset % self.page_size.max(1)
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::InvalidBankIndex {
            bank: self.name.clone(),
            index,
            pages: self.pages,
        }
    }
}

/// Snapshot of a bank's current mapping, handed to CPUs that cache their
/// opcode base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BankView {
    pub bank: BankId,
    pub block: BlockId,
    /// Byte offset of the selected page inside `block`.
    pub offset: usize,
    pub page: usize,
}

/// Owns every bank of a board and tracks which ones changed since the
/// scheduler last asked.
#[derive(Default)]
pub struct BankSwitch {
    banks: Vec<Bank>,
    changed: Vec<BankId>,
}

impl BankSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bank. Fails if its pages do not fit inside the backing
    /// block or its initial page is out of range.
    pub fn add(&mut self, bank: Bank, memory: &Memory) -> Result<BankId> {
        let block = memory
            .block(bank.block)
            .ok_or(Error::UnknownBlock(bank.block.0))?;
        if bank.pages == 0 || bank.initial >= bank.pages {
            return Err(bank.out_of_range(bank.initial));
        }
        let needed = bank.base + bank.pages * bank.page_size;
        if needed > block.len() {
            let fitting = block.len().saturating_sub(bank.base) / bank.page_size.max(1);
            return Err(Error::InvalidBankIndex {
                bank: bank.name.clone(),
                index: bank.pages - 1,
                pages: fitting,
            });
        }
        let id = BankId(self.banks.len());
        log::debug!(
            "bank \"{}\": {} pages of 0x{:X} bytes in block \"{}\"",
            bank.name,
            bank.pages,
            bank.page_size,
            block.name()
        );
        self.banks.push(bank);
        Ok(id)
    }

    pub fn get(&self, id: BankId) -> Result<&Bank> {
        self.banks.get(id.0).ok_or(Error::UnknownBank(id.0))
    }

    pub fn find(&self, name: &str) -> Option<BankId> {
        self.banks.iter().position(|b| b.name == name).map(BankId)
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Select a page. Takes effect for the very next access through the
    /// bank's window. Returns the page actually selected after the bank's
    /// out-of-range policy is applied.
    pub fn select(&mut self, id: BankId, index: usize) -> Result<usize> {
        let bank = self.banks.get_mut(id.0).ok_or(Error::UnknownBank(id.0))?;
        let page = if index < bank.pages {
            index
        } else {
            match bank.policy {
                BankPolicy::Wrap => index % bank.pages,
                BankPolicy::Clamp => bank.pages - 1,
                BankPolicy::Ignore => bank.selected,
                BankPolicy::Reject => return Err(bank.out_of_range(index)),
            }
        };
        if page != bank.selected {
            bank.selected = page;
            if !self.changed.contains(&id) {
                self.changed.push(id);
            }
        }
        Ok(page)
    }

    /// Resolve an offset within a bank window to its block and byte offset.
    pub fn resolve(&self, id: BankId, offset: usize) -> Option<(BlockId, usize)> {
        self.banks
            .get(id.0)
            .map(|bank| (bank.block, bank.physical(offset)))
    }

    pub fn view(&self, id: BankId) -> Option<BankView> {
        self.banks.get(id.0).map(|bank| BankView {
            bank: id,
            block: bank.block,
            offset: bank.physical(0),
            page: bank.selected,
        })
    }

    /// Drain the list of banks switched since the last call.
    pub fn take_changes(&mut self) -> Vec<BankId> {
        std::mem::take(&mut self.changed)
    }

    /// Return every bank to its initial page.
    pub fn reset(&mut self) {
        for bank in &mut self.banks {
            bank.selected = bank.initial;
        }
        self.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(policy: BankPolicy) -> (BankSwitch, BankId) {
        let mut memory = Memory::new();
        let rom = memory.add_rom("banked", (0..0x8000u32).map(|i| (i >> 13) as u8).collect());
        let mut banks = BankSwitch::new();
        let id = banks
            .add(
                Bank::new("bank1", rom, 0x2000, 4).with_policy(policy),
                &memory,
            )
            .unwrap();
        (banks, id)
    }

    #[test]
    fn select_rebinds_window() {
        let (mut banks, id) = setup(BankPolicy::Wrap);
        assert_eq!(banks.resolve(id, 0x10), Some((BlockId(0), 0x10)));
        banks.select(id, 2).unwrap();
        assert_eq!(banks.resolve(id, 0x10), Some((BlockId(0), 0x4010)));
        assert_eq!(banks.take_changes(), vec![id]);
        assert!(banks.take_changes().is_empty());
    }

    #[test]
    fn out_of_range_policies() {
        let (mut banks, id) = setup(BankPolicy::Wrap);
        assert_eq!(banks.select(id, 5).unwrap(), 1);

        let (mut banks, id) = setup(BankPolicy::Clamp);
        assert_eq!(banks.select(id, 9).unwrap(), 3);

        let (mut banks, id) = setup(BankPolicy::Ignore);
        banks.select(id, 2).unwrap();
        assert_eq!(banks.select(id, 7).unwrap(), 2);

        let (mut banks, id) = setup(BankPolicy::Reject);
        assert!(matches!(
            banks.select(id, 4),
            Err(Error::InvalidBankIndex { index: 4, pages: 4, .. })
        ));
    }

    #[test]
    fn oversized_bank_is_rejected() {
        let mut memory = Memory::new();
        let rom = memory.add_rom("small", vec![0; 0x3000]);
        let mut banks = BankSwitch::new();
        let err = banks
            .add(Bank::new("bank1", rom, 0x2000, 2), &memory)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBankIndex { pages: 1, .. }));
    }

    #[test]
    fn reselecting_same_page_is_not_a_change() {
        let (mut banks, id) = setup(BankPolicy::Wrap);
        banks.select(id, 0).unwrap();
        assert!(banks.take_changes().is_empty());
    }
}
