use crate::device::{Device, DeviceContext};
use crate::memory::BankId;

/// Bank register: page = (data >> shift) & mask.
pub struct BankSelect {
    name: String,
    bank: BankId,
    shift: u8,
    mask: u8,
    last: u8,
}

impl BankSelect {
    pub fn new(name: &str, bank: BankId) -> Self {
        Self {
            name: name.to_string(),
            bank,
            shift: 0,
            mask: 0xFF,
            last: 0,
        }
    }

    pub fn with_field(mut self, shift: u8, mask: u8) -> Self {
        self.shift = shift;
        self.mask = mask;
        self
    }
}

impl Device for BankSelect {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, _offset: u16, _ctx: &mut DeviceContext) -> u8 {
        self.last
    }

    fn write(&mut self, _offset: u16, data: u8, ctx: &mut DeviceContext) {
        self.last = data;
        let page = (data.checked_shr(self.shift.into()).unwrap_or(0) & self.mask) as usize;
        if let Err(err) = ctx.select_bank(self.bank, page) {
            log::warn!("{}: {err}", self.name);
        }
    }

    fn reset(&mut self) {
        self.last = 0;
    }
}
