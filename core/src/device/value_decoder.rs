use crate::board::Action;
use crate::device::{Device, DeviceContext};

/// Register that decodes whole byte values into actions, for boards where
/// particular "magic" values mean something (a stop code that also selects
/// a bank, say). Values without an entry run the fallback actions.
pub struct ValueDecoder {
    name: String,
    table: Vec<(u8, Vec<Action>)>,
    fallback: Vec<Action>,
    last: u8,
}

impl ValueDecoder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: Vec::new(),
            fallback: Vec::new(),
            last: 0,
        }
    }

    pub fn with_value(mut self, value: u8, actions: Vec<Action>) -> Self {
        self.table.retain(|(v, _)| *v != value);
        self.table.push((value, actions));
        self
    }

    pub fn with_fallback(mut self, actions: Vec<Action>) -> Self {
        self.fallback = actions;
        self
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

impl Device for ValueDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, _offset: u16, _ctx: &mut DeviceContext) -> u8 {
        self.last
    }

    fn write(&mut self, _offset: u16, data: u8, ctx: &mut DeviceContext) {
        self.last = data;
        let actions = self
            .table
            .iter()
            .find(|(v, _)| *v == data)
            .map_or(&self.fallback, |(_, a)| a);
        ctx.apply_all(actions);
    }

    fn reset(&mut self) {
        self.last = 0;
    }
}
