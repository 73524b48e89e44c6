//! Input ports: button state folded into bytes the CPUs read.
//!
//! Buttons update a live copy of each port as the host reports them; the
//! board latches the live copy once per frame so every CPU sees a stable
//! value for the whole frame. An attached [`InputSource`] replaces the live
//! copy entirely (record/replay).

use crate::core::machine::InputButton;

/// External provider of port values, polled once per frame.
pub trait InputSource {
    fn read_input_port(&mut self, port: u8, frame: u64) -> u8;
}

/// A button wired to one bit of a port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub id: u8,
    pub name: String,
    pub port: u8,
    pub mask: u8,
    /// Pressed pulls the bit low (the common case on arcade boards).
    pub active_low: bool,
}

#[derive(Default)]
pub struct InputPorts {
    defaults: Vec<u8>,
    live: Vec<u8>,
    latched: Vec<u8>,
    bindings: Vec<Binding>,
    buttons: Vec<InputButton>,
    source: Option<Box<dyn InputSource>>,
}

impl InputPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a port and its idle value (DIP switches live here too).
    pub fn add_port(&mut self, port: u8, default: u8) {
        let index = port as usize;
        if self.defaults.len() <= index {
            self.defaults.resize(index + 1, 0xFF);
            self.live.resize(index + 1, 0xFF);
            self.latched.resize(index + 1, 0xFF);
        }
        self.defaults[index] = default;
        self.live[index] = default;
        self.latched[index] = default;
    }

    pub fn bind(&mut self, binding: Binding) {
        if (binding.port as usize) >= self.defaults.len() {
            self.add_port(binding.port, 0xFF);
        }
        if !self.buttons.iter().any(|b| b.id == binding.id) {
            self.buttons.push(InputButton {
                id: binding.id,
                name: binding.name.clone(),
            });
        }
        self.bindings.push(binding);
    }

    pub fn buttons(&self) -> &[InputButton] {
        &self.buttons
    }

    pub fn port_count(&self) -> usize {
        self.defaults.len()
    }

    pub fn attach_source(&mut self, source: Box<dyn InputSource>) {
        self.source = Some(source);
    }

    pub fn detach_source(&mut self) -> Option<Box<dyn InputSource>> {
        self.source.take()
    }

    /// Update every bit bound to button `id`. Unknown ids are ignored.
    pub fn set_input(&mut self, id: u8, pressed: bool) {
        for binding in self.bindings.iter().filter(|b| b.id == id) {
            let reg = &mut self.live[binding.port as usize];
            if pressed != binding.active_low {
                *reg |= binding.mask;
            } else {
                *reg &= !binding.mask;
            }
        }
    }

    /// Snapshot the port values for the coming frame.
    pub fn latch(&mut self, frame: u64) {
        match self.source.as_mut() {
            Some(source) => {
                for (port, value) in self.latched.iter_mut().enumerate() {
                    *value = source.read_input_port(port as u8, frame);
                }
            }
            None => self.latched.copy_from_slice(&self.live),
        }
    }

    /// Latched value of `port`; undeclared ports float high.
    pub fn read(&self, port: u8) -> u8 {
        self.latched.get(port as usize).copied().unwrap_or(0xFF)
    }

    /// Release every button.
    pub fn reset(&mut self) {
        self.live.copy_from_slice(&self.defaults);
        self.latched.copy_from_slice(&self.defaults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> Binding {
        Binding {
            id: 4,
            name: "Coin".to_string(),
            port: 0,
            mask: 0x20,
            active_low: true,
        }
    }

    #[test]
    fn active_low_button_is_latched_per_frame() {
        let mut ports = InputPorts::new();
        ports.add_port(0, 0xFF);
        ports.bind(coin());

        ports.set_input(4, true);
        assert_eq!(ports.read(0), 0xFF);
        ports.latch(0);
        assert_eq!(ports.read(0), 0xDF);

        ports.set_input(4, false);
        ports.latch(1);
        assert_eq!(ports.read(0), 0xFF);
    }

    #[test]
    fn active_high_binding() {
        let mut ports = InputPorts::new();
        ports.add_port(1, 0x00);
        ports.bind(Binding {
            id: 0,
            name: "Fire".to_string(),
            port: 1,
            mask: 0x01,
            active_low: false,
        });
        ports.set_input(0, true);
        ports.latch(0);
        assert_eq!(ports.read(1), 0x01);
        assert_eq!(ports.buttons().len(), 1);
    }

    struct Replay;

    impl InputSource for Replay {
        fn read_input_port(&mut self, port: u8, frame: u64) -> u8 {
            port.wrapping_add(frame as u8)
        }
    }

    #[test]
    fn source_overrides_live_state() {
        let mut ports = InputPorts::new();
        ports.add_port(0, 0xFF);
        ports.add_port(1, 0xFF);
        ports.attach_source(Box::new(Replay));
        ports.latch(10);
        assert_eq!(ports.read(0), 10);
        assert_eq!(ports.read(1), 11);
        assert_eq!(ports.read(7), 0xFF);
    }
}
