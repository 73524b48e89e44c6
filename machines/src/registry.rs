//! Machine registry for automatic front-end discovery.
//!
//! Each built-in machine self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] holding its CLI name and embedded description. The
//! front-end discovers available machines at runtime without any central
//! list.

use std::path::Path;

use cabinet_core::board::Board;

use crate::description::MachineDescription;
use crate::error::Result;

/// A built-in machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "tiles").
    pub name: &'static str,
    /// One-line summary for `cabinet list`.
    pub summary: &'static str,
    /// TOML description, embedded at compile time.
    pub source: &'static str,
}

impl MachineEntry {
    pub const fn new(name: &'static str, summary: &'static str, source: &'static str) -> Self {
        Self {
            name,
            summary,
            source,
        }
    }

    pub fn description(&self) -> Result<MachineDescription> {
        MachineDescription::from_toml(self.source)
    }

    /// Build a fresh board. Built-in descriptions carry their data inline.
    pub fn create(&self) -> Result<Board> {
        self.description()?.build(Path::new("."))
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}

inventory::submit! {
    MachineEntry::new(
        "tiles",
        "single CPU painting a 4x4 tilemap with a sprite on top",
        include_str!("boards/tiles.toml"),
    )
}

inventory::submit! {
    MachineEntry::new(
        "latch",
        "main and sound CPUs talking through a command latch",
        include_str!("boards/latch.toml"),
    )
}
