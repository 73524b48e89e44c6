//! Machine descriptions and the registry of built-in boards.

pub mod build;
pub mod description;
pub mod error;
pub mod registry;

pub use description::MachineDescription;
pub use error::{DescriptionError, Result};
pub use registry::MachineEntry;

use std::path::Path;

use cabinet_core::board::Board;

/// Load a description from a TOML file and build it; relative data paths
/// resolve against the file's directory.
pub fn load_file(path: &Path) -> Result<Board> {
    let text = std::fs::read_to_string(path).map_err(|source| DescriptionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    MachineDescription::from_toml(&text)?.build(base_dir)
}
