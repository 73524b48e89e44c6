pub mod bus;
pub mod machine;

pub use bus::{Bus, BusMaster};
pub use machine::{InputButton, Machine};
