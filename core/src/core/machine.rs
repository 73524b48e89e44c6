use crate::error::Result;

/// Describes a single input button that a machine accepts.
#[derive(Clone, Debug, PartialEq)]
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "P1 Left", "Coin").
    pub name: String,
}

/// Machine-agnostic interface for emulated systems.
///
/// A [`Board`](crate::board::Board) implements this trait so a host can
/// drive any configured machine without knowing its memory map, devices or
/// video layout.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run one frame of emulation.
    ///
    /// Fails only when the board runs in strict mode and a CPU touched an
    /// unmapped address during the frame.
    fn run_frame(&mut self) -> Result<()>;

    /// Render the last composited frame into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&self, buffer: &mut [u8]);

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    /// `pressed` is true for key-down, false for key-up.
    ///
    /// Each call latches the button state; the board samples the latched
    /// state once at the start of the next frame.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Nominal frame rate in Hz.
    fn frame_rate_hz(&self) -> f64;
}
