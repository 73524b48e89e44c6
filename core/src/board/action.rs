use crate::cpu::CpuId;
use crate::device::DeviceId;
use crate::interrupt::InterruptLine;
use crate::memory::BankId;
use crate::video::DrawOrder;

/// A board-level effect. Devices apply these when written to, and the timer
/// queue carries them as payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SelectBank { bank: BankId, page: usize },
    RaiseInterrupt { cpu: CpuId, line: InterruptLine },
    ClearInterrupt { cpu: CpuId, line: InterruptLine },
    MaskInterrupt {
        cpu: CpuId,
        line: InterruptLine,
        masked: bool,
    },
    /// Reset a CPU at the start of its next slice.
    ResetCpu(CpuId),
    HaltCpu { cpu: CpuId, halted: bool },
    FlipScreen(bool),
    SetSpriteOrder(DrawOrder),
    ForceRedraw,
    KickWatchdog,
    /// Deliver `param` to a device's [`on_timer`](crate::device::Device::on_timer).
    Device { device: DeviceId, param: u32 },
}
