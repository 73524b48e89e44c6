//! Declarative machine descriptions.
//!
//! A description is a TOML document naming every storage block, bank,
//! device, address space, CPU and video layer of a board. Cross references
//! are by name; [`MachineDescription::build`] resolves them and wires a
//! [`Board`](cabinet_core::board::Board).

use serde::Deserialize;

use crate::error::Result;

#[derive(Clone, Debug, Deserialize)]
pub struct MachineDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub timing: TimingDesc,
    #[serde(default)]
    pub memory: Vec<BlockDesc>,
    #[serde(default)]
    pub banks: Vec<BankDesc>,
    #[serde(default)]
    pub devices: Vec<DeviceDesc>,
    #[serde(default)]
    pub spaces: Vec<SpaceDesc>,
    #[serde(default)]
    pub cpus: Vec<CpuDesc>,
    pub video: VideoDesc,
    #[serde(default)]
    pub inputs: InputsDesc,
}

impl MachineDescription {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimingDesc {
    pub master_clock_hz: u64,
    pub cycles_per_frame: u64,
    #[serde(default = "one")]
    pub interleave: u32,
    /// Frames without a kick before the board resets.
    pub watchdog: Option<u32>,
}

fn one() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    #[default]
    Rom,
    Ram,
}

/// A storage block. Contents come from `file` (relative to the
/// description's directory), then `data` is laid over them starting at
/// `load_offset`; the block is padded with `fill` up to `size`.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockDesc {
    pub name: String,
    #[serde(default)]
    pub kind: BlockKind,
    pub size: Option<usize>,
    #[serde(default)]
    pub fill: u8,
    pub file: Option<String>,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub load_offset: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyDesc {
    #[default]
    Wrap,
    Clamp,
    Ignore,
    Reject,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BankDesc {
    pub name: String,
    pub block: String,
    pub page_size: usize,
    pub pages: usize,
    #[serde(default)]
    pub base: usize,
    #[serde(default)]
    pub initial: usize,
    #[serde(default)]
    pub policy: PolicyDesc,
}

// ---------------------------------------------------------------------------
// Actions and devices
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineDesc {
    Nmi,
    Irq,
    Firq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderDesc {
    FrontToBack,
    BackToFront,
}

/// A board-level effect, as written in a description.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ActionDesc {
    SelectBank { bank: String, page: usize },
    Raise { cpu: String, line: LineDesc },
    Clear { cpu: String, line: LineDesc },
    Mask {
        cpu: String,
        line: LineDesc,
        masked: bool,
    },
    ResetCpu { cpu: String },
    HaltCpu { cpu: String, halted: bool },
    FlipScreen { flip: bool },
    SpriteOrder { order: OrderDesc },
    ForceRedraw,
    KickWatchdog,
    Device {
        device: String,
        #[serde(default)]
        param: u32,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputDesc {
    pub bit: u8,
    #[serde(default)]
    pub on_set: Vec<ActionDesc>,
    #[serde(default)]
    pub on_clear: Vec<ActionDesc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ValueDesc {
    pub value: u8,
    pub actions: Vec<ActionDesc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortModeDesc {
    #[default]
    Direct,
    AddressLatched,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeviceKind {
    CommandLatch {
        target: String,
        line: LineDesc,
        #[serde(default)]
        delay: u64,
        #[serde(default)]
        gate: bool,
        #[serde(default)]
        acknowledge: bool,
    },
    ControlLatch {
        #[serde(default)]
        outputs: Vec<OutputDesc>,
    },
    ValueDecoder {
        #[serde(default)]
        values: Vec<ValueDesc>,
        #[serde(default)]
        fallback: Vec<ActionDesc>,
    },
    BankSelect {
        bank: String,
        #[serde(default)]
        shift: u8,
        #[serde(default = "all_bits")]
        mask: u8,
    },
    SoundPort {
        #[serde(default)]
        mode: PortModeDesc,
    },
    Adpcm {
        rom: String,
        period: u64,
        granule: Option<usize>,
        end_marker: Option<u8>,
    },
}

fn all_bits() -> u8 {
    0xFF
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeviceDesc {
    pub name: String,
    #[serde(flatten)]
    pub kind: DeviceKind,
}

// ---------------------------------------------------------------------------
// Address spaces
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessDesc {
    #[default]
    ReadWrite,
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaneDesc {
    Code,
    Attribute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteFormatDesc {
    Rgb332,
    Bgr233,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "map", rename_all = "kebab-case")]
pub enum HandlerDesc {
    Rom {
        block: String,
        #[serde(default)]
        offset: usize,
    },
    Ram {
        block: String,
        #[serde(default)]
        offset: usize,
    },
    Bank {
        bank: String,
    },
    Device {
        device: String,
    },
    TileRam {
        layer: String,
        plane: PlaneDesc,
    },
    PaletteRam {
        format: PaletteFormatDesc,
    },
    Input {
        port: u8,
    },
    Nop,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegionDesc {
    pub start: u16,
    pub end: u16,
    #[serde(default)]
    pub access: AccessDesc,
    #[serde(flatten)]
    pub handler: HandlerDesc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmappedDesc {
    OpenBus,
    Strict,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpaceDesc {
    pub name: String,
    pub mirror_mask: Option<u16>,
    pub unmapped: Option<UnmappedDesc>,
    pub open_bus: Option<u8>,
    #[serde(default)]
    pub regions: Vec<RegionDesc>,
}

// ---------------------------------------------------------------------------
// CPUs
// ---------------------------------------------------------------------------

/// One step of a scripted CPU program.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum OpDesc {
    Read { addr: u16 },
    Write { addr: u16, data: u8 },
    WriteLast { addr: u16 },
    IoRead { addr: u16 },
    IoWrite { addr: u16, data: u8 },
    Idle { cycles: u64 },
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoutineDesc {
    pub line: LineDesc,
    pub script: Vec<OpDesc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerDesc {
    #[default]
    Edge,
    Level,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskedDesc {
    #[default]
    Latch,
    Drop,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LineConfigDesc {
    pub line: LineDesc,
    #[serde(default)]
    pub trigger: TriggerDesc,
    #[serde(default)]
    pub masked: MaskedDesc,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimedDesc {
    pub line: LineDesc,
    pub per_frame: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CpuDesc {
    pub name: String,
    pub clock_hz: u64,
    pub program: String,
    pub io: Option<String>,
    pub vblank: Option<LineDesc>,
    pub op_cycles: Option<u64>,
    #[serde(default)]
    pub script: Vec<OpDesc>,
    #[serde(default)]
    pub routines: Vec<RoutineDesc>,
    #[serde(default)]
    pub lines: Vec<LineConfigDesc>,
    #[serde(default)]
    pub timed: Vec<TimedDesc>,
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaletteDesc {
    /// Pen colours as "#RRGGBB".
    #[serde(default)]
    pub colors: Vec<String>,
    /// Block holding one colour PROM byte per pen.
    pub prom: Option<String>,
    pub format: Option<PaletteFormatDesc>,
    #[serde(default)]
    pub colortable: Vec<u16>,
}

/// A graphics set, either decoded from a block with a planar layout or
/// given as one byte per pixel.
#[derive(Clone, Debug, Deserialize)]
pub struct GfxDesc {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub block: Option<String>,
    #[serde(default)]
    pub planes: Vec<usize>,
    #[serde(default)]
    pub x_offsets: Vec<usize>,
    #[serde(default)]
    pub y_offsets: Vec<usize>,
    #[serde(default)]
    pub increment: usize,
    #[serde(default)]
    pub pixels: Vec<u8>,
    #[serde(default)]
    pub color_base: usize,
    pub granularity: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDesc {
    #[default]
    RowMajor,
    ColumnMajor,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TileFormatDesc {
    pub color_mask: Option<u8>,
    pub color_shift: u8,
    pub bank_mask: u8,
    pub bank_shift: u8,
    pub flip_x: u8,
    pub flip_y: u8,
    pub fixed_color: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LayerDesc {
    pub name: String,
    pub cols: usize,
    pub rows: usize,
    pub gfx: String,
    #[serde(default)]
    pub layout: LayoutDesc,
    #[serde(default)]
    pub attributes: bool,
    #[serde(default)]
    pub format: TileFormatDesc,
    pub transparent_pixel: Option<u8>,
    pub transparent_pen: Option<u16>,
    pub scroll: Option<(i32, i32)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FieldBitDesc {
    pub byte: usize,
    pub mask: u8,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpritesDesc {
    pub block: String,
    #[serde(default)]
    pub offset: usize,
    pub gfx: String,
    pub count: usize,
    pub entry_size: Option<usize>,
    pub x_byte: Option<usize>,
    pub y_byte: Option<usize>,
    pub code_byte: Option<usize>,
    pub attr_byte: Option<usize>,
    pub code_mask: Option<u8>,
    pub code_shift: Option<u8>,
    pub color_mask: Option<u8>,
    pub color_shift: Option<u8>,
    pub flip_x: Option<FieldBitDesc>,
    pub flip_y: Option<FieldBitDesc>,
    pub x_base: Option<i32>,
    pub x_sign: Option<i32>,
    pub y_base: Option<i32>,
    pub y_sign: Option<i32>,
    pub order: Option<OrderDesc>,
    pub transparent_pixel: Option<u8>,
    pub transparent_pen: Option<u16>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VideoDesc {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub background: u16,
    #[serde(default)]
    pub palette: PaletteDesc,
    #[serde(default)]
    pub gfx: Vec<GfxDesc>,
    #[serde(default)]
    pub layers: Vec<LayerDesc>,
    pub sprites: Option<SpritesDesc>,
    /// Back-to-front draw order: layer names plus "sprites". Defaults to
    /// the layers in declaration order with sprites on top.
    pub planes: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct PortDesc {
    pub port: u8,
    #[serde(default = "all_bits")]
    pub default: u8,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ButtonDesc {
    pub id: u8,
    pub name: String,
    pub port: u8,
    pub mask: u8,
    #[serde(default = "yes")]
    pub active_low: bool,
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InputsDesc {
    #[serde(default)]
    pub ports: Vec<PortDesc>,
    #[serde(default)]
    pub buttons: Vec<ButtonDesc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_tables_parse() {
        let desc = MachineDescription::from_toml(
            r#"
            name = "t"
            [timing]
            master_clock_hz = 1000
            cycles_per_frame = 100
            [video]
            width = 8
            height = 8
            [[devices]]
            name = "latch"
            kind = "command-latch"
            target = "sound"
            line = "nmi"
            [[spaces]]
            name = "main"
            regions = [
                { start = 0x0000, end = 0x0FFF, map = "rom", block = "prog" },
                { start = 0x1000, end = 0x1000, map = "device", device = "latch", access = "write" },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(desc.timing.interleave, 1);
        assert!(matches!(
            desc.devices[0].kind,
            DeviceKind::CommandLatch { line: LineDesc::Nmi, delay: 0, .. }
        ));
        let regions = &desc.spaces[0].regions;
        assert_eq!(regions[1].access, AccessDesc::Write);
        assert!(matches!(&regions[0].handler, HandlerDesc::Rom { offset: 0, .. }));
    }

    #[test]
    fn actions_parse_from_inline_tables() {
        let desc = MachineDescription::from_toml(
            r#"
            name = "t"
            [timing]
            master_clock_hz = 1000
            cycles_per_frame = 100
            [video]
            width = 8
            height = 8
            [[devices]]
            name = "outlatch"
            kind = "control-latch"
            outputs = [
                { bit = 0, on_set = [{ action = "flip-screen", flip = true }], on_clear = [{ action = "flip-screen", flip = false }] },
                { bit = 3, on_clear = [{ action = "halt-cpu", cpu = "sound", halted = true }] },
            ]
            "#,
        )
        .unwrap();
        let DeviceKind::ControlLatch { outputs } = &desc.devices[0].kind else {
            panic!("wrong device kind");
        };
        assert_eq!(outputs[0].on_set, vec![ActionDesc::FlipScreen { flip: true }]);
        assert!(outputs[1].on_set.is_empty());
    }

    #[test]
    fn missing_timing_is_a_parse_error() {
        let err = MachineDescription::from_toml("name = \"t\"\n[video]\nwidth = 8\nheight = 8\n")
            .unwrap_err();
        assert!(matches!(err, crate::DescriptionError::Parse(_)));
    }
}
