//! Turning a [`MachineDescription`] into a running [`Board`].

use std::collections::HashMap;
use std::path::Path;

use cabinet_core::board::{Action, Board, BoardBuilder, CpuConfig, Timing};
use cabinet_core::cpu::{BusOp, CpuId, ScriptedCpu};
use cabinet_core::device::{
    AdpcmFeeder, BankSelect, CommandLatch, ControlLatch, DeviceId, PortMode, RegisterFileChip,
    SoundPort, ValueDecoder,
};
use cabinet_core::input::Binding;
use cabinet_core::interrupt::{InterruptLine, LineConfig, MaskedBehavior, Trigger};
use cabinet_core::memory::{
    AddressSpace, Bank, BankId, BankPolicy, BlockId, Handler, SpaceId, UnmappedPolicy,
};
use cabinet_core::video::{
    CellLayout, DrawOrder, FieldBit, GfxId, GfxLayout, GfxSet, LayerId, Palette,
    PaletteRamFormat, Plane, Rgb, SpriteFormat, SpriteLayer, TileFormat, TileLayer, TilePlane,
    Transparency, Video,
};

use crate::description::*;
use crate::error::{DescriptionError, Result};

/// Name to position lookup for one kind of named item.
struct Names {
    kind: &'static str,
    ids: HashMap<String, usize>,
}

impl Names {
    fn new<'a>(kind: &'static str, names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut ids = HashMap::new();
        for (index, name) in names.into_iter().enumerate() {
            if ids.insert(name.to_string(), index).is_some() {
                return Err(DescriptionError::Duplicate {
                    kind,
                    name: name.to_string(),
                });
            }
        }
        Ok(Self { kind, ids })
    }

    fn get(&self, name: &str) -> Result<usize> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| DescriptionError::UnknownName {
                kind: self.kind,
                name: name.to_string(),
            })
    }
}

/// Every name a description can refer to. Ids are positions in the
/// description's lists, which is also the order the board hands them out.
struct Scope {
    blocks: Names,
    banks: Names,
    devices: Names,
    spaces: Names,
    cpus: Names,
    gfx: Names,
    layers: Names,
}

impl Scope {
    fn new(desc: &MachineDescription) -> Result<Self> {
        Ok(Self {
            blocks: Names::new("block", desc.memory.iter().map(|b| b.name.as_str()))?,
            banks: Names::new("bank", desc.banks.iter().map(|b| b.name.as_str()))?,
            devices: Names::new("device", desc.devices.iter().map(|d| d.name.as_str()))?,
            spaces: Names::new("space", desc.spaces.iter().map(|s| s.name.as_str()))?,
            cpus: Names::new("cpu", desc.cpus.iter().map(|c| c.name.as_str()))?,
            gfx: Names::new("gfx set", desc.video.gfx.iter().map(|g| g.name.as_str()))?,
            layers: Names::new("layer", desc.video.layers.iter().map(|l| l.name.as_str()))?,
        })
    }

    fn block(&self, name: &str) -> Result<BlockId> {
        self.blocks.get(name).map(BlockId)
    }

    fn bank(&self, name: &str) -> Result<BankId> {
        self.banks.get(name).map(BankId)
    }

    fn device(&self, name: &str) -> Result<DeviceId> {
        self.devices.get(name).map(DeviceId)
    }

    fn space(&self, name: &str) -> Result<SpaceId> {
        self.spaces.get(name).map(SpaceId)
    }

    fn cpu(&self, name: &str) -> Result<CpuId> {
        self.cpus.get(name).map(CpuId)
    }

    fn gfx(&self, name: &str) -> Result<GfxId> {
        self.gfx.get(name).map(GfxId)
    }

    fn layer(&self, name: &str) -> Result<LayerId> {
        self.layers.get(name).map(LayerId)
    }

    fn action(&self, action: &ActionDesc) -> Result<Action> {
        Ok(match action {
            ActionDesc::SelectBank { bank, page } => Action::SelectBank {
                bank: self.bank(bank)?,
                page: *page,
            },
            ActionDesc::Raise { cpu, line } => Action::RaiseInterrupt {
                cpu: self.cpu(cpu)?,
                line: line_of(*line),
            },
            ActionDesc::Clear { cpu, line } => Action::ClearInterrupt {
                cpu: self.cpu(cpu)?,
                line: line_of(*line),
            },
            ActionDesc::Mask { cpu, line, masked } => Action::MaskInterrupt {
                cpu: self.cpu(cpu)?,
                line: line_of(*line),
                masked: *masked,
            },
            ActionDesc::ResetCpu { cpu } => Action::ResetCpu(self.cpu(cpu)?),
            ActionDesc::HaltCpu { cpu, halted } => Action::HaltCpu {
                cpu: self.cpu(cpu)?,
                halted: *halted,
            },
            ActionDesc::FlipScreen { flip } => Action::FlipScreen(*flip),
            ActionDesc::SpriteOrder { order } => Action::SetSpriteOrder(order_of(*order)),
            ActionDesc::ForceRedraw => Action::ForceRedraw,
            ActionDesc::KickWatchdog => Action::KickWatchdog,
            ActionDesc::Device { device, param } => Action::Device {
                device: self.device(device)?,
                param: *param,
            },
        })
    }

    fn actions(&self, actions: &[ActionDesc]) -> Result<Vec<Action>> {
        actions.iter().map(|a| self.action(a)).collect()
    }
}

fn line_of(line: LineDesc) -> InterruptLine {
    match line {
        LineDesc::Nmi => InterruptLine::Nmi,
        LineDesc::Irq => InterruptLine::Irq,
        LineDesc::Firq => InterruptLine::Firq,
    }
}

fn order_of(order: OrderDesc) -> DrawOrder {
    match order {
        OrderDesc::FrontToBack => DrawOrder::FrontToBack,
        OrderDesc::BackToFront => DrawOrder::BackToFront,
    }
}

fn palette_format(format: PaletteFormatDesc) -> PaletteRamFormat {
    match format {
        PaletteFormatDesc::Rgb332 => PaletteRamFormat::Rgb332,
        PaletteFormatDesc::Bgr233 => PaletteRamFormat::Bgr233,
    }
}

fn transparency(pixel: Option<u8>, pen: Option<u16>) -> Transparency {
    match (pixel, pen) {
        (Some(p), _) => Transparency::Pixel(p),
        (None, Some(p)) => Transparency::Pen(p),
        (None, None) => Transparency::Opaque,
    }
}

/// Bit shifts apply to byte-wide registers.
fn byte_shift(owner: &str, field: &str, shift: u8) -> Result<u8> {
    if shift < 8 {
        Ok(shift)
    } else {
        Err(DescriptionError::Invalid(format!("{owner}: {field} = {shift} shifts past a byte")))
    }
}

/// Parse "#RRGGBB".
fn parse_color(text: &str) -> Result<Rgb> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    let value = u32::from_str_radix(hex, 16)
        .ok()
        .filter(|_| hex.len() == 6)
        .ok_or_else(|| DescriptionError::Invalid(format!("bad colour \"{text}\"")))?;
    Ok(Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

fn script(ops: &[OpDesc]) -> Vec<BusOp> {
    ops.iter()
        .map(|op| match *op {
            OpDesc::Read { addr } => BusOp::Read(addr),
            OpDesc::Write { addr, data } => BusOp::Write(addr, data),
            OpDesc::WriteLast { addr } => BusOp::WriteLast(addr),
            OpDesc::IoRead { addr } => BusOp::IoRead(addr),
            OpDesc::IoWrite { addr, data } => BusOp::IoWrite(addr, data),
            OpDesc::Idle { cycles } => BusOp::Idle(cycles),
        })
        .collect()
}

fn load_block(block: &BlockDesc, base_dir: &Path) -> Result<Vec<u8>> {
    let mut data = match &block.file {
        Some(file) => {
            let path = base_dir.join(file);
            std::fs::read(&path).map_err(|source| DescriptionError::Io { path, source })?
        }
        None => Vec::new(),
    };
    let inline_end = block.load_offset + block.data.len();
    if !block.data.is_empty() {
        if data.len() < inline_end {
            data.resize(inline_end, block.fill);
        }
        data[block.load_offset..inline_end].copy_from_slice(&block.data);
    }
    if let Some(size) = block.size {
        if data.len() > size {
            return Err(DescriptionError::Invalid(format!(
                "block \"{}\" holds 0x{:X} bytes but is declared 0x{size:X}",
                block.name,
                data.len()
            )));
        }
        data.resize(size, block.fill);
    }
    if data.is_empty() {
        return Err(DescriptionError::Invalid(format!(
            "block \"{}\" has no size, file or data",
            block.name
        )));
    }
    Ok(data)
}

impl MachineDescription {
    /// Build the board. Relative `file` paths are resolved against
    /// `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<Board> {
        let scope = Scope::new(self)?;
        let timing = Timing {
            master_clock_hz: self.timing.master_clock_hz,
            cycles_per_frame: self.timing.cycles_per_frame,
        };

        let mut contents = Vec::with_capacity(self.memory.len());
        for block in &self.memory {
            contents.push(load_block(block, base_dir)?);
        }

        let video = self.build_video(&scope, &contents)?;
        let mut builder = BoardBuilder::new(&self.name, timing, video)
            .interleave(self.timing.interleave);
        if let Some(frames) = self.timing.watchdog {
            builder = builder.watchdog(frames);
        }

        for (block, data) in self.memory.iter().zip(contents) {
            match block.kind {
                BlockKind::Rom => builder.memory().add_rom(&block.name, data),
                BlockKind::Ram => builder.memory().add_ram_with(&block.name, data),
            };
        }

        for bank in &self.banks {
            let policy = match bank.policy {
                PolicyDesc::Wrap => BankPolicy::Wrap,
                PolicyDesc::Clamp => BankPolicy::Clamp,
                PolicyDesc::Ignore => BankPolicy::Ignore,
                PolicyDesc::Reject => BankPolicy::Reject,
            };
            builder.add_bank(
                Bank::new(&bank.name, scope.block(&bank.block)?, bank.page_size, bank.pages)
                    .with_base(bank.base)
                    .with_policy(policy)
                    .with_initial(bank.initial),
            )?;
        }

        for device in &self.devices {
            self.add_device(&mut builder, &scope, device)?;
        }

        for space in &self.spaces {
            builder.add_space(build_space(&scope, space)?);
        }

        for cpu in &self.cpus {
            let mut program = ScriptedCpu::new(script(&cpu.script));
            if let Some(cycles) = cpu.op_cycles {
                program = program.with_op_cycles(cycles);
            }
            for routine in &cpu.routines {
                program = program.with_routine(line_of(routine.line), script(&routine.script));
            }
            let mut config = CpuConfig::new(
                &cpu.name,
                Box::new(program),
                cpu.clock_hz,
                scope.space(&cpu.program)?,
            );
            if let Some(io) = &cpu.io {
                config = config.with_io(scope.space(io)?);
            }
            if let Some(line) = cpu.vblank {
                config = config.with_vblank(line_of(line));
            }
            let id = builder.add_cpu(config);
            for line in &cpu.lines {
                let trigger = match line.trigger {
                    TriggerDesc::Edge => Trigger::Edge,
                    TriggerDesc::Level => Trigger::Level,
                };
                let masked = match line.masked {
                    MaskedDesc::Latch => MaskedBehavior::Latch,
                    MaskedDesc::Drop => MaskedBehavior::Drop,
                };
                builder.configure_line(id, line_of(line.line), LineConfig::new(trigger, masked));
            }
            for timed in &cpu.timed {
                builder.timed_interrupt(id, line_of(timed.line), timed.per_frame);
            }
        }

        let inputs = builder.inputs();
        for port in &self.inputs.ports {
            inputs.add_port(port.port, port.default);
        }
        for button in &self.inputs.buttons {
            inputs.bind(Binding {
                id: button.id,
                name: button.name.clone(),
                port: button.port,
                mask: button.mask,
                active_low: button.active_low,
            });
        }

        log::debug!(
            "machine \"{}\": {} block(s), {} device(s), {} cpu(s)",
            self.name,
            self.memory.len(),
            self.devices.len(),
            self.cpus.len()
        );
        Ok(builder.build()?)
    }

    fn add_device(
        &self,
        builder: &mut BoardBuilder,
        scope: &Scope,
        device: &DeviceDesc,
    ) -> Result<DeviceId> {
        let name = device.name.as_str();
        let id = match &device.kind {
            DeviceKind::CommandLatch {
                target,
                line,
                delay,
                gate,
                acknowledge,
            } => {
                let mut latch =
                    CommandLatch::new(name, scope.cpu(target)?, line_of(*line)).with_delay(*delay);
                if *gate {
                    latch = latch.with_gate();
                }
                if *acknowledge {
                    latch = latch.acknowledge_on_read();
                }
                builder.add_device(Box::new(latch))
            }
            DeviceKind::ControlLatch { outputs } => {
                let mut latch = ControlLatch::new(name);
                for output in outputs {
                    latch = latch.with_output(
                        output.bit,
                        scope.actions(&output.on_set)?,
                        scope.actions(&output.on_clear)?,
                    );
                }
                builder.add_device(Box::new(latch))
            }
            DeviceKind::ValueDecoder { values, fallback } => {
                let mut decoder = ValueDecoder::new(name).with_fallback(scope.actions(fallback)?);
                for value in values {
                    decoder = decoder.with_value(value.value, scope.actions(&value.actions)?);
                }
                builder.add_device(Box::new(decoder))
            }
            DeviceKind::BankSelect { bank, shift, mask } => builder.add_device(Box::new(
                BankSelect::new(name, scope.bank(bank)?)
                    .with_field(byte_shift(name, "shift", *shift)?, *mask),
            )),
            DeviceKind::SoundPort { mode } => {
                let mode = match mode {
                    PortModeDesc::Direct => PortMode::Direct,
                    PortModeDesc::AddressLatched => PortMode::AddressLatched,
                };
                builder.add_device(Box::new(SoundPort::new(name, mode, RegisterFileChip::new())))
            }
            DeviceKind::Adpcm {
                rom,
                period,
                granule,
                end_marker,
            } => {
                let this = builder.next_device_id();
                let mut feeder = AdpcmFeeder::new(
                    name,
                    this,
                    scope.block(rom)?,
                    *period,
                    RegisterFileChip::new(),
                );
                if let Some(bytes) = granule {
                    feeder = feeder.with_granule(*bytes);
                }
                if let Some(marker) = end_marker {
                    feeder = feeder.with_end_marker(*marker);
                }
                builder.add_device(Box::new(feeder))
            }
        };
        Ok(id)
    }

    fn build_video(&self, scope: &Scope, contents: &[Vec<u8>]) -> Result<Video> {
        let desc = &self.video;
        let mut palette = match &desc.palette.prom {
            Some(block) => {
                let format = desc.palette.format.unwrap_or(PaletteFormatDesc::Rgb332);
                Palette::from_prom(&contents[scope.blocks.get(block)?], palette_format(format))
            }
            None => Palette::new(
                desc.palette
                    .colors
                    .iter()
                    .map(|c| parse_color(c))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        if !desc.palette.colortable.is_empty() {
            palette = palette.with_colortable(desc.palette.colortable.clone());
        }

        let mut video = Video::new(desc.width, desc.height, palette);
        video.set_background(desc.background);

        for gfx in &desc.gfx {
            let offsets_fit = gfx.block.is_none()
                || (gfx.x_offsets.len() == gfx.width && gfx.y_offsets.len() == gfx.height);
            if gfx.width == 0 || gfx.height == 0 || !offsets_fit {
                return Err(DescriptionError::Invalid(format!(
                    "gfx set \"{}\" needs one x offset per column and one y offset per row",
                    gfx.name
                )));
            }
            let set = match &gfx.block {
                Some(block) => GfxLayout {
                    width: gfx.width,
                    height: gfx.height,
                    plane_offsets: gfx.planes.clone(),
                    x_offsets: gfx.x_offsets.clone(),
                    y_offsets: gfx.y_offsets.clone(),
                    increment: gfx.increment,
                }
                .decode(&contents[scope.blocks.get(block)?]),
                None => GfxSet::from_pixels(gfx.width, gfx.height, gfx.pixels.clone()),
            };
            if set.count() == 0 {
                return Err(DescriptionError::Invalid(format!(
                    "gfx set \"{}\" decodes to no elements",
                    gfx.name
                )));
            }
            let granularity = gfx.granularity.unwrap_or(4);
            video.add_gfx(set.with_colors(gfx.color_base, granularity));
        }

        for layer in &desc.layers {
            let f = &layer.format;
            let format = TileFormat {
                color_mask: f.color_mask.unwrap_or(0xFF),
                color_shift: byte_shift(&layer.name, "color_shift", f.color_shift)?,
                bank_mask: f.bank_mask,
                bank_shift: byte_shift(&layer.name, "bank_shift", f.bank_shift)?,
                flip_x: f.flip_x,
                flip_y: f.flip_y,
                fixed_color: f.fixed_color,
            };
            let layout = match layer.layout {
                LayoutDesc::RowMajor => CellLayout::RowMajor,
                LayoutDesc::ColumnMajor => CellLayout::ColumnMajor,
            };
            let gfx = scope.gfx(&layer.gfx)?;
            let mut tiles = TileLayer::new(&layer.name, layer.cols, layer.rows, gfx)
                .with_layout(layout)
                .with_transparency(transparency(layer.transparent_pixel, layer.transparent_pen));
            tiles = if layer.attributes {
                tiles.with_attributes(format)
            } else {
                tiles.with_format(format)
            };
            if let Some((x, y)) = layer.scroll {
                tiles.set_scroll(x, y);
            }
            video.add_layer(tiles)?;
        }

        let mut has_sprites = false;
        if let Some(sprites) = &desc.sprites {
            let defaults = SpriteFormat::default();
            let field = |f: Option<FieldBitDesc>| f.map(|f| FieldBit::new(f.byte, f.mask));
            let format = SpriteFormat {
                entry_size: sprites.entry_size.unwrap_or(defaults.entry_size),
                count: sprites.count,
                x_byte: sprites.x_byte.unwrap_or(defaults.x_byte),
                y_byte: sprites.y_byte.unwrap_or(defaults.y_byte),
                code_byte: sprites.code_byte.unwrap_or(defaults.code_byte),
                attr_byte: sprites.attr_byte.unwrap_or(defaults.attr_byte),
                code_mask: sprites.code_mask.unwrap_or(defaults.code_mask),
                code_shift: byte_shift(
                    "sprites",
                    "code_shift",
                    sprites.code_shift.unwrap_or(defaults.code_shift),
                )?,
                color_mask: sprites.color_mask.unwrap_or(defaults.color_mask),
                color_shift: byte_shift(
                    "sprites",
                    "color_shift",
                    sprites.color_shift.unwrap_or(defaults.color_shift),
                )?,
                flip_x: field(sprites.flip_x),
                flip_y: field(sprites.flip_y),
                x_base: sprites.x_base.unwrap_or(defaults.x_base),
                x_sign: sprites.x_sign.unwrap_or(defaults.x_sign),
                y_base: sprites.y_base.unwrap_or(defaults.y_base),
                y_sign: sprites.y_sign.unwrap_or(defaults.y_sign),
            };
            video.set_sprites(SpriteLayer {
                block: scope.block(&sprites.block)?,
                offset: sprites.offset,
                format,
                gfx: scope.gfx(&sprites.gfx)?,
                transparency: transparency(sprites.transparent_pixel, sprites.transparent_pen),
            })?;
            if let Some(order) = sprites.order {
                video.set_sprite_order(order_of(order));
            }
            has_sprites = true;
        }

        if let Some(names) = &desc.planes {
            let mut planes = Vec::with_capacity(names.len());
            for name in names {
                if name == "sprites" {
                    if !has_sprites {
                        return Err(DescriptionError::Invalid(
                            "plane list names sprites but none are declared".to_string(),
                        ));
                    }
                    planes.push(Plane::Sprites);
                } else {
                    planes.push(Plane::Layer(scope.layer(name)?));
                }
            }
            video.set_planes(planes);
        }
        Ok(video)
    }
}

fn build_space(scope: &Scope, desc: &SpaceDesc) -> Result<AddressSpace> {
    let mut space = AddressSpace::builder(&desc.name);
    if let Some(mask) = desc.mirror_mask {
        space = space.mirror_mask(mask);
    }
    if let Some(policy) = desc.unmapped {
        space = space.unmapped(match policy {
            UnmappedDesc::OpenBus => UnmappedPolicy::OpenBus,
            UnmappedDesc::Strict => UnmappedPolicy::Strict,
        });
    }
    if let Some(value) = desc.open_bus {
        space = space.open_bus(value);
    }
    for region in &desc.regions {
        let handler = match &region.handler {
            HandlerDesc::Rom { block, offset } => Handler::Rom {
                block: scope.block(block)?,
                offset: *offset,
            },
            HandlerDesc::Ram { block, offset } => Handler::Ram {
                block: scope.block(block)?,
                offset: *offset,
            },
            HandlerDesc::Bank { bank } => Handler::Banked(scope.bank(bank)?),
            HandlerDesc::Device { device } => Handler::Device(scope.device(device)?),
            HandlerDesc::TileRam { layer, plane } => Handler::TileRam {
                layer: scope.layer(layer)?,
                plane: match plane {
                    PlaneDesc::Code => TilePlane::Code,
                    PlaneDesc::Attribute => TilePlane::Attribute,
                },
            },
            HandlerDesc::PaletteRam { format } => Handler::PaletteRam(palette_format(*format)),
            HandlerDesc::Input { port } => Handler::Input(*port),
            HandlerDesc::Nop => Handler::Nop,
        };
        space = match region.access {
            AccessDesc::ReadWrite => space.map(region.start, region.end, handler),
            AccessDesc::Read => space.map_read(region.start, region.end, handler),
            AccessDesc::Write => space.map_write(region.start, region.end, handler),
        };
    }
    Ok(space.build()?)
}
