use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Result;
use cabinet_core::board::Board;
use cabinet_core::core::Machine;

/// Nearest-neighbour upscale of an RGB24 buffer.
fn scale_rgb(src: &[u8], width: usize, height: usize, scale: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() * scale * scale);
    for y in 0..height * scale {
        let row = &src[(y / scale) * width * 3..][..width * 3];
        for x in 0..width * scale {
            out.extend_from_slice(&row[(x / scale) * 3..][..3]);
        }
    }
    out
}

/// Write the board's last composited frame as an RGB PNG.
pub fn write_png(board: &Board, path: &Path, scale: u32) -> Result<()> {
    let (width, height) = board.display_size();
    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    board.render_frame(&mut rgb);
    let rgb = scale_rgb(&rgb, width as usize, height as usize, scale as usize);

    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, width * scale, height * scale);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgb)?;
    Ok(())
}
