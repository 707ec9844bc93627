//! CLI command implementations

pub mod backends;
pub mod info;
pub mod process;

use anyhow::{Context, Result};
use image::DynamicImage;
use sem_core::{Grid, Histogram, RawImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Load an image file as raw samples.
///
/// Single-channel files become `[height, width]`. Colour files keep their
/// channel axis (`[height, width, channels]`) and are rejected later by the
/// factory, unless `grayscale` converts them to 8-bit luma first.
pub fn load_image(path: &Path, grayscale: bool) -> Result<RawImage<u16>> {
    let img = image::open(path).with_context(|| format!("Failed to load: {}", path.display()))?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;
    debug!(path = %path.display(), width, height, channels, "Loaded image");

    let raw = match img {
        DynamicImage::ImageLuma8(buf) => {
            RawImage::new(vec![height, width], buf.into_raw().into_iter().map(u16::from).collect())
        }
        DynamicImage::ImageLuma16(buf) => RawImage::new(vec![height, width], buf.into_raw()),
        other if grayscale => {
            let luma = other.to_luma8().into_raw();
            RawImage::new(vec![height, width], luma.into_iter().map(u16::from).collect())
        }
        other => {
            // Channel axis follows the decoded colour type
            let samples = match channels {
                2 => other.to_luma_alpha8().into_raw(),
                4 => other.to_rgba8().into_raw(),
                _ => other.to_rgb8().into_raw(),
            };
            let channels = if matches!(channels, 2 | 4) { channels } else { 3 };
            RawImage::new(vec![height, width, channels], samples.into_iter().map(u16::from).collect())
        }
    };
    Ok(raw)
}

/// Saturate a pixel value to 8 bits. NaN maps to 0.
pub fn to_u8(value: f32) -> u8 {
    // `as` saturates and sends NaN to 0
    value.round() as u8
}

/// Save 8-bit luma samples.
pub fn save_gray(path: &Path, width: usize, height: usize, bytes: Vec<u8>) -> Result<()> {
    let buf = image::GrayImage::from_raw(width as u32, height as u32, bytes)
        .with_context(|| format!("Buffer does not match {}x{}", width, height))?;
    buf.save(path)
        .with_context(|| format!("Failed to save: {}", path.display()))
}

/// Save a pixel grid, saturating each value to 8 bits.
pub fn save_grid(path: &Path, grid: &Grid) -> Result<()> {
    let bytes = grid.data().iter().map(|&v| to_u8(v)).collect();
    save_gray(path, grid.width(), grid.height(), bytes)
}

/// Render a magnitude spectrum for display: `log`, divide by the largest
/// finite log, scale to 255 and saturate.
///
/// Zero magnitudes (log = -inf) and non-finite values render black. A
/// spectrum whose largest log is not positive renders fully black.
pub fn render_spectrum(spectrum: &Grid) -> Vec<u8> {
    let logs: Vec<f32> = spectrum.data().iter().map(|m| m.ln()).collect();
    let max = logs
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);

    logs.iter()
        .map(|&l| {
            if l.is_finite() && max > 0.0 {
                (l / max * 255.0) as u8
            } else {
                0
            }
        })
        .collect()
}

/// Write the histogram as `bin_start,bin_end,count` rows.
pub fn write_histogram_csv(path: &Path, histogram: &Histogram) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_histogram(&mut out, histogram)?;
    out.flush()?;
    Ok(())
}

fn write_histogram<W: Write>(out: &mut W, histogram: &Histogram) -> std::io::Result<()> {
    writeln!(out, "bin_start,bin_end,count")?;
    for (i, count) in histogram.counts.iter().enumerate() {
        writeln!(out, "{},{},{}", histogram.bin_edges[i], histogram.bin_edges[i + 1], count)?;
    }
    Ok(())
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn json_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage};
    use sem_compute::ComputeError;
    use sem_core::Error;

    #[test]
    fn to_u8_saturates() {
        assert_eq!(to_u8(-3.0), 0);
        assert_eq!(to_u8(12.4), 12);
        assert_eq!(to_u8(256.0), 255);
        assert_eq!(to_u8(f32::NAN), 0);
    }

    #[test]
    fn spectrum_peak_renders_white() {
        let mut grid = Grid::filled(2, 2, 1.0);
        grid.data_mut()[3] = std::f32::consts::E.powi(2);
        let px = render_spectrum(&grid);
        // ln(1) = 0 -> black, ln(e^2) = max -> white
        assert_eq!(px, vec![0, 0, 0, 255]);
    }

    #[test]
    fn spectrum_zero_magnitudes_are_black() {
        let grid = Grid::new(vec![0.0, 10.0, 100.0, 0.0], 2, 2).unwrap();
        let px = render_spectrum(&grid);
        assert_eq!(px[0], 0);
        assert_eq!(px[3], 0);
        assert_eq!(px[2], 255);
        assert_eq!(px[1], 127);
    }

    #[test]
    fn spectrum_all_zero_is_black() {
        assert!(render_spectrum(&Grid::zeros(3, 3)).iter().all(|&v| v == 0));
    }

    #[test]
    fn histogram_csv_layout() {
        let hist = Histogram::compute(&[0.0, 1.0, 1.0, 255.0], 256);
        let mut out = Vec::new();
        write_histogram(&mut out, &hist).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 257);
        assert_eq!(lines[0], "bin_start,bin_end,count");
        assert_eq!(lines[1], "0,1,1");
        assert_eq!(lines[2], "1,2,2");
        assert_eq!(lines[256], "255,256,1");
    }

    #[test]
    fn load_luma_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        GrayImage::from_fn(5, 3, |x, y| Luma([(x + 10 * y) as u8])).save(&path).unwrap();

        let raw = load_image(&path, false).unwrap();
        assert_eq!(raw.shape, vec![3, 5]);
        assert_eq!(raw.data[0], 0);
        assert_eq!(raw.data[7], 12);
    }

    #[test]
    fn load_rgb_keeps_channels_unless_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colour.png");
        RgbImage::from_pixel(4, 2, Rgb([50, 50, 50])).save(&path).unwrap();

        let raw = load_image(&path, false).unwrap();
        assert_eq!(raw.shape, vec![2, 4, 3]);
        assert!(sem_compute::create(raw).is_err());

        let gray = load_image(&path, true).unwrap();
        assert_eq!(gray.shape, vec![2, 4]);
        assert!(gray.data.iter().all(|&v| v == 50));
    }

    #[test]
    fn load_luma_alpha_keeps_two_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masked.png");
        GrayAlphaImage::from_pixel(3, 2, LumaA([80, 255])).save(&path).unwrap();

        let raw = load_image(&path, false).unwrap();
        assert_eq!(raw.shape, vec![2, 3, 2]);
        assert_eq!(&raw.data[..2], &[80, 255]);

        let err = sem_compute::create(raw).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Core(Error::InvalidShape { ndim: 3, ref shape }) if shape == &vec![2, 3, 2]
        ));
    }

    #[test]
    fn save_grid_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let grid = Grid::new(vec![0.0, 64.0, 192.0, 256.0], 2, 2).unwrap();
        save_grid(&path, &grid).unwrap();

        let back = image::open(&path).unwrap().to_luma8().into_raw();
        assert_eq!(back, vec![0, 64, 192, 255]);
    }

    #[test]
    fn format_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn escapes_json() {
        assert_eq!(json_escape("a\"b\\c"), "a\\\"b\\\\c");
    }
}
