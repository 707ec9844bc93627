//! Process command
//!
//! Applies the Hanning window and/or histogram equalisation, then writes the
//! pixels, spectrum and histogram. Spectrum and histogram are written as the
//! image holds them: without `--refresh` they describe the loaded frame.

use crate::ProcessArgs;
use anyhow::{Context, Result};
use sem_compute::{SemConfig, SemImage};
use tracing::{debug, info, trace};

pub fn run(args: ProcessArgs, verbose: bool) -> Result<()> {
    trace!(input = %args.input.display(), "process::run");

    let raw = super::load_image(&args.input, args.grayscale)?;
    let config = if args.clamp_table { SemConfig::new().clamped() } else { SemConfig::default() };
    let mut image = sem_compute::create_with_config(raw, config)
        .with_context(|| format!("Cannot build SEM image from {}", args.input.display()))?;

    let (height, width) = image.shape();
    info!(w = width, h = height, backend = %image.backend(), "Processing");
    if verbose {
        println!("Processing {} ({}x{}) on {}", args.input.display(), width, height, image.backend());
    }

    transform(image.as_mut(), &args)?;

    super::save_grid(&args.output, image.pixels()?)?;
    debug!(path = %args.output.display(), "Wrote pixels");

    if let Some(path) = &args.spectrum {
        let spectrum = image.fft()?;
        let bytes = super::render_spectrum(spectrum);
        super::save_gray(path, spectrum.width(), spectrum.height(), bytes)?;
        debug!(path = %path.display(), "Wrote spectrum");
    }

    if let Some(path) = &args.histogram {
        super::write_histogram_csv(path, image.histogram())?;
        debug!(path = %path.display(), "Wrote histogram");
    }

    if verbose {
        println!("Done.");
    }
    Ok(())
}

/// Window, equalise, then optionally refresh the derived fields.
fn transform(image: &mut dyn SemImage, args: &ProcessArgs) -> Result<()> {
    if args.hanning {
        image.apply_hanning().context("Hanning window failed")?;
    }
    if args.equalise {
        image
            .apply_histogram_equalisation()
            .context("Histogram equalisation failed")?;
    }
    if args.refresh {
        image.update_fft()?;
        image.update_histogram()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::path::PathBuf;

    fn args(input: PathBuf, output: PathBuf) -> ProcessArgs {
        ProcessArgs {
            input,
            output,
            hanning: false,
            equalise: false,
            clamp_table: false,
            refresh: false,
            spectrum: None,
            histogram: None,
            grayscale: false,
        }
    }

    #[test]
    fn writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        GrayImage::from_fn(8, 6, |x, y| Luma([(x * 30 + y) as u8])).save(&input).unwrap();

        let mut a = args(input, dir.path().join("out.png"));
        a.hanning = true;
        a.equalise = true;
        a.refresh = true;
        a.spectrum = Some(dir.path().join("fft.png"));
        a.histogram = Some(dir.path().join("hist.csv"));
        run(a, false).unwrap();

        let out = image::open(dir.path().join("out.png")).unwrap();
        assert_eq!((out.width(), out.height()), (8, 6));
        let fft = image::open(dir.path().join("fft.png")).unwrap();
        assert_eq!((fft.width(), fft.height()), (8, 6));
        let csv = std::fs::read_to_string(dir.path().join("hist.csv")).unwrap();
        assert_eq!(csv.lines().count(), 257);
    }

    #[test]
    fn clamped_table_saturates_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        GrayImage::from_raw(2, 2, vec![0, 1, 2, 3]).unwrap().save(&input).unwrap();

        let mut a = args(input, dir.path().join("out.png"));
        a.equalise = true;
        a.clamp_table = true;
        a.histogram = Some(dir.path().join("hist.csv"));
        run(a, false).unwrap();

        let out = image::open(dir.path().join("out.png")).unwrap().to_luma8().into_raw();
        assert_eq!(out, vec![64, 128, 192, 255]);

        // No refresh: histogram still describes the loaded frame.
        let csv = std::fs::read_to_string(dir.path().join("hist.csv")).unwrap();
        assert_eq!(csv.lines().nth(1), Some("0,1,1"));
        assert_eq!(csv.lines().nth(65), Some("64,65,0"));
    }
}
