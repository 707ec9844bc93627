//! Image info command.
//!
//! Builds an image on the selected backend and prints its shape, histogram
//! summary and spectrum peak.

use crate::InfoArgs;
use anyhow::{Context, Result};
use sem_compute::SemImage;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Everything reported for one input.
struct Summary {
    backend: &'static str,
    height: usize,
    width: usize,
    file_size: u64,
    create_time: Duration,
    total: u64,
    mean: Option<f64>,
    occupied: Option<(usize, usize)>,
    /// Peak position relative to the zero-frequency centre, and its magnitude.
    peak: Option<(isize, isize, f32)>,
}

/// Runs the info command for every input.
pub fn run(args: InfoArgs, verbose: bool) -> Result<()> {
    for path in &args.input {
        trace!(input = %path.display(), "info::run");
        let file_size = fs::metadata(path)
            .with_context(|| format!("Cannot stat: {}", path.display()))?
            .len();
        let raw = super::load_image(path, args.grayscale)?;

        let start = Instant::now();
        let image = sem_compute::create(raw)
            .with_context(|| format!("Cannot build SEM image from {}", path.display()))?;
        let create_time = start.elapsed();
        debug!(elapsed = ?create_time, backend = %image.backend(), "Image created");

        let summary = summarise(image.as_ref(), file_size, create_time)?;
        if args.json {
            print_json(path, &summary);
        } else {
            print_text(path, &summary, verbose);
        }

        if args.input.len() > 1 {
            println!();
        }
    }

    Ok(())
}

fn summarise(image: &dyn SemImage, file_size: u64, create_time: Duration) -> Result<Summary> {
    let (height, width) = image.shape();
    let hist = image.histogram();
    let spectrum = image.fft()?;

    let peak = spectrum.argmax().map(|(y, x)| {
        let dy = y as isize - (height / 2) as isize;
        let dx = x as isize - (width / 2) as isize;
        (dy, dx, spectrum.get(y, x))
    });

    Ok(Summary {
        backend: image.backend().name(),
        height,
        width,
        file_size,
        create_time,
        total: hist.total(),
        mean: hist.mean(),
        occupied: hist.occupied_range(),
        peak,
    })
}

/// Prints info in human-readable text format.
fn print_text(path: &Path, s: &Summary, verbose: bool) {
    println!("{}", path.display());
    println!("  Backend:    {}", s.backend);
    println!("  Resolution: {}x{}", s.width, s.height);
    println!("  File size:  {}", super::format_size(s.file_size));
    println!("  Created in: {:.2} ms", s.create_time.as_secs_f64() * 1000.0);
    println!("  Histogram:  {} samples in range", s.total);
    if let Some(mean) = s.mean {
        println!("  Mean level: {:.2}", mean);
    }
    if let Some((lo, hi)) = s.occupied {
        println!("  Occupied:   bins {}..={}", lo, hi);
    }
    match s.peak {
        Some((dy, dx, magnitude)) => {
            println!("  Peak:       {:.4e} at ({:+}, {:+})", magnitude, dy, dx);
        }
        None => println!("  Peak:       -"),
    }
    if verbose {
        let clipped = (s.width * s.height) as u64 - s.total;
        println!("  Out of range samples: {}", clipped);
    }
}

/// Prints info in JSON format.
fn print_json(path: &Path, s: &Summary) {
    let opt = |v: Option<String>| v.unwrap_or_else(|| "null".to_string());

    println!("{{");
    println!("  \"file\": \"{}\",", super::json_escape(&path.display().to_string()));
    println!("  \"backend\": \"{}\",", s.backend);
    println!("  \"width\": {},", s.width);
    println!("  \"height\": {},", s.height);
    println!("  \"size_bytes\": {},", s.file_size);
    println!("  \"create_ms\": {:.3},", s.create_time.as_secs_f64() * 1000.0);
    println!("  \"histogram\": {{");
    println!("    \"total\": {},", s.total);
    println!("    \"mean\": {},", opt(s.mean.map(|m| format!("{:.4}", m))));
    println!(
        "    \"occupied\": {}",
        opt(s.occupied.map(|(lo, hi)| format!("[{}, {}]", lo, hi)))
    );
    println!("  }},");
    println!(
        "  \"peak\": {}",
        opt(s.peak.map(|(dy, dx, m)| format!("{{\"dy\": {}, \"dx\": {}, \"magnitude\": {}}}", dy, dx, m)))
    );
    println!("}}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use sem_compute::{CpuSemImage, Grid};

    #[test]
    fn summary_of_constant_frame() {
        let image = CpuSemImage::new(Grid::filled(4, 6, 3.0)).unwrap();
        let s = summarise(&image, 100, Duration::from_millis(1)).unwrap();
        assert_eq!(s.backend, "cpu");
        assert_eq!((s.height, s.width), (4, 6));
        assert_eq!(s.total, 24);
        assert_eq!(s.occupied, Some((3, 3)));
        let (dy, dx, magnitude) = s.peak.unwrap();
        assert_eq!((dy, dx), (0, 0));
        assert!((magnitude - 72.0).abs() < 1e-3);
    }

    #[test]
    fn summary_of_empty_frame() {
        let image = CpuSemImage::new(Grid::zeros(0, 3)).unwrap();
        let s = summarise(&image, 0, Duration::ZERO).unwrap();
        assert_eq!(s.total, 0);
        assert_eq!(s.mean, None);
        assert_eq!(s.peak, None);
    }
}
