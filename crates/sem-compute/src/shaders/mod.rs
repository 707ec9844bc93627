//! WGSL shader sources for the wgpu image variant.
//!
//! All kernels run on 16x16 workgroups over `(x, y)` and read the grid size
//! from `dims = (width, height, max_level, 0)`.

#![allow(dead_code)] // Shaders used by wgpu backend

/// Separable Hanning window multiply: `dst = sqrt(win_col[y] * win_row[x]) * src`.
pub const HANNING: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;
@group(0) @binding(3) var<storage, read> win_col: array<f32>;
@group(0) @binding(4) var<storage, read> win_row: array<f32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if x >= dims.x || y >= dims.y { return; }

    let i = y * dims.x + x;
    dst[i] = sqrt(win_col[y] * win_row[x]) * src[i];
}
"#;

/// Unit-bin histogram. Bin `i` is `[i, i + 1)`, the last bin is closed;
/// out-of-range and NaN samples are skipped.
pub const HISTOGRAM: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> bins: array<atomic<u32>>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if x >= dims.x || y >= dims.y { return; }

    let v = src[y * dims.x + x];
    let levels = dims.z;
    if v >= 0.0 && v <= f32(levels) {
        let bin = min(u32(v), levels - 1u);
        atomicAdd(&bins[bin], 1u);
    }
}
"#;

/// Equalisation gather: `dst[i] = lut[bin(src[i])]`, with the bin clamped
/// into the table so every sample has a defined lookup.
pub const EQUALISE: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;
@group(0) @binding(3) var<storage, read> lut: array<f32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if x >= dims.x || y >= dims.y { return; }

    let i = y * dims.x + x;
    let v = src[i];
    let levels = dims.z;
    var idx = 0u;
    if v > 0.0 {
        idx = min(u32(min(v, f32(levels))), levels - 1u);
    }
    dst[i] = lut[idx];
}
"#;

/// First DFT pass along rows of a real grid.
///
/// `dst[y, k] = sum_x src[y, x] * twiddle[(k * x) mod w]` with
/// `twiddle[j] = (cos, -sin)(2 pi j / w)`.
pub const DFT_ROWS: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;
@group(0) @binding(3) var<storage, read> twiddle: array<vec2<f32>>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let k = id.x;
    let y = id.y;
    let w = dims.x;
    if k >= w || y >= dims.y { return; }

    let base = y * w;
    var acc = vec2<f32>(0.0, 0.0);
    var t = 0u;
    for (var x = 0u; x < w; x = x + 1u) {
        acc = acc + src[base + x] * twiddle[t];
        t = (t + k) % w;
    }
    dst[base + k] = acc;
}
"#;

/// Second DFT pass along columns, writing centred magnitudes.
///
/// Frequency `(ky, kx)` lands at `((ky + h/2) mod h, (kx + w/2) mod w)`.
pub const DFT_COLS_MAGNITUDE: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;
@group(0) @binding(3) var<storage, read> twiddle: array<vec2<f32>>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let kx = id.x;
    let ky = id.y;
    let w = dims.x;
    let h = dims.y;
    if kx >= w || ky >= h { return; }

    var acc = vec2<f32>(0.0, 0.0);
    var t = 0u;
    for (var y = 0u; y < h; y = y + 1u) {
        let a = src[y * w + kx];
        let b = twiddle[t];
        acc = acc + vec2<f32>(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);
        t = (t + ky) % h;
    }

    let sy = (ky + h / 2u) % h;
    let sx = (kx + w / 2u) % w;
    dst[sy * w + sx] = length(acc);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    /// Kernel name, source and number of bound resources.
    const KERNELS: &[(&str, &str, usize)] = &[
        ("hanning", HANNING, 5),
        ("histogram", HISTOGRAM, 3),
        ("equalise", EQUALISE, 4),
        ("dft_rows", DFT_ROWS, 4),
        ("dft_cols_magnitude", DFT_COLS_MAGNITUDE, 4),
    ];

    #[test]
    fn all_kernels_parse_and_validate() {
        for (name, source, _) in KERNELS {
            let module = naga::front::wgsl::parse_str(source)
                .unwrap_or_else(|err| panic!("{name} failed to parse: {err}"));
            Validator::new(ValidationFlags::all(), Capabilities::all())
                .validate(&module)
                .unwrap_or_else(|err| panic!("{name} failed validation: {err:?}"));
        }
    }

    #[test]
    fn kernels_match_dispatch_layout() {
        for (name, source, bindings) in KERNELS {
            let module = naga::front::wgsl::parse_str(source)
                .unwrap_or_else(|err| panic!("{name} failed to parse: {err}"));
            assert_eq!(module.entry_points.len(), 1, "{name}");
            let entry = &module.entry_points[0];
            assert_eq!(entry.name, "main", "{name}");
            assert_eq!(entry.workgroup_size, [16, 16, 1], "{name}");

            // Buffers are bound to consecutive slots of group 0
            let mut slots: Vec<u32> = module
                .global_variables
                .iter()
                .filter_map(|(_, var)| var.binding.as_ref())
                .map(|b| {
                    assert_eq!(b.group, 0, "{name}");
                    b.binding
                })
                .collect();
            slots.sort_unstable();
            let expected: Vec<u32> = (0..*bindings as u32).collect();
            assert_eq!(slots, expected, "{name}");
        }
    }
}
