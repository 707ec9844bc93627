//! Backend detection and process-wide selection.
//!
//! The accelerator is probed exactly once, on first use. The outcome never
//! changes afterwards: no re-detection, no switching between backends.

use std::sync::OnceLock;
#[cfg(feature = "wgpu")]
use std::sync::Arc;

#[cfg(feature = "wgpu")]
use tracing::debug;
use tracing::{error, warn};

use super::Backend;
#[cfg(feature = "wgpu")]
use super::WgpuContext;
#[cfg(feature = "wgpu")]
use crate::ComputeError;

/// Environment variable read once by the selector.
pub const BACKEND_ENV: &str = "SEM_BACKEND";

/// Operator preference for backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Use the accelerator when it can be acquired.
    #[default]
    Auto,
    /// Never try the accelerator.
    Cpu,
    /// Expect the accelerator; its absence is logged as an error.
    Wgpu,
}

impl BackendPreference {
    /// Parse a preference value, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Some(Self::Auto),
            "cpu" => Some(Self::Cpu),
            "wgpu" | "gpu" => Some(Self::Wgpu),
            _ => None,
        }
    }

    /// Read [`BACKEND_ENV`]; unknown values fall back to `Auto`.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_ENV) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown {BACKEND_ENV} value, using auto");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }
}

/// Result of the one-time accelerator probe.
pub struct BackendSelector {
    preference: BackendPreference,
    #[cfg(feature = "wgpu")]
    wgpu: Option<Arc<WgpuContext>>,
    fallback_reason: Option<String>,
}

impl BackendSelector {
    /// Probe the accelerator according to `preference`.
    ///
    /// Failure does not propagate: it is logged and recorded, and the CPU
    /// backend is selected. A missing adapter is a warning; an adapter that
    /// fails to build its device or pipelines is logged as an error.
    pub fn detect(preference: BackendPreference) -> Self {
        #[cfg(feature = "wgpu")]
        {
            let acquired = match preference {
                BackendPreference::Cpu => Err((format!("disabled by {BACKEND_ENV}=cpu"), false)),
                BackendPreference::Auto | BackendPreference::Wgpu => {
                    WgpuContext::new().map(Arc::new).map_err(|e| {
                        let broken = !matches!(e, ComputeError::NoAdapter);
                        (e.to_string(), broken)
                    })
                }
            };
            match acquired {
                Ok(ctx) => {
                    debug!(device = ctx.device_name(), "Accelerator available");
                    Self { preference, wgpu: Some(ctx), fallback_reason: None }
                }
                Err((reason, broken)) => Self::fallback(preference, reason, broken),
            }
        }
        #[cfg(not(feature = "wgpu"))]
        {
            Self::fallback(preference, "wgpu feature not enabled".to_string(), false)
        }
    }

    /// Record the CPU fallback. `broken` marks an adapter that exists but
    /// could not build a device or its pipelines.
    fn fallback(preference: BackendPreference, reason: String, broken: bool) -> Self {
        if broken {
            error!(reason = %reason, "Accelerator present but unusable, falling back to CPU");
        } else if preference == BackendPreference::Wgpu {
            error!(reason = %reason, "Accelerator requested but unavailable, falling back to CPU");
        } else {
            warn!(reason = %reason, "Could not acquire accelerator, GPU acceleration disabled");
        }
        Self {
            preference,
            #[cfg(feature = "wgpu")]
            wgpu: None,
            fallback_reason: Some(reason),
        }
    }

    /// Whether the accelerator was acquired.
    pub fn accelerator_available(&self) -> bool {
        #[cfg(feature = "wgpu")]
        {
            self.wgpu.is_some()
        }
        #[cfg(not(feature = "wgpu"))]
        {
            false
        }
    }

    /// Backend every factory call will use.
    pub fn backend(&self) -> Backend {
        if self.accelerator_available() {
            Backend::Wgpu
        } else {
            Backend::Cpu
        }
    }

    pub fn preference(&self) -> BackendPreference {
        self.preference
    }

    /// Why the accelerator is unavailable, if it is.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Shared device context, when the accelerator was acquired.
    #[cfg(feature = "wgpu")]
    pub fn wgpu_context(&self) -> Option<&Arc<WgpuContext>> {
        self.wgpu.as_ref()
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector")
            .field("preference", &self.preference)
            .field("backend", &self.backend())
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

static SELECTOR: OnceLock<BackendSelector> = OnceLock::new();

/// Process-wide selector, probing on first call.
pub fn selector() -> &'static BackendSelector {
    SELECTOR.get_or_init(|| BackendSelector::detect(BackendPreference::from_env()))
}

/// Whether the process-wide selector acquired the accelerator.
pub fn accelerator_available() -> bool {
    selector().accelerator_available()
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let sel = selector();
    let mut desc = String::new();

    let cores = sys_info::cpu_num().unwrap_or(0);
    let mem = sys_info::mem_info()
        .map(|m| format!("{:.1} GB available", m.avail as f64 / (1024.0 * 1024.0)))
        .unwrap_or_else(|_| "memory unknown".to_string());
    desc.push_str(&format!("[+] CPU: rayon + rustfft ({cores} cores, {mem})\n"));

    #[cfg(feature = "wgpu")]
    {
        if let Some(ctx) = sel.wgpu_context() {
            let info = ctx.adapter_info();
            desc.push_str(&format!("[+] wgpu: {} ({:?})\n", info.name, info.backend));
        }
    }
    if !sel.accelerator_available() {
        desc.push_str(&format!("[-] wgpu: {}\n", sel.fallback_reason().unwrap_or("unavailable")));
    }

    desc.push_str(&format!("selected: {}\n", sel.backend()));
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preferences() {
        assert_eq!(BackendPreference::parse("CPU"), Some(BackendPreference::Cpu));
        assert_eq!(BackendPreference::parse(" auto "), Some(BackendPreference::Auto));
        assert_eq!(BackendPreference::parse(""), Some(BackendPreference::Auto));
        assert_eq!(BackendPreference::parse("gpu"), Some(BackendPreference::Wgpu));
        assert_eq!(BackendPreference::parse("cuda"), None);
    }

    #[test]
    fn forced_cpu_records_reason() {
        let sel = BackendSelector::detect(BackendPreference::Cpu);
        assert!(!sel.accelerator_available());
        assert_eq!(sel.backend(), Backend::Cpu);
        assert!(sel.fallback_reason().is_some());
    }

    #[test]
    fn selector_is_stable() {
        let a = selector() as *const BackendSelector;
        let b = selector() as *const BackendSelector;
        assert_eq!(a, b);
        assert_eq!(selector().backend(), selector().backend());
    }
}
