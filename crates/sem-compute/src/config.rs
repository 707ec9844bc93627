//! Per-image configuration.
//!
//! Process-wide settings (which backend to try) live in the selector and are
//! read from the environment once; see [`crate::backend::BackendPreference`].

use sem_core::TableOverflow;

/// Configuration carried by each image entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SemConfig {
    /// Handling of equalisation table entries equal to `max_level`.
    ///
    /// Defaults to [`TableOverflow::Preserve`]: an equalised image can hold
    /// the value 256 at 8 bits.
    pub table_overflow: TableOverflow,
}

impl SemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set table overflow handling.
    pub fn table_overflow(mut self, overflow: TableOverflow) -> Self {
        self.table_overflow = overflow;
        self
    }

    /// Shorthand for `table_overflow(TableOverflow::Clamp)`.
    pub fn clamped(self) -> Self {
        self.table_overflow(TableOverflow::Clamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preserves_overflow() {
        assert_eq!(SemConfig::default().table_overflow, TableOverflow::Preserve);
        assert_eq!(SemConfig::new().clamped().table_overflow, TableOverflow::Clamp);
    }
}
