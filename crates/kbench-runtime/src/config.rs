use derive_builder::Builder;

use crate::error::RuntimeError;

/// Nesting depth used when nested regions are switched off: only the
/// outermost region gets a real team.
pub const FLAT_LEVELS: usize = 1;

/// Explicit configuration of a worker team.
///
/// Every [`crate::Runtime`] is built from one of these; there is no
/// process-wide setting behind it, so two runtimes with different ceilings
/// can coexist.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
#[builder(default, build_fn(validate = "Self::check"))]
pub struct RuntimeConfig {
    /// Ceiling on simultaneously active workers.
    pub max_threads: usize,
    /// Deepest nesting level that still forks a team. Regions opened deeper
    /// than this run on the encountering thread alone.
    pub max_active_levels: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_threads: 1,
            max_active_levels: FLAT_LEVELS,
        }
    }
}

impl RuntimeConfigBuilder {
    fn check(&self) -> Result<(), String> {
        if self.max_threads == Some(0) {
            return Err("max_threads must be at least 1".into());
        }
        if self.max_active_levels == Some(0) {
            return Err("max_active_levels must be at least 1".into());
        }
        Ok(())
    }
}

impl RuntimeConfig {
    pub fn with_threads(max_threads: usize) -> Self {
        Self {
            max_threads,
            ..Default::default()
        }
    }

    pub fn nested(max_threads: usize, max_active_levels: usize) -> Self {
        Self {
            max_threads,
            max_active_levels,
        }
    }

    pub fn nesting_enabled(&self) -> bool {
        self.max_active_levels > FLAT_LEVELS
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.max_threads == 0 {
            return Err(RuntimeError::InvalidArgument(
                "max_threads must be at least 1".into(),
            ));
        }
        if self.max_active_levels == 0 {
            return Err(RuntimeError::InvalidArgument(
                "max_active_levels must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_flat_single_thread() {
        let cfg = RuntimeConfigBuilder::default().build().unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
        assert!(!cfg.nesting_enabled());
    }

    #[test]
    fn test_builder_sets_fields() {
        let cfg = RuntimeConfigBuilder::default()
            .max_threads(8)
            .max_active_levels(2)
            .build()
            .unwrap();
        assert_eq!(cfg, RuntimeConfig::nested(8, 2));
        assert!(cfg.nesting_enabled());
    }

    #[test]
    fn test_builder_rejects_zero() {
        let err = RuntimeConfigBuilder::default().max_threads(0).build();
        assert!(matches!(err, Err(RuntimeConfigBuilderError::ValidationError(_))));
        assert!(RuntimeConfigBuilder::default()
            .max_threads(2)
            .max_active_levels(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(RuntimeConfig::with_threads(0).validate().is_err());
        assert!(RuntimeConfig::nested(4, 0).validate().is_err());
        assert!(RuntimeConfig::nested(4, 2).validate().is_ok());
    }
}
