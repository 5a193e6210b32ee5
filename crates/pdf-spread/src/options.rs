use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rotate every page that does not already have the wanted orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotateStep {
    pub orientation: Orientation,
    pub direction: TurnDirection,
}

/// A complete normalization job.
///
/// Stages run in the order rotate, resize, combine; each is skipped when
/// unset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpreadOptions {
    // Per-page stages
    pub rotate: Option<RotateStep>,
    pub resize: Option<PaperSize>,

    // Pairing; the direction is used to turn landscape pages upright
    pub combine: Option<TurnDirection>,

    // Output metadata
    pub info: DocumentInfo,

    // Maximum number of pages transformed at once
    pub parallelism: usize,
}

impl Default for SpreadOptions {
    fn default() -> Self {
        Self {
            rotate: None,
            resize: None,
            combine: None,
            info: DocumentInfo::default(),
            parallelism: default_parallelism(),
        }
    }
}

/// One worker per available core
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl SpreadOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| SpreadError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SpreadError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(SpreadError::Config(
                "Parallelism must be at least 1".to_string(),
            ));
        }

        if let Some(PaperSize::Custom {
            width_mm,
            height_mm,
        }) = self.resize
        {
            let valid = |v: f32| v.is_finite() && v > 0.0;
            if !valid(width_mm) || !valid(height_mm) {
                return Err(SpreadError::Config(format!(
                    "Custom page size must be positive, got {} x {} mm",
                    width_mm, height_mm
                )));
            }
        }

        Ok(())
    }

    /// True when no stage is configured
    pub fn is_passthrough(&self) -> bool {
        self.rotate.is_none() && self.resize.is_none() && self.combine.is_none()
    }
}
