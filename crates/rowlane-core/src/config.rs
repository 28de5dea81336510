//! Pipeline configuration, fixed for the lifetime of a pipeline run

use serde::{Deserialize, Serialize};

use crate::error::{Result, RowlaneError};
use crate::lanes::MAX_LANES;

/// Default lane width (values per block).
pub const DEFAULT_LANES: usize = 16;
/// Default depth of the channel between segmenter and reducer.
pub const DEFAULT_CHANNEL_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lanes per value block.
    pub lanes: usize,
    /// Tiles per run.
    pub tiles: usize,
    /// Repetitions of the whole tile sequence.
    pub runs: usize,
    /// Expected value blocks per run; checked after every run when set.
    pub total_blocks: Option<usize>,
    /// Capacity of the segmenter -> reducer channel.
    pub channel_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
            tiles: 1,
            runs: 1,
            total_blocks: None,
            channel_depth: DEFAULT_CHANNEL_DEPTH,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_tiles(mut self, tiles: usize) -> Self {
        self.tiles = tiles;
        self
    }

    #[must_use]
    pub const fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    #[must_use]
    pub const fn with_total_blocks(mut self, total_blocks: usize) -> Self {
        self.total_blocks = Some(total_blocks);
        self
    }

    #[must_use]
    pub const fn with_channel_depth(mut self, depth: usize) -> Self {
        self.channel_depth = depth;
        self
    }

    /// # Errors
    /// [`RowlaneError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        validate_lanes(self.lanes)?;
        if self.tiles == 0 {
            return Err(RowlaneError::InvalidConfig("tiles must be > 0".into()));
        }
        if self.runs == 0 {
            return Err(RowlaneError::InvalidConfig("runs must be > 0".into()));
        }
        if self.channel_depth == 0 {
            return Err(RowlaneError::InvalidConfig(
                "channel_depth must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// # Errors
/// [`RowlaneError::InvalidConfig`] unless `1 <= lanes <= MAX_LANES`.
pub fn validate_lanes(lanes: usize) -> Result<()> {
    if lanes == 0 || lanes > MAX_LANES {
        return Err(RowlaneError::InvalidConfig(format!(
            "lanes must be in 1..={MAX_LANES}, got {lanes}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = PipelineConfig::default();
        assert_eq!(c.lanes, 16);
        assert_eq!(c.channel_depth, 16);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let err = PipelineConfig::new(0).validate().unwrap_err();
        assert!(err.to_string().contains("lanes"));
        let err = PipelineConfig::new(65).validate().unwrap_err();
        assert!(err.to_string().contains("65"));
        let err = PipelineConfig::new(4).with_tiles(0).validate().unwrap_err();
        assert!(err.to_string().contains("tiles"));
        let err = PipelineConfig::new(4).with_runs(0).validate().unwrap_err();
        assert!(err.to_string().contains("runs"));
        let err = PipelineConfig::new(4)
            .with_channel_depth(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("channel_depth"));
    }

    #[test]
    fn reads_partial_json() {
        let c: PipelineConfig = serde_json::from_str(r#"{"lanes": 8, "tiles": 3}"#).unwrap();
        assert_eq!(c.lanes, 8);
        assert_eq!(c.tiles, 3);
        assert_eq!(c.runs, 1);
        assert_eq!(c.total_blocks, None);
        assert_eq!(c.channel_depth, DEFAULT_CHANNEL_DEPTH);
    }
}
