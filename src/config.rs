use crate::error::{Error, Result};
use crate::grid::{cell_count, MAX_GRID_CELLS};

/// Parameters of one rendering, resolved once before any ray is traced
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
	pub width: usize,
	pub height: usize,
	/// deepest reflection/refraction level; 0 traces primary rays only
	pub max_bounces: u32,
	/// branches whose contribution falls below this are not traced
	pub cutoff_weight: f32,
	pub shadows: bool,
	/// light the back side of surfaces as if it were the front side
	pub shade_back: bool,
	/// cell counts of the acceleration grid, if any
	pub grid: Option<[usize; 3]>,
}

impl Default for RenderConfig {
	fn default() -> RenderConfig {
		RenderConfig {
			width: 100,
			height: 100,
			max_bounces: 0,
			cutoff_weight: 0.0,
			shadows: false,
			shade_back: false,
			grid: None,
		}
	}
}

impl RenderConfig {
	pub fn validate(&self) -> Result<()> {
		if self.width == 0 || self.height == 0 {
			return Err(Error::Config(format!("image size must be positive, got {}x{}", self.width, self.height)));
		}
		if !(self.cutoff_weight >= 0.0) {
			return Err(Error::Config(format!("cutoff weight must be non-negative, got {}", self.cutoff_weight)));
		}
		if let Some(dims) = self.grid {
			if dims.iter().any(|&n| n == 0) {
				return Err(Error::Config(format!("grid cell counts must be positive, got {:?}", dims)));
			}
			if cell_count(dims).is_none() {
				return Err(Error::Config(format!("grid {:?} exceeds {} cells", dims, MAX_GRID_CELLS)));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_valid() {
		let config = RenderConfig::default();
		assert!(config.validate().is_ok());
		assert_eq!(config.max_bounces, 0);
		assert_eq!(config.grid, None);
	}

	#[test]
	fn empty_image_and_grid_are_rejected() {
		let config = RenderConfig { width: 0, ..RenderConfig::default() };
		assert!(config.validate().is_err());
		let config = RenderConfig { grid: Some([4, 0, 4]), ..RenderConfig::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn oversized_grid_is_rejected() {
		let config = RenderConfig { grid: Some([5000, 5000, 5000]), ..RenderConfig::default() };
		match config.validate() {
			Err(Error::Config(_)) => {}
			other => panic!("unexpected result {:?}", other),
		}
		let config = RenderConfig { grid: Some([usize::MAX, usize::MAX, 2]), ..RenderConfig::default() };
		assert!(config.validate().is_err());
		let config = RenderConfig { grid: Some([256, 256, 256]), ..RenderConfig::default() };
		assert!(config.validate().is_ok());
	}

	#[test]
	fn missing_fields_take_defaults() {
		let config: RenderConfig = serde_json::from_str(r#"{ "max_bounces": 3, "grid": [2, 2, 2] }"#).unwrap();
		assert_eq!(config.width, 100);
		assert_eq!(config.max_bounces, 3);
		assert_eq!(config.grid, Some([2, 2, 2]));
	}
}
