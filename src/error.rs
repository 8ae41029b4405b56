use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong before the first ray is traced
#[derive(Error, Debug)]
pub enum Error {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("image error: {0}")]
	Image(#[from] image::ImageError),

	#[error("mesh cache error: {0}")]
	Cache(#[from] bincode::Error),

	#[error("{}:{line}: {message}", path.display())]
	Obj { path: PathBuf, line: usize, message: String },

	#[error("invalid scene: {0}")]
	Scene(String),

	#[error("invalid configuration: {0}")]
	Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
