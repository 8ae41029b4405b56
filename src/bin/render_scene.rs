#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use gridtrace::{loader, Error, RenderConfig, Result};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl From<LogLevel> for LevelFilter {
	fn from(level: LogLevel) -> LevelFilter {
		match level {
			LogLevel::Error => LevelFilter::Error,
			LogLevel::Warn => LevelFilter::Warn,
			LogLevel::Info => LevelFilter::Info,
			LogLevel::Debug => LevelFilter::Debug,
			LogLevel::Trace => LevelFilter::Trace,
		}
	}
}

/// Render a JSON scene with a Whitted ray tracer
#[derive(Parser, Debug)]
#[command(name = "render_scene")]
struct Args {
	/// Scene description (JSON)
	#[arg(short, long)]
	input: PathBuf,

	/// Image size in pixels
	#[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
	size: Option<Vec<usize>>,

	/// Color image; .ppm is written directly, other extensions go through the image crate
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Depth image, white at MIN and black at MAX
	#[arg(long, num_args = 3, value_names = ["MIN", "MAX", "FILE"])]
	depth: Option<Vec<String>>,

	/// Normals image
	#[arg(long)]
	normals: Option<PathBuf>,

	/// Maximum number of reflection/refraction bounces
	#[arg(long, default_value_t = 0)]
	bounces: u32,

	/// Branches contributing less than this are not traced
	#[arg(long, default_value_t = 0.0)]
	weight: f32,

	/// Cast shadow rays
	#[arg(long)]
	shadows: bool,

	/// Light back faces as front faces
	#[arg(long)]
	shade_back: bool,

	/// Accelerate with a uniform grid of NX*NY*NZ cells
	#[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"])]
	grid: Option<Vec<usize>>,

	/// Render on the calling thread only
	#[arg(long)]
	sequential: bool,

	/// Logging level, RUST_LOG takes precedence
	#[arg(long, value_enum, default_value = "info")]
	log_level: LogLevel,
}

struct DepthOutput {
	min: f32,
	max: f32,
	path: PathBuf,
}

fn parse_depth(values: &[String]) -> Result<DepthOutput> {
	let num = |s: &String| s.parse::<f32>()
		.map_err(|e| Error::Config(format!("bad depth bound {:?}: {}", s, e)));
	let min = num(&values[0])?;
	let max = num(&values[1])?;
	if !(min < max) {
		return Err(Error::Config(format!("depth range must satisfy MIN < MAX, got {} {}", min, max)));
	}
	Ok(DepthOutput { min, max, path: PathBuf::from(&values[2]) })
}

fn config_from(args: &Args) -> Result<RenderConfig> {
	let mut config = RenderConfig {
		max_bounces: args.bounces,
		cutoff_weight: args.weight,
		shadows: args.shadows,
		shade_back: args.shade_back,
		grid: args.grid.as_ref().map(|g| [g[0], g[1], g[2]]),
		..RenderConfig::default()
	};
	if let Some(ref size) = args.size {
		config.width = size[0];
		config.height = size[1];
	}
	config.validate()?;
	Ok(config)
}

fn run(args: Args) -> Result<()> {
	let config = config_from(&args)?;
	let depth = match args.depth {
		Some(ref values) => Some(parse_depth(values)?),
		None => None,
	};
	if args.output.is_none() && depth.is_none() && args.normals.is_none() {
		warn!("no output file given, the image will be rendered and discarded");
	}

	let mut scene = loader::load_scene(&args.input)?;
	gridtrace::prepare_scene(&mut scene, &config);

	let frame = if args.sequential {
		gridtrace::render_seq(&scene, &config)
	} else {
		gridtrace::render(&scene, &config)
	};

	if let Some(ref path) = args.output {
		frame.color_image().save(path)?;
		info!("wrote {}", path.display());
	}
	if let Some(ref d) = depth {
		frame.depth_image(d.min, d.max).save(&d.path)?;
		info!("wrote {}", d.path.display());
	}
	if let Some(ref path) = args.normals {
		frame.normals_image().save(path)?;
		info!("wrote {}", path.display());
	}
	Ok(())
}

fn main() {
	let args = Args::parse();

	env_logger::Builder::new()
		.filter_level(args.log_level.into())
		.parse_default_env()
		.init();

	if let Err(e) = run(args) {
		error!("{}", e);
		process::exit(1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flags_map_onto_the_config() {
		let args = Args::parse_from(vec![
			"render_scene", "--input", "scene.json", "--size", "320", "200",
			"--bounces", "4", "--weight", "0.01", "--shadows", "--grid", "8", "8", "4",
		]);
		let config = config_from(&args).unwrap();
		assert_eq!((config.width, config.height), (320, 200));
		assert_eq!(config.max_bounces, 4);
		assert!(config.shadows);
		assert!(!config.shade_back);
		assert_eq!(config.grid, Some([8, 8, 4]));
	}

	#[test]
	fn invalid_values_are_config_errors() {
		let args = Args::parse_from(vec!["render_scene", "-i", "s.json", "--grid", "8", "0", "4"]);
		assert!(config_from(&args).is_err());
		assert!(parse_depth(&["5".to_owned(), "1".to_owned(), "d.png".to_owned()]).is_err());
		assert!(parse_depth(&["x".to_owned(), "1".to_owned(), "d.png".to_owned()]).is_err());
		let d = parse_depth(&["1".to_owned(), "5".to_owned(), "d.png".to_owned()]).unwrap();
		assert_eq!((d.min, d.max), (1.0, 5.0));
	}
}
