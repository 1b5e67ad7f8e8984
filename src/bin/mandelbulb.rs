use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use mandelbulb::{
    BulbError, ColorMapConfig, Domain, FailurePolicy, Field, GridConfig, PipelineConfig,
    RadiusFormula, Size, VideoConfig,
};

#[derive(Parser, Debug)]
#[command(name = "mandelbulb", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every frame and encode the video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render every frame without encoding.
    Frames(RunArgs),
    /// Encode an existing image directory.
    Encode(EncodeArgs),
    /// Sample the escape-time grid and write it as a field file.
    Grid(GridArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// JSON run configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with distance_* and light_* inputs.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output image directory.
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Keep every n-th input frame.
    #[arg(long)]
    stride: Option<usize>,

    /// Worker threads (default: available parallelism).
    #[arg(long)]
    workers: Option<usize>,

    /// Raster size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    raster: Option<Size>,

    /// Seed for the random color map.
    #[arg(long)]
    seed: Option<u64>,

    /// Use one color map for every frame instead of reseeding per frame.
    #[arg(long)]
    fixed_colormap: bool,

    /// Keep existing files in the image directory.
    #[arg(long)]
    no_cleanup: bool,

    /// Stop scheduling frames after the first failure.
    #[arg(long)]
    fail_fast: bool,

    /// Mark a frame failed when it runs longer than this many seconds.
    #[arg(long)]
    unit_timeout: Option<f64>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    video: VideoArgs,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Output video path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output width in pixels (height keeps the aspect ratio).
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// Bitrate, e.g. 40M.
    #[arg(long)]
    bitrate: Option<String>,

    #[arg(long)]
    codec: Option<String>,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Directory holding mandelbulb_NNN.png frames.
    #[arg(long, default_value = "images")]
    image_dir: PathBuf,

    /// Number of frames to encode (default: up to the highest index found).
    #[arg(long)]
    frames: Option<u64>,

    #[command(flatten)]
    video: VideoArgs,
}

#[derive(Parser, Debug)]
struct GridArgs {
    #[arg(long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    #[arg(long, default_value_t = 100)]
    max_iter: u32,

    #[arg(long, default_value_t = 8.0)]
    power: f64,

    /// Domain as RE_MIN,RE_MAX,IM_MIN,IM_MAX.
    #[arg(long, value_parser = parse_domain)]
    domain: Option<Domain>,

    /// Use the Euclidean modulus for the spherical radius.
    #[arg(long)]
    euclidean: bool,

    /// Output field file (comma-separated escape indices).
    #[arg(long)]
    out: PathBuf,

    /// Also write a colorized PNG.
    #[arg(long)]
    png: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Encode(args) => cmd_encode(args),
        Command::Grid(args) => cmd_grid(args),
    };

    if let Err(err) = &result
        && let Some(bulb) = err.downcast_ref::<BulbError>()
    {
        match bulb.frame() {
            Some(frame) => eprintln!("failed: {} at frame {:03}", bulb.kind(), frame.0),
            None => eprintln!("failed: {}", bulb.kind()),
        }
    }
    result
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let height = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Size::new(width, height).map_err(|e| e.to_string())
}

fn parse_domain(s: &str) -> Result<Domain, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    let &[re_min, re_max, im_min, im_max] = parts.as_slice() else {
        return Err(format!("expected 4 comma-separated bounds, got {}", parts.len()));
    };
    let domain = Domain {
        re_min,
        re_max,
        im_min,
        im_max,
    };
    domain.validate().map_err(|e| e.to_string())?;
    Ok(domain)
}

fn load_config(args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(dir) = &args.image_dir {
        cfg.image_dir = dir.clone();
    }
    if let Some(stride) = args.stride {
        cfg.stride = stride;
    }
    if args.workers.is_some() {
        cfg.workers = args.workers;
    }
    if let Some(raster) = args.raster {
        cfg.raster = raster;
    }
    if args.seed.is_some() || args.fixed_colormap {
        let (seed, per_frame) = match &cfg.colormap {
            ColorMapConfig::Random { seed, per_frame } => (*seed, *per_frame),
            ColorMapConfig::Gradient { .. } => (0, true),
        };
        cfg.colormap = ColorMapConfig::Random {
            seed: args.seed.unwrap_or(seed),
            per_frame: per_frame && !args.fixed_colormap,
        };
    }
    if args.no_cleanup {
        cfg.cleanup = false;
    }
    if args.fail_fast {
        cfg.failure_policy = FailurePolicy::FailFast;
    }
    if args.unit_timeout.is_some() {
        cfg.unit_timeout_secs = args.unit_timeout;
    }
    Ok(cfg)
}

fn apply_video_args(mut video: VideoConfig, args: VideoArgs) -> VideoConfig {
    if let Some(out) = args.out {
        video.out_path = out;
    }
    if let Some(width) = args.width {
        video.width = width;
    }
    if let Some(fps) = args.fps {
        video.fps = fps;
    }
    if let Some(bitrate) = args.bitrate {
        video.bitrate = bitrate;
    }
    if let Some(codec) = args.codec {
        video.codec = codec;
    }
    video
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.run)?;
    let video = cfg.video.take().unwrap_or_default();
    cfg.video = Some(apply_video_args(video, args.video));

    let report = mandelbulb::run(&cfg)?;
    if let Some(video) = &report.video {
        eprintln!(
            "wrote {} ({} frames, {:.1}s)",
            video.out_path.display(),
            video.frames.count,
            report.elapsed.as_secs_f64()
        );
    }
    Ok(())
}

fn cmd_frames(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args)?;
    cfg.video = None;

    let report = mandelbulb::run(&cfg)?;
    eprintln!(
        "wrote {} images to {} ({:.1}s)",
        report.image_paths().count(),
        cfg.image_dir.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let video = apply_video_args(VideoConfig::default(), args.video);
    let report = mandelbulb::encode_frames(&args.image_dir, &video, args.frames)?;
    eprintln!(
        "wrote {} ({} frames)",
        report.out_path.display(),
        report.frames.count
    );
    Ok(())
}

fn cmd_grid(args: GridArgs) -> anyhow::Result<()> {
    let cfg = GridConfig {
        width: args.width,
        height: args.height,
        max_iter: args.max_iter,
        power: args.power,
        domain: args.domain.unwrap_or_default(),
        radius: if args.euclidean {
            RadiusFormula::Euclidean
        } else {
            RadiusFormula::DoubledImaginary
        },
    };
    let field = mandelbulb::sample_grid_with(&cfg)?;

    create_parent(&args.out)?;
    field.write_delimited(&args.out, ',')?;
    eprintln!("wrote {}", args.out.display());

    if let Some(png) = &args.png {
        create_parent(png)?;
        let values = Field::<f64>::from(&field);
        let map = ColorMapConfig::viridis_like().for_frame(mandelbulb::FrameIndex(0))?;
        mandelbulb::colorize(&values, &map)
            .save(png)
            .with_context(|| format!("write png '{}'", png.display()))?;
        eprintln!("wrote {}", png.display());
    }
    Ok(())
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
