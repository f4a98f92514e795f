use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use poseover::{ComposeConfig, ComposeJob, SolveMode};

#[derive(Parser, Debug)]
#[command(name = "poseover", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite the whole timeline into an MP4 plus a transform log
    /// (requires `ffmpeg`/`ffprobe` on PATH).
    Render(RenderArgs),
    /// Composite a single timeline record and save it as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Pose timeline JSON (bare record array or {"frames": [...]}).
    #[arg(long)]
    timeline: PathBuf,

    /// Background video path.
    #[arg(long)]
    bg: PathBuf,

    /// Directory of sequentially named sprite PNGs.
    #[arg(long)]
    fg_dir: Option<PathBuf>,

    /// Sprite index table (header `t_ms,path`). Takes priority over --fg-dir.
    #[arg(long)]
    fg_index: Option<PathBuf>,

    /// Run parameters as JSON (ComposeConfig). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transform-solving mode.
    #[arg(long, value_enum, default_value_t = ModeChoice::Rule)]
    mode: ModeChoice,

    #[arg(long)]
    canvas_w: Option<u32>,

    #[arg(long)]
    canvas_h: Option<u32>,

    /// Output frame rate; also used to synthesize missing timestamps.
    #[arg(long)]
    demo_fps: Option<u32>,

    /// Seek the background to the timestamp-matched frame index instead of
    /// playing it sequentially.
    #[arg(long)]
    strict_bg_sync: Option<bool>,

    #[arg(long)]
    bg_fps: Option<f64>,

    #[arg(long)]
    bg_start_ms: Option<i64>,

    #[arg(long)]
    feather_px: Option<u32>,

    #[arg(long)]
    alpha_bias: Option<f64>,

    #[arg(long)]
    color_match: Option<bool>,

    #[arg(long)]
    color_match_strength: Option<f64>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory for composite.mp4 and composite.log.csv.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Timeline record index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Rule,
}

impl From<ModeChoice> for SolveMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Rule => SolveMode::Rule,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn resolve_config(input: &InputArgs) -> anyhow::Result<ComposeConfig> {
    let mut cfg = match &input.config {
        Some(path) => ComposeConfig::load(path)?,
        None => ComposeConfig::default(),
    };

    if let Some(w) = input.canvas_w {
        cfg.canvas.width = w;
    }
    if let Some(h) = input.canvas_h {
        cfg.canvas.height = h;
    }
    if let Some(fps) = input.demo_fps {
        cfg.sync.demo_fps = fps;
    }
    if let Some(strict) = input.strict_bg_sync {
        cfg.sync.strict_bg_sync = strict;
    }
    if let Some(fps) = input.bg_fps {
        cfg.sync.bg_fps = fps;
    }
    if let Some(ms) = input.bg_start_ms {
        cfg.sync.bg_start_ms = ms;
    }
    if let Some(px) = input.feather_px {
        cfg.blend.feather_px = px;
    }
    if let Some(bias) = input.alpha_bias {
        cfg.blend.alpha_bias = bias;
    }
    if let Some(enabled) = input.color_match {
        cfg.blend.color_match = enabled;
    }
    if let Some(strength) = input.color_match_strength {
        cfg.blend.color_match_strength = strength;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn build_job(input: &InputArgs, out_dir: &Path) -> anyhow::Result<ComposeJob> {
    Ok(ComposeJob {
        timeline_path: input.timeline.clone(),
        bg_video: input.bg.clone(),
        fg_dir: input.fg_dir.clone(),
        fg_index: input.fg_index.clone(),
        out_dir: out_dir.to_path_buf(),
        mode: input.mode.into(),
        config: resolve_config(input)?,
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let job = build_job(&args.input, &args.out_dir)?;
    let artifacts = poseover::run(&job)?;

    println!(
        "Saved: {} ({} frames)",
        artifacts.video_path.display(),
        artifacts.frames_written
    );
    println!("Log: {}", artifacts.log_path.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = build_job(&args.input, Path::new("."))?;
    let frame = poseover::compose_single_frame(&job, args.frame)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write frame PNG '{}'", args.out.display()))?;

    println!("Saved: {}", args.out.display());
    Ok(())
}
