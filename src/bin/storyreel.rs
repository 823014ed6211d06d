use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storyreel", version, about = "Render storyboards of still images to video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print the frame schedule as JSON.
    Schedule(ScheduleArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Storyboard JSON.
    #[arg(long)]
    storyboard: PathBuf,

    /// Media table JSON (`{"ref": "path"}`). Without it, references are file paths relative to
    /// the storyboard.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Render config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output frame rate (`24` or `30000/1001`).
    #[arg(long)]
    fps: Option<storyreel::Fps>,

    /// Total duration in seconds.
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Letterbox fill color (`#rrggbb`).
    #[arg(long)]
    fill: Option<storyreel::Rgb8>,

    /// Skip the H.264 compatibility pass.
    #[arg(long, default_value_t = false)]
    no_compat_pass: bool,

    /// Fail instead of replacing an existing output.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Print the render report as JSON on stdout.
    #[arg(long, default_value_t = false)]
    report: bool,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyreel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Schedule(args) => cmd_schedule(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

struct Inputs {
    storyboard: storyreel::Storyboard,
    resolution: storyreel::AssetResolution,
    config: storyreel::RenderConfig,
}

fn load_inputs(args: &InputArgs) -> anyhow::Result<Inputs> {
    let storyboard = storyreel::Storyboard::from_path(&args.storyboard)?;
    let resolution = match &args.assets {
        Some(path) => storyreel::AssetResolution::from_path(path)?,
        None => {
            let base = args.storyboard.parent().unwrap_or_else(|| Path::new("."));
            storyreel::AssetResolution::passthrough().with_base_dir(base)
        }
    };

    let mut config = match &args.config {
        Some(path) => storyreel::RenderConfig::from_path(path)?,
        None => storyreel::RenderConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(d) = args.duration {
        config.duration_secs = Some(d);
    }

    Ok(Inputs {
        storyboard,
        resolution,
        config,
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let Inputs {
        storyboard,
        resolution,
        mut config,
    } = load_inputs(&args.input)?;
    if let Some(w) = args.width {
        config.canvas.width = w;
    }
    if let Some(h) = args.height {
        config.canvas.height = h;
    }
    if let Some(fill) = args.fill {
        config.fill = fill;
    }
    if args.no_compat_pass {
        config.compat.enabled = false;
    }
    if args.no_overwrite {
        config.overwrite = false;
    }

    let mut progress = |e: &storyreel::RenderEvent| match e {
        storyreel::RenderEvent::ScheduleBuilt {
            total_frames,
            slots,
            gap_fill_frames,
        } => tracing::info!(total_frames, slots, gap_fill_frames, "schedule built"),
        storyreel::RenderEvent::FramesWritten { written, total } => {
            tracing::debug!(written, total, "frames written")
        }
        storyreel::RenderEvent::PostProcessed { stage, applied } => {
            tracing::info!(stage, applied, "post-processing done")
        }
        _ => {}
    };
    let report = storyreel::render_to_mp4(
        &storyboard,
        &resolution,
        &config,
        &args.out,
        &mut progress,
    )?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input)?;
    inputs.config.validate()?;
    let schedule = storyreel::build_schedule(
        &inputs.storyboard,
        &inputs.resolution,
        &inputs.config.schedule_opts(),
    )?;
    println!("{}", serde_json::to_string_pretty(&schedule)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(&args.input)?;
    inputs.config.validate()?;
    let schedule = storyreel::build_schedule(
        &inputs.storyboard,
        &inputs.resolution,
        &inputs.config.schedule_opts(),
    )?;
    let frame =
        storyreel::render_frame(&schedule, storyreel::FrameIndex(args.frame), &inputs.config)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
