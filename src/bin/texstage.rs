use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "texstage", version)]
struct Cli {
    /// Log buffering decisions to stderr (filter with RUST_LOG, default `texstage=debug`).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script on the CPU backend and write one image as a PNG.
    Run(RunArgs),
    /// Parse and validate a script without running it.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Name of the image to read back.
    #[arg(long)]
    image: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print backend resource-touch counters.
    #[arg(long)]
    stats: bool,

    /// Execute calls immediately instead of deferring them until the first frame.
    #[arg(long)]
    no_defer: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        init_tracing();
    }
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("texstage=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_script_json(path: &Path) -> anyhow::Result<texstage::Script> {
    let f = File::open(path).with_context(|| format!("open script '{}'", path.display()))?;
    let r = BufReader::new(f);
    let script: texstage::Script =
        serde_json::from_reader(r).with_context(|| "parse script JSON")?;
    Ok(script)
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let script = read_script_json(&args.in_path)?;
    script.validate()?;
    eprintln!(
        "ok: {} image(s), {} setup op(s), {} frame(s)",
        script.images.len(),
        script.setup.len(),
        script.frames.len()
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let script = read_script_json(&args.in_path)?;

    let mut opts = texstage::GraphicsOpts::from_env();
    if args.no_defer {
        opts.defer_until_first_frame = false;
    }
    let backend = texstage::CpuBackend::new(texstage::CpuBackendOpts::from_env());
    let mut graphics = texstage::Graphics::new(backend, opts);

    let names = texstage::run_script(&mut graphics, &script)?;
    let id = *names
        .get(&args.image)
        .with_context(|| format!("script has no live image named '{}'", args.image))?;

    let (width, height) = graphics.size(id);
    let premul = graphics.pixels(id, texstage::Region::full(width, height))?;
    let straight: Vec<u8> = premul
        .chunks_exact(4)
        .flat_map(|px| {
            texstage::Rgba8Premul::from_array([px[0], px[1], px[2], px[3]]).to_straight_rgba()
        })
        .collect();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &straight,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.stats {
        let s = graphics.backend().stats();
        eprintln!("frames:    {}", s.frames_begun);
        eprintln!("textures:  {} created, {} disposed", s.textures_created, s.textures_disposed);
        eprintln!("fills:     {}", s.fills);
        eprintln!("uploads:   {}", s.uploads);
        eprintln!("readbacks: {}", s.readbacks);
        eprintln!("draws:     {} image, {} triangles", s.image_draws, s.triangle_draws);
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
