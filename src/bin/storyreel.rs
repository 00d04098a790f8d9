use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use storyreel::{
    ArtifactKind, CoverMode, CoverRenderer, CueSource, EdgeTts, PipelineConfig,
    PipelineCoordinator, PostDirectory, SubtitleAligner, Synthesizer as _, TextBlock,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// Pipeline configuration JSON. Defaults apply to every missing field.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log external tool invocations and subtitle decisions.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full run: cover, narration, subtitles and video in a new post directory.
    Run(RunArgs),
    /// Render a cover image only.
    Cover(CoverArgs),
    /// Synthesize narration audio only.
    Audio(AudioArgs),
    /// Convert a VTT/SRT caption file into a re-split SRT file.
    Subtitles(SubtitlesArgs),
}

#[derive(Args, Debug)]
struct ScriptArgs {
    /// Script text: title on the first line, body below. Literal `\n` becomes a line break.
    text: Option<String>,

    /// Read the script from a UTF-8 file instead.
    #[arg(long, conflicts_with = "text")]
    from_file: Option<PathBuf>,
}

impl ScriptArgs {
    fn load(&self) -> anyhow::Result<String> {
        match (&self.text, &self.from_file) {
            (_, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("read script '{}'", path.display())),
            (Some(text), None) => Ok(storyreel::unescape_newlines(text)),
            (None, None) => anyhow::bail!("provide script text or --from-file"),
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    script: ScriptArgs,

    /// TTS voice identifier.
    #[arg(long)]
    voice: Option<String>,

    /// Directory holding post directories.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CoverArgs {
    #[command(flatten)]
    script: ScriptArgs,

    /// Write only the image to this path (no post directory, no post.json).
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Blank canvas without text.
    #[arg(long)]
    background_only: bool,

    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AudioArgs {
    #[command(flatten)]
    script: ScriptArgs,

    #[arg(short = 'o', long)]
    out: PathBuf,

    #[arg(long)]
    voice: Option<String>,
}

#[derive(Args, Debug)]
struct SubtitlesArgs {
    /// Input VTT or SRT file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output SRT path.
    #[arg(short = 'o', long)]
    out: PathBuf,

    /// Override the maximum characters per cue.
    #[arg(long)]
    max_chars: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Run(args) => cmd_run(cfg, args),
        Command::Cover(args) => cmd_cover(cfg, args),
        Command::Audio(args) => cmd_audio(cfg, args),
        Command::Subtitles(args) => cmd_subtitles(cfg, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => Ok(PipelineConfig::from_json_path(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn cmd_run(mut cfg: PipelineConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(voice) = args.voice {
        cfg.voice = voice;
    }
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    let script = args.script.load()?;

    let coordinator = PipelineCoordinator::with_system_tools(cfg)?;
    let report = coordinator.run(&script)?;

    println!("post_dir={}", report.post_dir.display());
    for a in &report.artifacts {
        println!("{:?}={}", a.kind, a.path.display());
    }
    println!("subtitles={:?}", report.subtitles);
    println!("audio_duration_sec={:.3}", report.audio_duration_sec);
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    Ok(())
}

fn cmd_cover(mut cfg: PipelineConfig, args: CoverArgs) -> anyhow::Result<()> {
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    let block = TextBlock::parse(&args.script.load()?)?;
    let mode = if args.background_only {
        CoverMode::Background
    } else {
        cfg.cover.mode
    };
    let mut renderer = match mode {
        CoverMode::Text => CoverRenderer::new(cfg.cover.clone())?,
        CoverMode::Background => CoverRenderer::background_only(cfg.cover.clone())?,
    };

    let output = match args.out {
        Some(out) => match mode {
            CoverMode::Text => renderer.render_text(&block, &out)?,
            CoverMode::Background => renderer.render_background(&out)?,
        },
        None => {
            let dir = PostDirectory::create(
                &cfg.data_dir,
                block.title(),
                cfg.dir_name_max_len,
                chrono::Local::now().naive_local(),
            )?;
            storyreel::cover::generate_with_manifest(
                &mut renderer,
                mode,
                &block,
                &dir.artifact_path(ArtifactKind::Cover),
                &dir.artifact_path(ArtifactKind::Manifest),
            )?
        }
    };
    if let Some(overflow) = &output.overflow {
        eprintln!("warning: {overflow}");
    }
    println!("{}", output.path.display());
    Ok(())
}

fn cmd_audio(cfg: PipelineConfig, args: AudioArgs) -> anyhow::Result<()> {
    let block = TextBlock::parse(&args.script.load()?)?;
    let voice = args.voice.unwrap_or(cfg.voice);
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    EdgeTts::new(cfg.tools.tts_program).synthesize(&block.narration(), &voice, &args.out)?;
    println!("{}", args.out.display());
    Ok(())
}

fn cmd_subtitles(mut cfg: PipelineConfig, args: SubtitlesArgs) -> anyhow::Result<()> {
    if let Some(max) = args.max_chars {
        cfg.subtitles.max_chars = max;
    }
    let content = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read captions '{}'", args.in_path.display()))?;
    let aligner = SubtitleAligner::new(cfg.subtitles)?;
    let cues = aligner.align(CueSource::FromForeignFormat(&content))?;
    if cues.is_empty() {
        anyhow::bail!("no cues found in '{}'", args.in_path.display());
    }
    storyreel::subtitle::write_srt(&args.out, &cues)?;
    println!("{} cues -> {}", cues.len(), args.out.display());
    Ok(())
}
