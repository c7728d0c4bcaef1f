use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slidecast::{
    Collaborators, ConvertOptions, ConvertReport, EspeakTts, FfmpegEncoder, PptxDeckParser,
    SlidecastResult, SofficeRasterizer, StdioPrompter, convert, deps,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version, about = "Convert a slide deck into a narrated video")]
struct Cli {
    /// Input presentation (.pptx).
    input: PathBuf,

    /// Output video (.mp4).
    output: PathBuf,

    /// Seconds to show slides that have no narration (skips the interactive
    /// prompt for fully note-less decks).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    slide_secs: Option<u32>,

    /// Output frame rate.
    #[arg(long, default_value_t = slidecast::DEFAULT_FPS, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Parent directory for temporary artifacts (defaults to the system temp
    /// dir). Everything created there is removed before exit.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// espeak-ng voice for narration.
    #[arg(long)]
    voice: Option<String>,

    /// Narration speaking rate in words per minute.
    #[arg(long)]
    speed: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let missing = deps::missing_tools();
    if !missing.is_empty() {
        println!("The following external tools are missing:");
        for tool in &missing {
            println!("- {} ({})", tool.binary, tool.role);
        }
        println!("\nPlease install them:");
        for tool in &missing {
            println!("  {}: {}", tool.binary, tool.install_hint);
        }
        return ExitCode::from(1);
    }

    match run(cli) {
        Ok(report) => {
            match &report.output {
                Some(path) => eprintln!(
                    "wrote {} ({} segments, {} narrated, {} slides dropped)",
                    path.display(),
                    report.segments,
                    report.narrated,
                    report.dropped_slides
                ),
                None => eprintln!("no video produced"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            // Only pre-flight failures change the exit code; later errors are
            // reported without failing the process.
            if err.is_preflight() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

fn run(cli: Cli) -> SlidecastResult<ConvertReport> {
    let parser = PptxDeckParser;
    let mut rasterizer = SofficeRasterizer::new(&cli.input);
    let mut tts = EspeakTts::new();
    if let Some(voice) = &cli.voice {
        tts = tts.with_voice(voice);
    }
    if let Some(wpm) = cli.speed {
        tts = tts.with_speed_wpm(wpm);
    }
    let mut encoder = FfmpegEncoder;
    let mut prompter = StdioPrompter;

    let opts = ConvertOptions {
        fallback_secs: cli.slide_secs,
        fps: cli.fps,
        overwrite: true,
        work_dir: cli.work_dir.clone(),
    };
    let mut collab = Collaborators {
        parser: &parser,
        rasterizer: &mut rasterizer,
        tts: &tts,
        encoder: &mut encoder,
        prompter: &mut prompter,
    };

    convert(&cli.input, &cli.output, &opts, &mut collab)
}
