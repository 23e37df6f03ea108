use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use cuelist::{
    BpmTimeline, ClipRef, Fps, Frame, JsonLinesSink, OfflineOpts, Runner, TempoMap,
    Value, clip_fn, clip_frame_range, render_range,
};

#[derive(Parser, Debug)]
#[command(name = "cuelist", version)]
struct Cli {
    /// Log lifecycle events at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a beat position to seconds.
    Time {
        #[command(flatten)]
        tempo: TempoArgs,
        beat: f64,
    },
    /// Convert seconds to a beat position.
    Beat {
        #[command(flatten)]
        tempo: TempoArgs,
        seconds: f64,
    },
    /// Print verify points of a metronome timeline as JSON.
    Points(MetronomeArgs),
    /// Render a metronome timeline offline as JSON lines.
    Render(RenderArgs),
    /// Play a metronome timeline in real time, one JSON line per frame.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct TempoArgs {
    /// Initial tempo in BPM.
    #[arg(long, default_value_t = cuelist::DEFAULT_BPM)]
    bpm: f64,

    /// Tempo change as `beat:bpm`; repeatable.
    #[arg(long = "change", value_parser = parse_change)]
    changes: Vec<(f64, f64)>,
}

#[derive(Args, Debug)]
struct MetronomeArgs {
    #[command(flatten)]
    tempo: TempoArgs,

    /// Number of bars.
    #[arg(long, default_value_t = 4)]
    bars: u32,

    /// Beats per bar.
    #[arg(long, default_value_t = 4)]
    beats_per_bar: u32,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    metronome: MetronomeArgs,

    /// Frames per second.
    #[arg(long, default_value_t = 40)]
    fps: u32,

    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Render frames in parallel.
    #[arg(long)]
    parallel: bool,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    metronome: MetronomeArgs,

    /// Frames per second.
    #[arg(long, default_value_t = cuelist::DEFAULT_FPS)]
    fps: f64,

    /// Start position in seconds.
    #[arg(long, default_value_t = 0.0)]
    start_at: f64,
}

fn parse_change(s: &str) -> Result<(f64, f64), String> {
    let (beat, bpm) = s
        .split_once(':')
        .ok_or_else(|| format!("expected beat:bpm, got '{s}'"))?;
    let beat = beat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad beat '{beat}': {e}"))?;
    let bpm = bpm
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad bpm '{bpm}': {e}"))?;
    Ok((beat, bpm))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.cmd {
        Command::Time { tempo, beat } => {
            println!("{}", tempo_map(&tempo)?.time(beat)?);
            Ok(())
        }
        Command::Beat { tempo, seconds } => {
            println!("{}", tempo_map(&tempo)?.beat(seconds)?);
            Ok(())
        }
        Command::Points(args) => cmd_points(args),
        Command::Render(args) => cmd_render(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn tempo_map(args: &TempoArgs) -> anyhow::Result<TempoMap> {
    let mut map = TempoMap::new(args.bpm).context("initial tempo")?;
    for &(beat, bpm) in &args.changes {
        map.set_tempo(beat, bpm)
            .with_context(|| format!("tempo change {beat}:{bpm}"))?;
    }
    Ok(map)
}

/// One clip per bar: `beat` counts 1.. within the bar, `accent` marks the
/// downbeat.
fn metronome(args: &MetronomeArgs) -> anyhow::Result<BpmTimeline> {
    anyhow::ensure!(args.beats_per_bar > 0, "beats per bar must be >= 1");
    let per_bar = f64::from(args.beats_per_bar);
    let mut tl = BpmTimeline::new(Arc::new(tempo_map(&args.tempo)?));

    for bar in 0..args.bars {
        let number = f64::from(bar + 1);
        let click: ClipRef = clip_fn(Some(per_bar), move |t, _: &()| {
            Ok(Frame::from([
                ("bar".to_owned(), Value::Number(number)),
                ("beat".to_owned(), Value::Number(t.floor() + 1.0)),
                ("accent".to_owned(), Value::Bool(t < 1.0)),
            ]))
        })?;
        tl.add_labeled(f64::from(bar) * per_bar, format!("bar {}", bar + 1), click)?;
    }
    Ok(tl)
}

fn cmd_points(args: MetronomeArgs) -> anyhow::Result<()> {
    let tl = metronome(&args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &tl.verify_points()).context("write verify points")?;
    writeln!(out)?;
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let tl = metronome(&args.metronome)?;
    let fps = Fps::new(args.fps, 1)?;
    let range = clip_frame_range::<()>(&tl, fps)?;
    let opts = OfflineOpts {
        parallel: args.parallel,
        ..OfflineOpts::default()
    };

    let writer: Box<dyn Write + Send> = match &args.out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("create '{}'", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer));
    let stats = render_range(&tl, &(), fps, range, &opts, &mut sink)?;
    tracing::info!(frames = stats.frames_total, "render finished");
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let tl = metronome(&args.metronome)?;
    let runner = Runner::builder(())
        .fps(args.fps)
        .output(|frame: &Frame| match serde_json::to_string(frame) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(error = %err, "frame dropped: not serializable"),
        })
        .build()?;
    runner.play_sync(Arc::new(tl), args.start_at)?;
    Ok(())
}
