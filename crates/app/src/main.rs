mod config;
mod logging;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use kbm_core::{MetaBuilder, Project, Session};
use kbm_decode::{AudioFormat, OnsetBpmAnalyzer, decode_bytes, decode_file, spawn_bpm_analysis};
use kbm_project::{Vector3, load_project, load_project_meta, save_package, save_project};
use kbm_transport::{AudioOutput, NullOutput};

use crate::config::Config;

const USAGE: &str = "\
usage:
  kbmaker new <music> <project> --bundle <parent.child> --name <name>
              [--left 2] [--right 2] [--bpm <bpm>] [--difficulty 1]
              [--author <name>] [--composer <name>] [--description <text>]
  kbmaker info <project>
  kbmaker export <project> <dir>
  kbmaker play <project>";

/// Positional arguments plus `--key value` pairs.
struct Args {
    positional: Vec<String>,
    flags: HashMap<String, String>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.strip_prefix("--") {
                Some(key) => {
                    let value = args
                        .next()
                        .with_context(|| format!("--{key} needs a value"))?;
                    flags.insert(key.to_string(), value);
                }
                None => positional.push(arg),
            }
        }
        Ok(Self { positional, flags })
    }

    fn path(&self, index: usize, what: &str) -> anyhow::Result<PathBuf> {
        self.positional
            .get(index)
            .map(PathBuf::from)
            .with_context(|| format!("missing {what}\n{USAGE}"))
    }

    fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    fn parsed<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.flag(key) {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid --{key} '{value}'")),
            None => Ok(default),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let _logger = logging::init_logging(&config.log_level)?;

    let mut argv = std::env::args().skip(1);
    let command = argv.next().unwrap_or_default();
    let args = Args::parse(argv)?;

    match command.as_str() {
        "new" => new_project(&args),
        "info" => info(&args.path(0, "project")?),
        "export" => export(&args.path(0, "project")?, &args.path(1, "output directory")?),
        "play" => play(&config, &args.path(0, "project")?),
        _ => bail!("{USAGE}"),
    }
}

fn new_project(args: &Args) -> anyhow::Result<()> {
    let music_path = args.path(0, "music")?;
    let out = args.path(1, "project")?;
    let format = AudioFormat::from_path(&music_path)?;
    let music = std::fs::read(&music_path)
        .with_context(|| format!("failed to read {}", music_path.display()))?;

    let bpm = match args.flag("bpm") {
        Some(_) => args.parsed("bpm", 0.0)?,
        None => estimate_bpm(&music, format)?,
    };

    let meta = MetaBuilder::new()
        .asset_bundle_name(args.flag("bundle").unwrap_or_default())
        .name(args.flag("name").unwrap_or_default())
        .description(args.flag("description").unwrap_or_default())
        .level_author(args.flag("author").unwrap_or("unknown"))
        .composer(args.flag("composer").unwrap_or("unknown"))
        .difficulty(args.parsed("difficulty", 1)?)
        .track_sizes(args.parsed("left", 2)?, args.parsed("right", 2)?)
        .note_appear_position(Vector3::default())
        .bpm(bpm)
        .music(music, format.extension())
        .build()?;

    let mut project = Project::with_empty_sheet(meta)?;
    project.set_saving_path(&out);
    save_project(&out, &project)?;
    println!("created {} ({} lanes, {bpm} bpm)", out.display(), project.sheet().column());
    Ok(())
}

fn estimate_bpm(music: &[u8], format: AudioFormat) -> anyhow::Result<f64> {
    let audio = decode_bytes(music, format)?;
    let job = spawn_bpm_analysis(OnsetBpmAnalyzer::default(), audio);
    match job.join() {
        Some(bpm) => {
            let bpm = f64::from(bpm).round();
            log::info!("no --bpm given, using estimate {bpm}");
            Ok(bpm)
        }
        None => bail!("could not estimate the tempo, pass --bpm"),
    }
}

fn info(path: &Path) -> anyhow::Result<()> {
    let meta = load_project_meta(path)?;
    println!("name:        {}", meta.name);
    println!("bundle:      {}", meta.asset_bundle_name);
    println!("authors:     {}", meta.level_authors.join(", "));
    println!("composers:   {}", meta.composers.join(", "));
    println!("difficulty:  {}", meta.difficulty);
    println!(
        "lanes:       {} + {}",
        meta.left_track_size, meta.right_track_size
    );
    println!("bpm:         {}", meta.bpm);
    println!(
        "length:      {}",
        kbm_core::format_seconds(meta.length_seconds)
    );
    println!("music:       mus{}", meta.ext);
    Ok(())
}

fn export(path: &Path, dir: &Path) -> anyhow::Result<()> {
    let project = load_project(path)?;
    save_package(&project, dir)?;
    println!(
        "exported {} notes to {}",
        project.sheet().len(),
        dir.display()
    );
    Ok(())
}

fn open_output(config: &Config) -> Box<dyn AudioOutput> {
    let strike = config
        .strike_sample
        .as_deref()
        .and_then(|path| match decode_file(path) {
            Ok(audio) => Some(audio),
            Err(err) => {
                log::warn!("strike sample {} not loaded: {err}", path.display());
                None
            }
        });

    match kbm_engine::start(strike) {
        Ok(handle) => Box::new(handle),
        Err(err) => {
            log::warn!("no audio output, playing silently: {err}");
            Box::new(NullOutput::default())
        }
    }
}

/// Play the chart from the start without a window, striking notes on the
/// audio device until the song ends.
fn play(config: &Config, path: &Path) -> anyhow::Result<()> {
    let mut session = Session::new(config.session_options(), open_output(config));
    session.open(path)?;
    session.toggle_playback()?;

    let frame = Duration::from_millis(1000 / u64::from(config.fps_limit.max(1)));
    let mut struck = 0;
    while session.player().is_playing() {
        struck += session.tick();
        if let Some(frame) = session.render() {
            log::trace!("{} draw commands", frame.len());
        }
        std::thread::sleep(frame);
    }

    println!("{}", session.status());
    println!("struck {struck} notes");
    Ok(())
}
