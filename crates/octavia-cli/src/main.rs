// Octavia CLI: resolve a project snapshot into absolute pitches.
//
// Usage:
//   octavia render <project.json> [--track ID] [--events] [--out FILE] [--ppq N] [--no-cache]
//   octavia scale <project.json> <NAME|ID>
//   octavia mode [NAME] [--root PITCH]
//   octavia config [--write]

mod config;

use std::path::Path;

use anyhow::{bail, Context};
use octavia_core::{Scale, ScaleId, ScaleMode, TrackId};
use octavia_services::{Renderer, Session};
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::CliConfig;

const USAGE: &str = "usage: octavia <render|scale|mode|config> [args]";

fn main() -> anyhow::Result<()> {
    let config = config::load_config();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log.filter.parse::<Directive>().context("invalid [log] filter")?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("render") => render(&args, &config),
        Some("scale") => scale(&args),
        Some("mode") => mode(&args),
        Some("config") => show_config(&args, &config),
        _ => bail!(USAGE),
    }
}

fn render(args: &[String], config: &CliConfig) -> anyhow::Result<()> {
    let session = load_session(args)?;

    let mut render_config = config.render.clone();
    if let Some(ppq) = parse_flag(args, "--ppq")? {
        render_config.ppq = ppq;
    }
    let renderer = Renderer::new(render_config.timing())
        .with_cache(config.cache.enabled && !has_flag(args, "--no-cache"))
        .with_velocity_scale(render_config.velocity_scale);

    let track: Option<u64> = parse_flag(args, "--track")?;
    let json = match (track, has_flag(args, "--events")) {
        (Some(track), true) => serde_json::to_string_pretty(&renderer.events_for_track(&session, TrackId(track))?)?,
        (Some(track), false) => serde_json::to_string_pretty(&renderer.render_track(&session, TrackId(track))?)?,
        (None, true) => bail!("--events needs --track"),
        (None, false) => serde_json::to_string_pretty(&renderer.render_all(&session)?)?,
    };

    info!(
        "Rendered with ppq {} (cache hits {}, misses {})",
        renderer.timing().ppq,
        renderer.cache().hits(),
        renderer.cache().misses()
    );

    match parse_flag::<String>(args, "--out")? {
        Some(out) => {
            std::fs::write(&out, json).with_context(|| format!("writing {}", out))?;
            info!("Wrote {}", out);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn scale(args: &[String]) -> anyhow::Result<()> {
    let session = load_session(args)?;
    let Some(query) = positional(args, 3) else {
        bail!("usage: octavia scale <project.json> <NAME|ID>");
    };

    let scale = match query.parse::<u64>() {
        Ok(id) => session.scale(ScaleId(id)),
        Err(_) => session.scale_named(query),
    }
    .with_context(|| format!("no scale named {}", query))?;
    let id = scale.id.context("scale has no id")?;

    print_scale(scale, &session.preview_scale(id)?);
    Ok(())
}

fn mode(args: &[String]) -> anyhow::Result<()> {
    let Some(name) = positional(args, 2) else {
        let names: Vec<&str> = ScaleMode::ALL.iter().map(|m| m.name()).collect();
        println!("{}", names.join(", "));
        return Ok(());
    };
    let mode = ScaleMode::from_name(name).with_context(|| format!("unknown mode {}", name))?;
    let root: i32 = parse_flag(args, "--root")?.unwrap_or(60);

    let mut session = Session::new();
    let chromatic = session.add_scale(Scale::chromatic(ScaleId(1), root))?;
    let preset = session.add_scale(Scale::from_mode(ScaleId(2), mode))?;
    let parent = session.add_track("root", None, Some(chromatic))?;
    session.add_track(mode.name(), Some(parent), Some(preset))?;

    let scale = session.scale(preset).context("preset scale missing")?;
    print_scale(scale, &session.preview_scale(preset)?);
    Ok(())
}

fn show_config(args: &[String], config: &CliConfig) -> anyhow::Result<()> {
    if has_flag(args, "--write") {
        let path = config::save_config(config)?;
        println!("Wrote {}", path.display());
    } else {
        println!("# {}", config::config_path().display());
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn load_session(args: &[String]) -> anyhow::Result<Session> {
    let Some(path) = positional(args, 2) else {
        bail!(USAGE);
    };
    Session::load(Path::new(path)).with_context(|| format!("loading project {}", path))
}

fn print_scale(scale: &Scale, pitches: &[i32]) {
    let names: Vec<String> = pitches.iter().map(|&p| format!("{} ({})", pitch_name(p), p)).collect();
    println!("{}: {}", scale.name, names.join(" "));
}

fn pitch_name(pitch: i32) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    format!("{}{}", NAMES[pitch.rem_euclid(12) as usize], pitch.div_euclid(12) - 1)
}

fn positional(args: &[String], index: usize) -> Option<&str> {
    args.get(index).filter(|s| !s.starts_with("--")).map(String::as_str)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Value following `flag`; an absent flag is `None`, a missing or bad value an error
fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> anyhow::Result<Option<T>> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let Some(value) = args.get(i + 1).filter(|v| !v.starts_with("--")) else {
        bail!("{} needs a value", flag);
    };
    match value.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => bail!("invalid value for {}: {}", flag, value),
    }
}
