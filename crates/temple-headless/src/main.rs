//! Temple Puzzle headless runner
//!
//! Drives a scenario without a renderer: `run` plays a scripted walk for a
//! number of frames and prints the resulting state, `check` validates a
//! scenario file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use temple_core::{GameSession, JsonModelLoader, Key, ScenarioConfig, SceneId, Theme};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "temple-headless", about = "Headless runner for temple puzzle scenarios")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scripted walk through a scenario
    Run {
        /// Scenario JSON file (built-in temple scenario if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "600")]
        frames: u32,
        /// Directory that model paths are resolved against
        #[arg(short, long)]
        assets: Option<PathBuf>,
        /// Color theme
        #[arg(short, long, value_enum)]
        theme: Option<ThemeArg>,
    },
    /// Validate a scenario file
    Check {
        /// Scenario JSON file
        scenario: PathBuf,
    },
}

/// One scripted input phase, as a share of the total frame count.
struct Phase {
    until: f32,
    keys: &'static [Key],
    look: (f32, f32),
    scene: Option<SceneId>,
}

const SCRIPT: [Phase; 5] = [
    Phase { until: 0.2, keys: &[], look: (0.0, 0.0), scene: None },
    Phase { until: 0.45, keys: &[Key::Forward], look: (0.0, 0.0), scene: None },
    Phase { until: 0.6, keys: &[Key::Left, Key::Jump], look: (4.0, 0.0), scene: Some(SceneId::TempleTwo) },
    Phase { until: 0.8, keys: &[Key::Back, Key::Right], look: (0.0, 0.0), scene: Some(SceneId::DoorScene) },
    Phase { until: 1.0, keys: &[Key::Interact], look: (0.0, 0.0), scene: None },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
    Day,
    Dusk,
    Night,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Day => Theme::Day,
            ThemeArg::Dusk => Theme::Dusk,
            ThemeArg::Night => Theme::Night,
        }
    }
}

fn load_scenario(path: Option<&PathBuf>) -> anyhow::Result<ScenarioConfig> {
    match path {
        Some(path) => ScenarioConfig::from_path(path)
            .with_context(|| format!("loading scenario {}", path.display())),
        None => Ok(ScenarioConfig::default()),
    }
}

fn run(
    config: ScenarioConfig,
    frames: u32,
    assets: Option<PathBuf>,
    theme: Option<Theme>,
) -> anyhow::Result<()> {
    let name = config.meta.name.clone();
    let mut session = GameSession::new(config).context("building session")?;
    if let Some(root) = assets {
        let built = session.load_models(&JsonModelLoader::new(root));
        tracing::info!(built, "models loaded");
    }
    if let Some(theme) = theme {
        session.set_theme(theme);
    }

    let keyboard = session.keyboard();
    session.set_pointer_locked(true);

    let frame_dt = Duration::try_from_secs_f32(session.config().physics.time_step)
        .context("scenario time step is not a valid frame duration")?;
    let mut phase_index = usize::MAX;
    for frame in 0..frames {
        #[allow(clippy::cast_precision_loss)]
        let progress = frame as f32 / frames.max(1) as f32;
        let current = SCRIPT
            .iter()
            .position(|phase| progress < phase.until)
            .unwrap_or(SCRIPT.len() - 1);

        if current != phase_index {
            phase_index = current;
            let phase = &SCRIPT[current];
            keyboard.release_all();
            for key in phase.keys {
                keyboard.set(*key, true);
            }
            if let Some(scene) = phase.scene {
                session.switch_scene(scene);
            }
            tracing::debug!(frame, phase = current, "script phase");
        }
        let (dx, dy) = SCRIPT[current].look;
        session.look(dx, dy);

        let report = session.frame(frame_dt);
        if let Some(trigger) = report.trigger {
            tracing::info!(frame, ?trigger, "trigger fired");
        }
        if let Some(outcome) = report.interaction {
            tracing::info!(frame, ?outcome, "interaction");
        }
    }

    let player = session.player_position().unwrap_or_default();
    let ball = session.ball_position().unwrap_or_default();
    println!("Scenario: {name}, frames={}", session.frames());
    println!("Active scene: {:?}", session.scenes().active());
    println!("Player: ({:.2}, {:.2}, {:.2})", player.x, player.y, player.z);
    println!("Ball: ({:.2}, {:.2}, {:.2})", ball.x, ball.y, ball.z);
    println!(
        "Keys: {}/{}, door open: {}",
        session.scenes().key_count(),
        temple_core::KEY_COUNT,
        session.scenes().door_open()
    );
    for text in session.notices().history() {
        println!("Notice: {text}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let fallback = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            frames,
            assets,
            theme,
        } => {
            let config = load_scenario(scenario.as_ref())?;
            run(config, frames, assets, theme.map(Theme::from))?;
        }
        Commands::Check { scenario } => {
            let config = load_scenario(Some(&scenario))?;
            println!(
                "OK: {} ({} scenes, puzzle in {:?})",
                config.meta.name,
                config.scenes.len(),
                config.puzzle.scene
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_flag_parses_known_names() {
        let cli = Cli::try_parse_from(["temple-headless", "run", "--theme", "dusk"]).unwrap();
        let Commands::Run { theme, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(theme.map(Theme::from), Some(Theme::Dusk));
    }

    #[test]
    fn test_theme_flag_rejects_unknown_names() {
        let err = Cli::try_parse_from(["temple-headless", "run", "--theme", "noon"]).err();
        assert_eq!(err.map(|e| e.kind()), Some(clap::error::ErrorKind::InvalidValue));
    }

    #[test]
    fn test_run_rejects_unrepresentable_time_step() {
        let mut config = ScenarioConfig::default();
        config.physics.time_step = f32::MAX;
        assert!(run(config, 1, None, None).is_err());
    }
}
