// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ambimix::audio::{self, Backend};
use ambimix::config;
use ambimix::engine::{Collaborators, Engine, NotificationKind};
use ambimix::external;
use ambimix::import::FileHandle;
use ambimix::keyboard;
use ambimix::notify::{AutoConfirm, Confirm, LogNotifier, PromptConfirm};
use ambimix::persist::JsonFileStore;
use ambimix::runtime::{self, Driver};
use ambimix::sound::SourceId;
use ambimix::state::CategoryFilter;
use clap::{crate_version, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How long a chime gets to play before the process exits.
const CHIME_WAIT: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An ambient sound mixer."
)]
struct Cli {
    /// The path to the engine config.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the registered sounds.
    Sounds {
        /// Only list this category (nature, ambient, music, affirmations).
        category: Option<String>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Imports audio files as custom sounds.
    Import {
        /// The files to import.
        paths: Vec<PathBuf>,
    },
    /// Removes a custom sound.
    Remove {
        /// The id of the sound.
        id: String,
        /// Don't ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Lists the saved presets.
    Presets {},
    /// Deletes a saved preset.
    DeletePreset {
        /// The name of the preset.
        name: String,
    },
    /// Plays a timer notification sound (focus-complete, break-complete, tick).
    Chime {
        /// The kind of notification.
        kind: String,
    },
    /// Starts the mixer and reads commands from the keyboard.
    Start {
        /// A preset to load on start.
        #[arg(short, long)]
        preset: Option<String>,
        /// Sounds to play on start.
        sounds: Vec<String>,
    },
}

fn build_engine(
    config: &config::Engine,
    backend: Box<dyn Backend>,
    confirm: Box<dyn Confirm>,
) -> Result<Engine, Box<dyn Error>> {
    let data_dir = config.data_dir();
    info!(data_dir = ?data_dir, backend = %backend, "Building engine.");
    Ok(Engine::bootstrap(
        config,
        Collaborators {
            backend,
            player: external::get_player(&config.external_player()),
            notifier: Box::new(LogNotifier),
            store: Box::new(JsonFileStore::new(&data_dir)),
            confirm,
        },
    )?)
}

/// An engine for commands that never produce sound.
fn silent_engine(config: &config::Engine) -> Result<Engine, Box<dyn Error>> {
    build_engine(
        config,
        Box::new(audio::mock::Backend::get("silent")),
        Box::new(AutoConfirm(false)),
    )
}

async fn start(
    mut engine: Engine,
    preset: Option<String>,
    sounds: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    if let Some(preset) = preset {
        engine.load_preset(&preset)?;
    }
    for id in sounds {
        engine.play(&SourceId::new(id))?;
    }

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let driver = keyboard::Driver::new();
    let _keyboard = driver.monitor_commands(commands_tx);

    tokio::select! {
        _ = runtime::run(&mut engine, commands_rx, runtime::DEFAULT_TICK) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted.");
        }
    }
    engine.stop_all();
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sounds { category } => {
            let filter = match category {
                Some(category) => category.parse::<CategoryFilter>()?,
                None => CategoryFilter::All,
            };
            let engine = silent_engine(&config)?;
            let sounds = engine.registry().list(filter);
            if sounds.is_empty() {
                println!("No sounds found.");
                return Ok(());
            }

            println!("Sounds (count: {}):", sounds.len());
            for sound in sounds {
                println!(
                    "- {} ({}, {}){}",
                    sound.name(),
                    sound.id(),
                    sound.category(),
                    if sound.is_default() { "" } else { " [custom]" }
                );
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Import { paths } => {
            let mut engine = silent_engine(&config)?;
            let handles = paths.into_iter().map(FileHandle::Path).collect();
            for result in engine.import_files(handles) {
                match result {
                    Ok(id) => println!("Imported {}", id),
                    Err(e) => println!("Skipped: {}", e),
                }
            }
        }
        Commands::Remove { id, yes } => {
            let confirm: Box<dyn Confirm> = if yes {
                Box::new(AutoConfirm(true))
            } else {
                Box::new(PromptConfirm::new(io::stdin().lock(), io::stdout()))
            };
            let mut engine = build_engine(
                &config,
                Box::new(audio::mock::Backend::get("silent")),
                confirm,
            )?;
            engine.remove_custom_sound(&SourceId::new(id))?;
        }
        Commands::Presets {} => {
            let engine = silent_engine(&config)?;
            let presets = engine.presets();
            if presets.is_empty() {
                println!("No presets saved.");
                return Ok(());
            }

            println!("Presets:");
            for preset in presets {
                println!("- {}", preset);
            }
        }
        Commands::DeletePreset { name } => {
            silent_engine(&config)?.delete_preset(&name)?;
        }
        Commands::Chime { kind } => {
            let kind = kind.parse::<NotificationKind>()?;
            let backend = audio::get_backend(config.audio_device())?;
            let mut engine = build_engine(&config, backend, Box::new(AutoConfirm(false)))?;
            engine.play_notification_sound(kind)?;
            tokio::time::sleep(CHIME_WAIT).await;
        }
        Commands::Start { preset, sounds } => {
            let backend = audio::get_backend(config.audio_device())?;
            // The keyboard owns stdin.
            let engine = build_engine(&config, backend, Box::new(AutoConfirm(true)))?;
            start(engine, preset, sounds).await?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    // The keyboard thread may still be blocked on stdin.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}
