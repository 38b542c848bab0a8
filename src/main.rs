use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use legion_led_controller::*;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Demonstration of backlight features (does not touch saved settings)
    Demo {
        /// Duration of each demo step in seconds
        #[arg(short, long, default_value_t = 3)]
        duration: u64,
    },
    /// Turn the backlight on (restores the static effect if it was off)
    On,
    /// Turn the backlight off
    Off,
    /// Set the lighting effect
    Effect {
        /// Effect (hardware: static, breath, wave, hue, off; software: police, scanner, heartbeat, fire, battery, soft-wave)
        #[arg(short, long, value_enum)]
        effect: EffectMode,
        /// Animation speed (1-4)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
        speed: Option<u8>,
    },
    /// Set one zone's color
    Color {
        /// Zone number (1-4)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
        zone: u8,
        /// Color as 6-digit hex ("ff0000") or decimal triple ("255,0,0")
        color: String,
    },
    /// Set all four zone colors at once
    Colors {
        /// Four colors, zone 1 first
        #[arg(num_args = 4)]
        colors: Vec<String>,
    },
    /// Set the backlight brightness
    Brightness {
        #[arg(short, long, value_enum)]
        level: Brightness,
    },
    /// Set the animation speed
    Speed {
        /// Speed (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        speed: u8,
    },
    /// Set the hardware wave direction
    Wave {
        #[arg(value_enum)]
        direction: WaveDirection,
    },
    /// Fill zones 2 and 3 with a gradient from zone 1 to zone 4
    Gradient,
    /// Run the animation and blink tickers in the foreground until ctrl-c
    Run,
    /// Manage named profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Save the current settings under a name
    Save { name: String },
    /// Load a profile (falls back to Default if unknown)
    Load { name: String },
    /// Delete a profile (Default is protected)
    Delete { name: String },
    /// List all profile names
    List,
    /// Export a profile to a JSON file
    Export { name: String, path: PathBuf },
    /// Import profiles from a JSON file, keyed by their own names
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with pretty colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("legion_led_controller=info")),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    let config_path = SettingsDocument::default_path();
    let doc = SettingsDocument::load(&config_path);
    let transport = UsbTransport::open();
    let mut engine = LightingEngine::new(doc, transport, Box::new(SysfsBattery::new()));

    match cli.command.unwrap_or(Commands::Demo { duration: 3 }) {
        Commands::Demo { duration } => {
            // The engine is left in its loading state on purpose: nothing
            // the demo does is persisted
            run_demo(&mut engine, duration).await?;
            return Ok(());
        }
        Commands::On => {
            engine.finish_initialization();
            if engine.state().effect() == EffectMode::Off {
                engine.set_effect(EffectMode::Static);
            }
            if engine.state().brightness() == Brightness::Off {
                engine.set_brightness(Brightness::Low);
            }
            engine.apply()?;
        }
        Commands::Off => {
            engine.finish_initialization();
            engine.set_effect(EffectMode::Off);
            engine.apply()?;
        }
        Commands::Effect { effect, speed } => {
            engine.finish_initialization();
            engine.set_effect(effect);
            if let Some(speed) = speed {
                engine.set_speed(speed);
            }
            engine.apply()?;
        }
        Commands::Color { zone, color } => {
            engine.finish_initialization();
            engine.set_zone_color((zone - 1) as usize, &color)?;
            engine.apply()?;
        }
        Commands::Colors { colors } => {
            engine.finish_initialization();
            for (zone, color) in colors.iter().enumerate() {
                engine.set_zone_color(zone, color)?;
            }
            engine.apply()?;
        }
        Commands::Brightness { level } => {
            engine.finish_initialization();
            engine.set_brightness(level);
            engine.apply()?;
        }
        Commands::Speed { speed } => {
            engine.finish_initialization();
            engine.set_speed(speed);
            engine.apply()?;
        }
        Commands::Wave { direction } => {
            engine.finish_initialization();
            engine.set_wave_direction(direction);
            engine.apply()?;
        }
        Commands::Gradient => {
            engine.finish_initialization();
            engine.generate_gradient()?;
            engine.apply()?;
        }
        Commands::Run => {
            // Push the loaded profile to the hardware, then start ticking
            engine.apply()?;
            engine.finish_initialization();
            engine.run().await?;
        }
        Commands::Profile { action } => {
            engine.finish_initialization();
            match action {
                ProfileAction::Save { name } => {
                    engine.save_profile(&name)?;
                    info!("Profile '{}' saved", name);
                }
                ProfileAction::Load { name } => {
                    engine.load_profile(&name);
                    engine.apply()?;
                }
                ProfileAction::Delete { name } => {
                    engine.delete_profile(&name)?;
                    info!("Profile '{}' deleted", name);
                }
                ProfileAction::List => {
                    for name in engine.list_profiles() {
                        let marker = if name == engine.current_profile() { "*" } else { " " };
                        println!("{marker} {name}");
                    }
                }
                ProfileAction::Export { name, path } => {
                    let profile = engine.profile_snapshot(&name);
                    settings::export_profile(&path, &name, &profile)?;
                    info!("Profile '{}' exported to {}", name, path.display());
                }
                ProfileAction::Import { path } => {
                    let imported = settings::import_profiles(&path)?;
                    let names: Vec<_> = imported.keys().cloned().collect();
                    engine.import_profiles(imported)?;
                    info!("Imported profiles: {}", names.join(", "));
                }
            }
        }
    }

    Ok(())
}

/// Sleep for specified number of seconds
async fn sleep(seconds: u64) {
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}

/// Run a demonstration of the backlight features
async fn run_demo<T: Transport>(engine: &mut LightingEngine<T>, duration: u64) -> Result<()> {
    info!("Running backlight demo with {}s intervals", duration);

    info!("Turning backlight off");
    engine.set_effect(EffectMode::Off);
    engine.apply()?;
    sleep(duration).await;

    info!("Static red / green / blue / white across the zones");
    engine.set_effect(EffectMode::Static);
    engine.set_brightness(Brightness::High);
    for (zone, color) in ["ff0000", "00ff00", "0000ff", "ffffff"].iter().enumerate() {
        engine.set_zone_color(zone, color)?;
    }
    engine.apply()?;
    sleep(duration).await;

    info!("Gradient from zone 1 to zone 4");
    engine.set_zone_color(0, "ff0000")?;
    engine.set_zone_color(3, "0000ff")?;
    engine.generate_gradient()?;
    engine.apply()?;
    sleep(duration).await;

    info!("Hardware breath effect");
    engine.set_effect(EffectMode::Breath);
    engine.apply()?;
    sleep(duration).await;

    info!("Hardware wave, left to right");
    engine.set_effect(EffectMode::Wave);
    engine.set_wave_direction(WaveDirection::Ltr);
    engine.apply()?;
    sleep(duration).await;

    info!("Hardware wave, right to left");
    engine.set_wave_direction(WaveDirection::Rtl);
    engine.apply()?;
    sleep(duration).await;

    info!("Hardware hue cycle");
    engine.set_effect(EffectMode::Hue);
    engine.apply()?;
    sleep(duration).await;

    info!("Software police effect");
    engine.set_effect(EffectMode::Police);
    demo_ticks(engine, duration).await;

    info!("Software scanner effect");
    engine.set_effect(EffectMode::Scanner);
    demo_ticks(engine, duration).await;

    info!("Software soft wave effect");
    engine.set_effect(EffectMode::SoftWave);
    engine.set_speed(4);
    demo_ticks(engine, duration).await;

    info!("Turning backlight off to end demo");
    engine.set_effect(EffectMode::Off);
    engine.apply()?;

    info!("Demo completed!");
    Ok(())
}

/// Drive the animation ticker for roughly `seconds` seconds
async fn demo_ticks<T: Transport>(engine: &mut LightingEngine<T>, seconds: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    while tokio::time::Instant::now() < deadline {
        let delay = engine.tick_animation();
        tokio::time::sleep(delay).await;
    }
}
