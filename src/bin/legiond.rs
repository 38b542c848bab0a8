use color_eyre::eyre::Result;
use legion_led_controller::*;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Line-protocol daemon: commands on stdin, `OK`/`ERR ...` replies on
/// stdout, with the animation and blink tickers running in between.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("legion_led_controller=warn")),
        )
        .compact()
        .init();
    color_eyre::install()?;

    let doc = SettingsDocument::load(&SettingsDocument::default_path());
    let transport = UsbTransport::open();
    let mut engine = LightingEngine::new(doc, transport, Box::new(SysfsBattery::new()));

    // Push the loaded profile to the hardware before accepting commands
    engine.apply()?;
    engine.finish_initialization();

    // Inform about successful initialization
    println!("OK");

    // Stdin is read on a plain thread; lines reach the ticker loop through
    // a channel so one task keeps sole ownership of the engine
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.trim().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut blink = interval(Duration::from_millis(600));
    blink.tick().await;

    let sleep = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(sleep);

    // Mainloop: one cooperative task drives commands and both tickers
    loop {
        tokio::select! {
            () = &mut sleep => {
                let delay = engine.tick_animation();
                sleep.as_mut().reset(Instant::now() + delay);
            }
            _ = blink.tick() => {
                engine.tick_blink();
            }
            maybe_line = rx.recv() => {
                match maybe_line {
                    Some(line) if line == "quit" => {
                        println!("OK");
                        break;
                    }
                    Some(line) if line.is_empty() => {}
                    Some(line) => handle_command(&mut engine, &line),
                    None => {
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Parses and executes one protocol line
fn handle_command<T: Transport>(engine: &mut LightingEngine<T>, line: &str) {
    let mut cmd = line.trim().split(':');
    let outcome = match cmd.next() {
        Some("set_effect") => match cmd.next().unwrap_or("").parse::<EffectMode>() {
            Ok(effect) => {
                engine.set_effect(effect);
                apply_if_previewing(engine)
            }
            Err(e) => Err(e),
        },
        Some("set_color") => {
            let mut args = cmd.next().unwrap_or("").splitn(2, ',');
            match (parse_zone(args.next()), args.next()) {
                (Ok(zone), Some(color)) => engine
                    .set_zone_color(zone, color)
                    .map_err(|e| e.to_string())
                    .and_then(|()| apply_if_previewing(engine)),
                (Err(e), _) => Err(e),
                (_, None) => Err("no color given".to_string()),
            }
        }
        Some("set_brightness") => match cmd.next().unwrap_or("").to_lowercase().as_str() {
            "off" => {
                engine.set_brightness(Brightness::Off);
                apply_if_previewing(engine)
            }
            "low" => {
                engine.set_brightness(Brightness::Low);
                apply_if_previewing(engine)
            }
            "high" => {
                engine.set_brightness(Brightness::High);
                apply_if_previewing(engine)
            }
            other => Err(format!("unknown brightness: {other}")),
        },
        Some("set_speed") => match cmd.next().unwrap_or("").trim().parse::<u8>() {
            Ok(speed @ 1..=4) => {
                engine.set_speed(speed);
                apply_if_previewing(engine)
            }
            Ok(other) => Err(format!("speed {other} out of range (1-4)")),
            Err(e) => Err(e.to_string()),
        },
        Some("set_wave") => match cmd.next().unwrap_or("").parse::<WaveDirection>() {
            Ok(direction) => {
                engine.set_wave_direction(direction);
                apply_if_previewing(engine)
            }
            Err(e) => Err(e),
        },
        Some("select") => match cmd.next().unwrap_or("") {
            "-" => {
                engine.select_zone(None);
                Ok(())
            }
            zone => parse_zone(Some(zone)).map(|z| engine.select_zone(Some(z))),
        },
        Some("toggle") => parse_zone(cmd.next()).map(|zone| {
            engine.toggle_zone_power(zone);
        }),
        Some("gradient") => engine
            .generate_gradient()
            .map_err(|e| e.to_string())
            .and_then(|()| apply_if_previewing(engine)),
        Some("live_preview") => parse_flag(cmd.next()).map(|on| engine.set_live_preview(on)),
        Some("solo") => parse_flag(cmd.next()).map(|on| engine.set_solo_mode(on)),
        Some("blink_opposite") => parse_flag(cmd.next()).map(|on| engine.set_blink_opposite(on)),
        Some("profile_save") => match cmd.next() {
            Some(name) if !name.trim().is_empty() => {
                engine.save_profile(name.trim()).map_err(|e| e.to_string())
            }
            _ => Err("no profile name given".to_string()),
        },
        Some("profile_load") => match cmd.next() {
            Some(name) => {
                engine.load_profile(name.trim());
                engine.apply().map_err(|e| e.to_string())
            }
            None => Err("no profile name given".to_string()),
        },
        Some("profile_delete") => match cmd.next() {
            Some(name) => engine.delete_profile(name.trim()).map_err(|e| e.to_string()),
            None => Err("no profile name given".to_string()),
        },
        Some("profile_list") => {
            for name in engine.list_profiles() {
                println!("{name}");
            }
            Ok(())
        }
        Some("apply") => engine.apply().map_err(|e| e.to_string()),
        Some(other) => Err(format!("unknown command: {other}")),
        None => Err("no command given".to_string()),
    };

    match outcome {
        Ok(()) => println!("OK"),
        Err(e) => eprintln!("ERR {e}"),
    }
}

/// Applies immediately when live preview is enabled
fn apply_if_previewing<T: Transport>(engine: &mut LightingEngine<T>) -> Result<(), String> {
    if engine.live_preview() {
        engine.apply().map_err(|e| e.to_string())
    } else {
        Ok(())
    }
}

/// Parses a 1-based zone number into a 0-based index
fn parse_zone(arg: Option<&str>) -> Result<usize, String> {
    match arg.unwrap_or("").trim().parse::<usize>() {
        Ok(zone @ 1..=4) => Ok(zone - 1),
        Ok(other) => Err(format!("zone {other} out of range (1-4)")),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_flag(arg: Option<&str>) -> Result<bool, String> {
    match arg.unwrap_or("").trim().to_lowercase().as_str() {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        other => Err(format!("expected on/off, got: {other}")),
    }
}
