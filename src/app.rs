use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use instant::Instant;

use crate::assets::DirAssets;
use crate::config::SettingsPatch;
use crate::controller::{HostEvent, PetController};
use crate::landmark::LandmarkKind;
use crate::stage::Stage;
use crate::store::{JsonFileStore, SettingsStore};
use crate::timer::Millis;

/// Real-time loop period.
const TICK_MS: u64 = 16;
/// How often settings are re-read for external edits.
const SETTINGS_POLL_MS: Millis = 1000;
/// How often to log a status line (seconds).
const STATUS_LOG_INTERVAL: f64 = 5.0;
/// Viewport used when `CATNAP_VIEWPORT` is unset or unparsable.
const DEFAULT_VIEWPORT: (f64, f64) = (1280.0, 720.0);
/// Directory holding `assets/cats` and `assets/materials`.
const DEFAULT_ASSET_ROOT: &str = ".";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One line of stdin, parsed.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Host(HostEvent),
    Skin(String),
    Disable,
    Enable,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let mut number = || words.next().and_then(|w| w.parse::<f64>().ok());
    let command = match verb {
        "click" => Command::Host(HostEvent::Click),
        "resize" => Command::Host(HostEvent::Resize {
            width: number()?,
            height: number()?,
        }),
        "bed" => Command::Host(HostEvent::MoveLandmark {
            kind: LandmarkKind::Bed,
            left: number()?,
        }),
        "toy" => Command::Host(HostEvent::MoveLandmark {
            kind: LandmarkKind::Toy,
            left: number()?,
        }),
        "skin" => Command::Skin(line.split_whitespace().nth(1)?.to_string()),
        "disable" => Command::Disable,
        "enable" => Command::Enable,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// `WIDTHxHEIGHT`, both positive.
fn parse_viewport(text: &str) -> Option<(f64, f64)> {
    let (w, h) = text.trim().split_once(['x', 'X'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

fn spawn_stdin_reader(tx: mpsc::Sender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => log::warn!("Unknown command: {line:?}"),
            }
        }
        log::debug!("stdin closed");
    });
}

// ---------------------------------------------------------------------------
// Status log
// ---------------------------------------------------------------------------

struct StatusLog {
    last_log_time: Instant,
    ticks_since_log: u32,
}

impl StatusLog {
    fn new() -> Self {
        Self {
            last_log_time: Instant::now(),
            ticks_since_log: 0,
        }
    }

    fn record_tick(&mut self, controller: &PetController) {
        self.ticks_since_log += 1;
        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= STATUS_LOG_INTERVAL {
            log::debug!(
                "ticks/s: {:.0} | timers due next at {:?}",
                self.ticks_since_log as f64 / elapsed,
                controller.next_due(),
            );
            log_status(controller);
            self.last_log_time = Instant::now();
            self.ticks_since_log = 0;
        }
    }
}

fn log_status(controller: &PetController) {
    match controller.status() {
        Some(status) => log::info!(
            "agent #{} | case {:.2} ({:.0}px) | {}/{} frame {} | {:?} {:?} | on bed: {} | moving: {} | next cycle armed: {}",
            status.generation,
            status.case,
            status.left,
            status.skin,
            status.scenario,
            status.frame,
            status.activity,
            status.mood,
            status.on_bed,
            status.moving,
            status.scheduler_armed,
        ),
        None if controller.is_disabled() => log::info!("disabled"),
        None => log::info!("no agent on stage"),
    }
    for view in controller.stage().snapshot() {
        log::debug!(
            "  {:?} at {:.0}px | {} (shift {}px) | alpha {} over {}ms | scale {}{}",
            view.kind,
            view.left,
            view.sprite.as_ref().map_or("-", |s| s.url.as_str()),
            view.sprite.as_ref().map_or(0.0, |s| s.offset_x),
            view.opacity.alpha,
            view.opacity.fade_ms,
            view.transform.scale,
            if view.transform.flipped { " flipped" } else { "" },
        );
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    controller: PetController,
    commands: mpsc::Receiver<Command>,
    started: Instant,
    next_settings_poll: Millis,
    status_log: StatusLog,
}

impl App {
    fn new(controller: PetController, commands: mpsc::Receiver<Command>) -> Self {
        Self {
            controller,
            commands,
            started: Instant::now(),
            next_settings_poll: SETTINGS_POLL_MS,
            status_log: StatusLog::new(),
        }
    }

    fn elapsed_ms(&self) -> Millis {
        self.started.elapsed().as_millis() as Millis
    }

    /// Returns `false` once the user asked to quit.
    fn drain_commands(&mut self) -> bool {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Host(event) => self.controller.handle(event),
                Command::Skin(skin) => self.controller.apply_settings(&SettingsPatch {
                    skin: Some(skin),
                    ..SettingsPatch::default()
                }),
                Command::Disable => self.controller.apply_settings(&SettingsPatch {
                    disabled: Some(true),
                    ..SettingsPatch::default()
                }),
                Command::Enable => self.controller.apply_settings(&SettingsPatch {
                    disabled: Some(false),
                    ..SettingsPatch::default()
                }),
                Command::Status => log_status(&self.controller),
                Command::Quit => return false,
            }
        }
        true
    }

    fn tick(&mut self) {
        let now = self.elapsed_ms();
        self.controller.advance(now);
        if now >= self.next_settings_poll {
            self.controller.sync_settings();
            self.next_settings_poll = now + SETTINGS_POLL_MS;
        }
        self.status_log.record_tick(&self.controller);
    }
}

fn greet_first_run(store: &mut JsonFileStore) {
    match store.load() {
        Ok(settings) if settings.first_run => {
            log::info!(
                "Welcome! Your cat lives at {}. Type `click`, `skin <name>` or `quit`.",
                store.path().display()
            );
            let patch = SettingsPatch {
                first_run: Some(false),
                ..SettingsPatch::default()
            };
            if let Err(e) = store.save(&patch) {
                log::warn!("Failed to record first run: {e}");
            }
            // The greeting is not a change the controller cares about.
            store.take_changes();
        }
        Ok(_) => {}
        Err(e) => log::warn!("Skipping first-run check: {e}"),
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let asset_root =
        std::env::var("CATNAP_ASSETS").unwrap_or_else(|_| DEFAULT_ASSET_ROOT.to_string());
    let (width, height) = std::env::var("CATNAP_VIEWPORT")
        .ok()
        .and_then(|v| parse_viewport(&v))
        .unwrap_or(DEFAULT_VIEWPORT);

    let mut store = JsonFileStore::open_default()?;
    log::info!("Settings: {}", store.path().display());
    greet_first_run(&mut store);

    let mut controller = PetController::new(
        Stage::new(width, height),
        Box::new(store),
        Box::new(DirAssets::new(asset_root)),
        Box::new(fastrand::Rng::new()),
    );
    controller.start();
    log::info!("Viewport {width}x{height}");

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx);

    let mut app = App::new(controller, rx);
    while app.drain_commands() {
        app.tick();
        thread::sleep(Duration::from_millis(TICK_MS));
    }

    app.controller.dispose();
    log::info!("Bye");
    Ok(())
}
