use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use oddball_experiment::sink::{log_file_path, summary_path};
use oddball_experiment::{
    Audio, ChannelInput, CsvSink, Devices, Display, Key, Session, SessionSummary, SubjectInfo,
    TaskConfig,
};
use oddball_render::{load_font, FontVec};
use oddball_timing::HighPrecisionTimer;
use tracing::{info, warn};
use winit::event_loop::EventLoop;

use crate::app::{App, DisplayCommand, WindowDisplay};
use crate::audio::{MutedAudio, RodioTone};
use crate::cli::Cli;
use crate::{headless, scanner};

/// Fonts tried when `--font` is not given.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// What the session thread needs; everything here is `Send`.
struct Plan {
    config: TaskConfig,
    subject: SubjectInfo,
    log_path: PathBuf,
    tone: Option<PathBuf>,
    mute: bool,
}

pub fn run(cli: &Cli) -> Result<SessionSummary> {
    let config = cli.task_config()?;
    let subject = cli.subject()?;
    report(&config);

    let plan = Plan {
        log_path: log_file_path(&cli.data_dir, &subject.id, &Local::now()),
        config,
        subject,
        tone: cli.tone.clone(),
        mute: cli.mute,
    };
    let tr = Duration::try_from_secs_f64(plan.config.tr_secs)?;
    let (tx, input) = ChannelInput::channel();
    if cli.simulate_scanner {
        scanner::spawn(tx.clone(), tr)?;
        info!(tr_secs = tr.as_secs_f64(), "simulating scanner pulses");
    }

    if cli.headless {
        headless::spawn_stdin(tx)?;
        run_session(plan, headless::LogDisplay::default(), input)
    } else {
        let font = resolve_font(cli.font.as_deref())?;
        run_windowed(cli, plan, font, tx, input)
    }
}

/// Startup report: task length and the pulses the scanner must deliver.
fn report(config: &TaskConfig) {
    let secs = config.task_duration_secs();
    info!(
        trials = config.n_trials,
        task_secs = secs,
        task_min = secs / 60.0,
        pulses = config.total_pulses() + 1,
        "task plan"
    );
}

fn resolve_font(path: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = path {
        return load_font(path).map(Some);
    }
    let found = FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .filter(|p| p.exists())
        .find_map(|p| load_font(p).ok());
    if found.is_none() {
        warn!("no font found; text screens will show the background only");
    }
    Ok(found)
}

fn open_audio(plan: &Plan) -> Result<Box<dyn Audio>> {
    if plan.mute {
        return Ok(Box::new(MutedAudio::default()));
    }
    let tone = RodioTone::open(plan.tone.as_deref()).context("opening audio output")?;
    Ok(Box::new(tone))
}

fn run_session(
    plan: Plan,
    display: impl Display + 'static,
    input: ChannelInput,
) -> Result<SessionSummary> {
    let audio = open_audio(&plan)?;
    let sink = CsvSink::create(&plan.log_path)?;
    let devices = Devices {
        display: Box::new(display),
        audio,
        input: Box::new(input),
    };
    let session = Session::new(
        plan.config,
        plan.subject,
        devices,
        sink,
        HighPrecisionTimer::new(),
    )?;
    let summary = session.run()?;
    summary.log();
    summary.write_json(&summary_path(&plan.log_path))?;
    Ok(summary)
}

/// The window lives on the main thread; the session runs beside it and posts frames.
fn run_windowed(
    cli: &Cli,
    plan: Plan,
    font: Option<FontVec>,
    tx: Sender<Key>,
    input: ChannelInput,
) -> Result<SessionSummary> {
    let event_loop = EventLoop::<DisplayCommand>::with_user_event().build()?;
    let proxy = event_loop.create_proxy();

    let worker = thread::Builder::new()
        .name("session".into())
        .spawn(move || {
            let result = run_session(plan, WindowDisplay::new(proxy.clone()), input);
            let _ = proxy.send_event(DisplayCommand::Close);
            result
        })?;

    let mut app = App::new(cli.placement(), font, tx.clone());
    let loop_result = event_loop.run_app(&mut app);
    // A session still blocked on input sees the quit and closes its log.
    let _ = tx.send(Key::Quit);
    let window_error = app.take_error();
    drop(app);

    let result = worker
        .join()
        .map_err(|_| anyhow!("session thread panicked"))?;
    loop_result?;
    match (result, window_error) {
        (Err(_), Some(err)) => Err(err),
        (result, _) => result,
    }
}
