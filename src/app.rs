use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::explain::ExplanationClient;
use crate::model::{self, BandIntensity, ANGLE_MAX, ANGLE_MIN, ANGLE_STEP, ANGLE_STEP_COARSE};
use crate::ui;
use crate::Cli;

pub(crate) struct Explanation {
    pub(crate) text: String,
    pub(crate) fetched_at: DateTime<Local>,
}

pub(crate) struct AppState {
    pub(crate) angle: f64,
    pub(crate) mono: bool,
    // Angle-independent; computed once, the chart reads it every frame.
    pub(crate) scattering: [BandIntensity; 3],
    pub(crate) explanation: Option<Explanation>,
    pub(crate) explaining: bool,
    pub(crate) online: bool,
}

enum Msg {
    Explanation {
        angle: f64,
        text: String,
        fetched_at: DateTime<Local>,
    },
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let client = ExplanationClient::from_env();
    let mut state = AppState {
        angle: cli.angle.clamp(ANGLE_MIN, ANGLE_MAX),
        mono: cli.mono,
        scattering: model::scattering_table(),
        explanation: None,
        explaining: false,
        online: client.has_credential(),
    };

    let (tx, mut rx) = mpsc::channel::<Msg>(8);
    let mut terminal = setup_terminal()?;
    let res = run_loop(&mut terminal, &mut state, &client, &tx, &mut rx).await;
    restore_terminal(&mut terminal)?;
    res
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state: &mut AppState,
    client: &ExplanationClient,
    tx: &mpsc::Sender<Msg>,
    rx: &mut mpsc::Receiver<Msg>,
) -> Result<()> {
    let mut dirty = true;

    loop {
        while let Ok(msg) = rx.try_recv() {
            match msg {
                Msg::Explanation {
                    angle,
                    text,
                    fetched_at,
                } => {
                    state.explaining = false;
                    if accept_result(state.angle, angle) {
                        state.explanation = Some(Explanation { text, fetched_at });
                    }
                    // A superseded result is dropped; the slider moved on.
                    dirty = true;
                }
            }
        }

        // One frame per paint opportunity, read from the state at draw time.
        if dirty {
            ui::draw(terminal, state)?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(33))? {
            if handle_event(event::read()?, state, client, tx, &mut dirty)? {
                return Ok(());
            }
            // Drain whatever else queued up before the next paint, so a burst
            // of input coalesces into a single redraw.
            while event::poll(Duration::ZERO)? {
                if handle_event(event::read()?, state, client, tx, &mut dirty)? {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_event(
    ev: Event,
    state: &mut AppState,
    client: &ExplanationClient,
    tx: &mpsc::Sender<Msg>,
    dirty: &mut bool,
) -> Result<bool> {
    match ev {
        Event::Resize(_, _) => *dirty = true,
        Event::Key(k) if k.kind == KeyEventKind::Press => {
            if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }
            match k.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(true),
                KeyCode::Left => set_angle(state, state.angle - ANGLE_STEP, dirty),
                KeyCode::Right => set_angle(state, state.angle + ANGLE_STEP, dirty),
                KeyCode::Down => set_angle(state, state.angle - ANGLE_STEP_COARSE, dirty),
                KeyCode::Up => set_angle(state, state.angle + ANGLE_STEP_COARSE, dirty),
                KeyCode::Home => set_angle(state, ANGLE_MIN, dirty),
                KeyCode::End => set_angle(state, ANGLE_MAX, dirty),
                KeyCode::Char('n') | KeyCode::Char('N') => set_angle(state, 90.0, dirty),
                KeyCode::Char('m') | KeyCode::Char('M') => {
                    state.mono = !state.mono;
                    *dirty = true;
                }
                KeyCode::Char('e') | KeyCode::Char('E') => {
                    request_explanation(state, client, tx);
                    *dirty = true;
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(false)
}

fn set_angle(state: &mut AppState, value: f64, dirty: &mut bool) {
    let clamped = value.clamp(ANGLE_MIN, ANGLE_MAX);
    if clamped != state.angle {
        state.angle = clamped;
        *dirty = true;
    }
}

// One outstanding request at a time; the result message carries the angle
// it was computed for so a stale reply can be told apart on arrival.
fn request_explanation(state: &mut AppState, client: &ExplanationClient, tx: &mpsc::Sender<Msg>) {
    if state.explaining {
        return;
    }
    state.explaining = true;

    let client = client.clone();
    let tx = tx.clone();
    let angle = state.angle;
    let path_length = model::path_length_factor(angle);
    tokio::spawn(async move {
        let text = client.explain(angle, path_length).await;
        tx.send(Msg::Explanation {
            angle,
            text,
            fetched_at: Local::now(),
        })
        .await
        .ok();
    });
}

fn accept_result(current_angle: f64, requested_angle: f64) -> bool {
    (current_angle - requested_angle).abs() < f64::EPSILON
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(term: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut out = io::stdout();
    execute!(out, cursor::Show, EnableLineWrap, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    term.show_cursor()?;
    Ok(())
}
