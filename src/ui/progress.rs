//! Campaign progress UI.
//!
//! A `CampaignProgressUI` is one presentation surface. It receives readings
//! from its own progress loop and renders them in one of three modes:
//! - `full`: header, phase-colored bar and phase row, drawn with `indicatif`
//! - `minimal`: one line whenever the whole percent or the phase changes
//! - `json`: one JSON object per event on stdout

use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::phase::PhaseTable;
use crate::progress::{ActiveSession, ProgressObserver, ProgressReading};
use crate::ui::icons::{CHECK, RESUME, STOP};

/// Output mode for progress surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Rich terminal UI with progress bars
    #[default]
    Full,
    /// Single-line status updates
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    /// Parse UI mode from string (convenience method).
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Events written in JSON mode.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum UiEvent<'a> {
    Reading {
        surface: usize,
        #[serde(flatten)]
        reading: &'a ProgressReading,
    },
    Resumed {
        surface: usize,
        #[serde(flatten)]
        reading: &'a ProgressReading,
    },
    Completed {
        surface: usize,
        campaign_id: &'a str,
        campaign_name: &'a str,
        total_items: u32,
        generation: u64,
        completed_at: String,
    },
    Idle {
        surface: usize,
    },
}

/// "1 lead" / "N leads".
pub fn lead_badge(count: u32) -> String {
    if count == 1 {
        "1 lead".to_string()
    } else {
        format!("{} leads", count)
    }
}

/// Percent as shown to users.
pub fn display_percent(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

/// Phase names separated by arrows. Phases up to and including `current` are
/// drawn in their own color, later ones are dimmed.
pub fn phase_row(phases: &PhaseTable, current: usize) -> String {
    phases
        .phases()
        .iter()
        .enumerate()
        .map(|(index, phase)| {
            if index <= current {
                style(format!("● {}", phase.name))
                    .color256(phase.color.to_ansi256())
                    .bold()
                    .to_string()
            } else {
                style(format!("○ {}", phase.name)).dim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&format!(" {} ", style("→").dim()))
}

fn bar_style(color: u8) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "  [{{bar:40.{}/238}}] {{pos:>3}}% {{msg}}",
            color
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn text_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Last (rounded percent, phase, complete) rendered by the line-oriented modes.
type LastLine = Option<(u64, usize, bool)>;

/// Terminal surface for one progress loop.
///
/// # Thread Safety
///
/// Callbacks arrive from the loop's task one at a time; the mutexes guard
/// short sections that never panic.
pub struct CampaignProgressUI {
    mode: UiMode,
    surface: usize,
    phases: Arc<PhaseTable>,
    multi: MultiProgress,
    header_bar: ProgressBar,
    bar: ProgressBar,
    phase_bar: ProgressBar,
    /// Phase whose color the bar currently uses
    bar_phase: Mutex<Option<usize>>,
    last_line: Mutex<LastLine>,
    finished: AtomicBool,
    /// The last reading reached 100%
    reached_end: AtomicBool,
    term: Term,
}

impl CampaignProgressUI {
    /// Create a surface with its own multiplex renderer.
    pub fn new(mode: UiMode, phases: Arc<PhaseTable>) -> Self {
        Self::with_multi(mode, phases, MultiProgress::new(), 1)
    }

    /// Create a surface that shares `multi` with other surfaces. `surface`
    /// labels its output when several are mounted.
    pub fn with_multi(
        mode: UiMode,
        phases: Arc<PhaseTable>,
        multi: MultiProgress,
        surface: usize,
    ) -> Self {
        let (header_bar, bar, phase_bar) = if mode == UiMode::Full {
            let header_bar = multi.add(ProgressBar::new(0));
            header_bar.set_style(text_style());
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(bar_style(phases.get(0).color.to_ansi256()));
            let phase_bar = multi.add(ProgressBar::new(0));
            phase_bar.set_style(text_style());
            (header_bar, bar, phase_bar)
        } else {
            (
                ProgressBar::hidden(),
                ProgressBar::hidden(),
                ProgressBar::hidden(),
            )
        };

        Self {
            mode,
            surface,
            phases,
            multi,
            header_bar,
            bar,
            phase_bar,
            bar_phase: Mutex::new(None),
            last_line: Mutex::new(None),
            finished: AtomicBool::new(false),
            reached_end: AtomicBool::new(false),
            term: Term::stdout(),
        }
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Header text for a reading, e.g. "Processing Campaign: Spring (3 leads)".
    pub fn header(&self, reading: &ProgressReading) -> String {
        let label = if self.surface > 1 {
            format!("[{}] ", self.surface)
        } else {
            String::new()
        };
        format!(
            "{}Processing Campaign: {} ({})",
            label,
            reading.campaign_name,
            lead_badge(reading.total_items)
        )
    }

    /// Status line used by minimal mode.
    pub fn status_line(&self, reading: &ProgressReading) -> String {
        format!(
            "{} | {}% | {} | {}s remaining",
            self.header(reading),
            display_percent(reading.percent),
            reading.phase_name,
            reading.seconds_remaining
        )
    }

    /// Whether `reading` changes what the line-oriented modes last showed.
    fn is_new_line(&self, reading: &ProgressReading) -> bool {
        let key = (
            display_percent(reading.percent),
            reading.phase_index,
            reading.is_complete(),
        );
        let mut last = self.last_line.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(key) {
            return false;
        }
        *last = Some(key);
        true
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn emit(&self, event: &UiEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(&self.term, "{}", json);
        }
    }

    fn render_full(&self, reading: &ProgressReading) {
        if self.finished.swap(false, Ordering::SeqCst) {
            self.header_bar.reset();
            self.bar.reset();
            self.phase_bar.reset();
        }

        {
            let mut bar_phase = self.bar_phase.lock().unwrap_or_else(|e| e.into_inner());
            if *bar_phase != Some(reading.phase_index) {
                let color = self.phases.get(reading.phase_index).color.to_ansi256();
                self.bar.set_style(bar_style(color));
                *bar_phase = Some(reading.phase_index);
            }
        }

        self.header_bar
            .set_message(style(self.header(reading)).bold().to_string());
        self.bar.set_position(display_percent(reading.percent));
        self.bar.set_message(format!(
            "{}",
            style(format!("{}s remaining", reading.seconds_remaining)).dim()
        ));
        self.phase_bar.set_message(format!(
            "  {}",
            phase_row(&self.phases, reading.phase_index)
        ));
    }

    fn finish_bars(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.header_bar.finish();
        self.bar.finish();
        self.phase_bar.finish();
    }

    fn finish_full(&self, message: String) {
        self.finish_bars();
        self.print_line(message);
    }
}

impl ProgressObserver for CampaignProgressUI {
    fn on_reading(&self, reading: &ProgressReading) {
        self.reached_end.store(reading.is_complete(), Ordering::SeqCst);
        match self.mode {
            UiMode::Full => self.render_full(reading),
            UiMode::Minimal => {
                if self.is_new_line(reading) {
                    let _ = writeln!(&self.term, "{}", self.status_line(reading));
                }
            }
            UiMode::Json => {
                if self.is_new_line(reading) {
                    self.emit(&UiEvent::Reading {
                        surface: self.surface,
                        reading,
                    });
                }
            }
        }
    }

    fn on_complete(&self, session: &ActiveSession, reading: &ProgressReading) {
        match self.mode {
            UiMode::Full => self.finish_full(format!(
                "{}Campaign {} processed: {}",
                CHECK,
                style(&session.campaign_name).green().bold(),
                lead_badge(session.total_items)
            )),
            UiMode::Minimal => {
                let _ = writeln!(
                    &self.term,
                    "{}Campaign {} processed: {}",
                    CHECK,
                    session.campaign_name,
                    lead_badge(session.total_items)
                );
            }
            UiMode::Json => self.emit(&UiEvent::Completed {
                surface: self.surface,
                campaign_id: &session.campaign_id,
                campaign_name: &session.campaign_name,
                total_items: session.total_items,
                generation: session.generation,
                completed_at: reading.at.to_rfc3339(),
            }),
        }
    }

    fn on_resume(&self, reading: &ProgressReading) {
        match self.mode {
            UiMode::Full => self.print_line(format!(
                "{}{}",
                RESUME,
                style(format!(
                    "Resuming {} at {}%",
                    reading.campaign_name,
                    display_percent(reading.percent)
                ))
                .dim()
            )),
            UiMode::Minimal => {
                let _ = writeln!(
                    &self.term,
                    "{}Resuming {} at {}%",
                    RESUME,
                    reading.campaign_name,
                    display_percent(reading.percent)
                );
            }
            UiMode::Json => self.emit(&UiEvent::Resumed {
                surface: self.surface,
                reading,
            }),
        }
    }

    /// Surfaces that saw 100% stay quiet here; the completion was already shown.
    fn on_idle(&self) {
        *self.last_line.lock().unwrap_or_else(|e| e.into_inner()) = None;
        let interrupted = !self.reached_end.swap(false, Ordering::SeqCst);
        match self.mode {
            UiMode::Full => {
                if interrupted {
                    self.finish_full(format!("{}{}", STOP, style("Tracking stopped").yellow()));
                } else if !self.finished.load(Ordering::SeqCst) {
                    self.finish_bars();
                }
            }
            UiMode::Minimal => {
                if interrupted {
                    let _ = writeln!(&self.term, "{}Tracking stopped", STOP);
                }
            }
            UiMode::Json => self.emit(&UiEvent::Idle {
                surface: self.surface,
            }),
        }
    }
}
