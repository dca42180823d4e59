use crossterm::event::KeyCode;
use std::collections::HashSet;
use std::time::SystemTime;

use crate::corpus::TextSource;
use crate::metrics::{self, WpmSample};
use crate::results::{TestMode, TestRecord};

/// Lifecycle state of a typing test. Governs which transitions are legal;
/// illegal calls are ignored rather than corrupting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub mode: TestMode,
    /// Seconds for Time tests; typed-character threshold for Words tests.
    pub target: u32,
    pub user_id: Option<i64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: TestMode::Time,
            target: 30,
            user_id: None,
        }
    }
}

/// Live metrics frozen at the moment a test completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub wpm: f64,
    pub accuracy: f64,
    pub seconds_elapsed: u32,
    pub errors: u32,
}

/// A single test attempt: the reference text, everything the user has typed
/// against it, and the metrics derived from both.
///
/// All mutation goes through `start`/`tick`/`input`/`reset` so the machine
/// can be driven and asserted on without a terminal.
#[derive(Debug)]
pub struct Session {
    pub settings: SessionSettings,
    pub phase: Phase,
    /// The reference text the user is asked to reproduce.
    pub prompt: String,
    prompt_chars: Vec<char>,
    /// User input so far; grows one char per keystroke, shrinks on backspace.
    pub typed: String,
    current_index: usize,
    /// Indices where the committed character differed from the prompt.
    /// Sticky: backspacing and retyping correctly does not un-flag them.
    pub error_positions: HashSet<usize>,
    /// Erroneous keystroke events. Retyping the same position wrongly again
    /// bumps this even though the position is already flagged, so this is
    /// not the size of `error_positions`.
    pub errors: u32,
    pub seconds_elapsed: u32,
    pub started_at: Option<SystemTime>,
    pub wpm: f64,
    pub accuracy: f64,
    pub wpm_series: Vec<WpmSample>,
    pub final_snapshot: Option<Snapshot>,
}

impl Session {
    pub fn new(settings: SessionSettings, source: &dyn TextSource) -> Self {
        let prompt = draw_prompt(&settings, source);
        let prompt_chars = prompt.chars().collect();
        Self {
            settings,
            phase: Phase::Idle,
            prompt,
            prompt_chars,
            typed: String::new(),
            current_index: 0,
            error_positions: HashSet::new(),
            errors: 0,
            seconds_elapsed: 0,
            started_at: None,
            wpm: 0.0,
            accuracy: 100.0,
            wpm_series: Vec::new(),
            final_snapshot: None,
        }
    }

    /// Number of characters typed so far.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Prompt length in characters.
    pub fn prompt_len(&self) -> usize {
        self.prompt_chars.len()
    }

    pub fn expected_char(&self, idx: usize) -> Option<char> {
        self.prompt_chars.get(idx).copied()
    }

    /// Seconds left in a time-limited test; None for word-limited tests.
    pub fn seconds_remaining(&self) -> Option<u32> {
        match self.settings.mode {
            TestMode::Time => Some(self.settings.target.saturating_sub(self.seconds_elapsed)),
            TestMode::Words => None,
        }
    }

    /// Begin the test. Legal from Idle, and tolerated from Completed so a
    /// retry on the same text needs no explicit reset; a no-op while Active.
    pub fn start(&mut self) {
        if self.phase == Phase::Active {
            return;
        }
        self.phase = Phase::Active;
        self.started_at = Some(SystemTime::now());
        self.seconds_elapsed = 0;
        self.errors = 0;
        self.typed.clear();
        self.current_index = 0;
        self.error_positions.clear();
        self.wpm = 0.0;
        self.accuracy = 100.0;
        self.wpm_series.clear();
        self.final_snapshot = None;
    }

    /// One-second timer tick. Ignored unless Active, so a stale timer can
    /// never advance an idle or finished session. Returns the finalized
    /// record when this tick ends a time-limited test.
    pub fn tick(&mut self) -> Option<TestRecord> {
        if self.phase != Phase::Active {
            return None;
        }
        self.seconds_elapsed += 1;
        self.recompute();
        self.wpm_series
            .push(WpmSample::new(self.seconds_elapsed as f64, self.wpm));

        if self.settings.mode == TestMode::Time && self.seconds_elapsed >= self.settings.target {
            return Some(self.complete());
        }
        None
    }

    /// Apply the full text of the input field after a keystroke. Only the
    /// suffix beyond the previous length is diffed against the prompt;
    /// shrinking input (backspace) moves the index back without un-flagging
    /// recorded errors. Returns the finalized record when this keystroke
    /// ends the test.
    pub fn input(&mut self, new_text: &str) -> Option<TestRecord> {
        if self.phase != Phase::Active {
            return None;
        }

        let new_chars: Vec<char> = new_text.chars().collect();
        if new_chars.len() > self.current_index {
            for pos in self.current_index..new_chars.len() {
                if let Some(&expected) = self.prompt_chars.get(pos) {
                    if new_chars[pos] != expected {
                        self.error_positions.insert(pos);
                        self.errors += 1;
                    }
                }
            }
        }

        self.typed = new_text.to_owned();
        self.current_index = new_chars.len();
        self.recompute();

        // Word-mode targets are a typed-character threshold, not a count of
        // whitespace-delimited words.
        let reached_target = self.settings.mode == TestMode::Words
            && self.current_index as u32 >= self.settings.target;
        if reached_target || self.current_index >= self.prompt_chars.len() {
            return Some(self.complete());
        }
        None
    }

    /// Back to Idle with a fresh reference text. Legal from any phase.
    pub fn reset(&mut self, source: &dyn TextSource) {
        self.phase = Phase::Idle;
        self.started_at = None;
        self.seconds_elapsed = 0;
        self.errors = 0;
        self.typed.clear();
        self.current_index = 0;
        self.error_positions.clear();
        self.wpm = 0.0;
        self.accuracy = 100.0;
        self.wpm_series.clear();
        self.final_snapshot = None;
        self.prompt = draw_prompt(&self.settings, source);
        self.prompt_chars = self.prompt.chars().collect();
    }

    fn recompute(&mut self) {
        if let Some(wpm) = metrics::words_per_minute(self.current_index, self.seconds_elapsed) {
            self.wpm = wpm;
            self.accuracy = metrics::accuracy(self.current_index, self.errors);
        }
    }

    fn complete(&mut self) -> TestRecord {
        self.phase = Phase::Completed;
        self.final_snapshot = Some(Snapshot {
            wpm: self.wpm,
            accuracy: self.accuracy,
            seconds_elapsed: self.seconds_elapsed,
            errors: self.errors,
        });
        TestRecord {
            user_id: self.settings.user_id,
            wpm: self.wpm as i64,
            accuracy: self.accuracy,
            duration: self.seconds_elapsed as i64,
            errors: self.errors as i64,
            characters_typed: self.current_index as i64,
            test_mode: self.settings.mode,
            text_used: self.prompt.clone(),
        }
    }
}

/// Words mode draws a passage long enough to satisfy the threshold; Time
/// mode draws from the whole corpus.
fn draw_prompt(settings: &SessionSettings, source: &dyn TextSource) -> String {
    match settings.mode {
        TestMode::Words => source.pick_at_least(settings.target as usize),
        TestMode::Time => source.pick_random(),
    }
}

/// Control keys that must not fall through to surrounding handlers while a
/// test is running. Escape is swallowed here and wired one level up to
/// reset the session.
pub fn suppresses_key(phase: Phase, code: KeyCode) -> bool {
    phase == Phase::Active && matches!(code, KeyCode::Tab | KeyCode::Enter | KeyCode::Esc)
}
