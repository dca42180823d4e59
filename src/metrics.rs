/// Standard typing-test convention: five characters count as one word.
const CHARS_PER_WORD: f64 = 5.0;

/// Rounded words-per-minute for a test in progress or just finished.
/// Returns None when no time has elapsed; callers keep the previous value
/// rather than dividing by zero.
pub fn words_per_minute(chars_typed: usize, seconds_elapsed: u32) -> Option<f64> {
    if seconds_elapsed == 0 {
        return None;
    }
    let minutes = seconds_elapsed as f64 / 60.0;
    let words = chars_typed as f64 / CHARS_PER_WORD;
    Some((words / minutes).round())
}

/// Percentage of typed characters that were correct on first commit.
/// `errors` counts erroneous keystroke events, so the denominator is
/// everything the user committed, not just what is on screen.
pub fn accuracy(chars_typed: usize, errors: u32) -> f64 {
    let total_typed = chars_typed as f64 + errors as f64;
    if total_typed > 0.0 {
        (chars_typed as f64 / total_typed * 100.0).round()
    } else {
        100.0
    }
}

/// Renders a duration as "M:SS" with zero-padded seconds. Minutes keep
/// accumulating past 59; there is no hour rollover.
pub fn format_duration(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// One point of the live WPM curve, sampled once per elapsed second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmSample {
    pub seconds: f64,
    pub wpm: f64,
}

impl WpmSample {
    pub fn new(seconds: f64, wpm: f64) -> Self {
        Self { seconds, wpm }
    }
}

impl From<WpmSample> for (f64, f64) {
    fn from(s: WpmSample) -> Self {
        (s.seconds, s.wpm)
    }
}
