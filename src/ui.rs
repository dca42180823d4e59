use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
        Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::metrics::{format_duration, WpmSample};
use crate::results::{StoredResult, TestMode};
use crate::session::{Phase, Session};
use crate::submit::SubmitOutcome;
use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Typing => render_typing(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            AppState::History => render_history(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;

    if session.phase == Phase::Idle {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(area.height / 3),
                Constraint::Length(2),
                Constraint::Min(1),
            ])
            .split(area);

        let banner = Paragraph::new(Span::styled(
            "press any key to start - esc quits",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        banner.render(chunks[1], buf);

        let preview = Paragraph::new(Span::styled(session.prompt.clone(), dim_bold()))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        preview.render(chunks[2], buf);
        return;
    }

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let mut prompt_occupied_lines =
        ((session.prompt.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;
    if session.prompt.width() <= max_chars_per_line as usize {
        prompt_occupied_lines = 1;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(
                ((area.height as f64 - prompt_occupied_lines as f64) / 2.0) as u16,
            ),
            Constraint::Length(2),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(2),
        ])
        .split(area);

    let clock = match session.seconds_remaining() {
        Some(remaining) => format_duration(remaining),
        None => format_duration(session.seconds_elapsed),
    };
    let timer = Paragraph::new(Span::styled(clock, dim_bold())).alignment(Alignment::Center);
    timer.render(chunks[1], buf);

    let widget = Paragraph::new(Line::from(prompt_spans(session)))
        .alignment(if prompt_occupied_lines == 1 {
            // when the prompt fits on one line, centering reads better
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    widget.render(chunks[2], buf);

    if session.seconds_elapsed > 0 {
        let live = Paragraph::new(Span::styled(
            format!("{} wpm   {}% acc", session.wpm, session.accuracy),
            bold(),
        ))
        .alignment(Alignment::Center);
        live.render(chunks[3], buf);
    }
}

/// One span per prompt character: green where the committed input matches,
/// red where it does not ('·' stands in for a flagged space), an underlined
/// cursor, and the dimmed remainder.
fn prompt_spans(session: &Session) -> Vec<Span<'static>> {
    let green_bold = bold().fg(Color::Green);
    let red_bold = bold().fg(Color::Red);
    let underlined_dim_bold = dim_bold().add_modifier(Modifier::UNDERLINED);

    let typed: Vec<char> = session.typed.chars().collect();
    let cursor = session.current_index();

    session
        .prompt
        .chars()
        .enumerate()
        .map(|(idx, expected)| {
            if idx < cursor {
                match typed.get(idx) {
                    Some(&c) if c == expected => Span::styled(expected.to_string(), green_bold),
                    Some(&c) => Span::styled(
                        match c {
                            ' ' => "·".to_owned(),
                            other => other.to_string(),
                        },
                        red_bold,
                    ),
                    None => Span::styled(expected.to_string(), dim_bold()),
                }
            } else if idx == cursor {
                Span::styled(expected.to_string(), underlined_dim_bold)
            } else {
                Span::styled(expected.to_string(), dim_bold())
            }
        })
        .collect()
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let magenta = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // wpm chart
            Constraint::Length(1), // final stats
            Constraint::Length(1), // save status
            Constraint::Length(1), // aggregate summary
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let (overall_duration, highest_wpm) = compute_chart_params(&session.wpm_series);
    let points: Vec<(f64, f64)> = session.wpm_series.iter().map(|&s| s.into()).collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta)
        .graph_type(GraphType::Line)
        .data(&points)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(format_label(highest_wpm), bold()),
                ]),
        );
    chart.render(chunks[0], buf);

    let (wpm, accuracy, elapsed, errors) = match session.final_snapshot {
        Some(s) => (s.wpm, s.accuracy, s.seconds_elapsed, s.errors),
        None => (
            session.wpm,
            session.accuracy,
            session.seconds_elapsed,
            session.errors,
        ),
    };
    let stats = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {}   {} errors",
            wpm,
            accuracy,
            format_duration(elapsed),
            errors
        ),
        bold(),
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let status = match &app.last_submit {
        None => Span::styled(
            "saving result...",
            dim_bold().add_modifier(Modifier::ITALIC),
        ),
        Some(SubmitOutcome::Saved(stored)) => Span::styled(
            format!("result #{} saved", stored.id),
            Style::default().fg(Color::Green),
        ),
        Some(SubmitOutcome::Failed(msg)) => Span::styled(
            format!("failed to save result: {msg}"),
            Style::default().fg(Color::Red),
        ),
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    if let Some(summary) = &app.summary {
        let line = format!(
            "{} tests   best {} wpm   avg {} wpm   {} typed",
            summary.total_tests,
            summary.best_wpm,
            summary.average_wpm,
            format_duration(summary.total_time.max(0) as u32),
        );
        Paragraph::new(Span::styled(
            line,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    let legend = Paragraph::new(Span::styled(
        "(r)etry  (n)ew text  (h)istory  (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    legend.render(chunks[5], buf);
}

fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // results table
            Constraint::Length(2), // instructions
        ])
        .split(area);

    let title = Paragraph::new("Recent Results")
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    title.render(chunks[0], buf);

    let header = Row::new(
        ["when", "mode", "wpm", "acc", "time", "errors"]
            .into_iter()
            .map(|h| Cell::from(Span::styled(h, bold()))),
    );

    let visible_rows = chunks[1].height.saturating_sub(2) as usize;
    let rows: Vec<Row> = app
        .history
        .iter()
        .sorted_by_key(|r| std::cmp::Reverse(r.id))
        .take(visible_rows)
        .map(history_row)
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL));
    table.render(chunks[1], buf);

    let instructions = Paragraph::new(Span::styled(
        "(b)ack  (r)etry  (n)ew text  (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    instructions.render(chunks[2], buf);
}

fn history_row(result: &StoredResult) -> Row<'static> {
    let record = &result.record;
    Row::new(vec![
        Cell::from(result.completed_at.format("%b %d %H:%M").to_string()),
        Cell::from(match record.test_mode {
            TestMode::Time => "time",
            TestMode::Words => "words",
        }),
        Cell::from(record.wpm.to_string()),
        Cell::from(format!("{}%", record.accuracy)),
        Cell::from(format_duration(record.duration.max(0) as u32)),
        Cell::from(record.errors.to_string()),
    ])
}

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(samples: &[WpmSample]) -> (f64, f64) {
    let mut highest_wpm = 0.0;
    for s in samples {
        if s.wpm > highest_wpm {
            highest_wpm = s.wpm;
        }
    }

    let mut overall_duration = match samples.last() {
        Some(s) => s.seconds,
        None => 1.0,
    };
    if overall_duration < 1.0 {
        overall_duration = 1.0;
    }

    (overall_duration, highest_wpm.round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[]);
        assert_eq!(x, 1.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_compute_chart_params_tracks_peak_and_duration() {
        let samples = vec![
            WpmSample::new(1.0, 20.0),
            WpmSample::new(2.0, 44.0),
            WpmSample::new(3.0, 37.0),
        ];
        let (x, y) = compute_chart_params(&samples);
        assert_eq!(x, 3.0);
        assert_eq!(y, 44.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
