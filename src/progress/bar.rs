use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::outcome::RunTally;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// When to colorize bar output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ColorSetting {
    #[default]
    Automatic,
    Always,
    Never,
}

/// Renders one run-status line sized to the terminal.
///
/// The line never exceeds `width` display columns and never wraps; when space
/// runs out the track is dropped first and the rest is cut at a character
/// boundary. Advisory counters only appear when asked for.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    width: usize,
    color: bool,
    show_advisories: bool,
}

/// Smallest track worth drawing.
const MIN_TRACK: usize = 4;

impl ProgressBar {
    pub fn new(width: usize, color: bool, show_advisories: bool) -> Self {
        Self {
            width,
            color,
            show_advisories,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Render the status line for `tally`, without trailing newline.
    pub fn render(&self, tally: &RunTally) -> String {
        let pct = (tally.ratio() * 100.0).round() as usize;
        let head = format!("{}/{}", tally.completed, tally.total);
        let tail = format!(" {pct:>3}%");
        let counters = self.counters(tally);

        let mut segments: Vec<(String, Option<&'static str>)> = Vec::new();
        segments.push((head, None));

        let fixed: usize = segments
            .iter()
            .chain(counters.iter())
            .map(|(text, _)| text.width())
            .sum::<usize>()
            + tail.width();
        // head + " [" + track + "]" + tail + counters
        if self.width > fixed + MIN_TRACK + 3 {
            let track_len = self.width - fixed - 3;
            let filled = (tally.ratio() * track_len as f64).round() as usize;
            let filled = filled.min(track_len);
            let mut track = String::with_capacity(track_len + 3);
            track.push_str(" [");
            track.extend(std::iter::repeat_n('=', filled));
            track.extend(std::iter::repeat_n('-', track_len - filled));
            track.push(']');
            segments.push((track, None));
        }
        segments.push((tail, None));
        segments.extend(counters);

        self.compose(segments)
    }

    fn counters(&self, tally: &RunTally) -> Vec<(String, Option<&'static str>)> {
        let mut counters = Vec::new();
        let mut push = |count: usize, label: &str, color: &'static str| {
            if count == 0 {
                return;
            }
            let lead = if counters.is_empty() { "  " } else { ", " };
            counters.push((lead.to_string(), None));
            counters.push((format!("{count} {label}"), Some(color)));
        };
        push(tally.failed, "failed", RED);
        push(tally.errored, "errored", RED);
        if self.show_advisories {
            push(tally.skipped, "skipped", YELLOW);
            push(tally.deprecated, "deprecated", YELLOW);
        }
        counters
    }

    /// Lay segments out left to right within the available width, cutting
    /// the first segment that does not fit and dropping the rest.
    fn compose(&self, segments: Vec<(String, Option<&'static str>)>) -> String {
        let mut line = String::new();
        let mut remaining = self.width;
        for (text, color) in segments {
            if remaining == 0 {
                break;
            }
            let fitted = fit_width(&text, remaining);
            if fitted.is_empty() {
                break;
            }
            remaining -= fitted.width();
            match (self.color, color) {
                (true, Some(color)) => {
                    line.push_str(color);
                    line.push_str(fitted);
                    line.push_str(RESET);
                }
                _ => line.push_str(fitted),
            }
        }
        line
    }
}

/// Longest prefix of `text` that fits in `max` display columns.
fn fit_width(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (at, ch) in text.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > max {
            return &text[..at];
        }
        used += ch_width;
    }
    text
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::outcome::OutcomeKind;

    fn tally(total: usize, outcomes: &[(OutcomeKind, usize)]) -> RunTally {
        let mut tally = RunTally::new(total);
        for &(kind, count) in outcomes {
            for _ in 0..count {
                tally.record(kind);
            }
        }
        tally
    }

    #[test]
    fn renders_counts_track_and_percentage() {
        let bar = ProgressBar::new(40, false, false);
        let line = bar.render(&tally(10, &[(OutcomeKind::Passed, 5)]));
        assert_eq!(line, "5/10 [==============--------------]  50%");
    }

    #[test]
    fn bad_outcomes_show_up_in_the_counter_cluster() {
        let bar = ProgressBar::new(60, false, false);
        let line = bar.render(&tally(
            10,
            &[
                (OutcomeKind::Passed, 4),
                (OutcomeKind::Failed, 1),
                (OutcomeKind::Errored, 1),
            ],
        ));
        assert!(line.contains("6/10"), "{line:?}");
        assert!(line.contains(" 60%"), "{line:?}");
        assert!(line.contains("1 failed, 1 errored"), "{line:?}");
    }

    #[test]
    fn advisories_are_hidden_by_default() {
        let quiet = ProgressBar::new(60, false, false);
        let chatty = ProgressBar::new(60, false, true);
        let tally = tally(10, &[(OutcomeKind::Skipped, 2)]);
        assert!(!quiet.render(&tally).contains("skipped"));
        assert!(chatty.render(&tally).contains("2 skipped"));
    }

    #[test]
    fn line_never_exceeds_the_width() {
        let tally = tally(
            1000,
            &[(OutcomeKind::Passed, 123), (OutcomeKind::Failed, 45)],
        );
        for width in 0..50 {
            let bar = ProgressBar::new(width, false, true);
            let line = bar.render(&tally);
            assert!(
                line.width() <= width,
                "width {width}: {line:?} takes {} columns",
                line.width()
            );
            assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn narrow_widths_drop_the_track_first() {
        let bar = ProgressBar::new(12, false, false);
        let line = bar.render(&tally(10, &[(OutcomeKind::Passed, 5)]));
        assert_eq!(line, "5/10  50%");
    }

    #[test]
    fn full_and_overfull_tallies_fill_the_track() {
        let bar = ProgressBar::new(40, false, false);
        let full = bar.render(&tally(6, &[(OutcomeKind::Passed, 6)]));
        let overfull = bar.render(&tally(6, &[(OutcomeKind::Passed, 7)]));
        assert!(full.contains("] 100%"), "{full:?}");
        assert!(overfull.contains("] 100%"), "{overfull:?}");
        assert!(!overfull.contains('-'), "{overfull:?}");
    }

    #[test]
    fn color_wraps_only_the_counter_values() {
        let bar = ProgressBar::new(60, true, false);
        let line = bar.render(&tally(10, &[(OutcomeKind::Failed, 1)]));
        assert!(line.contains("\x1b[31m1 failed\x1b[0m"), "{line:?}");
        assert!(!line.starts_with('\x1b'), "{line:?}");
    }
}
