//! Fixed-width textual progress bar.

use std::io::Write;

use super::ProgressMonitor;

const WIDTH: usize = 50;
const MARK: char = '.';

/// A 50-column bar redrawn in place with `\r`.
///
/// The bar is only redrawn when the number of filled positions grows, so a
/// large table count does not flood the terminal. It never reports
/// cancellation; wrap it in [`super::Cancellable`] for that.
#[derive(Debug)]
pub struct TextProgressBar<W: Write> {
    out: W,
    current: u64,
    max: u64,
    filled: usize,
    drawn: bool,
}

impl TextProgressBar<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl TextProgressBar<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write> TextProgressBar<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: 0,
            max: 0,
            filled: 0,
            drawn: false,
        }
    }

    /// Filled positions in the last drawn bar.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn dots(&self) -> usize {
        if self.max == 0 {
            return 0;
        }
        let dots = (WIDTH as f64 * self.current as f64 / self.max as f64).round() as usize;
        dots.min(WIDTH)
    }

    fn draw(&mut self) {
        let bar: String = std::iter::repeat(MARK)
            .take(self.filled)
            .chain(std::iter::repeat(' ').take(WIDTH - self.filled))
            .collect();
        // best effort: a closed terminal must not fail the transfer
        let _ = write!(self.out, "\r[{bar}]");
        let _ = self.out.flush();
        self.drawn = true;
    }
}

impl<W: Write + Send> ProgressMonitor for TextProgressBar<W> {
    fn begin_task(&mut self, _name: &str, total: u64) {
        self.max = total;
        self.current = 0;
        self.filled = 0;
        self.draw();
    }

    fn worked(&mut self, units: u64) {
        self.current = self.current.saturating_add(units);
        let dots = self.dots();
        if dots > self.filled {
            self.filled = dots;
            self.draw();
        }
    }

    fn set_task_name(&mut self, _label: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }

    fn done(&mut self) {
        if self.drawn {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.drawn = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(bar: TextProgressBar<Vec<u8>>) -> Vec<String> {
        String::from_utf8(bar.into_inner())
            .unwrap()
            .split('\r')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_half_way_fills_twenty_five() {
        let mut bar = TextProgressBar::new(Vec::new());
        bar.begin_task("copy", 100);
        bar.worked(25);
        bar.worked(25);
        assert_eq!(bar.filled(), 25);

        let frames = frames(bar);
        let last = frames.last().unwrap();
        assert_eq!(last.len(), WIDTH + 2);
        assert_eq!(last.matches(MARK).count(), 25);
    }

    #[test]
    fn test_redraws_only_when_dots_grow() {
        let mut bar = TextProgressBar::new(Vec::new());
        bar.begin_task("copy", 1000);
        bar.worked(1); // rounds to 0 dots
        bar.worked(1);
        bar.worked(8); // 10/1000 -> 1 dot
        // initial empty bar plus one redraw
        assert_eq!(frames(bar).len(), 2);
    }

    #[test]
    fn test_caps_at_width_and_ends_line() {
        let mut bar = TextProgressBar::new(Vec::new());
        bar.begin_task("copy", 2);
        bar.worked(5);
        assert_eq!(bar.filled(), WIDTH);
        bar.done();
        let out = String::from_utf8(bar.into_inner()).unwrap();
        assert!(out.ends_with("]\n"));
    }

    #[test]
    fn test_zero_total_draws_empty_bar() {
        let mut bar = TextProgressBar::new(Vec::new());
        bar.begin_task("copy", 0);
        bar.worked(1);
        assert_eq!(bar.filled(), 0);
        assert!(!bar.is_cancelled());
    }
}
