use colored::Colorize;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const DEFAULT_WIDTH: usize = 40;

/// Progress indicator for batch operations
pub struct ProgressBar {
    total: usize,
    current: usize,
    message: String,
    start_time: Instant,
    width: usize,
    visible: bool,
}

impl ProgressBar {
    pub fn new(total: usize, message: &str) -> Self {
        Self {
            total,
            current: 0,
            message: message.to_string(),
            start_time: Instant::now(),
            width: bar_width(),
            visible: !super::is_quiet(),
        }
    }

    /// Hidden bar that only counts; used when output is suppressed.
    pub fn hidden(total: usize) -> Self {
        let mut bar = Self::new(total, "");
        bar.visible = false;
        bar
    }

    pub fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
        self.draw();
    }

    pub fn inc(&mut self) {
        if self.current < self.total {
            self.current += 1;
            self.draw();
        }
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn finish(mut self) {
        self.draw();
        if self.visible {
            println!();
        }
        self.visible = false;
    }

    fn draw(&self) {
        if !self.visible {
            return;
        }

        let percent = if self.total > 0 {
            (self.current * 100) / self.total
        } else {
            100
        };
        let filled = if self.total > 0 {
            (self.current * self.width) / self.total
        } else {
            self.width
        };

        let bar = "█".repeat(filled);
        let empty = "░".repeat(self.width.saturating_sub(filled));

        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let eta = if self.current > 0 && elapsed_secs > 0.0 {
            let remaining = self.total.saturating_sub(self.current);
            Duration::from_secs_f64(remaining as f64 * elapsed_secs / self.current as f64)
        } else {
            Duration::ZERO
        };
        let eta_str = if eta.as_secs() > 0 {
            format!("{}s", eta.as_secs())
        } else {
            "--".to_string()
        };

        print!(
            "\r{} {} [{}{}] {}/{} {}% ETA: {}\x1b[K",
            "▸".dimmed(),
            self.message.cyan(),
            bar.green(),
            empty.dimmed(),
            self.current.to_string().bold(),
            self.total.to_string().dimmed(),
            percent.to_string().bold(),
            eta_str.dimmed()
        );

        io::stdout().flush().unwrap_or(());
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        if self.visible {
            println!();
        }
    }
}

fn bar_width() -> usize {
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(w), _)) if (w as usize) > 60 => {
            DEFAULT_WIDTH.min(w as usize - 50)
        }
        Some(_) => 20,
        None => DEFAULT_WIDTH,
    }
}
