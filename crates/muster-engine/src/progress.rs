//! Condensed progress reporting for parallel runs.
//!
//! Overwrites a single status line (`done/total completed ...`) instead
//! of printing per-target output. Observable output only — nothing here
//! affects control flow.

use std::io::Write;

pub(crate) struct Progress {
    enabled: bool,
    total: usize,
    width: usize,
}

impl Progress {
    pub fn new(enabled: bool, total: usize) -> Self {
        Self {
            enabled,
            total,
            width: 0,
        }
    }

    pub fn begin(&mut self, label: &str, pool_size: usize) {
        if !self.enabled {
            return;
        }
        println!("{}", begin_line(label, self.total, pool_size));
        self.rewrite(&status_line(0, self.total));
    }

    pub fn record(&mut self, done: usize, host: &str) {
        if !self.enabled {
            return;
        }
        self.clear();
        println!("[multirun] Finished on {}", host);
        self.rewrite(&status_line(done, self.total));
    }

    pub fn finish(&mut self, done: usize, laggards_discarded: bool) {
        if !self.enabled {
            return;
        }
        self.clear();
        self.rewrite(&final_line(done, self.total, laggards_discarded));
        println!();
        self.width = 0;
    }

    fn rewrite(&mut self, line: &str) {
        let padding = self.width.saturating_sub(line.len());
        print!("\r{}{}", line, " ".repeat(padding));
        let _ = std::io::stdout().flush();
        self.width = line.len();
    }

    fn clear(&mut self) {
        if self.width > 0 {
            print!("\r{}\r", " ".repeat(self.width));
            self.width = 0;
        }
    }
}

fn begin_line(label: &str, total: usize, pool_size: usize) -> String {
    if total < pool_size {
        format!("[multirun] Running '{}' on {} hosts", label, total)
    } else {
        format!(
            "[multirun] Running '{}' on {} hosts with pool of {}",
            label, total, pool_size
        )
    }
}

fn status_line(done: usize, total: usize) -> String {
    format!("[multirun] {}/{} completed ...", done, total)
}

fn final_line(done: usize, total: usize, laggards_discarded: bool) -> String {
    if done == total {
        format!("[multirun] {}/{} completed successfully!", done, done)
    } else if laggards_discarded {
        format!(
            "[multirun] {}/{} completed ... laggards discarded!",
            done, total
        )
    } else {
        format!("[multirun] {}/{} completed", done, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_line_mentions_pool_only_when_saturated() {
        assert_eq!(
            begin_line("uptime", 2, 8),
            "[multirun] Running 'uptime' on 2 hosts"
        );
        assert_eq!(
            begin_line("uptime", 10, 8),
            "[multirun] Running 'uptime' on 10 hosts with pool of 8"
        );
    }

    #[test]
    fn status_and_final_lines() {
        assert_eq!(status_line(3, 6), "[multirun] 3/6 completed ...");
        assert_eq!(
            final_line(6, 6, false),
            "[multirun] 6/6 completed successfully!"
        );
        assert_eq!(
            final_line(4, 6, true),
            "[multirun] 4/6 completed ... laggards discarded!"
        );
        assert_eq!(final_line(4, 6, false), "[multirun] 4/6 completed");
    }
}
