//! Progress bar for multi-package checkouts

use linya::{Bar, Progress};

/// One bar counting finished packages
pub struct CheckoutProgress {
  progress: Progress,
  bar: Bar,
}

impl CheckoutProgress {
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Jump to `done` finished packages
  pub fn set(&mut self, done: usize) {
    self.progress.set_and_draw(&self.bar, done);
  }
}
