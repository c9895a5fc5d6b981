//! Progress display with indicatif

use indicatif::{ProgressBar, ProgressStyle};
use parflash_core::flash::{PagePhase, PageProgress, ProgramReport};

/// Create a progress bar counted in `unit` with a trailing phase message
pub fn create_progress_bar(
    total: u64,
    unit: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
                unit
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Byte-count progress bar style
pub fn create_byte_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Page progress on an indicatif bar
#[derive(Default)]
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageProgress for IndicatifProgress {
    fn started(&mut self, total_pages: u32) {
        let total = total_pages as u64;
        self.bar =
            Some(create_progress_bar(total, "pages").unwrap_or_else(|_| ProgressBar::new(total)));
    }

    // Called with interrupts masked under irq=cli: only move the bar once
    // per page and let indicatif rate-limit the redraw.
    fn page_status(&mut self, page: u32, phase: PagePhase) {
        if let (Some(pb), PagePhase::Done) = (&self.bar, phase) {
            pb.set_position(page as u64 + 1);
        }
    }

    fn finished(&mut self, report: &ProgramReport) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message(format!("{} pages programmed", report.pages_programmed));
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // A failed run never reaches finished()
        if let Some(pb) = self.bar.take() {
            pb.abandon_with_message("Programming failed!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_moves_on_done_only() {
        let pb = ProgressBar::hidden();
        let mut progress = IndicatifProgress {
            bar: Some(pb.clone()),
        };

        progress.page_status(0, PagePhase::Erasing);
        progress.page_status(0, PagePhase::Writing);
        assert_eq!(pb.position(), 0);
        assert!(pb.message().is_empty());

        progress.page_status(0, PagePhase::Done);
        progress.page_status(1, PagePhase::Writing);
        assert_eq!(pb.position(), 1);
        assert!(pb.message().is_empty());
    }
}
