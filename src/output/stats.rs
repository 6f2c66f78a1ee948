//! End-of-run statistics
//!
//! Renders the [`IndexSummary`] of a crawl-and-index run for the terminal.

use crate::index::IndexSummary;
use std::fmt::Write as _;

/// Renders the summary as the multi-line report printed after `crawl`
pub fn render_summary(summary: &IndexSummary) -> String {
    let crawl = &summary.crawl;
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Summary ===\n");

    let _ = writeln!(out, "Indexing:");
    let _ = writeln!(out, "  Pages processed: {}", summary.pages_processed);
    let _ = writeln!(out, "  Pages indexed: {}", summary.pages_indexed);
    let _ = writeln!(out, "  Chunks indexed: {}", summary.chunks_indexed);
    let _ = writeln!(out, "  Errors: {}", summary.errors);
    let _ = writeln!(out);

    let _ = writeln!(out, "Crawl:");
    let _ = writeln!(out, "  Delivered: {}", crawl.delivered);
    let _ = writeln!(out, "  Skipped: {}", crawl.skipped);
    let _ = writeln!(out, "  Failed: {}", crawl.failed);
    let _ = writeln!(out, "  Duplicates: {}", crawl.duplicates);
    let _ = writeln!(out, "  Deepest level reached: {}", crawl.max_depth_seen);
    let _ = writeln!(out);

    let processed = crawl.processed();
    let success_rate = if processed > 0 {
        (crawl.delivered as f64 / processed as f64) * 100.0
    } else {
        0.0
    };

    let _ = write!(
        out,
        "Success Rate: {:.1}% ({} / {} targets fetched)",
        success_rate, crawl.delivered, processed
    );

    out
}

/// Prints the summary to stdout
pub fn print_summary(summary: &IndexSummary) {
    println!("{}", render_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrawlStats;

    #[test]
    fn test_render_summary() {
        let summary = IndexSummary {
            pages_processed: 4,
            pages_indexed: 3,
            chunks_indexed: 12,
            errors: 1,
            crawl: CrawlStats {
                delivered: 4,
                skipped: 3,
                failed: 1,
                duplicates: 2,
                max_depth_seen: 2,
            },
        };

        let report = render_summary(&summary);

        assert!(report.contains("Pages indexed: 3"));
        assert!(report.contains("Chunks indexed: 12"));
        assert!(report.contains("Duplicates: 2"));
        assert!(report.contains("Success Rate: 50.0% (4 / 8 targets fetched)"));
    }

    #[test]
    fn test_render_empty_summary() {
        let report = render_summary(&IndexSummary::default());
        assert!(report.contains("Success Rate: 0.0% (0 / 0 targets fetched)"));
    }
}
