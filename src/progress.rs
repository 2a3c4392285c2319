//! Plain console progress output: a redrawn single-line bar and elapsed time
//! in hours, minutes and seconds.
//!
//! These are the lightweight counterparts of the `indicatif` bars used by the
//! CLI, meant for library callers (training loops, notebooks) that only want a
//! line on stdout.

use std::io::{self, Write};

/// Appearance of the progress bar line
#[derive(Debug, Clone)]
pub struct BarOptions {
    pub prefix: String,
    pub suffix: String,
    /// Decimals shown in the percentage
    pub decimals: usize,
    /// Bar width in characters
    pub length: usize,
    pub fill: char,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            prefix: "Progress:".to_string(),
            suffix: "Complete".to_string(),
            decimals: 1,
            length: 50,
            fill: '█',
        }
    }
}

/// Render `\r{prefix} |{bar}| {percent}% {suffix}` for `iteration` of `total`.
///
/// A `total` of 0 is reported as complete.
pub fn format_progress_bar(iteration: usize, total: usize, options: &BarOptions) -> String {
    let (percent, filled_length) = if total == 0 {
        (100.0, options.length)
    } else {
        (
            100.0 * (iteration as f64 / total as f64),
            (options.length * iteration / total).min(options.length),
        )
    };

    let bar: String = std::iter::repeat(options.fill)
        .take(filled_length)
        .chain(std::iter::repeat('-').take(options.length - filled_length))
        .collect();

    format!(
        "\r{} |{}| {:.*}% {}",
        options.prefix, bar, options.decimals, percent, options.suffix
    )
}

/// Redraw the progress line on stdout, ending it once `iteration == total`
pub fn print_progress_bar(iteration: usize, total: usize, options: &BarOptions) {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "{}", format_progress_bar(iteration, total, options));
    if iteration == total {
        let _ = writeln!(stdout);
    }
    let _ = stdout.flush();
}

/// `{message}{h}h {mm}m {ss}s`, with fractional seconds dropped
pub fn format_h_m_s(seconds: f64, message: &str) -> String {
    let seconds = seconds.trunc().max(0.0) as u64;
    let (m, s) = (seconds / 60, seconds % 60);
    let (h, m) = (m / 60, m % 60);
    format!("{}{}h {:02}m {:02}s", message, h, m, s)
}

pub fn print_h_m_s(seconds: f64, message: &str) {
    println!("{}", format_h_m_s(seconds, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_progress_bar_half() {
        let options = BarOptions {
            length: 10,
            ..Default::default()
        };
        assert_eq!(
            format_progress_bar(5, 10, &options),
            "\rProgress: |█████-----| 50.0% Complete"
        );
    }

    #[test]
    fn test_format_progress_bar_bounds() {
        let options = BarOptions {
            prefix: "Cropping".to_string(),
            suffix: "done".to_string(),
            decimals: 0,
            length: 4,
            fill: '#',
        };
        assert_eq!(format_progress_bar(0, 3, &options), "\rCropping |----| 0% done");
        assert_eq!(format_progress_bar(3, 3, &options), "\rCropping |####| 100% done");
        // 4 * 2 / 3 = 2 filled cells
        assert_eq!(format_progress_bar(2, 3, &options), "\rCropping |##--| 67% done");
    }

    #[test]
    fn test_format_progress_bar_zero_total() {
        let options = BarOptions {
            length: 3,
            ..Default::default()
        };
        assert_eq!(
            format_progress_bar(0, 0, &options),
            "\rProgress: |███| 100.0% Complete"
        );
    }

    #[test]
    fn test_format_h_m_s() {
        assert_eq!(format_h_m_s(0.0, ""), "0h 00m 00s");
        assert_eq!(format_h_m_s(59.9, "Elapsed: "), "Elapsed: 0h 00m 59s");
        assert_eq!(format_h_m_s(3725.0, ""), "1h 02m 05s");
        assert_eq!(format_h_m_s(90061.0, "Total "), "Total 25h 01m 01s");
    }
}
