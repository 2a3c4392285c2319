use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )?
        .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext)
    } else {
        false
    }
}

/// Parse a comma-separated extension list, lowercased
pub fn parse_extensions(extensions: &str) -> Vec<String> {
    extensions
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a `WIDTHxHEIGHT` size string
pub fn parse_size(size: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = size.split('x').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid size format '{}'. Use WIDTHxHEIGHT (e.g., 224x224)",
            size
        ));
    }

    let width = parts[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid width: '{}'", parts[0]))?;
    let height = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid height: '{}'", parts[1]))?;

    if width == 0 || height == 0 {
        return Err("Width and height must be greater than 0".to_string());
    }

    Ok((width, height))
}

/// Parse an aspect ratio given as a number (`1.5`) or a fraction (`4:3`, `16/9`)
pub fn parse_aspect_ratio(ratio: &str) -> Result<f64, String> {
    let ratio = ratio.trim();
    let value = match ratio.split_once(|c: char| c == ':' || c == '/') {
        Some((w, h)) => {
            let w = w
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid aspect ratio width: '{}'", w))?;
            let h = h
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid aspect ratio height: '{}'", h))?;
            w / h
        }
        None => ratio
            .parse::<f64>()
            .map_err(|_| format!("Invalid aspect ratio: '{}'", ratio))?,
    };

    if !value.is_finite() || value <= 0.0 {
        return Err(format!(
            "Aspect ratio must be a finite number greater than 0, got '{}'",
            ratio
        ));
    }
    Ok(value)
}

/// Generate a safe filename by removing/replacing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn output_base_name(input_path: &Path) -> String {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    format!("{}_roi", sanitize_filename(stem))
}

/// Output name for the crop of `input_path`: `{stem}_roi.{ext}`
pub fn create_output_filename(input_path: &Path, extension: &str) -> String {
    format!("{}.{}", output_base_name(input_path), extension)
}

/// Output names for a batch written into one directory, in input order.
///
/// Inputs sharing a stem (same name in another folder, or another source
/// extension) get `{stem}_roi_2.{ext}`, `{stem}_roi_3.{ext}`, ... in order of
/// appearance. Names are compared case-insensitively.
pub fn create_unique_output_filenames<P: AsRef<Path>>(inputs: &[P], extension: &str) -> Vec<String> {
    let mut used = HashSet::new();

    inputs
        .iter()
        .map(|input| {
            let base = output_base_name(input.as_ref());
            let mut name = format!("{}.{}", base, extension);
            let mut n = 2;
            while !used.insert(name.to_lowercase()) {
                name = format!("{}_{}.{}", base, n, extension);
                n += 1;
            }
            name
        })
        .collect()
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}
