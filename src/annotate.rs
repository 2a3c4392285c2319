//! Manual ROI annotation.
//!
//! Images are discovered in a folder and shown one by one to a
//! [`BoundingBoxPicker`], which returns the selected rectangle. The results
//! end up in a [`RoiStore`] that can be saved to disk.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::roi::Roi;
use crate::roi_store::RoiStore;
use crate::utils::{has_valid_extension, verbose_println, warn_println};

/// What the picker decided for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Roi(Roi),
    /// Leave this image out of the store
    Skip,
    /// Stop annotating; images picked so far are kept
    Quit,
}

/// Anything able to select a bounding box on an image: a window toolkit, a
/// prompt, a detector or a fixed rule.
pub trait BoundingBoxPicker {
    fn pick(&mut self, path: &Path, image: &DynamicImage) -> Result<Selection>;
}

/// Reads `x,y,w,h` lines from a reader, prompting on a writer.
///
/// An empty line or `s` skips the image, `q` stops annotation. Malformed
/// input is reported and asked for again.
pub struct ConsolePicker<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePicker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsolePicker<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

/// Parse `x,y,w,h`; commas and whitespace both separate values
pub fn parse_roi(line: &str) -> Option<Roi> {
    let values: Vec<u32> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;

    match values.as_slice() {
        [x, y, w, h] => Some(Roi::new(*x, *y, *w, *h)),
        _ => None,
    }
}

impl<R: BufRead, W: Write> BoundingBoxPicker for ConsolePicker<R, W> {
    fn pick(&mut self, path: &Path, image: &DynamicImage) -> Result<Selection> {
        let (width, height) = image.dimensions();
        writeln!(
            self.output,
            "Select ROI for {} ({}x{})",
            path.display(),
            width,
            height
        )?;

        loop {
            write!(self.output, "x,y,w,h [enter/s = skip, q = quit]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // Input closed
                return Ok(Selection::Quit);
            }

            match line.trim() {
                "" | "s" => return Ok(Selection::Skip),
                "q" => return Ok(Selection::Quit),
                text => match parse_roi(text) {
                    Some(roi) => return Ok(Selection::Roi(roi)),
                    None => writeln!(
                        self.output,
                        "Could not parse '{}', expected four non-negative integers",
                        text
                    )?,
                },
            }
        }
    }
}

/// Same answer for every image: a fixed rectangle, or the full frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker {
    roi: Option<Roi>,
}

impl FixedPicker {
    pub fn new(roi: Roi) -> Self {
        Self { roi: Some(roi) }
    }

    pub fn full_frame() -> Self {
        Self { roi: None }
    }
}

impl BoundingBoxPicker for FixedPicker {
    fn pick(&mut self, _path: &Path, image: &DynamicImage) -> Result<Selection> {
        let (width, height) = image.dimensions();
        Ok(Selection::Roi(
            self.roi.unwrap_or(Roi::full_frame(width, height)),
        ))
    }
}

/// Collect image files from `folder`, sorted by path.
///
/// Only the folder itself is scanned unless `recursive` is set.
pub fn discover_images(
    folder: &Path,
    extensions: &[String],
    recursive: bool,
    verbose: bool,
) -> Result<Vec<PathBuf>> {
    verbose_println(verbose, &format!("Scanning directory: {}", folder.display()));

    let walker = WalkDir::new(folder)
        .follow_links(false)
        .min_depth(1)
        .max_depth(if recursive { 10 } else { 1 });

    let mut image_files = Vec::new();
    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() && has_valid_extension(path, extensions) {
            image_files.push(path.to_path_buf());
        }
    }

    image_files.sort();

    verbose_println(verbose, &format!("Found {} image files", image_files.len()));
    Ok(image_files)
}

/// Outcome of an annotation session
#[derive(Debug, Default)]
pub struct AnnotationSummary {
    pub store: RoiStore,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// Set when the picker asked to stop before every image was seen
    pub aborted: bool,
}

/// Ask `picker` for the ROI of every image in `files`.
///
/// Rectangles are stored exactly as picked; a zero-sized selection (what a
/// cancelled selection usually produces) is kept, with a warning. Images that
/// fail to open are recorded and skipped.
pub fn annotate_images<P>(files: &[PathBuf], picker: &mut P, verbose: bool) -> Result<AnnotationSummary>
where
    P: BoundingBoxPicker + ?Sized,
{
    let mut summary = AnnotationSummary::default();

    for path in files {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                warn_println(&format!("Failed to open image {}: {}", path.display(), e));
                summary.failed.push((path.clone(), e.to_string()));
                continue;
            }
        };

        match picker
            .pick(path, &image)
            .with_context(|| format!("ROI selection failed for {}", path.display()))?
        {
            Selection::Roi(roi) => {
                if roi.is_empty() {
                    warn_println(&format!("Empty ROI {} stored for {}", roi, path.display()));
                }
                verbose_println(verbose, &format!("{} -> {}", path.display(), roi));
                summary.store.insert(path.display().to_string(), roi);
            }
            Selection::Skip => {
                verbose_println(verbose, &format!("Skipped {}", path.display()));
                summary.skipped.push(path.clone());
            }
            Selection::Quit => {
                summary.aborted = true;
                break;
            }
        }
    }

    Ok(summary)
}
