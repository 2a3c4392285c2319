//! Batch cropping of stored ROIs.
//!
//! Every entry of an [`RoiStore`] is opened, cropped (optionally after growing
//! the ROI to an aspect ratio), optionally resized and written to the output
//! directory. Files are independent and processed on a rayon pool.

use anyhow::{Context, Result};
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cli::OutputFormat;
use crate::roi::{get_roi, Roi};
use crate::roi_store::RoiStore;
use crate::utils::{create_output_filename, create_unique_output_filenames, verbose_println};

const STORED_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const ADJUSTED_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone)]
pub struct CropConfig {
    /// Target width/height ratio the ROI is grown to before cropping
    pub aspect_ratio: Option<f64>,
    pub resize: Option<(u32, u32)>,
    pub output_format: OutputFormat,
    pub parallel_jobs: usize,
    /// Outline the ROI on the full image instead of cropping it
    pub draw_boxes: bool,
    pub dry_run: bool,
    pub base_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: None,
            resize: None,
            output_format: OutputFormat::Png,
            parallel_jobs: 1,
            draw_boxes: false,
            dry_run: false,
            base_dir: None,
            verbose: false,
        }
    }
}

#[derive(Debug)]
pub struct CropResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// ROI as stored
    pub roi: Roi,
    /// ROI actually cropped, after aspect-ratio fitting
    pub effective_roi: Roi,
    pub dimensions: (u32, u32),
    pub processing_time: Duration,
}

pub struct CropEngine {
    config: CropConfig,
    pool: rayon::ThreadPool,
}

impl CropEngine {
    pub fn new(config: CropConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_jobs.max(1))
            .build()
            .context("Failed to initialize thread pool")?;

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Image location for a stored path, honoring the base directory
    pub fn resolve_path(&self, stored: &str) -> PathBuf {
        let path = PathBuf::from(stored);
        match &self.config.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// Crop every entry of `store`; results come back in store order, each
    /// paired with the resolved image path.
    ///
    /// Every entry gets its own output file, even when several images share a
    /// file stem.
    ///
    /// `progress_callback` receives the number of finished files after each one.
    pub fn process_store<F>(
        &self,
        store: &RoiStore,
        output_dir: &Path,
        progress_callback: F,
    ) -> Vec<(PathBuf, Result<CropResult>)>
    where
        F: Fn(usize, &Path) + Send + Sync,
    {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let processed_count = AtomicUsize::new(0);

        let input_paths: Vec<PathBuf> = store.iter().map(|(path, _)| self.resolve_path(path)).collect();
        let output_names =
            create_unique_output_filenames(&input_paths, self.config.output_format.extension());

        let entries: Vec<(PathBuf, Roi, PathBuf)> = input_paths
            .into_iter()
            .zip(store.iter().map(|(_, roi)| *roi))
            .zip(output_names)
            .map(|((input_path, roi), name)| (input_path, roi, output_dir.join(name)))
            .collect();

        self.pool.install(|| {
            entries
                .into_par_iter()
                .map(|(input_path, roi, output_path)| {
                    let result = self.crop_to(&input_path, roi, output_path);

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    progress_callback(count, &input_path);

                    (input_path, result)
                })
                .collect()
        })
    }

    /// Crop a single image into `output_dir/{stem}_roi.{ext}`
    pub fn process_single(&self, input_path: &Path, roi: Roi, output_dir: &Path) -> Result<CropResult> {
        let output_filename =
            create_output_filename(input_path, self.config.output_format.extension());
        self.crop_to(input_path, roi, output_dir.join(output_filename))
    }

    fn crop_to(&self, input_path: &Path, roi: Roi, output_path: PathBuf) -> Result<CropResult> {
        let start = Instant::now();
        verbose_println(
            self.config.verbose,
            &format!("Processing: {} {}", input_path.display(), roi),
        );

        let effective_roi = match self.config.aspect_ratio {
            Some(ratio) => roi
                .fit_aspect_ratio(ratio)
                .with_context(|| format!("Cannot fit ROI of {}", input_path.display()))?,
            None => roi,
        };

        let img = image::open(input_path)
            .with_context(|| format!("Failed to open image: {}", input_path.display()))?
            .to_rgb8();

        let output = if self.config.draw_boxes {
            draw_boxes(&img, roi, effective_roi)
        } else {
            let cropped = get_roi(&img, effective_roi);
            if cropped.width() == 0 || cropped.height() == 0 {
                return Err(anyhow::anyhow!(
                    "ROI {} selects no pixels of the {}x{} image {}",
                    effective_roi,
                    img.width(),
                    img.height(),
                    input_path.display()
                ));
            }
            match self.config.resize {
                Some((width, height)) => resize_image(&cropped, width, height)?,
                None => cropped,
            }
        };

        if self.config.dry_run {
            verbose_println(
                self.config.verbose,
                &format!("Dry run: would write {}", output_path.display()),
            );
        } else {
            output
                .save_with_format(&output_path, self.config.output_format.image_format())
                .with_context(|| format!("Failed to save crop: {}", output_path.display()))?;
        }

        Ok(CropResult {
            input_path: input_path.to_path_buf(),
            output_path,
            roi,
            effective_roi,
            dimensions: output.dimensions(),
            processing_time: start.elapsed(),
        })
    }
}

/// Full image with the stored ROI in green and, when it differs, the
/// adjusted one in red. Empty rectangles, and rectangles whose origin does
/// not fit an `i32`, are not drawn.
pub fn draw_boxes(img: &RgbImage, stored: Roi, adjusted: Roi) -> RgbImage {
    let mut canvas = img.clone();

    let mut outline = |roi: Roi, color: Rgb<u8>| {
        if roi.is_empty() {
            return;
        }
        if let (Ok(x), Ok(y)) = (i32::try_from(roi.x), i32::try_from(roi.y)) {
            draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(roi.w, roi.h), color);
        }
    };

    outline(stored, STORED_BOX_COLOR);
    if adjusted != stored {
        outline(adjusted, ADJUSTED_BOX_COLOR);
    }

    canvas
}

/// Resize an image to exact dimensions using high-quality algorithm
pub fn resize_image(img: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }
    if src_width == 0 || src_height == 0 {
        return Err(anyhow::anyhow!("Source image is empty"));
    }
    if width == 0 || height == 0 {
        return Err(anyhow::anyhow!("Target size must be greater than 0"));
    }

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x3)?;
    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let mut resizer = Resizer::new();
    resizer.resize(&src_image, &mut dst_image, Some(&ResizeOptions::default()))?;

    RgbImage::from_raw(width, height, dst_image.buffer().to_vec())
        .ok_or_else(|| anyhow::anyhow!("Resized buffer does not match {}x{}", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageBuffer};

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn engine(config: CropConfig) -> CropEngine {
        CropEngine::new(config).unwrap()
    }

    #[test]
    fn test_resize_image() {
        let img = create_test_image(100, 60);
        let resized = resize_image(&img, 50, 30).unwrap();
        assert_eq!(resized.dimensions(), (50, 30));

        let same = resize_image(&img, 100, 60).unwrap();
        assert_eq!(same, img);
    }

    #[test]
    fn test_draw_boxes() {
        let img = RgbImage::new(20, 20);
        let stored = Roi::new(5, 5, 4, 4);
        let adjusted = Roi::new(2, 5, 10, 4);
        let canvas = draw_boxes(&img, stored, adjusted);

        assert_eq!(canvas.dimensions(), (20, 20));
        // Adjusted outline drawn last where the boxes overlap
        assert_eq!(*canvas.get_pixel(2, 5), ADJUSTED_BOX_COLOR);
        assert_eq!(*canvas.get_pixel(5, 6), STORED_BOX_COLOR);
        assert_eq!(*canvas.get_pixel(7, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_boxes_skips_origin_beyond_i32() {
        let img = create_test_image(20, 20);
        let far = Roi::new(u32::MAX - 4, 2, 3, 3);
        let canvas = draw_boxes(&img, far, Roi::new(2, u32::MAX - 1, 3, 3));
        assert_eq!(canvas, img);

        // A drawable box next to an undrawable one still shows up
        let canvas = draw_boxes(&img, Roi::new(1, 1, 4, 4), far);
        assert_eq!(*canvas.get_pixel(1, 1), STORED_BOX_COLOR);
    }

    #[test]
    fn test_process_single_with_aspect_ratio_and_resize() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.png");
        create_test_image(100, 100).save(&input).unwrap();

        let engine = engine(CropConfig {
            aspect_ratio: Some(1.0),
            resize: Some((16, 16)),
            ..Default::default()
        });
        let result = engine
            .process_single(&input, Roi::new(10, 10, 40, 20), dir.path())
            .unwrap();

        assert_eq!(result.effective_roi, Roi::new(10, 0, 40, 40));
        assert_eq!(result.dimensions, (16, 16));
        assert_eq!(result.output_path, dir.path().join("sample_roi.png"));
        assert_eq!(image::open(&result.output_path).unwrap().dimensions(), (16, 16));
    }

    #[test]
    fn test_process_single_crop_matches_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pixels.png");
        let img = create_test_image(50, 40);
        img.save(&input).unwrap();

        let engine = engine(CropConfig::default());
        let result = engine
            .process_single(&input, Roi::new(5, 6, 7, 8), dir.path())
            .unwrap();

        let written = image::open(&result.output_path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (7, 8));
        assert_eq!(written.get_pixel(0, 0), img.get_pixel(5, 6));
    }

    #[test]
    fn test_process_single_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("small.png");
        create_test_image(10, 10).save(&input).unwrap();

        let plain = engine(CropConfig::default());
        assert!(plain
            .process_single(&input, Roi::new(20, 20, 5, 5), dir.path())
            .is_err());
        assert!(plain
            .process_single(&dir.path().join("missing.png"), Roi::new(0, 0, 5, 5), dir.path())
            .is_err());

        let fitted = engine(CropConfig {
            aspect_ratio: Some(1.0),
            ..Default::default()
        });
        assert!(fitted
            .process_single(&input, Roi::new(0, 0, 5, 0), dir.path())
            .is_err());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dry.png");
        create_test_image(10, 10).save(&input).unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let engine = engine(CropConfig {
            dry_run: true,
            ..Default::default()
        });
        let result = engine.process_single(&input, Roi::new(0, 0, 5, 5), &out).unwrap();
        assert!(!result.output_path.exists());
    }

    #[test]
    fn test_process_store_in_order_with_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        create_test_image(30, 30).save(dir.path().join("a.png")).unwrap();
        create_test_image(30, 30).save(dir.path().join("b.png")).unwrap();
        let out = dir.path().join("crops");
        std::fs::create_dir(&out).unwrap();

        let mut store = RoiStore::new();
        store.insert("b.png", Roi::new(0, 0, 10, 5));
        store.insert("a.png", Roi::new(1, 1, 4, 4));
        store.insert("gone.png", Roi::new(0, 0, 4, 4));

        let engine = engine(CropConfig {
            parallel_jobs: 2,
            base_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let results = engine.process_store(&store, &out, |_, _| {
            calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });

        assert_eq!(calls.into_inner(), 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1.as_ref().unwrap().dimensions, (4, 4));
        assert_eq!(results[1].1.as_ref().unwrap().dimensions, (10, 5));
        assert_eq!(results[2].0, dir.path().join("gone.png"));
        assert!(results[2].1.is_err());
    }

    #[test]
    fn test_process_store_keeps_crops_with_shared_stems() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["d1", "d2"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        create_test_image(30, 30).save(dir.path().join("d1/img.png")).unwrap();
        create_test_image(30, 30).save(dir.path().join("d2/img.png")).unwrap();
        create_test_image(30, 30).save(dir.path().join("d1/cat.jpg")).unwrap();
        create_test_image(30, 30).save(dir.path().join("d1/cat.png")).unwrap();
        let out = dir.path().join("crops");
        std::fs::create_dir(&out).unwrap();

        let mut store = RoiStore::new();
        store.insert("d1/img.png", Roi::new(0, 0, 4, 4));
        store.insert("d2/img.png", Roi::new(0, 0, 5, 5));
        store.insert("d1/cat.jpg", Roi::new(0, 0, 6, 6));
        store.insert("d1/cat.png", Roi::new(0, 0, 7, 7));

        let engine = engine(CropConfig {
            parallel_jobs: 4,
            base_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let results = engine.process_store(&store, &out, |_, _| {});
        assert_eq!(results.len(), 4);

        let mut outputs = std::collections::HashSet::new();
        for (_, result) in &results {
            let crop = result.as_ref().unwrap();
            assert!(outputs.insert(crop.output_path.clone()));
            let written = image::open(&crop.output_path).unwrap();
            assert_eq!(written.dimensions(), (crop.roi.w, crop.roi.h));
        }
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 4);
    }
}
