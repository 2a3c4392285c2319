use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use image::ImageFormat;
use std::path::PathBuf;

use crate::utils::{parse_aspect_ratio, parse_extensions, parse_size};

pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,bmp,tiff,webp";

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    #[value(name = "png")]
    Png,
    #[value(name = "jpg")]
    Jpg,
    #[value(name = "bmp")]
    Bmp,
    #[value(name = "tiff")]
    Tiff,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "roi-prep",
    version,
    about = "ROI annotation, cropping and label mapping for image-classification datasets",
    long_about = "
ROI Prep - dataset preparation for image classification

Annotate a folder of images with one region of interest each, crop those
regions (optionally grown to a fixed aspect ratio and resized) and turn string
labels into the integer codes classifiers expect.

Example Usage:
  # Annotate every image in a folder, typing x,y,w,h for each one
  roi-prep annotate -i ~/dataset/raw -o ~/dataset/rois.bin

  # Crop the stored ROIs as squares resized to 224x224
  roi-prep crop -r ~/dataset/rois.bin -o ~/dataset/crops --aspect-ratio 1 --resize 224x224

  # Check the adjusted boxes on the full images instead of cropping
  roi-prep crop -r ~/dataset/rois.bin -o ~/dataset/preview --aspect-ratio 4:3 --draw-boxes

  # Map labels to integers and print the label table
  roi-prep split -r ~/dataset/records.json -o ~/dataset/labels.json --table

  # Show what an ROI store contains
  roi-prep inspect ~/dataset/rois.bin"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// JSON configuration file providing defaults for unset options
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Emit progress and results as JSON lines instead of console output
    #[arg(long = "json-progress", global = true)]
    pub json_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select one ROI per image and save them to an ROI store
    Annotate(AnnotateArgs),
    /// Crop the stored ROIs out of their images
    Crop(CropArgs),
    /// Split labeled records into data, integer labels and a label map
    Split(SplitArgs),
    /// Print the contents of an ROI store
    Inspect(InspectArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnnotateArgs {
    /// Folder containing the images to annotate
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// ROI store file to write
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Comma-separated list of image extensions to include
    #[arg(long = "extensions", value_name = "LIST")]
    pub extensions_str: Option<String>,

    /// Also scan sub-folders
    #[arg(long = "recursive")]
    pub recursive: bool,

    /// Store the full image as ROI without asking
    #[arg(long = "full-frame")]
    pub full_frame: bool,

    /// Add to an existing store instead of replacing it; already annotated images are skipped
    #[arg(long = "append")]
    pub append: bool,
}

impl AnnotateArgs {
    pub fn extensions(&self) -> Vec<String> {
        parse_extensions(self.extensions_str.as_deref().unwrap_or(DEFAULT_EXTENSIONS))
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CropArgs {
    /// ROI store produced by `annotate`
    #[arg(short = 'r', long = "rois", value_name = "FILE")]
    pub rois: PathBuf,

    /// Output directory for the crops
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Directory that relative image paths in the store are resolved against
    #[arg(long = "base-dir", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Grow each ROI to this aspect ratio (width/height), e.g. 1, 1.5, 4:3
    #[arg(long = "aspect-ratio", value_name = "RATIO")]
    pub aspect_ratio: Option<String>,

    /// Resize every crop to WIDTHxHEIGHT
    #[arg(long = "resize", value_name = "WIDTHxHEIGHT")]
    pub resize: Option<String>,

    /// Image format of the written crops
    #[arg(long = "format", value_name = "FORMAT")]
    pub output_format: Option<OutputFormat>,

    /// Number of parallel jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Write the full image with the ROI outlined instead of the crop
    #[arg(long = "draw-boxes")]
    pub draw_boxes: bool,

    /// Compute every crop but write nothing
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl CropArgs {
    pub fn parse_aspect_ratio(&self) -> Result<Option<f64>, String> {
        self.aspect_ratio
            .as_deref()
            .map(parse_aspect_ratio)
            .transpose()
    }

    pub fn parse_resize(&self) -> Result<Option<(u32, u32)>, String> {
        self.resize.as_deref().map(parse_size).transpose()
    }

    pub fn parallel_jobs(&self) -> usize {
        match self.jobs.unwrap_or(0) {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SplitArgs {
    /// Records file: JSON list of {"path", "roi": [x, y, w, h], "label"}
    #[arg(
        short = 'r',
        long = "records",
        value_name = "FILE",
        required_unless_present = "rois",
        conflicts_with = "rois"
    )]
    pub records: Option<PathBuf>,

    /// ROI store to take paths and ROIs from (requires --labels)
    #[arg(long = "rois", value_name = "FILE", requires = "labels")]
    pub rois: Option<PathBuf>,

    /// JSON object mapping image path to label, used with --rois
    #[arg(long = "labels", value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Where to write data, integer labels and label map as JSON
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the label map as a table
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InspectArgs {
    /// ROI store file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_crop_args() {
        let args = Args::try_parse_from([
            "roi-prep",
            "crop",
            "-r",
            "rois.bin",
            "-o",
            "out",
            "--aspect-ratio",
            "4:3",
            "--resize",
            "64x48",
            "--format",
            "jpg",
            "-j",
            "2",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        let Command::Crop(crop) = args.command else {
            panic!("expected crop command");
        };
        assert_eq!(crop.parse_aspect_ratio().unwrap(), Some(4.0 / 3.0));
        assert_eq!(crop.parse_resize().unwrap(), Some((64, 48)));
        assert_eq!(crop.output_format, Some(OutputFormat::Jpg));
        assert_eq!(crop.parallel_jobs(), 2);
    }

    #[test]
    fn test_parse_crop_invalid_ratio() {
        let args = Args::try_parse_from([
            "roi-prep", "crop", "-r", "rois.bin", "-o", "out", "--aspect-ratio", "0",
        ])
        .unwrap();
        let Command::Crop(crop) = args.command else {
            panic!("expected crop command");
        };
        assert!(crop.parse_aspect_ratio().is_err());
    }

    #[test]
    fn test_split_requires_an_input() {
        assert!(Args::try_parse_from(["roi-prep", "split"]).is_err());
        assert!(Args::try_parse_from(["roi-prep", "split", "--rois", "r.bin"]).is_err());
        assert!(Args::try_parse_from([
            "roi-prep", "split", "--rois", "r.bin", "--labels", "l.json"
        ])
        .is_ok());
        assert!(Args::try_parse_from(["roi-prep", "split", "-r", "records.json"]).is_ok());
    }

    #[test]
    fn test_annotate_default_extensions() {
        let args =
            Args::try_parse_from(["roi-prep", "annotate", "-i", "raw", "-o", "rois.bin"]).unwrap();
        let Command::Annotate(annotate) = args.command else {
            panic!("expected annotate command");
        };
        assert_eq!(
            annotate.extensions(),
            vec!["jpg", "jpeg", "png", "bmp", "tiff", "webp"]
        );
    }
}
