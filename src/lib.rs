// Library exports for the CLI and for pipelines that consume annotated datasets
pub mod annotate;
pub mod cli;
pub mod config_file;
pub mod crop;
pub mod dataset;
pub mod error;
pub mod json_output;
pub mod labels;
pub mod progress;
pub mod report;
pub mod roi;
pub mod roi_store;
pub mod utils;

// Re-export commonly used types
pub use annotate::{annotate_images, discover_images, BoundingBoxPicker, ConsolePicker, FixedPicker, Selection};
pub use cli::OutputFormat;
pub use crop::{CropConfig, CropEngine, CropResult};
pub use dataset::{split_data_labels, DataEntry, LabeledRecord, SplitData};
pub use error::{RoiError, StoreError};
pub use json_output::JsonMessage;
pub use labels::{map_labels_to_int, LabelMap};
pub use progress::{format_h_m_s, format_progress_bar, print_h_m_s, print_progress_bar, BarOptions};
pub use roi::{get_roi, get_roi_with_aspect_ratio, Roi};
pub use roi_store::RoiStore;
