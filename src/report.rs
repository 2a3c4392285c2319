//! Table reports printed at the end of a run.

use prettytable::{format, Cell, Row, Table};

use crate::crop::CropResult;
use crate::labels::LabelMap;
use crate::roi_store::RoiStore;

/// Code, label and number of samples for every entry of the label map
pub fn label_table(label_map: &LabelMap, codes: &[usize]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![
        Cell::new("Code"),
        Cell::new("Label"),
        Cell::new("Samples"),
    ]));

    let counts = label_map.counts(codes);
    for (code, (label, count)) in label_map.iter().zip(counts).enumerate() {
        table.add_row(Row::new(vec![
            Cell::new(&code.to_string()),
            Cell::new(label),
            Cell::new(&count.to_string()),
        ]));
    }

    table
}

pub fn store_table(store: &RoiStore) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![
        Cell::new("Image"),
        Cell::new("x"),
        Cell::new("y"),
        Cell::new("w"),
        Cell::new("h"),
    ]));

    for (path, roi) in store {
        table.add_row(Row::new(vec![
            Cell::new(path),
            Cell::new(&roi.x.to_string()),
            Cell::new(&roi.y.to_string()),
            Cell::new(&roi.w.to_string()),
            Cell::new(&roi.h.to_string()),
        ]));
    }

    table
}

/// Stored ROI, cropped ROI and output size per successfully cropped image
pub fn crop_table(results: &[&CropResult]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![
        Cell::new("Input"),
        Cell::new("Stored ROI"),
        Cell::new("Cropped ROI"),
        Cell::new("Output size"),
    ]));

    for result in results {
        let input = result
            .input_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown");
        table.add_row(Row::new(vec![
            Cell::new(input),
            Cell::new(&result.roi.to_string()),
            Cell::new(&result.effective_roi.to_string()),
            Cell::new(&format!("{}x{}", result.dimensions.0, result.dimensions.1)),
        ]));
    }

    table
}
