use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use roi_prep::annotate::{annotate_images, discover_images, BoundingBoxPicker, ConsolePicker, FixedPicker};
use roi_prep::cli::{AnnotateArgs, Args, Command, CropArgs, InspectArgs, SplitArgs};
use roi_prep::crop::{CropConfig, CropEngine, CropResult};
use roi_prep::dataset::{attach_labels, load_records, split_data_labels};
use roi_prep::json_output::JsonMessage;
use roi_prep::progress::print_h_m_s;
use roi_prep::report::{crop_table, label_table, store_table};
use roi_prep::roi_store::{is_roi_store_file, RoiStore};
use roi_prep::utils::{create_progress_bar, error_println, format_duration, verbose_println, warn_println};

fn main() -> Result<()> {
    let mut args = Args::parse();
    args.load_and_merge_config()?;

    let Args {
        command,
        verbose,
        json_progress,
        ..
    } = args;

    if !json_progress {
        println!("{}", style("ROI Prep - Dataset Preparation").bold().blue());
        println!();
    }

    let result = match command {
        Command::Annotate(annotate) => run_annotate(&annotate, verbose && !json_progress, json_progress),
        Command::Crop(crop) => run_crop(&crop, verbose, json_progress),
        Command::Split(split) => run_split(&split, verbose, json_progress),
        Command::Inspect(inspect) => run_inspect(&inspect, json_progress),
    };

    if let Err(ref e) = result {
        if !json_progress {
            error_println(&format!("{:#}", e));
        }
    }
    result
}

fn run_annotate(args: &AnnotateArgs, verbose: bool, json: bool) -> Result<()> {
    let start_time = Instant::now();

    if !args.input_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Input path is not a directory: {}",
            args.input_dir.display()
        ));
    }

    let extensions = args.extensions();
    if extensions.is_empty() {
        return Err(anyhow::anyhow!("No valid extensions specified"));
    }

    let mut store = if args.append && args.output.exists() {
        RoiStore::load(&args.output)
            .with_context(|| format!("Failed to load ROI store: {}", args.output.display()))?
    } else {
        RoiStore::new()
    };

    let mut image_files = discover_images(&args.input_dir, &extensions, args.recursive, verbose)?;
    if args.append {
        let before = image_files.len();
        image_files.retain(|path| !store.contains(&path.display().to_string()));
        verbose_println(
            verbose,
            &format!("{} images already annotated", before - image_files.len()),
        );
    }

    if image_files.is_empty() {
        if !json {
            println!("{}", style("No images to annotate").red());
        }
        return Ok(());
    }

    let mut picker: Box<dyn BoundingBoxPicker> = if args.full_frame {
        Box::new(FixedPicker::full_frame())
    } else if json {
        // Keep stdout for JSON lines
        Box::new(ConsolePicker::new(std::io::stdin().lock(), std::io::stderr()))
    } else {
        Box::new(ConsolePicker::stdio())
    };

    let summary = annotate_images(&image_files, &mut *picker, verbose)?;
    let annotated = summary.store.len();
    store.merge(summary.store);

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    store
        .save(&args.output)
        .with_context(|| format!("Failed to write ROI store: {}", args.output.display()))?;

    let elapsed = start_time.elapsed();
    if json {
        JsonMessage::summary(
            image_files.len(),
            annotated,
            summary.failed.len(),
            elapsed.as_secs_f64(),
        );
        return Ok(());
    }

    println!();
    println!("{}", style("Annotation Summary:").bold().green());
    println!("  Annotated: {}", style(annotated).bold().green());
    if !summary.skipped.is_empty() {
        println!("  Skipped: {}", style(summary.skipped.len()).bold().yellow());
    }
    if !summary.failed.is_empty() {
        println!("  Failed: {}", style(summary.failed.len()).bold().red());
        for (path, error) in &summary.failed {
            println!("    {} - {}", style(path.display()).bold().red(), error);
        }
    }
    if summary.aborted {
        warn_println("Annotation stopped before all images were seen");
    }
    println!("  Entries in store: {}", store.len());
    println!("  Written to: {}", args.output.display());
    print_h_m_s(elapsed.as_secs_f64(), "  Session time: ");

    Ok(())
}

fn run_crop(args: &CropArgs, verbose: bool, json: bool) -> Result<()> {
    let start_time = Instant::now();

    let store = RoiStore::load(&args.rois)
        .with_context(|| format!("Failed to load ROI store: {}", args.rois.display()))?;

    let config = CropConfig {
        aspect_ratio: args.parse_aspect_ratio().map_err(anyhow::Error::msg)?,
        resize: args.parse_resize().map_err(anyhow::Error::msg)?,
        output_format: args.output_format.unwrap_or_default(),
        parallel_jobs: args.parallel_jobs(),
        draw_boxes: args.draw_boxes,
        dry_run: args.dry_run,
        base_dir: args.base_dir.clone(),
        verbose: verbose && !json,
    };

    if config.verbose {
        println!("{}", style("Configuration:").bold());
        println!("  ROI store: {} ({} entries)", args.rois.display(), store.len());
        match config.aspect_ratio {
            Some(ratio) => println!("  Aspect ratio: {:.4}", ratio),
            None => println!("  Aspect ratio: as annotated"),
        }
        if let Some((width, height)) = config.resize {
            println!("  Resize: {}x{}", width, height);
        }
        println!("  Output format: {:?}", config.output_format);
        println!("  Parallel jobs: {}", config.parallel_jobs);
        if config.draw_boxes {
            println!("  Draw boxes: enabled (full images with outlines)");
        }
        if config.dry_run {
            println!("  Dry run mode: enabled (no files will be created)");
        }
        println!();
    }

    if store.is_empty() {
        if !json {
            println!("{}", style("ROI store is empty, nothing to crop").red());
        }
        return Ok(());
    }

    if !config.dry_run {
        fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;
    }

    let dry_run = config.dry_run;
    let engine = CropEngine::new(config)?;
    let total = store.len();

    let progress = create_progress_bar(total as u64)?;
    if json {
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    progress.set_message("Cropping");

    let results = engine.process_store(&store, &args.output_dir, |count, path| {
        if json {
            JsonMessage::progress(count, total, format!("Cropped {}", path.display()));
        } else {
            progress.inc(1);
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                progress.set_message(name.to_string());
            }
        }
    });
    progress.finish_with_message("Done");

    let successes: Vec<&CropResult> = results
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .collect();
    let failures: Vec<(&PathBuf, &anyhow::Error)> = results
        .iter()
        .filter_map(|(path, r)| r.as_ref().err().map(|e| (path, e)))
        .collect();
    let total_time = start_time.elapsed();

    if json {
        for (path, result) in &results {
            match result {
                Ok(crop) => JsonMessage::file_completed(
                    &crop.input_path,
                    &crop.output_path,
                    crop.effective_roi.into(),
                    crop.processing_time.as_millis(),
                ),
                Err(e) => JsonMessage::file_failed(path, format!("{:#}", e)),
            }
        }
        JsonMessage::summary(total, successes.len(), failures.len(), total_time.as_secs_f64());
        return Ok(());
    }

    println!();
    let header = if dry_run {
        style("Dry Run Results Summary:").bold().cyan()
    } else {
        style("Results Summary:").bold().green()
    };
    println!("{}", header);
    let processed_label = if dry_run {
        "Would be cropped"
    } else {
        "Successfully cropped"
    };
    println!("  {}: {}", processed_label, style(successes.len()).bold().green());
    if !failures.is_empty() {
        println!("  Failed: {}", style(failures.len()).bold().red());
    }

    if verbose && !successes.is_empty() {
        println!();
        crop_table(&successes).printstd();
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total processing time: {}",
        style(format_duration(total_time)).bold()
    );
    println!(
        "  Average time per image: {}",
        style(format_duration(total_time / total as u32)).dim()
    );
    println!("  Output directory: {}", args.output_dir.display());

    if !failures.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, (path, error)) in failures.iter().enumerate() {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown");
            println!(
                "  {}: {} - {:#}",
                style(format!("#{}", i + 1)).dim(),
                style(filename).bold().red(),
                error
            );
        }
    }

    Ok(())
}

fn run_split(args: &SplitArgs, verbose: bool, json: bool) -> Result<()> {
    let records = match (&args.records, &args.rois, &args.labels) {
        (Some(records), _, _) => load_records(records)?,
        (None, Some(rois), Some(labels_path)) => {
            let store = RoiStore::load(rois)
                .with_context(|| format!("Failed to load ROI store: {}", rois.display()))?;
            let contents = fs::read_to_string(labels_path).with_context(|| {
                format!("Failed to read labels file: {}", labels_path.display())
            })?;
            let labels: HashMap<String, String> = serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse labels file: {}", labels_path.display())
            })?;

            let (records, unlabeled) = attach_labels(&store, &labels);
            if !unlabeled.is_empty() && !json {
                warn_println(&format!("{} images in the store have no label", unlabeled.len()));
                for path in &unlabeled {
                    verbose_println(verbose, &format!("No label: {}", path));
                }
            }
            records
        }
        _ => return Err(anyhow::anyhow!("Either --records or --rois with --labels is required")),
    };

    let split = split_data_labels(&records);

    if let Some(output) = &args.output {
        let contents = serde_json::to_string_pretty(&split).context("Failed to serialize split")?;
        fs::write(output, contents)
            .with_context(|| format!("Failed to write output: {}", output.display()))?;
    }

    if json {
        JsonMessage::LabelMap {
            labels: split.label_map.as_slice().to_vec(),
            counts: split.label_map.counts(&split.labels),
        }
        .emit();
        return Ok(());
    }

    println!("{}", style("Split Summary:").bold().green());
    println!("  Records: {}", style(split.data.len()).bold());
    println!("  Distinct labels: {}", style(split.label_map.len()).bold());
    if let Some(output) = &args.output {
        println!("  Written to: {}", output.display());
    }

    if args.table || verbose {
        println!();
        label_table(&split.label_map, &split.labels).printstd();
    }

    Ok(())
}

fn run_inspect(args: &InspectArgs, json: bool) -> Result<()> {
    if !is_roi_store_file(&args.file) {
        return Err(anyhow::anyhow!("Not an ROI store: {}", args.file.display()));
    }

    let store = RoiStore::load(&args.file)
        .with_context(|| format!("Failed to load ROI store: {}", args.file.display()))?;

    if json {
        println!("{}", serde_json::to_string(&store)?);
        return Ok(());
    }

    println!(
        "{} {} ({} entries)",
        style("ROI store:").bold(),
        args.file.display(),
        store.len()
    );
    store_table(&store).printstd();

    let empty = store.iter().filter(|(_, roi)| roi.is_empty()).count();
    if empty > 0 {
        warn_println(&format!("{} entries have a zero width or height", empty));
    }

    Ok(())
}
