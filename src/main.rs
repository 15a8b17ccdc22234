// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! VIKA - Video Interpolated Keyframe Annotator
//!
//! A cross-platform desktop application for annotating videos with
//! bounding boxes that interpolate linearly between saved keyframes.

mod app;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::VikaApp;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("VIKA - Video Interpolated Keyframe Annotator"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "VIKA",
        options,
        Box::new(|_cc| Ok(Box::new(VikaApp::new()))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
