// src/main.rs

//! `display-info`: reports what the X11 display backend sees on this machine.
//!
//! Usage: `display-info [--modes] [--json]`

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;
use x11_display_backend::config::CONFIG;
use x11_display_backend::display::{CursorCapabilities, DisplayMode, PbufferCapabilities};
use x11_display_backend::{DisplayImplementation, X11Display};

#[derive(Debug, Serialize)]
struct Report {
    desktop: DisplayMode,
    modes: Option<Vec<DisplayMode>>,
    gamma_ramp_length: Option<usize>,
    cursor_capabilities: CursorCapabilities,
    min_cursor_size: u32,
    max_cursor_size: u32,
    pbuffer_capabilities: PbufferCapabilities,
}

#[derive(Debug, Default)]
struct Options {
    modes: bool,
    json: bool,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--modes" => options.modes = true,
            "--json" => options.json = true,
            other => anyhow::bail!("unknown argument '{}' (expected --modes or --json)", other),
        }
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(CONFIG.logging.default_filter.as_str()),
    )
    .format_timestamp_micros()
    .init();

    let options = parse_args()?;
    let display = X11Display::from_config();

    let desktop = display.init().context("Failed to query the desktop mode")?;
    info!("Desktop mode: {}", desktop);

    let modes = if options.modes {
        Some(
            display
                .get_available_display_modes()
                .context("Failed to list display modes")?,
        )
    } else {
        None
    };

    // Gamma needs the XFree86-VidModeExtension, which not every server has.
    let gamma_ramp_length = match display.get_gamma_ramp_length() {
        Ok(length) => Some(length),
        Err(e) => {
            warn!("Gamma ramp unavailable: {}", e);
            None
        }
    };

    let report = Report {
        desktop,
        modes,
        gamma_ramp_length,
        cursor_capabilities: display
            .get_native_cursor_capabilities()
            .context("Failed to query cursor capabilities")?,
        min_cursor_size: display
            .get_min_cursor_size()
            .context("Failed to query minimum cursor size")?,
        max_cursor_size: display
            .get_max_cursor_size()
            .context("Failed to query maximum cursor size")?,
        pbuffer_capabilities: display
            .get_pbuffer_capabilities()
            .context("Failed to query pbuffer capabilities")?,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("desktop:             {}", report.desktop);
    if let Some(modes) = &report.modes {
        println!("modes:");
        for mode in modes {
            println!("  {}", mode);
        }
    }
    match report.gamma_ramp_length {
        Some(length) => println!("gamma ramp length:   {}", length),
        None => println!("gamma ramp length:   unavailable"),
    }
    println!("cursor capabilities: {:?}", report.cursor_capabilities);
    println!(
        "cursor sizes:        {}..={}",
        report.min_cursor_size, report.max_cursor_size
    );
    println!("pbuffers:            {:?}", report.pbuffer_capabilities);
    Ok(())
}
