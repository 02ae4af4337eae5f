// src/platform/backends/x11/modes.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

//! Display modes and gamma through the XF86VidMode extension.

use super::connection::Connection;
use crate::display::DisplayMode;
use crate::error::{DisplayError, Result};
use log::{debug, info, warn};
use std::ptr;
use std::slice;

// X11 library imports
use libc::{c_int, c_ushort};
use x11::{xf86vmode, xlib};

/// Refresh rate in Hz of a mode line. `dotclock_khz` is the pixel clock as
/// XF86VidMode reports it.
pub fn refresh_rate(dotclock_khz: u32, htotal: u16, vtotal: u16) -> u32 {
    let pixels_per_frame = u64::from(htotal) * u64::from(vtotal);
    if pixels_per_frame == 0 {
        return 0;
    }
    let hz = (u64::from(dotclock_khz) * 1000 + pixels_per_frame / 2) / pixels_per_frame;
    u32::try_from(hz).unwrap_or(u32::MAX)
}

/// Scales gamma values in [0, 1] to the 16-bit ramp XF86VidMode expects.
/// Out-of-range values are clamped.
pub fn ramp_to_u16(ramp: &[f32]) -> Vec<u16> {
    ramp.iter()
        .map(|&v| {
            let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
            (v * f32::from(u16::MAX)).round() as u16
        })
        .collect()
}

/// Index of the mode line matching `target`'s size, preferring an exact
/// refresh rate match.
pub fn find_mode(modes: &[DisplayMode], target: &DisplayMode) -> Option<usize> {
    modes
        .iter()
        .position(|m| m.same_size(target) && m.frequency == target.frequency)
        .or_else(|| modes.iter().position(|m| m.same_size(target)))
}

fn to_display_mode(info: &xf86vmode::XF86VidModeModeInfo, bits_per_pixel: u32) -> DisplayMode {
    DisplayMode::new(
        u32::from(info.hdisplay),
        u32::from(info.vdisplay),
        bits_per_pixel,
        refresh_rate(info.dotclock, info.htotal, info.vtotal),
    )
}

/// Mode switching and gamma state for one screen.
#[derive(Debug, Default)]
pub struct VidMode {
    desktop: Option<DisplayMode>,
    switched: bool,
    saved_gamma: Option<[Vec<u16>; 3]>,
}

impl VidMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_extension(conn: &Connection) -> Result<()> {
        if !conn.is_open() {
            return Err(DisplayError::DisplayUnavailable(
                "display mode query without an open display".to_string(),
            ));
        }
        let (mut event_base, mut error_base): (c_int, c_int) = (0, 0);
        // SAFETY: display is open; out-pointers are valid locals.
        let present = unsafe {
            xf86vmode::XF86VidModeQueryExtension(conn.display(), &mut event_base, &mut error_base)
        };
        if present == xlib::False {
            return Err(DisplayError::platform(
                "XF86VidModeQueryExtension",
                "XF86VidMode extension not available",
            ));
        }
        Ok(())
    }

    /// Runs `f` over the screen's mode lines. The first line is the current
    /// mode. The lines are freed when `f` returns.
    fn with_mode_lines<R>(
        conn: &Connection,
        f: impl FnOnce(&[*mut xf86vmode::XF86VidModeModeInfo]) -> Result<R>,
    ) -> Result<R> {
        Self::require_extension(conn)?;
        let mut count: c_int = 0;
        let mut lines: *mut *mut xf86vmode::XF86VidModeModeInfo = ptr::null_mut();
        // SAFETY: display is open; XF86VidModeGetAllModeLines allocates `lines`.
        let ok = unsafe {
            xf86vmode::XF86VidModeGetAllModeLines(conn.display(), conn.screen(), &mut count, &mut lines)
        };
        if ok == xlib::False || lines.is_null() {
            return Err(DisplayError::platform(
                "XF86VidModeGetAllModeLines",
                "could not query mode lines",
            ));
        }
        // SAFETY: the server returned `count` valid entries.
        let entries = unsafe { slice::from_raw_parts(lines, usize::try_from(count).unwrap_or(0)) };
        let result = f(entries);
        // SAFETY: lines was allocated by Xlib and is freed once.
        unsafe {
            xlib::XFree(lines.cast());
        }
        result
    }

    /// Records and returns the current (desktop) mode.
    pub fn init(&mut self, conn: &Connection) -> Result<DisplayMode> {
        let bpp = conn.default_depth();
        let mode = Self::with_mode_lines(conn, |lines| {
            let first = lines.first().ok_or_else(|| {
                DisplayError::platform("XF86VidModeGetAllModeLines", "no mode lines reported")
            })?;
            // SAFETY: entries are valid until the list is freed.
            Ok(to_display_mode(unsafe { &**first }, bpp))
        })?;
        self.desktop = Some(mode);
        Ok(mode)
    }

    pub fn available_modes(&self, conn: &Connection) -> Result<Vec<DisplayMode>> {
        let bpp = conn.default_depth();
        let modes = Self::with_mode_lines(conn, |lines| {
            Ok(lines
                .iter()
                // SAFETY: entries are valid until the list is freed.
                .map(|&line| to_display_mode(unsafe { &*line }, bpp))
                .collect::<Vec<_>>())
        })?;
        debug!("{} display modes available", modes.len());
        Ok(modes)
    }

    fn switch_to(&self, conn: &Connection, target: &DisplayMode) -> Result<()> {
        let bpp = conn.default_depth();
        Self::with_mode_lines(conn, |lines| {
            // SAFETY: entries are valid until the list is freed.
            let modes: Vec<DisplayMode> = lines
                .iter()
                .map(|&line| to_display_mode(unsafe { &*line }, bpp))
                .collect();
            let index = find_mode(&modes, target).ok_or_else(|| {
                DisplayError::InvalidArgument(format!("no mode line matches {}", target))
            })?;
            // SAFETY: display is open and the mode line belongs to it.
            let ok = unsafe {
                xf86vmode::XF86VidModeSwitchToMode(conn.display(), conn.screen(), lines[index])
            };
            if ok == xlib::False {
                return Err(DisplayError::platform(
                    "XF86VidModeSwitchToMode",
                    format!("server refused {}", target),
                ));
            }
            // SAFETY: as above.
            unsafe {
                xf86vmode::XF86VidModeSetViewPort(conn.display(), conn.screen(), 0, 0);
            }
            conn.flush();
            Ok(())
        })
    }

    pub fn switch_mode(&mut self, conn: &Connection, mode: &DisplayMode) -> Result<()> {
        self.switch_to(conn, mode)?;
        self.switched = true;
        info!("Switched display mode to {}", mode);
        Ok(())
    }

    /// Restores the desktop mode and any gamma ramp replaced by
    /// [`VidMode::set_gamma_ramp`].
    pub fn reset(&mut self, conn: &Connection) {
        if self.switched {
            match self.desktop {
                Some(desktop) => match self.switch_to(conn, &desktop) {
                    Ok(()) => info!("Restored desktop display mode {}", desktop),
                    Err(e) => warn!("Could not restore desktop display mode: {}", e),
                },
                None => warn!("Display mode was switched before init; nothing to restore."),
            }
            self.switched = false;
        }
        if self.saved_gamma.is_none() {
            return;
        }
        if !conn.is_open() {
            warn!("Display closed; saved gamma ramp kept for the next reset.");
            return;
        }
        if let Some([mut red, mut green, mut blue]) = self.saved_gamma.take() {
            let Ok(size) = c_int::try_from(red.len()) else {
                warn!("Saved gamma ramp of {} entries cannot be restored.", red.len());
                return;
            };
            // SAFETY: display is open; the three ramps have `size` entries.
            unsafe {
                xf86vmode::XF86VidModeSetGammaRamp(
                    conn.display(),
                    conn.screen(),
                    size,
                    red.as_mut_ptr(),
                    green.as_mut_ptr(),
                    blue.as_mut_ptr(),
                );
            }
            conn.flush();
            debug!("Restored saved gamma ramp ({} entries)", size);
        }
    }

    pub fn gamma_ramp_length(&self, conn: &Connection) -> usize {
        if Self::require_extension(conn).is_err() {
            return 0;
        }
        let mut size: c_int = 0;
        // SAFETY: display is open; size is a valid out-pointer.
        let ok = unsafe {
            xf86vmode::XF86VidModeGetGammaRampSize(conn.display(), conn.screen(), &mut size)
        };
        if ok == xlib::False {
            warn!("XF86VidModeGetGammaRampSize failed; reporting no gamma support.");
            return 0;
        }
        usize::try_from(size).unwrap_or(0)
    }

    fn read_gamma(conn: &Connection, size: c_int) -> Option<[Vec<u16>; 3]> {
        let len = usize::try_from(size).ok()?;
        let mut red: Vec<c_ushort> = vec![0; len];
        let mut green: Vec<c_ushort> = vec![0; len];
        let mut blue: Vec<c_ushort> = vec![0; len];
        // SAFETY: display is open; each buffer has `size` entries.
        let ok = unsafe {
            xf86vmode::XF86VidModeGetGammaRamp(
                conn.display(),
                conn.screen(),
                size,
                red.as_mut_ptr(),
                green.as_mut_ptr(),
                blue.as_mut_ptr(),
            )
        };
        (ok != xlib::False).then_some([red, green, blue])
    }

    /// Applies `ramp` to all three channels. The ramp must have exactly
    /// [`VidMode::gamma_ramp_length`] entries.
    pub fn set_gamma_ramp(&mut self, conn: &Connection, ramp: &[f32]) -> Result<()> {
        let length = self.gamma_ramp_length(conn);
        if length == 0 {
            return Err(DisplayError::platform(
                "XF86VidModeSetGammaRamp",
                "gamma ramps are not supported on this display",
            ));
        }
        if ramp.len() != length {
            return Err(DisplayError::InvalidArgument(format!(
                "gamma ramp has {} entries, display expects {}",
                ramp.len(),
                length
            )));
        }
        let size = c_int::try_from(length)
            .map_err(|e| DisplayError::InvalidArgument(e.to_string()))?;
        if self.saved_gamma.is_none() {
            self.saved_gamma = Self::read_gamma(conn, size);
        }
        let mut red = ramp_to_u16(ramp);
        let mut green = red.clone();
        let mut blue = red.clone();
        // SAFETY: display is open; the three ramps have `size` entries.
        let ok = unsafe {
            xf86vmode::XF86VidModeSetGammaRamp(
                conn.display(),
                conn.screen(),
                size,
                red.as_mut_ptr(),
                green.as_mut_ptr(),
                blue.as_mut_ptr(),
            )
        };
        if ok == xlib::False {
            return Err(DisplayError::platform(
                "XF86VidModeSetGammaRamp",
                "server refused gamma ramp",
            ));
        }
        conn.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rate_from_standard_1080p_timing() {
        // 148.5 MHz, 2200 x 1125 total
        assert_eq!(refresh_rate(148_500, 2200, 1125), 60);
    }

    #[test]
    fn refresh_rate_rounds_to_nearest() {
        // 25.175 MHz, 800 x 525 total: 59.94 Hz
        assert_eq!(refresh_rate(25_175, 800, 525), 60);
    }

    #[test]
    fn refresh_rate_with_zero_totals_is_zero() {
        assert_eq!(refresh_rate(148_500, 0, 1125), 0);
        assert_eq!(refresh_rate(148_500, 2200, 0), 0);
    }

    #[test]
    fn gamma_ramp_is_scaled_and_clamped() {
        assert_eq!(
            ramp_to_u16(&[0.0, 0.5, 1.0, -1.0, 2.0, f32::NAN]),
            vec![0, 32768, 65535, 0, 65535, 0]
        );
    }

    #[test]
    fn reset_on_closed_display_keeps_saved_gamma() {
        let mut vid_mode = VidMode::new();
        vid_mode.saved_gamma = Some([vec![0; 4], vec![1; 4], vec![2; 4]]);

        vid_mode.reset(&Connection::closed());

        assert_eq!(
            vid_mode.saved_gamma,
            Some([vec![0; 4], vec![1; 4], vec![2; 4]])
        );
    }

    #[test]
    fn find_mode_prefers_exact_frequency() {
        let modes = [
            DisplayMode::new(1920, 1080, 24, 60),
            DisplayMode::new(1280, 720, 24, 60),
            DisplayMode::new(1280, 720, 24, 75),
        ];
        assert_eq!(find_mode(&modes, &DisplayMode::new(1280, 720, 24, 75)), Some(2));
        assert_eq!(find_mode(&modes, &DisplayMode::new(1280, 720, 24, 50)), Some(1));
        assert_eq!(find_mode(&modes, &DisplayMode::new(800, 600, 24, 60)), None);
    }
}
