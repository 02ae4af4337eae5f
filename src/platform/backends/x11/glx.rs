// src/platform/backends/x11/glx.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

//! GLX visuals and pbuffers. The GLX entry points come from the libGL
//! loaded by the library loader; they are only reachable while it holds a
//! reference.

use super::connection::Connection;
use crate::display::{PbufferCapabilities, PixelFormat};
use crate::error::{DisplayError, Result};
use crate::platform::library::LoadedGlx;
use log::{debug, trace, warn};

// X11 library imports
use libc::{c_int, c_ulong};
use x11::xlib;
use x11_dl::glx as dl_glx;

// GLX attribute tokens (GL/glx.h)
const GLX_NONE: c_int = 0;
const GLX_RGBA: c_int = 4;
const GLX_DOUBLEBUFFER: c_int = 5;
const GLX_STEREO: c_int = 6;
const GLX_AUX_BUFFERS: c_int = 7;
const GLX_RED_SIZE: c_int = 8;
const GLX_GREEN_SIZE: c_int = 9;
const GLX_BLUE_SIZE: c_int = 10;
const GLX_ALPHA_SIZE: c_int = 11;
const GLX_DEPTH_SIZE: c_int = 12;
const GLX_STENCIL_SIZE: c_int = 13;
const GLX_ACCUM_RED_SIZE: c_int = 14;
const GLX_ACCUM_GREEN_SIZE: c_int = 15;
const GLX_ACCUM_BLUE_SIZE: c_int = 16;
const GLX_ACCUM_ALPHA_SIZE: c_int = 17;
const GLX_DRAWABLE_TYPE: c_int = 0x8010;
const GLX_RENDER_TYPE: c_int = 0x8011;
const GLX_PBUFFER_HEIGHT: c_int = 0x8040;
const GLX_PBUFFER_WIDTH: c_int = 0x8041;
const GLX_RGBA_BIT: c_int = 0x0001;
const GLX_PBUFFER_BIT: c_int = 0x0004;
const GLX_SAMPLE_BUFFERS: c_int = 100_000;
const GLX_SAMPLES: c_int = 100_001;

fn attr(value: u32) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

/// Size attributes shared by visual and framebuffer config selection.
fn push_size_attributes(attribs: &mut Vec<c_int>, pf: &PixelFormat) {
    let accum_channel = attr(pf.accum_bpp / 4);
    attribs.extend_from_slice(&[
        GLX_RED_SIZE,
        1,
        GLX_GREEN_SIZE,
        1,
        GLX_BLUE_SIZE,
        1,
        GLX_ALPHA_SIZE,
        attr(pf.alpha),
        GLX_DEPTH_SIZE,
        attr(pf.depth),
        GLX_STENCIL_SIZE,
        attr(pf.stencil),
        GLX_AUX_BUFFERS,
        attr(pf.num_aux_buffers),
        GLX_ACCUM_RED_SIZE,
        accum_channel,
        GLX_ACCUM_GREEN_SIZE,
        accum_channel,
        GLX_ACCUM_BLUE_SIZE,
        accum_channel,
        GLX_ACCUM_ALPHA_SIZE,
        attr(pf.accum_alpha),
    ]);
    if pf.samples > 0 {
        attribs.extend_from_slice(&[GLX_SAMPLE_BUFFERS, 1, GLX_SAMPLES, attr(pf.samples)]);
    }
}

/// `glXChooseVisual` attribute list for a double-buffered RGBA window.
/// Boolean attributes are bare tokens in this list.
pub fn visual_attributes(pf: &PixelFormat) -> Vec<c_int> {
    let mut attribs = vec![GLX_RGBA, GLX_DOUBLEBUFFER];
    if pf.stereo {
        attribs.push(GLX_STEREO);
    }
    push_size_attributes(&mut attribs, pf);
    attribs.push(GLX_NONE);
    attribs
}

/// `glXChooseFBConfig` attribute list for a single-buffered pbuffer.
pub fn pbuffer_config_attributes(pf: &PixelFormat) -> Vec<c_int> {
    let mut attribs = vec![
        GLX_DRAWABLE_TYPE,
        GLX_PBUFFER_BIT,
        GLX_RENDER_TYPE,
        GLX_RGBA_BIT,
        GLX_DOUBLEBUFFER,
        xlib::False,
        GLX_STEREO,
        if pf.stereo { xlib::True } else { xlib::False },
    ];
    push_size_attributes(&mut attribs, pf);
    attribs.push(GLX_NONE);
    attribs
}

pub fn pbuffer_attributes(width: u32, height: u32) -> [c_int; 5] {
    [
        GLX_PBUFFER_WIDTH,
        attr(width),
        GLX_PBUFFER_HEIGHT,
        attr(height),
        GLX_NONE,
    ]
}

/// Pbuffers are core from GLX 1.3.
pub fn version_supports_pbuffers(major: c_int, minor: c_int) -> bool {
    (major, minor) >= (1, 3)
}

fn query_version(glx: &LoadedGlx, conn: &Connection) -> Option<(c_int, c_int)> {
    let (mut major, mut minor): (c_int, c_int) = (0, 0);
    // SAFETY: display is open; out-pointers are valid locals.
    let ok = unsafe { (glx.glXQueryVersion)(conn.display().cast(), &mut major, &mut minor) };
    (ok != xlib::False).then_some((major, minor))
}

pub fn pbuffer_capabilities(glx: Option<&LoadedGlx>, conn: &Connection) -> PbufferCapabilities {
    let Some(glx) = glx else {
        debug!("GLX not loaded; reporting no pbuffer support.");
        return PbufferCapabilities::empty();
    };
    if !conn.is_open() {
        return PbufferCapabilities::empty();
    }
    match query_version(glx, conn) {
        Some((major, minor)) if version_supports_pbuffers(major, minor) => {
            debug!("GLX {}.{}: pbuffers supported", major, minor);
            PbufferCapabilities::PBUFFER_SUPPORTED
        }
        Some((major, minor)) => {
            debug!("GLX {}.{}: pbuffers need 1.3", major, minor);
            PbufferCapabilities::empty()
        }
        None => {
            warn!("glXQueryVersion failed; reporting no pbuffer support.");
            PbufferCapabilities::empty()
        }
    }
}

/// A GLX visual chosen for a display peer. Freed with [`GlxVisual::free`].
#[derive(Debug)]
pub struct GlxVisual {
    info: *mut xlib::XVisualInfo,
}

impl GlxVisual {
    pub fn choose(glx: &LoadedGlx, conn: &Connection, pf: &PixelFormat) -> Result<Self> {
        let mut attribs = visual_attributes(pf);
        trace!("glXChooseVisual attributes: {:?}", attribs);
        // SAFETY: display is open; the attribute list is GLX_NONE terminated.
        let info = unsafe {
            (glx.glXChooseVisual)(conn.display().cast(), conn.screen(), attribs.as_mut_ptr())
        };
        if info.is_null() {
            return Err(DisplayError::platform(
                "glXChooseVisual",
                format!("no visual matches {:?}", pf),
            ));
        }
        Ok(Self { info: info.cast() })
    }

    pub fn visual(&self) -> *mut xlib::Visual {
        // SAFETY: info is valid until free().
        unsafe { (*self.info).visual }
    }

    pub fn depth(&self) -> c_int {
        // SAFETY: as above.
        unsafe { (*self.info).depth }
    }

    pub fn visual_id(&self) -> xlib::VisualID {
        // SAFETY: as above.
        unsafe { (*self.info).visualid }
    }

    pub fn free(self) {
        // SAFETY: info was returned by glXChooseVisual and is freed once.
        unsafe {
            xlib::XFree(self.info.cast());
        }
    }
}

/// A GLX pbuffer drawable.
#[derive(Debug)]
pub struct GlxPbuffer {
    id: c_ulong,
}

impl GlxPbuffer {
    pub fn create(
        glx: &LoadedGlx,
        conn: &Connection,
        width: u32,
        height: u32,
        pf: &PixelFormat,
    ) -> Result<Self> {
        if !pbuffer_capabilities(Some(glx), conn).contains(PbufferCapabilities::PBUFFER_SUPPORTED) {
            return Err(DisplayError::platform("glXCreatePbuffer", "GLX 1.3 is required"));
        }
        let config_attribs = pbuffer_config_attributes(pf);
        let mut count: c_int = 0;
        // SAFETY: display is open; the attribute list is GLX_NONE terminated.
        let configs = unsafe {
            (glx.glXChooseFBConfig)(
                conn.display().cast(),
                conn.screen(),
                config_attribs.as_ptr(),
                &mut count,
            )
        };
        if configs.is_null() || count <= 0 {
            if !configs.is_null() {
                // SAFETY: configs was allocated by GLX.
                unsafe { xlib::XFree(configs.cast()) };
            }
            return Err(DisplayError::platform(
                "glXChooseFBConfig",
                format!("no pbuffer config matches {:?}", pf),
            ));
        }

        let pbuffer_attribs = pbuffer_attributes(width, height);
        // SAFETY: configs holds at least one entry; it is freed right after.
        let id = unsafe {
            let config: dl_glx::GLXFBConfig = *configs;
            let id = (glx.glXCreatePbuffer)(conn.display().cast(), config, pbuffer_attribs.as_ptr());
            xlib::XFree(configs.cast());
            id
        };
        if id == 0 {
            return Err(DisplayError::platform(
                "glXCreatePbuffer",
                format!("could not create {}x{} pbuffer", width, height),
            ));
        }
        debug!("GLX pbuffer {:#x} created", id);
        Ok(Self { id })
    }

    pub fn id(&self) -> c_ulong {
        self.id
    }

    pub fn destroy(self, glx: &LoadedGlx, conn: &Connection) {
        if !conn.is_open() {
            warn!("GLX pbuffer {:#x} outlived its display; not destroyed.", self.id);
            return;
        }
        // SAFETY: display is open and the pbuffer belongs to it.
        unsafe { (glx.glXDestroyPbuffer)(conn.display().cast(), self.id) };
        debug!("GLX pbuffer {:#x} destroyed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(attribs: &[c_int], key: c_int) -> Option<c_int> {
        attribs
            .chunks(2)
            .find(|pair| pair[0] == key)
            .and_then(|pair| pair.get(1).copied())
    }

    #[test]
    fn visual_attributes_request_double_buffered_rgba() {
        let attribs = visual_attributes(&PixelFormat::default());
        assert_eq!(&attribs[..2], &[GLX_RGBA, GLX_DOUBLEBUFFER]);
        assert_eq!(value_of(&attribs[2..], GLX_DEPTH_SIZE), Some(8));
        assert_eq!(attribs.last(), Some(&GLX_NONE));
        assert!(!attribs.contains(&GLX_SAMPLES));
    }

    #[test]
    fn stereo_and_samples_add_attributes() {
        let pf = PixelFormat {
            stereo: true,
            samples: 4,
            ..PixelFormat::default()
        };
        let attribs = visual_attributes(&pf);
        assert_eq!(attribs[2], GLX_STEREO);
        assert_eq!(value_of(&attribs[3..], GLX_SAMPLES), Some(4));
        assert_eq!(value_of(&attribs[3..], GLX_SAMPLE_BUFFERS), Some(1));
    }

    #[test]
    fn accumulation_bits_are_split_across_channels() {
        let pf = PixelFormat {
            accum_bpp: 32,
            accum_alpha: 8,
            ..PixelFormat::default()
        };
        let attribs = pbuffer_config_attributes(&pf);
        assert_eq!(value_of(&attribs, GLX_ACCUM_RED_SIZE), Some(8));
        assert_eq!(value_of(&attribs, GLX_ACCUM_ALPHA_SIZE), Some(8));
        assert_eq!(value_of(&attribs, GLX_DRAWABLE_TYPE), Some(GLX_PBUFFER_BIT));
        assert_eq!(value_of(&attribs, GLX_DOUBLEBUFFER), Some(xlib::False));
    }

    #[test]
    fn pbuffer_size_attributes() {
        assert_eq!(
            pbuffer_attributes(640, 480),
            [GLX_PBUFFER_WIDTH, 640, GLX_PBUFFER_HEIGHT, 480, GLX_NONE]
        );
    }

    #[test]
    fn pbuffers_need_glx_1_3() {
        assert!(!version_supports_pbuffers(1, 2));
        assert!(version_supports_pbuffers(1, 3));
        assert!(version_supports_pbuffers(1, 4));
        assert!(version_supports_pbuffers(2, 0));
    }
}
