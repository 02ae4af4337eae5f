// src/platform/linux_display/tests.rs

use super::*;
use crate::testing::{CountingLock, Recorder, RecordingBindings, RecordingLoader};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

type TestDisplay = LinuxDisplay<RecordingBindings, RecordingLoader>;

fn fixture() -> (TestDisplay, Recorder, Arc<CountingLock>) {
    let lock = Arc::new(CountingLock::new());
    let recorder = Recorder::new(Arc::clone(&lock));
    let display = LinuxDisplay::with_lock(recorder.bindings(), recorder.loader(), lock.clone());
    (display, recorder, lock)
}

fn assert_lock_balanced(lock: &CountingLock) {
    assert!(!lock.is_held(), "toolkit lock still held");
    assert_eq!(lock.locks(), lock.unlocks());
}

const ARROW: [u32; 4] = [0xFF00_0000, 0xFFFF_FFFF, 0x0000_0000, 0xFF00_0000];

// --- Locking ---

#[test_log::test]
fn every_native_call_happens_under_the_lock() {
    let (display, recorder, lock) = fixture();

    display.init().unwrap();
    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();
    display
        .create_window(&peer, &DisplayMode::new(640, 480, 24, 60), false, 10, 10)
        .unwrap();
    display.set_title("smoke");
    display.update();
    display.create_mouse();
    display.grab_mouse(true);
    display.create_keyboard().unwrap();
    let mut keys = [0u8; KEYBOARD_SIZE];
    display.poll_keyboard(&mut keys);
    display.destroy_keyboard();
    display.destroy_mouse();
    display.destroy_window();
    display.destroy_peer_info(peer);

    let calls = recorder.calls();
    assert!(!calls.is_empty());
    assert!(
        calls.iter().all(|call| call.lock_held),
        "calls outside the lock: {:?}",
        calls.iter().filter(|c| !c.lock_held).collect::<Vec<_>>()
    );
    assert_lock_balanced(&lock);
}

#[test]
fn each_operation_takes_the_lock_exactly_once() {
    let (display, _recorder, lock) = fixture();

    display.init().unwrap();
    assert_eq!((lock.locks(), lock.unlocks()), (1, 1));

    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();
    assert_eq!((lock.locks(), lock.unlocks()), (2, 2));

    display.destroy_peer_info(peer);
    assert_eq!((lock.locks(), lock.unlocks()), (3, 3));

    display.get_gamma_ramp_length().unwrap();
    display.get_max_cursor_size().unwrap();
    assert_eq!((lock.locks(), lock.unlocks()), (5, 5));
}

#[test]
fn lock_is_released_when_a_native_call_fails() {
    let (display, recorder, lock) = fixture();
    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();
    let injected = DisplayError::platform("XCreateWindow", "BadMatch");
    recorder.fail("create_window", injected.clone());

    let err = display
        .create_window(&peer, &DisplayMode::new(640, 480, 24, 60), true, 0, 0)
        .unwrap_err();

    assert_eq!(err, injected);
    assert_lock_balanced(&lock);
    display.destroy_peer_info(peer);
}

#[test]
fn lock_is_released_when_a_native_call_panics() {
    let (display, recorder, lock) = fixture();
    recorder.panic_on("set_title");

    let result = catch_unwind(AssertUnwindSafe(|| display.set_title("boom")));

    assert!(result.is_err());
    assert_lock_balanced(&lock);
    // The backend stays usable afterwards.
    assert_eq!(display.init().unwrap(), DisplayMode::new(1024, 768, 24, 60));
    assert_eq!(display.display_usage(), 0);
}

#[test]
fn panic_during_peer_creation_does_not_leak_usage() {
    let (display, recorder, lock) = fixture();
    recorder.panic_on("create_display_peer");

    let result = catch_unwind(AssertUnwindSafe(|| {
        display.create_peer_info(&PixelFormat::default())
    }));

    assert!(result.is_err());
    assert_lock_balanced(&lock);
    assert_eq!(display.display_usage(), 0);
    assert_eq!(recorder.library_refs(), 0);
    assert!(!recorder.is_display_open());
}

// --- Acquisition and rollback ---

#[test_log::test]
fn failed_peer_construction_rolls_back_in_reverse_order() {
    let (display, recorder, lock) = fixture();
    let injected = DisplayError::platform("glXChooseVisual", "no matching visual");
    recorder.fail("create_display_peer", injected.clone());

    let err = display.create_peer_info(&PixelFormat::default()).unwrap_err();

    assert_eq!(err, injected);
    assert_eq!(
        recorder.call_names(),
        [
            "open_display",
            "load_library",
            "create_display_peer",
            "unload_library",
            "close_display"
        ]
    );
    assert_eq!(display.display_usage(), 0);
    assert_eq!((recorder.loads(), recorder.unloads()), (1, 1));
    assert_lock_balanced(&lock);
}

#[test]
fn failed_library_load_releases_display_usage() {
    let (display, recorder, _lock) = fixture();
    let injected = DisplayError::LibraryLoad("libGL.so.1: cannot open shared object file".into());
    recorder.fail("load_library", injected.clone());

    let err = display.create_peer_info(&PixelFormat::default()).unwrap_err();

    assert_eq!(err, injected);
    assert_eq!(
        recorder.call_names(),
        ["open_display", "load_library", "close_display"]
    );
    assert_eq!(recorder.unloads(), 0);
    assert_eq!(display.display_usage(), 0);
}

#[test]
fn failed_display_open_touches_nothing_else() {
    let (display, recorder, _lock) = fixture();
    let injected = DisplayError::DisplayUnavailable("no X server".into());
    recorder.fail("open_display", injected.clone());

    assert_eq!(
        display.create_pbuffer(64, 64, &PixelFormat::default()).unwrap_err(),
        injected
    );
    assert_eq!(recorder.call_names(), ["open_display"]);
    assert_eq!(display.display_usage(), 0);

    // A later attempt opens again from scratch.
    recorder.succeed("open_display");
    let pbuffer = display.create_pbuffer(64, 64, &PixelFormat::default()).unwrap();
    assert_eq!(display.display_usage(), 1);
    display.destroy_pbuffer(pbuffer);
    assert_eq!(display.display_usage(), 0);
}

#[test]
fn failed_pbuffer_construction_rolls_back() {
    let (display, recorder, _lock) = fixture();
    recorder.fail("create_pbuffer", DisplayError::platform("glXCreatePbuffer", "BadAlloc"));

    assert!(display.create_pbuffer(4096, 4096, &PixelFormat::default()).is_err());
    assert_eq!(display.display_usage(), 0);
    assert_eq!(recorder.library_refs(), 0);
    assert_eq!(recorder.opens(), recorder.closes());
}

#[test]
fn pbuffer_query_holds_the_library_only_for_the_query() {
    let (display, recorder, lock) = fixture();

    assert_eq!(
        display.get_pbuffer_capabilities().unwrap(),
        PbufferCapabilities::PBUFFER_SUPPORTED
    );

    assert_eq!(
        recorder.call_names(),
        [
            "open_display",
            "load_library",
            "pbuffer_capabilities",
            "unload_library",
            "close_display"
        ]
    );
    assert_eq!((recorder.loads(), recorder.unloads()), (1, 1));
    assert_eq!(recorder.library_refs(), 0);
    assert_eq!(display.display_usage(), 0);
    assert_lock_balanced(&lock);
}

#[test]
fn pbuffer_query_reuses_a_loaded_library() {
    let (display, recorder, _lock) = fixture();
    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();

    display.get_pbuffer_capabilities().unwrap();

    assert_eq!(recorder.library_refs(), 1);
    assert_eq!(recorder.opens(), 1);
    display.destroy_peer_info(peer);
    assert_eq!((recorder.loads(), recorder.unloads()), (2, 2));
}

#[test]
fn pbuffer_query_without_gl_library_reports_no_support() {
    let (display, recorder, _lock) = fixture();
    recorder.fail(
        "load_library",
        DisplayError::LibraryLoad("libGL.so.1: cannot open shared object file".into()),
    );

    assert!(display.get_pbuffer_capabilities().unwrap().is_empty());
    assert_eq!(
        recorder.call_names(),
        ["open_display", "load_library", "close_display"]
    );
    assert_eq!(recorder.unloads(), 0);
    assert_eq!(display.display_usage(), 0);
}

// --- Display usage ---

#[test_log::test]
fn create_and_destroy_scenario() {
    let (display, recorder, lock) = fixture();

    let desktop = display.init().unwrap();
    assert_eq!(desktop, DisplayMode::new(1024, 768, 24, 60));
    assert_eq!(display.display_usage(), 0);
    assert!(!recorder.is_display_open());

    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();
    assert_eq!(display.display_usage(), 1);
    assert_eq!(recorder.library_refs(), 1);

    display.create_window(&peer, &desktop, true, 0, 0).unwrap();
    display.switch_display_mode(&DisplayMode::new(800, 600, 24, 60)).unwrap();
    display.reset_display_mode();
    display.destroy_window();

    recorder.clear_calls();
    display.destroy_peer_info(peer);
    assert_eq!(
        recorder.call_names(),
        ["destroy_display_peer", "unload_library", "close_display"]
    );
    assert_eq!(display.display_usage(), 0);
    assert_eq!(recorder.library_refs(), 0);
    assert_eq!((recorder.opens(), recorder.closes()), (2, 2));
    assert_lock_balanced(&lock);
}

#[test]
fn live_resources_share_one_connection() {
    let (display, recorder, _lock) = fixture();

    let first = display.create_peer_info(&PixelFormat::default()).unwrap();
    let pbuffer = display.create_pbuffer(256, 256, &PixelFormat::default()).unwrap();
    let cursor = display
        .create_cursor(&CursorImage::still(2, 2, 0, 0, &ARROW))
        .unwrap();
    assert_eq!(display.display_usage(), 3);
    assert_eq!(recorder.opens(), 1);
    assert_eq!(recorder.library_refs(), 2);

    // Transient queries ride on the open connection.
    display.get_available_display_modes().unwrap();
    display.get_native_cursor_capabilities().unwrap();
    assert_eq!(recorder.opens(), 1);
    assert_eq!(display.display_usage(), 3);

    display.destroy_peer_info(first);
    display.destroy_cursor(cursor);
    assert_eq!(recorder.closes(), 0);
    display.destroy_pbuffer(pbuffer);
    assert_eq!(recorder.closes(), 1);
    assert_eq!(recorder.live_peers(), 0);
    assert_eq!(recorder.live_cursors(), 0);
}

#[test]
fn transient_queries_open_and_close_the_display() {
    let (display, recorder, _lock) = fixture();

    display.init().unwrap();
    display.get_available_display_modes().unwrap();
    assert_eq!(display.get_gamma_ramp_length().unwrap(), 256);
    assert_eq!(display.get_min_cursor_size().unwrap(), 1);
    assert_eq!(display.get_max_cursor_size().unwrap(), 64);
    assert_eq!(
        display.get_pbuffer_capabilities().unwrap(),
        PbufferCapabilities::PBUFFER_SUPPORTED
    );
    assert_eq!(
        display.get_native_cursor_capabilities().unwrap(),
        CursorCapabilities::all()
    );

    assert_eq!((recorder.opens(), recorder.closes()), (7, 7));
    assert_eq!(display.display_usage(), 0);
}

#[test]
fn cursor_capability_failure_propagates_and_releases_usage() {
    let (display, recorder, _lock) = fixture();
    let injected = DisplayError::platform("XcursorSupportsARGB", "extension missing");
    recorder.fail("native_cursor_capabilities", injected.clone());

    assert_eq!(display.get_native_cursor_capabilities().unwrap_err(), injected);
    assert_eq!(display.display_usage(), 0);
    assert_eq!((recorder.opens(), recorder.closes()), (1, 1));
}

#[test]
fn release_without_acquire_never_goes_negative() {
    let (display, recorder, _lock) = fixture();

    display.destroy_cursor(CursorHandle::zeroed());
    display.destroy_cursor(CursorHandle::zeroed());

    assert_eq!(display.display_usage(), 0);
    assert_eq!(recorder.closes(), 0);

    // The counter still works normally afterwards.
    let cursor = display
        .create_cursor(&CursorImage::still(2, 2, 1, 1, &ARROW))
        .unwrap();
    assert_eq!(display.display_usage(), 1);
    display.destroy_cursor(cursor);
    assert_eq!(display.display_usage(), 0);
    assert_eq!((recorder.opens(), recorder.closes()), (1, 1));
}

#[test]
fn balanced_create_destroy_returns_to_zero() {
    let (display, recorder, _lock) = fixture();

    for n in 1..=4 {
        let peers: Vec<_> = (0..n)
            .map(|_| display.create_peer_info(&PixelFormat::default()).unwrap())
            .collect();
        assert_eq!(display.display_usage(), n);
        for peer in peers.into_iter().rev() {
            display.destroy_peer_info(peer);
        }
        assert_eq!(display.display_usage(), 0);
        assert_eq!(recorder.opens(), n);
        assert_eq!(recorder.closes(), n);
    }
    assert_eq!(recorder.library_refs(), 0);
}

// --- Cursors ---

#[test]
fn cursor_creation_failure_releases_usage() {
    let (display, recorder, _lock) = fixture();
    let injected = DisplayError::platform("XcursorImagesLoadCursor", "server refused cursor");
    recorder.fail("create_cursor", injected.clone());

    let err = display
        .create_cursor(&CursorImage::still(2, 2, 0, 0, &ARROW))
        .unwrap_err();

    assert_eq!(err, injected);
    assert_eq!(display.display_usage(), 0);
    assert_eq!(
        recorder.call_names(),
        ["open_display", "create_cursor", "close_display"]
    );
}

#[test]
fn invalid_cursor_image_is_rejected_before_any_native_call() {
    let (display, recorder, lock) = fixture();
    let short = [0u32; 3];

    let err = display
        .create_cursor(&CursorImage::still(2, 2, 0, 0, &short))
        .unwrap_err();

    assert!(matches!(err, DisplayError::InvalidArgument(_)));
    assert!(recorder.calls().is_empty());
    assert_eq!(lock.locks(), 0);
}

#[test]
fn oversized_cursor_is_rejected_without_panicking() {
    let (display, recorder, lock) = fixture();
    let image = CursorImage {
        width: 1 << 30,
        height: 1 << 30,
        num_images: 16,
        ..CursorImage::still(2, 2, 0, 0, &ARROW)
    };

    let err = display.create_cursor(&image).unwrap_err();

    assert!(matches!(err, DisplayError::InvalidArgument(_)));
    assert!(recorder.calls().is_empty());
    assert_eq!(lock.locks(), 0);
}

#[test]
fn created_cursor_carries_the_native_id() {
    let (display, _recorder, _lock) = fixture();
    let cursor = display
        .create_cursor(&CursorImage::still(2, 2, 0, 0, &ARROW))
        .unwrap();
    assert_ne!(cursor.id(), 0);
    display.destroy_cursor(cursor);
}

// --- Unsupported and constant operations ---

#[test]
fn unsupported_pbuffer_operations_make_no_native_calls() {
    let (display, recorder, lock) = fixture();
    let pbuffer = display.create_pbuffer(32, 32, &PixelFormat::default()).unwrap();
    recorder.clear_calls();
    let locks_before = lock.locks();

    assert_eq!(
        display.set_pbuffer_attrib(&pbuffer, 0x2085, 1),
        Err(DisplayError::Unsupported("set_pbuffer_attrib"))
    );
    assert_eq!(
        display.bind_tex_image_to_pbuffer(&pbuffer, 0),
        Err(DisplayError::Unsupported("bind_tex_image_to_pbuffer"))
    );
    assert_eq!(
        display.release_tex_image_from_pbuffer(&pbuffer, 0),
        Err(DisplayError::Unsupported("release_tex_image_from_pbuffer"))
    );
    assert!(!display.is_buffer_lost(&pbuffer));

    assert!(recorder.calls().is_empty());
    assert_eq!(lock.locks(), locks_before);
    display.destroy_pbuffer(pbuffer);
}

#[test]
fn constant_answers_skip_the_lock() {
    let (display, recorder, lock) = fixture();

    assert!(display.has_wheel());
    assert_eq!(display.get_button_count(), NUM_BUTTONS);
    assert_eq!(display.get_adapter(), None);
    assert_eq!(display.get_version(), None);
    assert_eq!(display.is_state_key_set(crate::keys::KEY_CAPITAL), KeyState::Unknown);

    assert_eq!(lock.locks(), 0);
    assert!(recorder.calls().is_empty());
}

// --- Concurrency ---

#[test]
fn concurrent_callers_never_overlap() {
    let (display, recorder, lock) = fixture();
    recorder.set_delay(Duration::from_micros(200));
    let display = Arc::new(display);

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let display = Arc::clone(&display);
            thread::spawn(move || {
                for _ in 0..20 {
                    let peer = display.create_peer_info(&PixelFormat::default()).unwrap();
                    display.get_gamma_ramp_length().unwrap();
                    display.destroy_peer_info(peer);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(recorder.overlaps(), 0);
    assert!(recorder.calls().iter().all(|call| call.lock_held));
    assert_eq!(display.display_usage(), 0);
    assert_eq!(recorder.opens(), recorder.closes());
    assert_eq!(recorder.library_refs(), 0);
    assert_lock_balanced(&lock);
}
