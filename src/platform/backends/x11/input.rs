// src/platform/backends/x11/input.rs
//
// Buffered mouse and keyboard state fed from X events. Nothing here talks to
// the X server; the event pump pushes translated events in and the backend
// drains them on poll/read.

use crate::display::{KeyEvent, MouseEvent, MouseState, KEYBOARD_SIZE, NUM_BUTTONS};
use log::trace;
use std::collections::VecDeque;

/// Wheel delta reported per wheel notch.
pub const WHEEL_SCALE: i32 = 120;

/// Pushes onto a bounded queue, dropping the oldest entry once full.
fn push_bounded<T>(queue: &mut VecDeque<T>, capacity: usize, item: T) {
    if capacity == 0 {
        return;
    }
    if queue.len() == capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

fn drain_into<T>(queue: &mut VecDeque<T>, buffer: &mut [T]) -> usize {
    let count = queue.len().min(buffer.len());
    for (slot, item) in buffer.iter_mut().zip(queue.drain(..count)) {
        *slot = item;
    }
    count
}

/// Maps an X pointer button to a backend button index.
/// X numbers left, middle, right as 1, 2, 3; the backend uses 0, 2, 1.
fn button_index(x_button: u32) -> Option<u8> {
    match x_button {
        1 => Some(0),
        2 => Some(2),
        3 => Some(1),
        _ => None,
    }
}

#[derive(Debug)]
pub struct MouseInput {
    active: bool,
    accum_dx: i32,
    accum_dy: i32,
    accum_dwheel: i32,
    buttons: [bool; NUM_BUTTONS],
    last_position: Option<(i32, i32)>,
    events: VecDeque<MouseEvent>,
    capacity: usize,
}

impl MouseInput {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: false,
            accum_dx: 0,
            accum_dy: 0,
            accum_dwheel: 0,
            buttons: [false; NUM_BUTTONS],
            last_position: None,
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Starts collecting input with cleared state.
    pub fn activate(&mut self) {
        self.reset();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.reset();
    }

    fn reset(&mut self) {
        self.accum_dx = 0;
        self.accum_dy = 0;
        self.accum_dwheel = 0;
        self.buttons = [false; NUM_BUTTONS];
        self.last_position = None;
        self.events.clear();
    }

    /// Forgets the last pointer position, so the next motion reports no
    /// delta. Used after the pointer is warped.
    pub fn forget_position(&mut self) {
        self.last_position = None;
    }

    /// Sets the position the next motion is measured from, e.g. the point
    /// a grabbed pointer was warped back to.
    pub fn set_reference(&mut self, x: i32, y: i32) {
        self.last_position = Some((x, y));
    }

    /// Pointer moved to window position (`x`, `y`). The y axis points up.
    pub fn motion(&mut self, x: i32, y: i32) {
        if !self.active {
            return;
        }
        let (dx, dy) = match self.last_position {
            Some((last_x, last_y)) => (x - last_x, last_y - y),
            None => (0, 0),
        };
        self.last_position = Some((x, y));
        if dx == 0 && dy == 0 {
            return;
        }
        self.accum_dx += dx;
        self.accum_dy += dy;
        push_bounded(
            &mut self.events,
            self.capacity,
            MouseEvent {
                button: None,
                pressed: false,
                dx,
                dy,
                dwheel: 0,
            },
        );
    }

    /// A pointer button changed state. Buttons 4 and 5 are the wheel and
    /// only count on press.
    pub fn button(&mut self, x_button: u32, pressed: bool) {
        if !self.active {
            return;
        }
        let dwheel = match x_button {
            4 => WHEEL_SCALE,
            5 => -WHEEL_SCALE,
            _ => 0,
        };
        if dwheel != 0 {
            if pressed {
                self.accum_dwheel += dwheel;
                push_bounded(
                    &mut self.events,
                    self.capacity,
                    MouseEvent {
                        button: None,
                        pressed: false,
                        dx: 0,
                        dy: 0,
                        dwheel,
                    },
                );
            }
            return;
        }
        let Some(index) = button_index(x_button) else {
            trace!("Ignoring X pointer button {}", x_button);
            return;
        };
        self.buttons[usize::from(index)] = pressed;
        push_bounded(
            &mut self.events,
            self.capacity,
            MouseEvent {
                button: Some(index),
                pressed,
                dx: 0,
                dy: 0,
                dwheel: 0,
            },
        );
    }

    /// Copies accumulated deltas and button state into `state` and clears
    /// the deltas.
    pub fn poll(&mut self, state: &mut MouseState) {
        state.dx = self.accum_dx;
        state.dy = self.accum_dy;
        state.dwheel = self.accum_dwheel;
        state.buttons = self.buttons;
        self.accum_dx = 0;
        self.accum_dy = 0;
        self.accum_dwheel = 0;
    }

    pub fn read(&mut self, buffer: &mut [MouseEvent]) -> usize {
        drain_into(&mut self.events, buffer)
    }
}

#[derive(Debug)]
pub struct KeyboardInput {
    active: bool,
    keys: [u8; KEYBOARD_SIZE],
    events: VecDeque<KeyEvent>,
    capacity: usize,
}

impl KeyboardInput {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: false,
            keys: [0; KEYBOARD_SIZE],
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn activate(&mut self) {
        self.keys = [0; KEYBOARD_SIZE];
        self.events.clear();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.keys = [0; KEYBOARD_SIZE];
        self.events.clear();
    }

    /// Records a key transition. Key code 0 (no key) still queues an event
    /// when it carries a character.
    pub fn key(&mut self, key: u8, pressed: bool, character: Option<char>) {
        if !self.active {
            return;
        }
        if key == 0 && character.is_none() {
            return;
        }
        if key != 0 {
            self.keys[usize::from(key)] = u8::from(pressed);
        }
        push_bounded(
            &mut self.events,
            self.capacity,
            KeyEvent {
                key,
                pressed,
                character,
            },
        );
    }

    /// Releases every held key, e.g. when focus is lost.
    pub fn release_all(&mut self) {
        self.keys = [0; KEYBOARD_SIZE];
    }

    pub fn poll(&self, keys: &mut [u8; KEYBOARD_SIZE]) {
        keys.copy_from_slice(&self.keys);
    }

    pub fn read(&mut self, buffer: &mut [KeyEvent]) -> usize {
        drain_into(&mut self.events, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KEY_A, KEY_ESCAPE};

    fn active_mouse(capacity: usize) -> MouseInput {
        let mut mouse = MouseInput::new(capacity);
        mouse.activate();
        mouse
    }

    #[test]
    fn first_motion_only_sets_the_reference_position() {
        let mut mouse = active_mouse(8);
        mouse.motion(10, 10);
        mouse.motion(15, 4);

        let mut state = MouseState::default();
        mouse.poll(&mut state);
        assert_eq!((state.dx, state.dy), (5, 6));

        let mut events = [MouseEvent::default(); 4];
        assert_eq!(mouse.read(&mut events), 1);
        assert_eq!((events[0].dx, events[0].dy), (5, 6));
    }

    #[test]
    fn motion_back_to_reference_reports_nothing() {
        let mut mouse = active_mouse(8);
        mouse.motion(50, 50);
        mouse.set_reference(20, 20);
        mouse.motion(20, 20);
        let mut events = [MouseEvent::default(); 4];
        assert_eq!(mouse.read(&mut events), 0);
    }

    #[test]
    fn poll_clears_deltas_but_keeps_buttons() {
        let mut mouse = active_mouse(8);
        mouse.button(1, true);
        mouse.button(4, true);
        mouse.button(4, false);

        let mut state = MouseState::default();
        mouse.poll(&mut state);
        assert_eq!(state.dwheel, WHEEL_SCALE);
        assert_eq!(state.buttons, [true, false, false]);

        mouse.poll(&mut state);
        assert_eq!(state.dwheel, 0);
        assert_eq!(state.buttons, [true, false, false]);
    }

    #[test]
    fn right_and_middle_buttons_are_swapped() {
        let mut mouse = active_mouse(8);
        mouse.button(3, true);
        mouse.button(2, true);
        let mut events = [MouseEvent::default(); 2];
        assert_eq!(mouse.read(&mut events), 2);
        assert_eq!(events[0].button, Some(1));
        assert_eq!(events[1].button, Some(2));
    }

    #[test]
    fn full_queue_drops_oldest_event() {
        let mut mouse = active_mouse(2);
        mouse.button(1, true);
        mouse.button(1, false);
        mouse.button(3, true);

        let mut events = [MouseEvent::default(); 4];
        assert_eq!(mouse.read(&mut events), 2);
        assert_eq!(events[0].button, Some(0));
        assert!(!events[0].pressed);
        assert_eq!(events[1].button, Some(1));
    }

    #[test]
    fn read_is_limited_by_buffer_length() {
        let mut mouse = active_mouse(8);
        for _ in 0..3 {
            mouse.button(5, true);
        }
        let mut events = [MouseEvent::default(); 2];
        assert_eq!(mouse.read(&mut events), 2);
        assert_eq!(mouse.read(&mut events), 1);
        assert_eq!(events[0].dwheel, -WHEEL_SCALE);
    }

    #[test]
    fn inactive_mouse_ignores_events() {
        let mut mouse = MouseInput::new(8);
        mouse.button(1, true);
        mouse.motion(1, 1);
        let mut events = [MouseEvent::default(); 1];
        assert_eq!(mouse.read(&mut events), 0);
    }

    #[test]
    fn key_transitions_update_key_array_and_queue() {
        let mut keyboard = KeyboardInput::new(8);
        keyboard.activate();
        keyboard.key(KEY_A, true, Some('a'));
        keyboard.key(KEY_ESCAPE, true, None);
        keyboard.key(KEY_ESCAPE, false, None);

        let mut keys = [0u8; KEYBOARD_SIZE];
        keyboard.poll(&mut keys);
        assert_eq!(keys[usize::from(KEY_A)], 1);
        assert_eq!(keys[usize::from(KEY_ESCAPE)], 0);

        let mut events = [KeyEvent::default(); 8];
        assert_eq!(keyboard.read(&mut events), 3);
        assert_eq!(events[0].character, Some('a'));
    }

    #[test]
    fn character_without_key_code_is_still_queued() {
        let mut keyboard = KeyboardInput::new(8);
        keyboard.activate();
        keyboard.key(0, true, Some('é'));
        keyboard.key(0, true, None);
        let mut events = [KeyEvent::default(); 8];
        assert_eq!(keyboard.read(&mut events), 1);
        assert_eq!(events[0].character, Some('é'));
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut keyboard = KeyboardInput::new(8);
        keyboard.activate();
        keyboard.key(KEY_A, true, None);
        keyboard.release_all();
        let mut keys = [0u8; KEYBOARD_SIZE];
        keyboard.poll(&mut keys);
        assert!(keys.iter().all(|&k| k == 0));
    }
}
