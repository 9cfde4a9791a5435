use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Keys currently held in the window.
#[derive(Debug, Default)]
pub struct InputState {
    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies `ev` and records new presses into `frame`.
    ///
    /// Auto-repeat presses do not count as new transitions.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            // Releases are not delivered to an unfocused window.
            InputEvent::Focused(false) => self.keys_down.clear(),
            InputEvent::Focused(true) => {}

            InputEvent::Key { key, state, repeat } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(key) && !repeat {
                        frame.keys_pressed.insert(key);
                    }
                }
                KeyState::Released => {
                    self.keys_down.remove(&key);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Pressed, repeat: false }
    }

    fn release(key: Key) -> InputEvent {
        InputEvent::Key { key, state: KeyState::Released, repeat: false }
    }

    #[test]
    fn press_is_recorded_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::Escape));
        assert!(frame.pressed(Key::Escape));
        assert!(state.keys_down.contains(&Key::Escape));

        frame.clear();
        state.apply_event(
            &mut frame,
            InputEvent::Key { key: Key::Escape, state: KeyState::Pressed, repeat: true },
        );
        assert!(!frame.pressed(Key::Escape));
    }

    #[test]
    fn release_allows_the_next_press() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::N));
        state.apply_event(&mut frame, release(Key::N));
        assert!(!state.keys_down.contains(&Key::N));

        frame.clear();
        state.apply_event(&mut frame, press(Key::N));
        assert!(frame.pressed(Key::N));
    }

    #[test]
    fn held_key_presses_again_after_focus_loss() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(Key::N));
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());

        frame.clear();
        state.apply_event(&mut frame, press(Key::N));
        assert!(frame.pressed(Key::N));
    }
}
