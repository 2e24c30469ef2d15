//! Control-source arbitration
//!
//! Pointer, keyboard and touch can all produce events, but only the channel
//! that spoke last drives the ship. Raw events go in; one [`TickInput`] per
//! frame comes out.

use glam::Vec2;

use crate::sim::{ControlInput, Direction, TickInput};

/// Which input channel is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlSource {
    #[default]
    Pointer,
    Keyboard,
    Touch,
}

/// Collects raw input events between frames
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    source: ControlSource,
    pointer: Option<Vec2>,
    direction: Option<Direction>,
    drag: Vec2,
    special: bool,
    /// Source to restore after a pause
    paused_source: Option<ControlSource>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> ControlSource {
        self.source
    }

    pub fn is_paused(&self) -> bool {
        self.paused_source.is_some()
    }

    /// Pointer moved to `pos` in play-area coordinates
    pub fn pointer_moved(&mut self, pos: Vec2) {
        if !pos.is_finite() {
            return;
        }
        self.pointer = Some(pos);
        self.source = ControlSource::Pointer;
    }

    pub fn key_down(&mut self, direction: Direction) {
        self.direction = Some(direction);
        self.source = ControlSource::Keyboard;
    }

    /// Releasing a key only stops movement if it is the held direction
    pub fn key_up(&mut self, direction: Direction) {
        if self.direction == Some(direction) {
            self.direction = None;
        }
    }

    /// Touch moved by `delta` since the last event
    pub fn drag(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        self.drag += delta;
        self.source = ControlSource::Touch;
    }

    /// Laser button or space bar
    pub fn special_pressed(&mut self) {
        self.special = true;
    }

    /// Freeze input: held keys and pending drags are dropped, the source is
    /// remembered
    pub fn pause(&mut self) {
        if self.paused_source.is_none() {
            self.paused_source = Some(self.source);
            self.direction = None;
            self.drag = Vec2::ZERO;
            self.special = false;
        }
    }

    pub fn resume(&mut self) {
        if let Some(source) = self.paused_source.take() {
            self.source = source;
        }
    }

    /// Build the input for the next frame and clear one-shot state
    pub fn take(&mut self) -> TickInput {
        if self.is_paused() {
            return TickInput::default();
        }

        let control = match self.source {
            ControlSource::Pointer => self.pointer.map_or(ControlInput::None, ControlInput::Pointer),
            ControlSource::Keyboard => ControlInput::Keys(self.direction),
            ControlSource::Touch => ControlInput::Drag(std::mem::take(&mut self.drag)),
        };
        let fire_special = std::mem::take(&mut self.special);
        TickInput {
            control,
            fire_special,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_channel_wins() {
        let mut input = InputTracker::new();
        input.pointer_moved(Vec2::new(10.0, 20.0));
        input.key_down(Direction::Left);
        assert_eq!(input.take().control, ControlInput::Keys(Some(Direction::Left)));

        input.pointer_moved(Vec2::new(30.0, 40.0));
        assert_eq!(input.take().control, ControlInput::Pointer(Vec2::new(30.0, 40.0)));
    }

    #[test]
    fn test_key_up_only_clears_held_direction() {
        let mut input = InputTracker::new();
        input.key_down(Direction::Left);
        input.key_down(Direction::Up);
        input.key_up(Direction::Left);
        assert_eq!(input.take().control, ControlInput::Keys(Some(Direction::Up)));
        input.key_up(Direction::Up);
        assert_eq!(input.take().control, ControlInput::Keys(None));
    }

    #[test]
    fn test_drag_accumulates_and_resets() {
        let mut input = InputTracker::new();
        input.drag(Vec2::new(1.0, 0.0));
        input.drag(Vec2::new(2.0, -1.0));
        assert_eq!(input.take().control, ControlInput::Drag(Vec2::new(3.0, -1.0)));
        assert_eq!(input.take().control, ControlInput::Drag(Vec2::ZERO));
    }

    #[test]
    fn test_special_is_one_shot() {
        let mut input = InputTracker::new();
        input.special_pressed();
        assert!(input.take().fire_special);
        assert!(!input.take().fire_special);
    }

    #[test]
    fn test_pause_restores_source() {
        let mut input = InputTracker::new();
        input.key_down(Direction::Right);
        input.pause();
        input.pointer_moved(Vec2::new(5.0, 5.0));
        assert_eq!(input.take().control, ControlInput::None);

        input.resume();
        assert_eq!(input.source(), ControlSource::Keyboard);
        // The held key was released by the pause
        assert_eq!(input.take().control, ControlInput::Keys(None));
    }
}
