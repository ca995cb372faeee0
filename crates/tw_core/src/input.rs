//! Frame-indexed input snapshot handed to the simulation once per frame.
//!
//! Buttons carry both a level and an edge view:
//!
//! - **Level-triggered (held):** `is_held()` is true every frame the button
//!   ended down. Used for continuous actions like movement.
//!
//! - **Edge-triggered (was_pressed / was_released):** derived from the number
//!   of half transitions that happened during the frame, so a tap that goes
//!   down and up inside one frame is still seen as a press.
//!
//! Every type here is `#[repr(C)]` and `Pod`: the byte layout of [`GameInput`]
//! is what input recordings store on disk.

use bytemuck::{Pod, Zeroable};

pub const BUTTON_COUNT: usize = 12;
pub const MAX_CONTROLLERS: usize = 5;
pub const MOUSE_BUTTON_COUNT: usize = 5;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ButtonState {
    pub half_transition_count: i32,
    pub ended_down: u32,
}

impl ButtonState {
    pub fn is_held(&self) -> bool {
        self.ended_down != 0
    }

    pub fn was_pressed(&self) -> bool {
        self.half_transition_count > 1 || (self.half_transition_count == 1 && self.is_held())
    }

    pub fn was_released(&self) -> bool {
        self.half_transition_count > 1 || (self.half_transition_count == 1 && !self.is_held())
    }

    /// Feeds the button's current physical state. Repeats of the same state
    /// do not count as transitions.
    pub fn process(&mut self, is_down: bool) {
        if self.is_held() != is_down {
            self.ended_down = u32::from(is_down);
            self.half_transition_count += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ActionUp,
    ActionDown,
    ActionLeft,
    ActionRight,
    ShoulderLeft,
    ShoulderRight,
    Start,
    Back,
}

impl Button {
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::MoveUp,
        Button::MoveDown,
        Button::MoveLeft,
        Button::MoveRight,
        Button::ActionUp,
        Button::ActionDown,
        Button::ActionLeft,
        Button::ActionRight,
        Button::ShoulderLeft,
        Button::ShoulderRight,
        Button::Start,
        Button::Back,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ControllerInput {
    pub is_connected: u32,
    pub is_analog: u32,
    /// Dead-zone adjusted, in -1..=1.
    pub stick_average_x: f32,
    pub stick_average_y: f32,
    pub buttons: [ButtonState; BUTTON_COUNT],
}

impl ControllerInput {
    pub fn is_connected(&self) -> bool {
        self.is_connected != 0
    }

    pub fn is_analog(&self) -> bool {
        self.is_analog != 0
    }

    pub fn button(&self, button: Button) -> &ButtonState {
        &self.buttons[button.index()]
    }

    pub fn button_mut(&mut self, button: Button) -> &mut ButtonState {
        &mut self.buttons[button.index()]
    }

    pub fn set_stick(&mut self, x: f32, y: f32) {
        self.is_analog = 1;
        self.stick_average_x = x.clamp(-1.0, 1.0);
        self.stick_average_y = y.clamp(-1.0, 1.0);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GameInput {
    pub mouse_buttons: [ButtonState; MOUSE_BUTTON_COUNT],
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub mouse_z: i32,
    /// Seconds to simulate this frame.
    pub frame_delta: f32,
    pub controllers: [ControllerInput; MAX_CONTROLLERS],
}

impl GameInput {
    pub fn new(frame_delta: f32) -> Self {
        Self {
            frame_delta,
            ..Self::default()
        }
    }

    pub fn controller(&self, index: usize) -> Option<&ControllerInput> {
        self.controllers.get(index)
    }

    pub fn controller_mut(&mut self, index: usize) -> Option<&mut ControllerInput> {
        self.controllers.get_mut(index)
    }

    /// Starts the following frame: held state carries over, transition counts
    /// and stick values are cleared for the platform to fill in again.
    pub fn next_frame(&self) -> Self {
        let mut next = *self;
        for button in next.mouse_buttons.iter_mut() {
            button.half_transition_count = 0;
        }
        for controller in next.controllers.iter_mut() {
            controller.is_analog = 0;
            controller.stick_average_x = 0.0;
            controller.stick_average_y = 0.0;
            for button in controller.buttons.iter_mut() {
                button.half_transition_count = 0;
            }
        }
        next
    }
}
