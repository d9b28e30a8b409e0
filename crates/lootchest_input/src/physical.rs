use std::collections::HashMap;

use glam::Vec2;

use crate::logical::{ActionId, ActionState, AxisId, AxisState, ButtonPhase};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MouseButtonId {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MouseAxis {
    Wheel,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DeviceKind {
    Keyboard(u16),
    MouseButton(MouseButtonId),
    MouseAxis(MouseAxis),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PhysicalInputId {
    pub device: DeviceKind,
}

impl PhysicalInputId {
    pub fn key(code: u16) -> Self {
        Self {
            device: DeviceKind::Keyboard(code),
        }
    }

    pub fn mouse(button: MouseButtonId) -> Self {
        Self {
            device: DeviceKind::MouseButton(button),
        }
    }

    pub fn wheel() -> Self {
        Self {
            device: DeviceKind::MouseAxis(MouseAxis::Wheel),
        }
    }
}

/// Raw device state plus the logical state resolved from it each frame.
#[derive(Default, Debug)]
pub struct InputState {
    pub physical_buttons: HashMap<PhysicalInputId, bool>,
    pub physical_axes: HashMap<PhysicalInputId, f32>,

    pub actions: HashMap<ActionId, ActionState>,
    pub axes: HashMap<AxisId, AxisState>,

    pub pointer_position: Option<Vec2>,
    pub pointer_delta: Vec2,
}

impl InputState {
    pub fn set_button(&mut self, input: PhysicalInputId, pressed: bool) {
        self.physical_buttons.insert(input, pressed);
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if let Some(previous) = self.pointer_position {
            self.pointer_delta += position - previous;
        }
        self.pointer_position = Some(position);
    }

    pub fn pointer_left(&mut self) {
        self.pointer_position = None;
    }

    /// Accumulates wheel movement in lines; positive scrolls away from the user.
    pub fn wheel_scrolled(&mut self, lines: f32) {
        *self.physical_axes.entry(PhysicalInputId::wheel()).or_insert(0.0) += lines;
    }

    pub fn phase(&self, action: ActionId) -> ButtonPhase {
        self.actions
            .get(&action)
            .map(|a| a.phase)
            .unwrap_or(ButtonPhase::NONE)
    }

    pub fn just_pressed(&self, action: ActionId) -> bool {
        self.phase(action).contains(ButtonPhase::PRESSED)
    }

    pub fn held(&self, action: ActionId) -> bool {
        self.phase(action).contains(ButtonPhase::HELD)
    }

    pub fn axis(&self, axis: AxisId) -> f32 {
        self.axes.get(&axis).map(|a| a.value).unwrap_or(0.0)
    }

    /// Clears per-frame deltas once everything has read them.
    pub fn end_frame(&mut self) {
        self.pointer_delta = Vec2::ZERO;
        self.physical_axes.clear();
    }
}
