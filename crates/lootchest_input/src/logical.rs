use crate::physical::{InputState, MouseButtonId, PhysicalInputId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub u32);
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct AxisId(pub u32);

#[derive(Clone, Debug)]
pub enum BindingKind {
    Button { action: ActionId },
    Axis { axis: AxisId, scale: f32 },
}

#[derive(Clone, Debug)]
pub struct InputBinding {
    pub physical: PhysicalInputId,
    pub kind: BindingKind,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ButtonPhase: u8 {
        const NONE     = 0;
        const PRESSED  = 1 << 0;
        const HELD     = 1 << 1;
        const RELEASED = 1 << 2;
    }
}

#[derive(Clone, Debug)]
pub struct ActionState {
    pub phase: ButtonPhase,
}

#[derive(Clone, Debug)]
pub struct AxisState {
    pub value: f32,
}

#[derive(Default, Clone, Debug)]
pub struct InputMap {
    pub bindings: Vec<InputBinding>,
}

impl InputMap {
    pub fn bind_keyboard_button(&mut self, key_code: u16, action: ActionId) -> &mut Self {
        self.bind_button(PhysicalInputId::key(key_code), action)
    }

    pub fn bind_mouse_button(&mut self, button: MouseButtonId, action: ActionId) -> &mut Self {
        self.bind_button(PhysicalInputId::mouse(button), action)
    }

    pub fn bind_button(&mut self, physical: PhysicalInputId, action: ActionId) -> &mut Self {
        self.bindings.push(InputBinding {
            physical,
            kind: BindingKind::Button { action },
        });
        self
    }

    pub fn bind_axis(&mut self, physical: PhysicalInputId, axis: AxisId, scale: f32) -> &mut Self {
        self.bindings.push(InputBinding {
            physical,
            kind: BindingKind::Axis { axis, scale },
        });
        self
    }

    /// Resolves physical state into action phases and axis values. Run once
    /// per frame before anything reads the logical state.
    pub fn resolve(&self, input_state: &mut InputState) {
        for action in input_state.actions.values_mut() {
            let was_held = action.phase.contains(ButtonPhase::HELD);
            action.phase = if was_held {
                ButtonPhase::HELD
            } else {
                ButtonPhase::NONE
            };
        }
        for axis in input_state.axes.values_mut() {
            axis.value = 0.0;
        }

        for binding in &self.bindings {
            match binding.kind {
                BindingKind::Button { action } => {
                    let pressed = input_state
                        .physical_buttons
                        .get(&binding.physical)
                        .copied()
                        .unwrap_or(false);
                    let entry = input_state.actions.entry(action).or_insert(ActionState {
                        phase: ButtonPhase::NONE,
                    });
                    if pressed {
                        if !entry.phase.contains(ButtonPhase::HELD) {
                            entry.phase |= ButtonPhase::PRESSED;
                        }
                        entry.phase |= ButtonPhase::HELD;
                    } else if entry.phase.contains(ButtonPhase::HELD) {
                        entry.phase &= !ButtonPhase::HELD;
                        entry.phase |= ButtonPhase::RELEASED;
                    }
                }
                BindingKind::Axis { axis, scale } => {
                    let value = input_state
                        .physical_axes
                        .get(&binding.physical)
                        .copied()
                        .unwrap_or(0.0);
                    let entry = input_state
                        .axes
                        .entry(axis)
                        .or_insert(AxisState { value: 0.0 });
                    entry.value += value * scale;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::MouseButtonId;

    const ORBIT: ActionId = ActionId(1);
    const ZOOM: AxisId = AxisId(2);

    fn map() -> InputMap {
        let mut map = InputMap::default();
        map.bind_mouse_button(MouseButtonId::Left, ORBIT)
            .bind_axis(PhysicalInputId::wheel(), ZOOM, -1.0);
        map
    }

    #[test]
    fn press_hold_release_cycle() {
        let map = map();
        let mut state = InputState::default();
        let left = PhysicalInputId::mouse(MouseButtonId::Left);

        state.set_button(left, true);
        map.resolve(&mut state);
        assert!(state.just_pressed(ORBIT));
        assert!(state.held(ORBIT));

        map.resolve(&mut state);
        assert!(!state.just_pressed(ORBIT));
        assert!(state.held(ORBIT));

        state.set_button(left, false);
        map.resolve(&mut state);
        assert_eq!(state.phase(ORBIT), ButtonPhase::RELEASED);

        map.resolve(&mut state);
        assert_eq!(state.phase(ORBIT), ButtonPhase::NONE);
    }

    #[test]
    fn wheel_is_scaled_and_cleared_each_frame() {
        let map = map();
        let mut state = InputState::default();
        state.wheel_scrolled(2.0);
        map.resolve(&mut state);
        assert_eq!(state.axis(ZOOM), -2.0);

        state.end_frame();
        map.resolve(&mut state);
        assert_eq!(state.axis(ZOOM), 0.0);
    }

    #[test]
    fn pointer_delta_accumulates_until_end_of_frame() {
        let mut state = InputState::default();
        state.pointer_moved(glam::Vec2::new(10.0, 10.0));
        state.pointer_moved(glam::Vec2::new(13.0, 8.0));
        state.pointer_moved(glam::Vec2::new(15.0, 8.0));
        assert_eq!(state.pointer_delta, glam::Vec2::new(5.0, -2.0));

        state.end_frame();
        assert_eq!(state.pointer_delta, glam::Vec2::ZERO);
    }
}
