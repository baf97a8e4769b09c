#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Accelerate,
    Reverse,
    SteerLeft,
    SteerRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::Accelerate => 0,
            InputAction::Reverse => 1,
            InputAction::SteerLeft => 2,
            InputAction::SteerRight => 3,
            InputAction::Quit => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_tracked_independently() {
        let mut states = ActionStates::default();
        states.set(InputAction::Accelerate, true);
        states.set(InputAction::SteerLeft, true);
        states.set(InputAction::SteerLeft, false);
        assert!(states.is_down(InputAction::Accelerate));
        assert!(!states.is_down(InputAction::SteerLeft));
        assert!(!states.is_down(InputAction::Quit));
    }
}
