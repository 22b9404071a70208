use crate::events::{KeyCode, Modifier, Modifiers};

/// Какие клавиши-модификаторы сейчас зажаты. Левая и правая клавиши учитываются
/// отдельно: отпускание левого Alt при зажатом правом модификатор не снимает.
#[derive(Debug, Default)]
pub struct ModifierState {
    pressed: smallvec::SmallVec<[KeyCode; 8]>,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Обновить состояние; возвращает true, если код был модификатором
    pub fn update_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        if Modifier::from_key_code(key).is_none() {
            return false;
        }

        if pressed {
            if !self.pressed.contains(&key) {
                self.pressed.push(key);
            }
        } else {
            self.pressed.retain(|k| *k != key);
        }
        true
    }

    pub fn to_modifiers(&self) -> Modifiers {
        self.pressed
            .iter()
            .filter_map(|code| Modifier::from_key_code(*code))
            .fold(Modifiers::new(), |set, m| set.with(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT_ALT: KeyCode = KeyCode(56);
    const RIGHT_ALT: KeyCode = KeyCode(100);
    const LEFT_SHIFT: KeyCode = KeyCode(42);

    #[test]
    fn test_tracks_modifiers() {
        let mut state = ModifierState::new();
        assert!(state.update_key(LEFT_ALT, true));
        assert!(state.update_key(LEFT_SHIFT, true));
        assert!(!state.update_key(KeyCode(15), true));

        let held = state.to_modifiers();
        assert!(held.alt && held.shift && !held.ctrl);
    }

    #[test]
    fn test_left_and_right_are_independent() {
        let mut state = ModifierState::new();
        state.update_key(LEFT_ALT, true);
        state.update_key(RIGHT_ALT, true);
        state.update_key(LEFT_ALT, false);
        assert!(state.to_modifiers().alt);

        state.update_key(RIGHT_ALT, false);
        assert_eq!(state.to_modifiers(), Modifiers::new());
    }
}
