use crate::error::{CycleError, Result};
use crate::mappings::KeyNames;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Клавиша-модификатор
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

impl Modifier {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Ctrl),
            "alt" | "mod1" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "super" | "meta" | "win" => Some(Self::Super),
            _ => None,
        }
    }

    /// evdev коды левого и правого варианта
    pub fn key_codes(&self) -> [KeyCode; 2] {
        match self {
            Self::Ctrl => [KeyCode(29), KeyCode(97)],
            Self::Alt => [KeyCode(56), KeyCode(100)],
            Self::Shift => [KeyCode(42), KeyCode(54)],
            Self::Super => [KeyCode(125), KeyCode(126)],
        }
    }

    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        [Self::Ctrl, Self::Alt, Self::Shift, Self::Super]
            .into_iter()
            .find(|m| m.key_codes().contains(&code))
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Super => "super",
        };
        write!(f, "{}", name)
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match KeyNames::name(self.0) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "KEY_{}", self.0),
        }
    }
}

/// Набор зажатых модификаторов
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.set(modifier, true);
        self
    }

    pub fn set(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Ctrl => self.ctrl = held,
            Modifier::Alt => self.alt = held,
            Modifier::Shift => self.shift = held,
            Modifier::Super => self.super_key = held,
        }
    }
}

/// Сочетание горячих клавиш: набор модификаторов + одна клавиша, например `Alt+Shift+E`.
///
/// Равенство и хэш считаются по набору модификаторов, порядок записи важен только
/// для `hold_modifier` и `Display`.
#[derive(Debug, Clone)]
pub struct KeySpec {
    /// Модификаторы в порядке записи в конфигурации
    modifiers: SmallVec<[Modifier; 4]>,
    key: KeyCode,
}

impl PartialEq for KeySpec {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.modifier_set() == other.modifier_set()
    }
}

impl Eq for KeySpec {}

impl Hash for KeySpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.modifier_set().hash(state);
        self.key.hash(state);
    }
}

impl KeySpec {
    pub fn modifier_set(&self) -> Modifiers {
        self.modifiers
            .iter()
            .fold(Modifiers::new(), |set, m| set.with(*m))
    }

    /// Модификатор, удержание которого продолжает жест (первый в записи)
    pub fn hold_modifier(&self) -> Option<Modifier> {
        self.modifiers.first().copied()
    }

    /// Срабатывает ли сочетание на нажатие `key` при зажатых `held`
    pub fn matches(&self, key: KeyCode, held: Modifiers) -> bool {
        self.key == key && self.modifier_set() == held
    }
}

impl FromStr for KeySpec {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self> {
        let mut modifiers: SmallVec<[Modifier; 4]> = SmallVec::new();
        let mut key = None;

        for part in s.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(crate::cycle_error!(invalid_keybind, "пустой элемент в '{}'", s));
            }

            if let Some(modifier) = Modifier::parse(part) {
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
                continue;
            }

            let code = KeyNames::code(part).ok_or_else(|| {
                crate::cycle_error!(invalid_keybind, "неизвестная клавиша '{}' в '{}'", part, s)
            })?;

            if key.replace(KeyCode(code)).is_some() {
                return Err(crate::cycle_error!(
                    invalid_keybind,
                    "в '{}' больше одной обычной клавиши",
                    s
                ));
            }
        }

        let key = key.ok_or_else(|| {
            crate::cycle_error!(invalid_keybind, "в '{}' нет обычной клавиши", s)
        })?;

        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_keybinds() {
        let add: KeySpec = "Alt+Shift+E".parse().unwrap();
        assert_eq!(add.modifiers.as_slice(), &[Modifier::Alt, Modifier::Shift]);
        assert_eq!(add.key, KeyCode(18));

        let cycle: KeySpec = "Alt+Tab".parse().unwrap();
        assert_eq!(cycle.hold_modifier(), Some(Modifier::Alt));
        assert_eq!(cycle.key, KeyCode(15));
        assert_eq!(cycle.to_string(), "alt+tab");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("Alt+Shift".parse::<KeySpec>().is_err());
        assert!("Alt++Tab".parse::<KeySpec>().is_err());
        assert!("Alt+Tab+E".parse::<KeySpec>().is_err());
        assert!("Hyper+Tab".parse::<KeySpec>().is_err());
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let spec: KeySpec = "Alt+Tab".parse().unwrap();
        let alt = Modifiers::new().with(Modifier::Alt);

        assert!(spec.matches(KeyCode(15), alt));
        assert!(!spec.matches(KeyCode(15), alt.with(Modifier::Shift)));
        assert!(!spec.matches(KeyCode(15), Modifiers::new()));
        assert!(!spec.matches(KeyCode(18), alt));
    }

    #[test]
    fn test_modifier_order_does_not_change_identity() {
        use std::collections::HashSet;

        let written: KeySpec = "Alt+Shift+E".parse().unwrap();
        let swapped: KeySpec = "Shift+Alt+E".parse().unwrap();

        assert_eq!(written, swapped);
        assert_eq!(HashSet::from([written.clone(), swapped.clone()]).len(), 1);
        assert_eq!(written.hold_modifier(), Some(Modifier::Alt));
        assert_eq!(swapped.hold_modifier(), Some(Modifier::Shift));
        assert_ne!(written, "Alt+E".parse::<KeySpec>().unwrap());
    }

    #[test]
    fn test_modifier_from_key_code() {
        assert_eq!(Modifier::from_key_code(KeyCode(100)), Some(Modifier::Alt));
        assert_eq!(Modifier::from_key_code(KeyCode(42)), Some(Modifier::Shift));
        assert_eq!(Modifier::from_key_code(KeyCode(15)), None);
    }
}
