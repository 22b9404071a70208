use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Таблица имён клавиш, допустимых в сочетаниях горячих клавиш, и их evdev кодов.
/// Модификаторы (ctrl/alt/shift/super) сюда не входят - их разбирает `Modifier`.
pub struct KeyNames;

static NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Буквенные клавиши
    for (name, code) in [
        ("a", 30), ("b", 48), ("c", 46), ("d", 32), ("e", 18), ("f", 33),
        ("g", 34), ("h", 35), ("i", 23), ("j", 36), ("k", 37), ("l", 38),
        ("m", 50), ("n", 49), ("o", 24), ("p", 25), ("q", 16), ("r", 19),
        ("s", 31), ("t", 20), ("u", 22), ("v", 47), ("w", 17), ("x", 45),
        ("y", 21), ("z", 44),
    ] {
        map.insert(name, code);
    }

    // Цифровые клавиши (верхний ряд)
    for (name, code) in [
        ("1", 2), ("2", 3), ("3", 4), ("4", 5), ("5", 6),
        ("6", 7), ("7", 8), ("8", 9), ("9", 10), ("0", 11),
    ] {
        map.insert(name, code);
    }

    // Специальные клавиши
    map.insert("tab", 15);        // KEY_TAB
    map.insert("space", 57);      // KEY_SPACE
    map.insert("enter", 28);      // KEY_ENTER
    map.insert("escape", 1);      // KEY_ESC
    map.insert("backspace", 14);  // KEY_BACKSPACE
    map.insert("grave", 41);      // KEY_GRAVE (`)
    map.insert("minus", 12);      // KEY_MINUS
    map.insert("equal", 13);      // KEY_EQUAL
    map.insert("comma", 51);      // KEY_COMMA
    map.insert("dot", 52);        // KEY_DOT
    map.insert("slash", 53);      // KEY_SLASH

    // Стрелки
    map.insert("up", 103);
    map.insert("down", 108);
    map.insert("left", 105);
    map.insert("right", 106);

    // Функциональные клавиши
    for (name, code) in [
        ("f1", 59), ("f2", 60), ("f3", 61), ("f4", 62), ("f5", 63), ("f6", 64),
        ("f7", 65), ("f8", 66), ("f9", 67), ("f10", 68), ("f11", 87), ("f12", 88),
    ] {
        map.insert(name, code);
    }

    map
});

static CODE_TO_NAME: Lazy<HashMap<u16, &'static str>> =
    Lazy::new(|| NAME_TO_CODE.iter().map(|(name, code)| (*code, *name)).collect());

impl KeyNames {
    /// evdev код клавиши по имени (регистр не важен, поддерживаются синонимы)
    pub fn code(name: &str) -> Option<u16> {
        let normalized = name.trim().to_lowercase();
        let canonical = match normalized.as_str() {
            "esc" => "escape",
            "return" => "enter",
            "period" => "dot",
            "backtick" => "grave",
            other => other,
        };
        NAME_TO_CODE.get(canonical).copied()
    }

    /// Имя клавиши по evdev коду - для логов
    pub fn name(code: u16) -> Option<&'static str> {
        CODE_TO_NAME.get(&code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_keys() {
        assert_eq!(KeyNames::code("tab"), Some(15));
        assert_eq!(KeyNames::code("E"), Some(18));
        assert_eq!(KeyNames::code("d"), Some(32));
        assert_eq!(KeyNames::code("F12"), Some(88));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(KeyNames::code("Esc"), KeyNames::code("escape"));
        assert_eq!(KeyNames::code("Return"), Some(28));
        assert_eq!(KeyNames::code("backtick"), Some(41));
    }

    #[test]
    fn test_modifiers_are_not_keys() {
        assert_eq!(KeyNames::code("alt"), None);
        assert_eq!(KeyNames::code("ctrl"), None);
        assert_eq!(KeyNames::code("nonsense"), None);
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(KeyNames::name(15), Some("tab"));
        assert_eq!(KeyNames::name(30), Some("a"));
        assert_eq!(KeyNames::name(9999), None);
    }
}
