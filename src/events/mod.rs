pub mod keyboard;
pub mod window;

pub use keyboard::{KeyCode, KeySpec, Modifier, Modifiers};
pub use window::{ActiveWindow, CycleItem, WindowId, WindowSnapshot};

/// Входные сигналы жеста, приходящие от горячих клавиш
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    Add,
    Remove,
    CycleStep,
}

impl std::fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::CycleStep => "cycle",
        };
        write!(f, "{}", name)
    }
}
