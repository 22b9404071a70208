//! Горячие клавиши и опрос состояния модификаторов
//!
//! Реестр доставляет только нажатия (без отпусканий), поэтому отпускание модификатора
//! GestureController определяет опросом `KeyboardState`.

mod bindings;
mod dry_run;
mod evdev_backend;
mod modifier_state;
mod r#trait;

#[cfg(test)]
pub use self::dry_run::{DryRunHotkeyRegistry, DryRunKeyboardState};
pub use self::r#trait::{create_hotkey_backend, HotkeyHandle, HotkeyRegistry, KeyboardState};
