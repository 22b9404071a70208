//! WindowSystem: граница с оконной системой
//!
//! Модули отвечают ТОЛЬКО за запросы к оконной системе: активное окно, поиск окна по PID,
//! фокус и имя приложения. Логика кольца и жеста здесь не живёт.

mod command;
mod dry_run;
mod kdotool;
mod xdotool;
mod r#trait;

#[cfg(test)]
pub use self::dry_run::DryRunWindowSystem;
pub use self::r#trait::{create_window_system, WindowSystem};
