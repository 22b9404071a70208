use crate::error::Result;
use crate::services::window_system::WindowSystem;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Идентификатор окна в терминах оконной системы (`0x03a00007` для wmctrl, десятичный для xdotool)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Активное окно, как его видит оконная система
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub window_id: WindowId,
    pub title: String,
    pub process_id: u32,
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" (окно {}, PID {})", self.title, self.window_id, self.process_id)
    }
}

/// Снимок активного окна для добавления в кольцо.
/// Собирается до захвата блокировки CycleList.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub window_id: WindowId,
    pub process_id: u32,
    pub title: String,
    pub app_name: String,
}

impl WindowSnapshot {
    pub const UNKNOWN_APP: &'static str = "Unknown";

    pub fn capture(window_system: &dyn WindowSystem) -> Result<Self> {
        let active = window_system.active_window()?;

        let app_name = match window_system.application_name(active.process_id) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => Self::UNKNOWN_APP.to_string(),
            Err(e) => {
                warn!("Не удалось получить имя приложения для PID {}: {}", active.process_id, e);
                Self::UNKNOWN_APP.to_string()
            }
        };

        Ok(Self {
            window_id: active.window_id,
            process_id: active.process_id,
            title: active.title,
            app_name,
        })
    }
}

/// Отслеживаемое окно - копия элемента кольца без навигационных связей
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleItem {
    pub process_id: u32,
    pub title: String,
    pub app_name: String,
}

impl From<WindowSnapshot> for CycleItem {
    fn from(snapshot: WindowSnapshot) -> Self {
        Self {
            process_id: snapshot.process_id,
            title: snapshot.title,
            app_name: snapshot.app_name,
        }
    }
}

impl fmt::Display for CycleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID {}, {})", self.title, self.process_id, self.app_name)
    }
}
