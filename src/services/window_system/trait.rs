use crate::config::Config;
use crate::error::{CycleError, Result};
use crate::events::{ActiveWindow, WindowId};
use std::sync::Arc;
use tracing::{info, warn};

use super::dry_run::DryRunWindowSystem;
use super::kdotool::KdotoolWindowSystem;
use super::xdotool::XdotoolWindowSystem;

/// Запросы к оконной системе, которые использует ядро.
/// Вызовы блокирующие и не должны выполняться под блокировкой CycleList.
pub trait WindowSystem: Send + Sync {
    /// Активное окно; ошибка, если фокуса нет или утилита недоступна
    fn active_window(&self) -> Result<ActiveWindow>;

    /// Окно, принадлежащее процессу. Ошибка означает, что окно закрыто
    /// или утилита недоступна.
    fn find_window(&self, process_id: u32) -> Result<WindowId>;

    /// Вывести окно на передний план
    fn focus(&self, window: &WindowId) -> Result<()>;

    /// Имя приложения процесса (best-effort)
    fn application_name(&self, process_id: u32) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Xdotool,
    Kdotool,
}

/// Factory function to create a window system backend based on config and the dry_run flag
pub fn create_window_system(config: &Config, dry_run: bool) -> Result<Arc<dyn WindowSystem>> {
    if dry_run {
        info!("Dry-run режим - WindowSystem работает в режиме эмуляции");
        return Ok(Arc::new(DryRunWindowSystem::demo()));
    }

    let backend = match config.window.backend.as_str() {
        "xdotool" => Backend::Xdotool,
        "kdotool" => Backend::Kdotool,
        "auto" => detect_backend()?,
        other => {
            return Err(CycleError::Internal(format!(
                "Неизвестный бэкенд оконной системы: {}",
                other
            )))
        }
    };

    info!("Используем бэкенд оконной системы: {:?}", backend);
    Ok(match backend {
        Backend::Xdotool => Arc::new(XdotoolWindowSystem::new()),
        Backend::Kdotool => Arc::new(KdotoolWindowSystem::new()),
    })
}

fn is_kde_wayland() -> bool {
    let kde = std::env::var("XDG_CURRENT_DESKTOP")
        .map(|d| d.to_lowercase().contains("kde"))
        .unwrap_or(false);
    let wayland = std::env::var("XDG_SESSION_TYPE")
        .map(|s| s == "wayland")
        .unwrap_or(false);
    kde && wayland
}

fn detect_backend() -> Result<Backend> {
    info!("Определяем рабочий бэкенд оконной системы...");

    let order = if is_kde_wayland() {
        [Backend::Kdotool, Backend::Xdotool]
    } else {
        [Backend::Xdotool, Backend::Kdotool]
    };

    for backend in order {
        let probe = match backend {
            Backend::Xdotool => XdotoolWindowSystem::new().probe(),
            Backend::Kdotool => KdotoolWindowSystem::new().probe(),
        };
        match probe {
            Ok(()) => return Ok(backend),
            Err(e) => warn!("Бэкенд {:?} недоступен: {}", backend, e),
        }
    }

    Err(CycleError::ServiceUnavailable(
        "ни xdotool/wmctrl, ни kdotool не отвечают".to_string(),
    ))
}
