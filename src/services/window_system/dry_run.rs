use crate::error::{CycleError, Result};
use crate::events::{ActiveWindow, WindowId};
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

use super::r#trait::WindowSystem;

#[derive(Debug, Clone)]
struct FakeWindow {
    id: WindowId,
    process_id: u32,
    title: String,
    app_name: String,
}

#[derive(Debug, Default)]
struct FakeDesktop {
    windows: Vec<FakeWindow>,
    active: Option<u32>,
    focus_history: Vec<WindowId>,
    last_rotation: Option<Instant>,
}

/// Эмуляция рабочего стола в памяти для dry-run режима.
///
/// Фокус через `focus` делает окно активным. Если задан период ротации,
/// активное окно само переключается на следующее, как будто пользователь щёлкает мышью.
#[derive(Debug, Default)]
pub struct DryRunWindowSystem {
    desktop: RwLock<FakeDesktop>,
    rotate_every: Option<Duration>,
}

impl DryRunWindowSystem {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Набор окон для `--dry-run`
    pub fn demo() -> Self {
        let system = Self {
            desktop: RwLock::new(FakeDesktop::default()),
            rotate_every: Some(Duration::from_secs(10)),
        };
        for (pid, title, app) in [
            (1001, "Terminal - dry_run", "alacritty"),
            (1002, "Browser - dry_run", "firefox"),
            (1003, "Editor - dry_run", "nvim"),
            (1004, "Game - dry_run", "steam"),
        ] {
            system.open_window(pid, title, app);
        }
        system
    }

    pub fn open_window(&self, process_id: u32, title: &str, app_name: &str) {
        let mut desktop = self.desktop.write();
        desktop.windows.retain(|w| w.process_id != process_id);
        desktop.windows.push(FakeWindow {
            id: WindowId(format!("0x{:08x}", process_id)),
            process_id,
            title: title.to_string(),
            app_name: app_name.to_string(),
        });
        if desktop.active.is_none() {
            desktop.active = Some(process_id);
        }
    }

    #[cfg(test)]
    pub fn close_window(&self, process_id: u32) {
        let mut desktop = self.desktop.write();
        desktop.windows.retain(|w| w.process_id != process_id);
        if desktop.active == Some(process_id) {
            desktop.active = None;
        }
    }

    #[cfg(test)]
    pub fn activate(&self, process_id: u32) {
        let mut desktop = self.desktop.write();
        if desktop.windows.iter().any(|w| w.process_id == process_id) {
            desktop.active = Some(process_id);
        }
    }

    #[cfg(test)]
    pub fn focus_history(&self) -> Vec<WindowId> {
        self.desktop.read().focus_history.clone()
    }

    fn rotate_if_due(&self) {
        let Some(period) = self.rotate_every else {
            return;
        };

        let mut desktop = self.desktop.write();
        let now = Instant::now();
        let due = desktop
            .last_rotation
            .map_or(true, |last| now.duration_since(last) >= period);
        if !due || desktop.windows.is_empty() {
            return;
        }
        desktop.last_rotation = Some(now);

        let position = desktop
            .active
            .and_then(|pid| desktop.windows.iter().position(|w| w.process_id == pid))
            .map_or(0, |i| (i + 1) % desktop.windows.len());
        let next = desktop.windows[position].clone();
        desktop.active = Some(next.process_id);
        info!("Dry-run: эмулируем смену окна на: {}", next.title);
    }
}

impl WindowSystem for DryRunWindowSystem {
    fn active_window(&self) -> Result<ActiveWindow> {
        self.rotate_if_due();

        let desktop = self.desktop.read();
        desktop
            .active
            .and_then(|pid| desktop.windows.iter().find(|w| w.process_id == pid))
            .map(|w| ActiveWindow {
                window_id: w.id.clone(),
                title: w.title.clone(),
                process_id: w.process_id,
            })
            .ok_or_else(|| CycleError::WindowQuery("нет активного окна".to_string()))
    }

    fn find_window(&self, process_id: u32) -> Result<WindowId> {
        self.desktop
            .read()
            .windows
            .iter()
            .find(|w| w.process_id == process_id)
            .map(|w| w.id.clone())
            .ok_or_else(|| CycleError::WindowQuery(format!("окно процесса {} не найдено", process_id)))
    }

    fn focus(&self, window: &WindowId) -> Result<()> {
        let mut desktop = self.desktop.write();
        let process_id = desktop
            .windows
            .iter()
            .find(|w| &w.id == window)
            .map(|w| w.process_id)
            .ok_or_else(|| CycleError::WindowQuery(format!("окно {} не существует", window)))?;

        info!("[DRY RUN] Фокус на окно {}", window);
        desktop.active = Some(process_id);
        desktop.focus_history.push(window.clone());
        Ok(())
    }

    fn application_name(&self, process_id: u32) -> Result<String> {
        self.desktop
            .read()
            .windows
            .iter()
            .find(|w| w.process_id == process_id)
            .map(|w| w.app_name.clone())
            .ok_or_else(|| CycleError::WindowQuery(format!("процесс {} не найден", process_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_makes_window_active() {
        let system = DryRunWindowSystem::new();
        system.open_window(1, "one", "a");
        system.open_window(2, "two", "b");
        assert_eq!(system.active_window().unwrap().process_id, 1);

        let window = system.find_window(2).unwrap();
        system.focus(&window).unwrap();
        assert_eq!(system.active_window().unwrap().process_id, 2);
        assert_eq!(system.focus_history(), vec![window]);
    }

    #[test]
    fn test_closed_window_is_not_open() {
        let system = DryRunWindowSystem::new();
        system.open_window(1, "one", "a");
        assert!(system.find_window(1).is_ok());

        system.close_window(1);
        assert!(system.find_window(1).is_err());
        assert!(system.active_window().is_err());
        assert!(system.application_name(1).is_err());
    }

    #[test]
    fn test_demo_rotates_active_window() {
        let system = DryRunWindowSystem::demo();
        // Первый запрос сразу делает ротацию
        let first = system.active_window().unwrap();
        let second = system.active_window().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.process_id, 1002);
    }
}
