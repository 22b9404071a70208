use crate::error::{CycleError, Result};
use crate::events::{ActiveWindow, WindowId};
use tracing::debug;

use super::command::{parse_pid, process_name, ToolCommand};
use super::r#trait::WindowSystem;

/// KDE Plasma (в том числе Wayland) через kdotool
pub struct KdotoolWindowSystem {
    kdotool: ToolCommand,
}

impl Default for KdotoolWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl KdotoolWindowSystem {
    pub fn new() -> Self {
        Self {
            kdotool: ToolCommand::new("kdotool").as_session_user(),
        }
    }

    pub fn probe(&self) -> Result<()> {
        debug!("=== Тестируем kdotool ===");
        let window_id = self.kdotool.run(&["getactivewindow"])?;
        self.kdotool.run(&["getwindowname", &window_id])?;
        debug!("=== kdotool работает ===");
        Ok(())
    }
}

impl WindowSystem for KdotoolWindowSystem {
    fn active_window(&self) -> Result<ActiveWindow> {
        let window_id = self.kdotool.run(&["getactivewindow"])?;
        if window_id.is_empty() {
            return Err(CycleError::WindowQuery("kdotool не вернул активное окно".to_string()));
        }

        let title = self.kdotool.run(&["getwindowname", &window_id])?;
        let process_id = parse_pid(&self.kdotool.run(&["getwindowpid", &window_id])?)?;

        Ok(ActiveWindow {
            window_id: WindowId(window_id),
            title,
            process_id,
        })
    }

    fn find_window(&self, process_id: u32) -> Result<WindowId> {
        let output = self
            .kdotool
            .run(&["search", "--pid", &process_id.to_string(), "--limit", "1"])?;

        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|id| WindowId(id.to_string()))
            .ok_or_else(|| CycleError::WindowQuery(format!("окно процесса {} не найдено", process_id)))
    }

    fn focus(&self, window: &WindowId) -> Result<()> {
        self.kdotool.run(&["windowactivate", window.as_str()])?;
        Ok(())
    }

    fn application_name(&self, process_id: u32) -> Result<String> {
        process_name(process_id)
    }
}
