use crate::error::{CycleError, Result};
use crate::events::{ActiveWindow, WindowId};
use tracing::debug;

use super::command::{parse_pid, process_name, ToolCommand};
use super::r#trait::WindowSystem;

/// X11: активное окно через xdotool, поиск и фокус через wmctrl
pub struct XdotoolWindowSystem {
    xdotool: ToolCommand,
    wmctrl: ToolCommand,
}

impl Default for XdotoolWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl XdotoolWindowSystem {
    pub fn new() -> Self {
        Self {
            xdotool: ToolCommand::new("xdotool"),
            wmctrl: ToolCommand::new("wmctrl"),
        }
    }

    pub fn probe(&self) -> Result<()> {
        self.xdotool.run(&["getactivewindow"])?;
        self.wmctrl.run(&["-l"])?;
        Ok(())
    }
}

/// Найти окно процесса в выводе `wmctrl -lp`: `<id> <desktop> <pid> <host> <title...>`
pub(super) fn window_for_pid(listing: &str, process_id: u32) -> Option<WindowId> {
    let pid = process_id.to_string();
    listing.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let id = fields.next()?;
        let _desktop = fields.next()?;
        (fields.next()? == pid).then(|| WindowId(id.to_string()))
    })
}

impl WindowSystem for XdotoolWindowSystem {
    fn active_window(&self) -> Result<ActiveWindow> {
        let window_id = self.xdotool.run(&["getactivewindow"])?;
        if window_id.is_empty() {
            return Err(CycleError::WindowQuery("xdotool не вернул активное окно".to_string()));
        }

        let title = self.xdotool.run(&["getwindowname", &window_id])?;
        let process_id = parse_pid(&self.xdotool.run(&["getwindowpid", &window_id])?)?;
        debug!("xdotool: активное окно {} '{}' PID {}", window_id, title, process_id);

        Ok(ActiveWindow {
            window_id: WindowId(window_id),
            title,
            process_id,
        })
    }

    fn find_window(&self, process_id: u32) -> Result<WindowId> {
        let listing = self.wmctrl.run(&["-lp"])?;
        window_for_pid(&listing, process_id).ok_or_else(|| {
            CycleError::WindowQuery(format!("окно процесса {} не найдено", process_id))
        })
    }

    fn focus(&self, window: &WindowId) -> Result<()> {
        self.wmctrl.run(&["-ia", window.as_str()])?;
        Ok(())
    }

    fn application_name(&self, process_id: u32) -> Result<String> {
        process_name(process_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
0x03a00007  0 1234   host Terminal - bash
0x04c00003  0 12345  host Firefox
0x05000001 -1 999    host Panel";

    #[test]
    fn test_window_for_pid_matches_pid_column_exactly() {
        assert_eq!(window_for_pid(LISTING, 1234), Some(WindowId("0x03a00007".to_string())));
        assert_eq!(window_for_pid(LISTING, 12345), Some(WindowId("0x04c00003".to_string())));
        assert_eq!(window_for_pid(LISTING, 123), None);
    }

    #[test]
    fn test_window_for_pid_ignores_garbage_lines() {
        assert_eq!(window_for_pid("\n  \nbroken", 1), None);
    }
}
