use crate::config::Config;
use crate::error::Result;
use crate::events::{KeySpec, Modifier};
use crate::utils::DeviceFinder;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use super::dry_run::{DryRunHotkeyRegistry, DryRunKeyboardState};
use super::evdev_backend::{EvdevHotkeyRegistry, EvdevKeyboardState};

/// Идентификатор зарегистрированного сочетания
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotkeyHandle(pub u64);

impl fmt::Display for HotkeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Результат регистрации: хэндл и канал, в который приходит по одному сообщению на нажатие
#[derive(Debug)]
pub struct Registration {
    pub handle: HotkeyHandle,
    pub presses: mpsc::UnboundedReceiver<()>,
}

/// Глобальные горячие клавиши
pub trait HotkeyRegistry: Send + Sync {
    fn register(&self, spec: &KeySpec) -> Result<Registration>;

    fn unregister(&self, handle: HotkeyHandle);
}

/// Опрос физического состояния клавиатуры
pub trait KeyboardState: Send + Sync {
    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool>;

    /// Освободить соединение; дальнейшие запросы завершаются ошибкой
    fn close(&self);
}

/// Реестр и опрос состояния от одного источника ввода
pub struct HotkeyBackend {
    pub registry: Arc<dyn HotkeyRegistry>,
    pub keyboard: Arc<dyn KeyboardState>,
}

/// Factory function to create the hotkey backend based on the dry_run flag.
/// Must be called inside a tokio runtime: the evdev reader runs as a task.
pub fn create_hotkey_backend(config: &Config, dry_run: bool) -> Result<HotkeyBackend> {
    if dry_run {
        info!("Dry-run режим - горячие клавиши эмулируются");
        return Ok(HotkeyBackend {
            registry: Arc::new(DryRunHotkeyRegistry::with_simulation(Duration::from_secs(5))),
            keyboard: Arc::new(DryRunKeyboardState::new()),
        });
    }

    let device_path = DeviceFinder::find_keyboard_device(&config.input.device_path)?;
    info!("Горячие клавиши читаются с устройства {:?}", device_path);

    Ok(HotkeyBackend {
        registry: Arc::new(EvdevHotkeyRegistry::open(&device_path)?),
        keyboard: Arc::new(EvdevKeyboardState::open(&device_path)?),
    })
}
