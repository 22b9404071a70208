use crate::error::{CycleError, Result};
use crate::events::{KeyCode, KeySpec, Modifier};
use evdev::{Device, EventStream, EventType};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::bindings::BindingTable;
use super::modifier_state::ModifierState;
use super::r#trait::{HotkeyHandle, HotkeyRegistry, KeyboardState, Registration};

/// Горячие клавиши по событиям evdev.
///
/// Устройство читается без эксклюзивного захвата: сочетания по-прежнему видит
/// и оконный менеджер. Нажатие доставляется, когда клавиша опускается (value 1)
/// при зажатом ровно наборе модификаторов сочетания; автоповтор игнорируется.
pub struct EvdevHotkeyRegistry {
    bindings: Arc<BindingTable>,
    reader: JoinHandle<()>,
}

impl EvdevHotkeyRegistry {
    pub fn open(device_path: &Path) -> Result<Self> {
        let device = Device::open(device_path).map_err(|e| {
            CycleError::DeviceNotFound(format!(
                "Не удалось открыть устройство {:?}: {}",
                device_path, e
            ))
        })?;
        info!("Устройство горячих клавиш: {}", device.name().unwrap_or("Unknown"));

        let stream = device.into_event_stream()?;
        let bindings = Arc::new(BindingTable::new());
        let reader = tokio::spawn(Self::read_events(stream, Arc::clone(&bindings)));

        Ok(Self { bindings, reader })
    }

    async fn read_events(mut stream: EventStream, bindings: Arc<BindingTable>) {
        let mut modifiers = ModifierState::new();

        loop {
            let event = match stream.next_event().await {
                Ok(event) => event,
                Err(e) if e.raw_os_error() == Some(19) => {
                    // ENODEV - клавиатуру отключили
                    error!("Клавиатура отключена, чтение горячих клавиш остановлено: {}", e);
                    return;
                }
                Err(e) => {
                    error!("Ошибка чтения событий: {}", e);
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    continue;
                }
            };

            if event.event_type() != EventType::KEY {
                continue;
            }

            let key = KeyCode(event.code());
            if modifiers.update_key(key, event.value() != 0) {
                continue;
            }

            // 0 - отпускание, 2 - автоповтор
            if event.value() != 1 {
                continue;
            }

            bindings.dispatch(key, modifiers.to_modifiers());
        }
    }
}

impl HotkeyRegistry for EvdevHotkeyRegistry {
    fn register(&self, spec: &KeySpec) -> Result<Registration> {
        if self.reader.is_finished() {
            return Err(crate::cycle_error!(
                hotkey,
                "чтение клавиатуры остановлено, {} не может сработать",
                spec
            ));
        }
        self.bindings.insert(spec)
    }

    fn unregister(&self, handle: HotkeyHandle) {
        self.bindings.remove(handle);
    }
}

impl Drop for EvdevHotkeyRegistry {
    fn drop(&mut self) {
        if self.bindings.len() > 0 {
            warn!("Реестр горячих клавиш закрывается с {} регистрациями", self.bindings.len());
        }
        self.reader.abort();
    }
}

/// Опрос состояния модификаторов через битовую карту нажатых клавиш устройства
pub struct EvdevKeyboardState {
    device: Mutex<Option<Device>>,
}

impl EvdevKeyboardState {
    pub fn open(device_path: &Path) -> Result<Self> {
        let device = Device::open(device_path).map_err(|e| {
            CycleError::DeviceNotFound(format!(
                "Не удалось открыть устройство {:?}: {}",
                device_path, e
            ))
        })?;

        Ok(Self {
            device: Mutex::new(Some(device)),
        })
    }
}

impl KeyboardState for EvdevKeyboardState {
    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool> {
        let device = self.device.lock();
        let device = device
            .as_ref()
            .ok_or_else(|| crate::cycle_error!(keyboard_state, "устройство уже закрыто"))?;

        let keys = device
            .get_key_state()
            .map_err(|e| crate::cycle_error!(keyboard_state, "EVIOCGKEY: {}", e))?;

        Ok(modifier
            .key_codes()
            .iter()
            .any(|code| keys.contains(evdev::KeyCode::new(code.value()))))
    }

    fn close(&self) {
        if self.device.lock().take().is_some() {
            debug!("Устройство опроса клавиатуры закрыто");
        }
    }
}
