use crate::error::{CycleError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BY_ID_DIR: &str = "/dev/input/by-id";
const INPUT_DIR: &str = "/dev/input";

/// Поиск клавиатуры, с которой читаются горячие клавиши
pub struct DeviceFinder;

impl DeviceFinder {
    /// `"auto"` - автопоиск, иначе путь к устройству как есть
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            if !path.exists() {
                return CycleError::device_not_found(format!(
                    "Указанное устройство не найдено: {:?}",
                    path
                ));
            }
            info!("Используется указанное устройство: {:?}", path);
            return Ok(path);
        }

        info!("Автопоиск клавиатуры...");

        match Self::find_by_id() {
            Ok(device) => {
                info!("Клавиатура найдена в by-id: {:?}", device);
                return Ok(device);
            }
            Err(e) => debug!("by-id: {}", e),
        }

        match Self::find_by_event_devices() {
            Ok(device) => {
                info!("Клавиатура найдена среди event устройств: {:?}", device);
                Ok(device)
            }
            Err(e) => {
                debug!("event*: {}", e);
                CycleError::device_not_found(
                    "Не удалось найти клавиатуру. Убедитесь, что пользователь в группе 'input' \
                     или укажите input.device_path",
                )
            }
        }
    }

    /// Приоритет ссылки из by-id по имени; `None` - не клавиатура
    fn by_id_priority(name: &str) -> Option<u32> {
        if !name.contains("event") {
            return None;
        }
        let lower = name.to_lowercase();
        if lower.contains("mouse") || lower.contains("deathadder") {
            return None;
        }
        if name.ends_with("event-kbd") {
            Some(100)
        } else if lower.contains("keyboard") {
            Some(50)
        } else if lower.contains("kbd") {
            Some(10)
        } else {
            None
        }
    }

    fn find_by_id() -> Result<PathBuf> {
        let entries = fs::read_dir(BY_ID_DIR).map_err(|e| {
            CycleError::DeviceNotFound(format!("{} недоступна: {}", BY_ID_DIR, e))
        })?;

        let mut candidates: Vec<(PathBuf, u32)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_str()?.to_string();
                let priority = Self::by_id_priority(&name)?;
                if !Self::is_device_accessible(&path) {
                    warn!("Устройство {:?} недоступно", path);
                    return None;
                }
                Some((path, priority))
            })
            .filter(|(path, _)| Self::is_keyboard_device(path))
            .collect();

        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        candidates
            .into_iter()
            .next()
            .map(|(path, _)| path)
            .ok_or_else(|| CycleError::DeviceNotFound("клавиатура в by-id не найдена".to_string()))
    }

    fn find_by_event_devices() -> Result<PathBuf> {
        let entries = fs::read_dir(INPUT_DIR).map_err(|e| {
            CycleError::Permission(format!("Нет доступа к {}: {}", INPUT_DIR, e))
        })?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("event"))
            })
            .collect();
        devices.sort();

        devices
            .into_iter()
            .find(|path| Self::is_device_accessible(path) && Self::is_keyboard_device(path))
            .ok_or_else(|| {
                CycleError::DeviceNotFound("нет доступной клавиатуры среди event устройств".to_string())
            })
    }

    /// Клавиатура по возможностям: есть буквы, Tab и модификаторы
    fn is_keyboard_device(device_path: &Path) -> bool {
        let device = match evdev::Device::open(device_path) {
            Ok(device) => device,
            Err(e) => {
                debug!("Не удалось открыть {:?}: {}", device_path, e);
                return false;
            }
        };

        let name = device.name().unwrap_or("Unknown").to_lowercase();
        if ["mouse", "touchpad", "trackpoint"].iter().any(|m| name.contains(m)) {
            debug!("Пропускаем {:?} ({})", device_path, name);
            return false;
        }

        let suitable = device.supported_keys().is_some_and(|keys| {
            [
                evdev::KeyCode::KEY_A,
                evdev::KeyCode::KEY_TAB,
                evdev::KeyCode::KEY_LEFTALT,
                evdev::KeyCode::KEY_LEFTSHIFT,
            ]
            .into_iter()
            .all(|key| keys.contains(key))
                && keys.iter().count() > 20
        });

        debug!("{:?} ({}) клавиатура: {}", device_path, name, suitable);
        suitable
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                debug!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}
