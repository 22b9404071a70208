use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{KeyCode, KeySpec, Modifiers};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::r#trait::{HotkeyHandle, Registration};

#[derive(Debug)]
struct Binding {
    spec: KeySpec,
    sender: mpsc::UnboundedSender<()>,
}

/// Таблица зарегистрированных сочетаний, общая для evdev и dry-run реестров
#[derive(Debug)]
pub(super) struct BindingTable {
    bindings: DashMap<HotkeyHandle, Binding>,
    next_id: AtomicU64,
    // Проверка дубликата и вставка должны быть атомарны
    register_lock: Mutex<()>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
            next_id: AtomicU64::new(1),
            register_lock: Mutex::new(()),
        }
    }

    pub fn insert(&self, spec: &KeySpec) -> Result<Registration> {
        let _guard = self.register_lock.lock();

        if self.bindings.iter().any(|entry| entry.value().spec == *spec) {
            return Err(crate::cycle_error!(hotkey, "сочетание {} уже зарегистрировано", spec));
        }

        let handle = HotkeyHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, presses) = mpsc::unbounded_channel();
        self.bindings.insert(handle, Binding { spec: spec.clone(), sender });

        info!("Зарегистрировано сочетание {} ({})", spec, handle);
        Ok(Registration { handle, presses })
    }

    pub fn remove(&self, handle: HotkeyHandle) -> bool {
        match self.bindings.remove(&handle) {
            Some((_, binding)) => {
                info!("Снята регистрация сочетания {} ({})", binding.spec, handle);
                true
            }
            None => {
                debug!("Сочетание {} не зарегистрировано", handle);
                false
            }
        }
    }

    /// Разослать нажатие `key` при зажатых `held` всем совпавшим сочетаниям
    pub fn dispatch(&self, key: KeyCode, held: Modifiers) -> usize {
        let mut delivered = 0;
        for entry in self.bindings.iter() {
            if entry.value().spec.matches(key, held) && entry.value().sender.send(()).is_ok() {
                debug_if_enabled!("Нажатие {} ({})", entry.value().spec, entry.key());
                delivered += 1;
            }
        }
        delivered
    }

    /// Нажатие конкретного сочетания в обход устройства
    pub fn press(&self, handle: HotkeyHandle) -> bool {
        self.bindings
            .get(&handle)
            .map(|binding| binding.sender.send(()).is_ok())
            .unwrap_or(false)
    }

    pub fn handles(&self) -> Vec<HotkeyHandle> {
        let mut handles: Vec<_> = self.bindings.iter().map(|entry| *entry.key()).collect();
        handles.sort();
        handles
    }

    #[cfg(test)]
    pub fn find(&self, spec: &KeySpec) -> Option<HotkeyHandle> {
        self.bindings
            .iter()
            .find(|entry| entry.value().spec == *spec)
            .map(|entry| *entry.key())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Modifier;

    #[test]
    fn test_duplicate_spec_is_rejected() {
        let table = BindingTable::new();
        let spec: KeySpec = "Alt+Tab".parse().unwrap();
        let first = table.insert(&spec).unwrap();
        assert!(table.insert(&spec).is_err());

        assert!(table.remove(first.handle));
        assert!(table.insert(&spec).is_ok());
    }

    #[test]
    fn test_reordered_modifiers_are_the_same_binding() {
        let table = BindingTable::new();
        let mut first = table.insert(&"Alt+Shift+E".parse().unwrap()).unwrap();
        assert!(table.insert(&"Shift+Alt+E".parse().unwrap()).is_err());

        let held = Modifiers::new().with(Modifier::Alt).with(Modifier::Shift);
        assert_eq!(table.dispatch(KeyCode(18), held), 1);
        assert!(first.presses.try_recv().is_ok());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_dispatch_delivers_to_matching_spec() {
        let table = BindingTable::new();
        let mut cycle = table.insert(&"Alt+Tab".parse().unwrap()).unwrap();
        let mut add = table.insert(&"Alt+Shift+E".parse().unwrap()).unwrap();

        let alt = Modifiers::new().with(Modifier::Alt);
        assert_eq!(table.dispatch(KeyCode(15), alt), 1);
        assert_eq!(table.dispatch(KeyCode(15), Modifiers::new()), 0);

        assert!(cycle.presses.try_recv().is_ok());
        assert!(cycle.presses.try_recv().is_err());
        assert!(add.presses.try_recv().is_err());
    }

    #[test]
    fn test_press_unknown_handle() {
        let table = BindingTable::new();
        assert!(!table.press(HotkeyHandle(42)));
        assert!(!table.remove(HotkeyHandle(42)));
    }
}
