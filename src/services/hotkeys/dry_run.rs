use crate::error::Result;
use crate::events::{KeySpec, Modifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use super::bindings::BindingTable;
use super::r#trait::{HotkeyHandle, HotkeyRegistry, KeyboardState, Registration};

/// Реестр без устройства: регистрации принимаются, нажатия эмулируются
pub struct DryRunHotkeyRegistry {
    bindings: Arc<BindingTable>,
    simulation: Option<JoinHandle<()>>,
}

impl Default for DryRunHotkeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunHotkeyRegistry {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(BindingTable::new()),
            simulation: None,
        }
    }

    /// По очереди нажимает зарегистрированные сочетания с периодом `period`.
    /// Должен вызываться внутри tokio runtime.
    pub fn with_simulation(period: Duration) -> Self {
        let mut registry = Self::new();
        let simulated = Arc::clone(&registry.bindings);

        let simulation = tokio::spawn(async move {
            let mut ticker = interval(period);
            let mut turn = 0usize;
            loop {
                ticker.tick().await;
                let handles = simulated.handles();
                if handles.is_empty() {
                    continue;
                }
                let handle = handles[turn % handles.len()];
                turn += 1;
                info!("[DRY RUN] Эмулируем нажатие {}", handle);
                simulated.press(handle);
            }
        });

        registry.simulation = Some(simulation);
        registry
    }

    /// Нажать зарегистрированное сочетание
    #[cfg(test)]
    pub fn press(&self, spec: &KeySpec) -> bool {
        match self.bindings.find(spec) {
            Some(handle) => self.bindings.press(handle),
            None => false,
        }
    }

    #[cfg(test)]
    pub fn registered(&self) -> usize {
        self.bindings.len()
    }
}

impl HotkeyRegistry for DryRunHotkeyRegistry {
    fn register(&self, spec: &KeySpec) -> Result<Registration> {
        self.bindings.insert(spec)
    }

    fn unregister(&self, handle: HotkeyHandle) {
        self.bindings.remove(handle);
    }
}

impl Drop for DryRunHotkeyRegistry {
    fn drop(&mut self) {
        if let Some(simulation) = self.simulation.take() {
            simulation.abort();
        }
    }
}

/// Состояние клавиатуры, управляемое вручную
#[derive(Debug, Default)]
pub struct DryRunKeyboardState {
    held: AtomicBool,
    closed: AtomicBool,
}

impl DryRunKeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_held(&self, held: bool) {
        self.held.store(held, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl KeyboardState for DryRunKeyboardState {
    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool> {
        if self.is_closed() {
            return Err(crate::cycle_error!(keyboard_state, "опрос клавиатуры закрыт"));
        }
        let held = self.held.load(Ordering::SeqCst);
        debug!("[DRY RUN] {} зажат: {}", modifier, held);
        Ok(held)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_delivers_to_registration() {
        let registry = DryRunHotkeyRegistry::new();
        let spec: KeySpec = "Alt+Tab".parse().unwrap();
        let mut registration = registry.register(&spec).unwrap();

        assert!(registry.press(&spec));
        assert!(registration.presses.try_recv().is_ok());

        registry.unregister(registration.handle);
        assert_eq!(registry.registered(), 0);
        assert!(!registry.press(&spec));
    }

    #[test]
    fn test_keyboard_state_fails_after_close() {
        let keyboard = DryRunKeyboardState::new();
        keyboard.set_held(true);
        assert!(keyboard.is_modifier_held(Modifier::Alt).unwrap());

        keyboard.close();
        assert!(keyboard.is_modifier_held(Modifier::Alt).is_err());
    }

    #[tokio::test]
    async fn test_simulation_presses_registered_hotkeys() {
        let registry = DryRunHotkeyRegistry::with_simulation(Duration::from_millis(10));
        let mut registration = registry.register(&"Alt+Tab".parse().unwrap()).unwrap();

        let pressed = tokio::time::timeout(Duration::from_secs(2), registration.presses.recv()).await;
        assert_eq!(pressed.ok().flatten(), Some(()));
    }
}
