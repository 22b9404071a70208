//! GestureController: жест "нажми, чтобы шагнуть, держи модификатор, чтобы смотреть,
//! отпусти, чтобы зафиксировать".
//!
//! Состояния: `Idle` и `CyclingActive`. Реестр горячих клавиш не сообщает об отпускании,
//! поэтому конец жеста определяется опросом модификатора по тикеру.

use crate::config::{Config, Keybinds};
use crate::debug_if_enabled;
use crate::error::{CycleError, Result};
use crate::events::{HotkeyAction, KeySpec, Modifier, WindowSnapshot};
use crate::services::cycle_list::{CycleList, FocusOutcome};
use crate::services::hotkeys::{HotkeyHandle, HotkeyRegistry, KeyboardState};
use crate::services::preview::PreviewRenderer;
use crate::services::service::{stopped, Service, Shutdown};
use crate::services::window_system::WindowSystem;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    CyclingActive,
}

#[derive(Debug)]
struct GestureState {
    phase: GesturePhase,
    last_step: Option<Instant>,
}

/// Внешние зависимости контроллера
pub struct GestureDeps {
    pub cycle_list: Arc<CycleList>,
    pub window_system: Arc<dyn WindowSystem>,
    pub registry: Arc<dyn HotkeyRegistry>,
    pub keyboard: Arc<dyn KeyboardState>,
    pub preview: Arc<dyn PreviewRenderer>,
}

struct HotkeyPresses {
    add: UnboundedReceiver<()>,
    remove: UnboundedReceiver<()>,
    cycle: UnboundedReceiver<()>,
}

pub struct GestureController {
    deps: GestureDeps,
    hold_modifier: Modifier,
    tick: Duration,
    debounce: Duration,
    state: Mutex<GestureState>,
    handles: Vec<HotkeyHandle>,
    presses: Option<HotkeyPresses>,
}

impl GestureController {
    /// Регистрирует три сочетания. Если хотя бы одно не удалось, уже
    /// зарегистрированные снимаются до возврата ошибки.
    pub fn new(config: &Config, keybinds: &Keybinds, deps: GestureDeps) -> Result<Self> {
        info!("Инициализация GestureController");

        let hold_modifier = keybinds.cycle.hold_modifier().ok_or_else(|| {
            crate::cycle_error!(invalid_keybind, "сочетание {} без модификатора", keybinds.cycle)
        })?;

        let mut handles = Vec::with_capacity(3);
        let mut receivers = Vec::with_capacity(3);
        let specs: [(HotkeyAction, &KeySpec); 3] = [
            (HotkeyAction::Add, &keybinds.add),
            (HotkeyAction::Remove, &keybinds.remove),
            (HotkeyAction::CycleStep, &keybinds.cycle),
        ];

        for (action, spec) in specs {
            match deps.registry.register(spec) {
                Ok(registration) => {
                    debug!("Сочетание {} назначено на {}", spec, action);
                    handles.push(registration.handle);
                    receivers.push(registration.presses);
                }
                Err(e) => {
                    error!("Не удалось зарегистрировать {} ({}): {}", spec, action, e);
                    for handle in handles.drain(..) {
                        deps.registry.unregister(handle);
                    }
                    return Err(match e {
                        CycleError::HotkeyRegistration(_) => e,
                        other => crate::cycle_error!(hotkey, "{} ({}): {}", spec, action, other),
                    });
                }
            }
        }

        let mut receivers = receivers.into_iter();
        let presses = match (receivers.next(), receivers.next(), receivers.next()) {
            (Some(add), Some(remove), Some(cycle)) => HotkeyPresses { add, remove, cycle },
            _ => {
                for handle in handles.drain(..) {
                    deps.registry.unregister(handle);
                }
                return Err(crate::cycle_error!(internal, "регистрация вернула не все каналы"));
            }
        };

        Ok(Self {
            deps,
            hold_modifier,
            tick: config.timing.tick_interval(),
            debounce: config.timing.debounce(),
            state: Mutex::new(GestureState {
                phase: GesturePhase::Idle,
                last_step: None,
            }),
            handles,
            presses: Some(presses),
        })
    }

    #[cfg(test)]
    pub fn phase(&self) -> GesturePhase {
        self.state.lock().phase
    }

    pub fn handle_add(&self) {
        info!("Нажата горячая клавиша добавления");
        match WindowSnapshot::capture(&*self.deps.window_system) {
            Ok(snapshot) => {
                if self.deps.cycle_list.add(snapshot) {
                    info!("Окон в списке: {}", self.deps.cycle_list.len());
                }
                debug!("{}", self.deps.cycle_list.describe());
            }
            Err(e) => warn!("Не удалось получить активное окно: {}", e),
        }
        self.refresh_preview();
    }

    pub fn handle_remove(&self) {
        info!("Нажата горячая клавиша удаления");
        match self.deps.window_system.active_window() {
            Ok(active) => {
                if self.deps.cycle_list.contains(active.process_id) {
                    self.deps.cycle_list.remove(active.process_id);
                    debug!("{}", self.deps.cycle_list.describe());
                } else {
                    info!("Активное окно {} не в списке", active);
                }
            }
            Err(e) => warn!("Не удалось получить активное окно: {}", e),
        }
        self.refresh_preview();
    }

    /// Шаг цикла; возвращает false, если нажатие подавлено антидребезгом
    pub fn handle_cycle_step(&self, now: Instant) -> bool {
        let accepted = {
            let mut state = self.state.lock();
            let accept = match (state.phase, state.last_step) {
                (GesturePhase::CyclingActive, Some(last)) => {
                    now.saturating_duration_since(last) > self.debounce
                }
                _ => true,
            };
            if accept {
                state.phase = GesturePhase::CyclingActive;
                state.last_step = Some(now);
            }
            accept
        };

        if !accepted {
            debug_if_enabled!("Повторное нажатие в пределах {:?}, игнорируем", self.debounce);
            return false;
        }

        info!("Нажата горячая клавиша переключения");
        match self.deps.cycle_list.focus_next(&*self.deps.window_system) {
            Ok(FocusOutcome::Focused(item)) => debug!("Текущее окно: {}", item),
            Ok(FocusOutcome::NoneOpen) => info!("Открытых окон в списке нет, курсор не изменён"),
            Ok(FocusOutcome::Empty) => info!("Список окон пуст"),
            Err(e) => warn!("Не удалось переключить фокус: {}", e),
        }

        self.refresh_preview();
        if !self.deps.preview.is_visible() {
            debug!("Жест начат, показываем превью");
            self.deps.preview.show();
        }
        true
    }

    /// Тик опроса модификатора. Опрос идёт без блокировки состояния, поэтому
    /// сессия завершается, только если за это время не было нового шага.
    pub fn handle_tick(&self) {
        let observed = {
            let state = self.state.lock();
            if state.phase != GesturePhase::CyclingActive {
                return;
            }
            state.last_step
        };

        let held = match self.deps.keyboard.is_modifier_held(self.hold_modifier) {
            Ok(held) => held,
            Err(e) => {
                warn!("Не удалось опросить {}: {}, считаем отпущенным", self.hold_modifier, e);
                false
            }
        };

        if held {
            // Держим превью в соответствии с WindowMonitor
            self.refresh_preview();
            return;
        }

        if self.end_session(observed) {
            info!("{} отпущен, скрываем превью", self.hold_modifier);
            self.deps.preview.hide();
        }
    }

    /// Перейти в Idle, если сессия всё ещё та, что начата шагом `observed`
    fn end_session(&self, observed: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        if state.phase != GesturePhase::CyclingActive || state.last_step != observed {
            return false;
        }
        state.phase = GesturePhase::Idle;
        true
    }

    fn refresh_preview(&self) {
        let items = self.deps.cycle_list.items();
        let current = self.deps.cycle_list.current();
        self.deps.preview.update_content(&items, current.as_ref());
    }

    /// Снять регистрации и закрыть опрос клавиатуры. Повторный вызов ничего не делает.
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            self.deps.registry.unregister(handle);
        }
        self.deps.keyboard.close();
        info!("GestureController освободил горячие клавиши");
    }

    async fn run_impl(mut self, mut shutdown: Shutdown) -> Result<()> {
        let Some(mut presses) = self.presses.take() else {
            return Err(crate::cycle_error!(internal, "GestureController уже запускался"));
        };

        info!("GestureController запущен (тик {:?}, антидребезг {:?})", self.tick, self.debounce);

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                Some(()) = presses.add.recv() => self.handle_add(),
                Some(()) = presses.remove.recv() => self.handle_remove(),
                Some(()) = presses.cycle.recv() => {
                    self.handle_cycle_step(Instant::now());
                }
                _ = ticker.tick() => self.handle_tick(),
            }
        }

        self.stop();
        info!("GestureController остановлен");
        Ok(())
    }
}

impl Drop for GestureController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait::async_trait]
impl Service for GestureController {
    fn name(&self) -> &'static str {
        "GestureController"
    }

    async fn run(self: Box<Self>, shutdown: Shutdown) -> Result<()> {
        (*self).run_impl(shutdown).await
    }
}
