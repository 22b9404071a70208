use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::services::cycle_list::CycleList;
use crate::services::service::{stopped, Service, Shutdown};
use crate::services::window_system::WindowSystem;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Периодически сверяет курсор CycleList с активным окном оконной системы,
/// чтобы следующий шаг цикла начинался от реально активного окна.
pub struct WindowMonitor {
    cycle_list: Arc<CycleList>,
    window_system: Arc<dyn WindowSystem>,
    period: Duration,
}

impl WindowMonitor {
    pub fn new(config: &Config, cycle_list: Arc<CycleList>, window_system: Arc<dyn WindowSystem>) -> Self {
        Self {
            cycle_list,
            window_system,
            period: config.timing.monitor_interval(),
        }
    }

    /// Один тик сверки; true, если курсор переставлен
    pub fn reconcile(&self) -> bool {
        let active = match self.window_system.active_window() {
            Ok(active) => active,
            Err(e) => {
                debug_if_enabled!("Не удалось получить активное окно, пропускаем тик: {}", e);
                return false;
            }
        };

        let moved = self.cycle_list.sync_current(active.process_id);
        if moved {
            debug!("Курсор переставлен на активное окно: {}", active);
        }
        moved
    }

    async fn run_impl(self, mut shutdown: Shutdown) -> Result<()> {
        info!("WindowMonitor запущен (период {:?})", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {
                    self.reconcile();
                }
            }
        }

        info!("WindowMonitor остановлен");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Service for WindowMonitor {
    fn name(&self) -> &'static str {
        "WindowMonitor"
    }

    async fn run(self: Box<Self>, shutdown: Shutdown) -> Result<()> {
        (*self).run_impl(shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{WindowId, WindowSnapshot};
    use crate::services::service::shutdown_channel;
    use crate::services::window_system::DryRunWindowSystem;

    fn track(list: &CycleList, pid: u32) {
        list.add(WindowSnapshot {
            window_id: WindowId(pid.to_string()),
            process_id: pid,
            title: format!("window-{}", pid),
            app_name: "app".to_string(),
        });
    }

    fn monitor(list: &Arc<CycleList>, desktop: &Arc<DryRunWindowSystem>) -> WindowMonitor {
        let mut config = Config::default();
        config.timing.monitor_interval_ms = 10;
        WindowMonitor::new(&config, Arc::clone(list), Arc::clone(desktop) as Arc<dyn WindowSystem>)
    }

    #[test]
    fn test_reconcile_follows_tracked_active_window() {
        let list = Arc::new(CycleList::new());
        track(&list, 1);
        track(&list, 2);
        let desktop = Arc::new(DryRunWindowSystem::new());
        desktop.open_window(1, "one", "app");
        desktop.open_window(2, "two", "app");
        desktop.activate(2);

        assert!(monitor(&list, &desktop).reconcile());
        assert_eq!(list.current().map(|i| i.process_id), Some(2));
    }

    #[test]
    fn test_reconcile_ignores_untracked_window() {
        let list = Arc::new(CycleList::new());
        track(&list, 1);
        let desktop = Arc::new(DryRunWindowSystem::new());
        desktop.open_window(9, "other", "app");

        assert!(!monitor(&list, &desktop).reconcile());
        assert_eq!(list.current().map(|i| i.process_id), Some(1));
    }

    #[test]
    fn test_reconcile_skips_query_errors() {
        let list = Arc::new(CycleList::new());
        track(&list, 1);
        let desktop = Arc::new(DryRunWindowSystem::new());

        assert!(!monitor(&list, &desktop).reconcile());
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let list = Arc::new(CycleList::new());
        track(&list, 1);
        track(&list, 2);
        let desktop = Arc::new(DryRunWindowSystem::new());
        desktop.open_window(2, "two", "app");

        let (stop, shutdown) = shutdown_channel();
        let service: Box<dyn Service + Send> = Box::new(monitor(&list, &desktop));
        let task = tokio::spawn(service.run(shutdown));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(list.current().map(|i| i.process_id), Some(2));

        stop.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
