use crate::error::Result;
use tokio::sync::watch;

/// Сигнал остановки для фоновых циклов
pub type Shutdown = watch::Receiver<bool>;

pub fn shutdown_channel() -> (watch::Sender<bool>, Shutdown) {
    watch::channel(false)
}

/// Завершается, когда остановка запрошена или отправитель уничтожен
pub async fn stopped(shutdown: &mut Shutdown) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Trait for long-running services driven by the tokio runtime
#[async_trait::async_trait]
pub trait Service {
    fn name(&self) -> &'static str;

    /// Run until the shutdown signal fires
    async fn run(self: Box<Self>, shutdown: Shutdown) -> Result<()>;
}
