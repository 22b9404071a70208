use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
pub mod mappings;
mod services;
mod utils;

use config::Config;
use services::{
    create_hotkey_backend, create_window_system, shutdown_channel, CycleList, GestureController,
    GestureDeps, Service, TextPreview, WindowMonitor,
};

#[derive(Parser, Debug)]
#[command(name = "cycle-rust")]
#[command(about = "Циклическое переключение между отмеченными окнами с удержанием модификатора")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "cycle.toml")]
    config: String,

    /// Режим сухого запуска: эмуляция окон и горячих клавиш
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level)?;

    info!("Запуск Cycle Rust v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - окна и клавиатура эмулируются");
    } else {
        utils::permissions::check_permissions()?;
    }

    let keybinds = config.keybinds.parse()?;
    info!(
        "Сочетания: добавить {}, удалить {}, переключить {}",
        keybinds.add, keybinds.remove, keybinds.cycle
    );

    let cycle_list = Arc::new(CycleList::new());
    let window_system = create_window_system(&config, args.dry_run)?;
    let backend = create_hotkey_backend(&config, args.dry_run)?;
    let preview = Arc::new(TextPreview::new(config.preview.max_items));

    let gesture = GestureController::new(
        &config,
        &keybinds,
        GestureDeps {
            cycle_list: Arc::clone(&cycle_list),
            window_system: Arc::clone(&window_system),
            registry: backend.registry,
            keyboard: backend.keyboard,
            preview,
        },
    )?;
    let monitor = WindowMonitor::new(&config, Arc::clone(&cycle_list), window_system);

    info!("Все компоненты инициализированы");

    let (stop, shutdown) = shutdown_channel();
    let services: Vec<Box<dyn Service + Send>> = vec![Box::new(gesture), Box::new(monitor)];
    let handles: Vec<_> = services
        .into_iter()
        .map(|service| {
            let name = service.name();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = service.run(shutdown).await {
                    error!("Ошибка в {}: {}", name, e);
                }
            })
        })
        .collect();

    info!("Все сервисы запущены");

    match signal::ctrl_c().await {
        Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
        Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
    }

    info!("Завершение работы...");
    // Ошибка значит, что все получатели уже завершились
    let _ = stop.send(true);

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        for handle in handles {
            let _ = handle.await;
        }
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    if !cycle_list.is_empty() {
        info!("{}", cycle_list.describe());
    }
    info!("Cycle Rust завершил работу");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
