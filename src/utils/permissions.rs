use crate::error::{CycleError, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const INPUT_DIR: &str = "/dev/input";

/// Проверить доступ к устройствам ввода перед открытием клавиатуры
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");
    check_input_devices_access(Path::new(INPUT_DIR))?;
    check_not_root();
    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access(input_dir: &Path) -> Result<()> {
    if !input_dir.exists() {
        return Err(crate::cycle_error!(
            permission,
            "Директория {} не существует",
            input_dir.display()
        ));
    }

    fs::read_dir(input_dir).map_err(|e| {
        CycleError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            input_dir.display(),
            e
        ))
    })?;

    info!("Доступ к {} подтвержден", input_dir.display());
    Ok(())
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   xdotool/kdotool будут выполняться от пользователя из SUDO_USER");
            warn!("   Лучше добавить пользователя в группу 'input':");
            warn!("   sudo usermod -a -G input $USER");
        }
        Ok(user) => info!("Приложение запущено от имени пользователя: {}", user),
        Err(_) => warn!("Не удалось определить пользователя"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_dir_is_permission_error() {
        let result = check_input_devices_access(Path::new("/non/existent/input"));
        assert!(matches!(result, Err(CycleError::Permission(_))));
    }

    #[test]
    fn test_readable_dir_passes() {
        let dir = std::env::temp_dir();
        assert!(check_input_devices_access(&dir).is_ok());
    }
}
