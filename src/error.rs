use thiserror::Error;

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Неверное сочетание клавиш: {0}")]
    InvalidKeybind(String),

    #[error("Не удалось зарегистрировать горячую клавишу: {0}")]
    HotkeyRegistration(String),

    #[error("Ошибка запроса к оконной системе: {0}")]
    WindowQuery(String),

    #[error("Не удалось получить состояние клавиатуры: {0}")]
    KeyboardState(String),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl CycleError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(CycleError::DeviceNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! cycle_error {
    (invalid_keybind, $($arg:tt)*) => {
        $crate::error::CycleError::InvalidKeybind(format!($($arg)*))
    };
    (hotkey, $($arg:tt)*) => {
        $crate::error::CycleError::HotkeyRegistration(format!($($arg)*))
    };
    (window_query, $($arg:tt)*) => {
        $crate::error::CycleError::WindowQuery(format!($($arg)*))
    };
    (keyboard_state, $($arg:tt)*) => {
        $crate::error::CycleError::KeyboardState(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::CycleError::Permission(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::CycleError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::CycleError::Internal(format!($($arg)*))
    };
}
