use crate::error::Result as CycleResult;
use crate::events::KeySpec;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub input: InputConfig,
    pub keybinds: KeybindsConfig,
    pub timing: TimingConfig,
    pub window: WindowConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub device_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub add: String,
    pub remove: String,
    pub cycle: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub monitor_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    /// "auto" | "xdotool" | "kdotool"
    pub backend: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// 0 - без ограничения
    pub max_items: usize,
}

/// Разобранные сочетания клавиш жеста
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybinds {
    pub add: KeySpec,
    pub remove: KeySpec,
    pub cycle: KeySpec,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: "auto".to_string(),
        }
    }
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        Self {
            add: "Alt+Shift+E".to_string(),
            remove: "Alt+Shift+D".to_string(),
            cycle: "Alt+Tab".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: 500,
            tick_interval_ms: 50,
            debounce_ms: 200,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
        }
    }
}

impl KeybindsConfig {
    pub fn parse(&self) -> CycleResult<Keybinds> {
        Ok(Keybinds {
            add: self.add.parse()?,
            remove: self.remove.parse()?,
            cycle: self.cycle.parse()?,
        })
    }
}

impl TimingConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("CYCLE_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        if self.input.device_path.is_empty() {
            anyhow::bail!("input.device_path не может быть пустым (используйте \"auto\")");
        }

        // Валидация сочетаний клавиш
        let keybinds = self
            .keybinds
            .parse()
            .context("Неверное сочетание клавиш в секции [keybinds]")?;

        if keybinds.cycle.hold_modifier().is_none() {
            anyhow::bail!(
                "Сочетание cycle '{}' должно содержать модификатор, который удерживается во время переключения",
                self.keybinds.cycle
            );
        }

        if keybinds.add == keybinds.remove
            || keybinds.add == keybinds.cycle
            || keybinds.remove == keybinds.cycle
        {
            anyhow::bail!("Сочетания add/remove/cycle должны различаться");
        }

        // Валидация таймингов
        if self.timing.monitor_interval_ms == 0 {
            anyhow::bail!("monitor_interval_ms должно быть больше 0");
        }

        if self.timing.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms должно быть больше 0");
        }

        if self.timing.debounce_ms <= self.timing.tick_interval_ms {
            anyhow::bail!(
                "debounce_ms ({}) должно быть больше tick_interval_ms ({})",
                self.timing.debounce_ms,
                self.timing.tick_interval_ms
            );
        }

        match self.window.backend.as_str() {
            "auto" | "xdotool" | "kdotool" => {}
            _ => anyhow::bail!("Неизвестный бэкенд оконной системы: {}", self.window.backend),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Modifier, Modifiers};

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_keybinds_parse() {
        let keybinds = Config::default().keybinds.parse().unwrap();
        assert_eq!(keybinds.cycle.hold_modifier(), Some(Modifier::Alt));
        assert_eq!(
            keybinds.add.modifier_set(),
            Modifiers::new().with(Modifier::Alt).with(Modifier::Shift)
        );
    }

    #[test]
    fn test_cycle_without_modifier_is_rejected() {
        let mut config = Config::default();
        config.keybinds.cycle = "Tab".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_keybinds_are_rejected() {
        let mut config = Config::default();
        config.keybinds.remove = config.keybinds.add.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reordered_modifiers_count_as_duplicate() {
        let mut config = Config::default();
        config.keybinds.add = "Alt+Shift+E".to_string();
        config.keybinds.remove = "Shift+Alt+E".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debounce_must_exceed_tick() {
        let mut config = Config::default();
        config.timing.debounce_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let mut config = Config::default();
        config.window.backend = "sway".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/non/existent/cycle.toml").unwrap();
        assert_eq!(config.timing.monitor_interval_ms, 500);
        assert_eq!(config.keybinds.cycle, "Alt+Tab");
    }
}
