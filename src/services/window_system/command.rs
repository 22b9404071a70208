use crate::error::{CycleError, Result};
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// Переменные окружения пользовательской сессии, если процесс запущен через sudo.
/// Без них xdotool/kdotool не найдут дисплей и сессионную шину.
fn build_env_overrides() -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    if std::env::var("USER").unwrap_or_default() == "root" {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            if let Ok(output) = Command::new("id").args(["-u", &sudo_user]).output() {
                if let Ok(uid_str) = String::from_utf8(output.stdout) {
                    let uid = uid_str.trim();
                    let user_runtime_dir = format!("/run/user/{}", uid);
                    let dbus_address = format!("unix:path={}/bus", user_runtime_dir);

                    debug!("Подставляем переменные окружения для пользователя {}: uid={}", sudo_user, uid);
                    env_vars.insert("DBUS_SESSION_BUS_ADDRESS".to_string(), dbus_address);
                    env_vars.insert("XDG_RUNTIME_DIR".to_string(), user_runtime_dir);
                    env_vars.insert("USER".to_string(), sudo_user);
                }
            }
        }
    }

    if let Ok(display_var) = std::env::var("DISPLAY") {
        env_vars.insert("DISPLAY".to_string(), display_var);
    }

    env_vars
}

/// Запуск внешней утилиты оконной системы с разбором stdout
pub(super) struct ToolCommand {
    program: &'static str,
    as_session_user: bool,
}

impl ToolCommand {
    pub fn new(program: &'static str) -> Self {
        Self {
            program,
            as_session_user: false,
        }
    }

    /// Запускать от имени SUDO_USER (нужно kdotool для доступа к KWin)
    pub fn as_session_user(mut self) -> Self {
        self.as_session_user = true;
        self
    }

    fn build(&self, args: &[&str]) -> Command {
        let mut cmd = match std::env::var("SUDO_USER") {
            Ok(sudo_user) if self.as_session_user => {
                let mut cmd = Command::new("sudo");
                cmd.args(["-E", "-u", &sudo_user, self.program]);
                cmd
            }
            _ => Command::new(self.program),
        };
        cmd.args(args);

        for (key, value) in build_env_overrides() {
            cmd.env(key, value);
        }

        cmd
    }

    /// Выполнить команду и вернуть обрезанный stdout; ненулевой код выхода - ошибка
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.build(args).output().map_err(|e| {
            CycleError::WindowQuery(format!("{} не найден: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{} {:?} вернул ошибку: {}", self.program, args, stderr.trim());
            return Err(CycleError::WindowQuery(format!(
                "{} {} завершился с ошибкой: {}",
                self.program,
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

pub(super) fn parse_pid(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| CycleError::WindowQuery(format!("некорректный PID: '{}'", raw.trim())))
}

/// Имя исполняемого файла процесса через `ps`
pub(super) fn process_name(process_id: u32) -> Result<String> {
    let name = ToolCommand::new("ps").run(&["-p", &process_id.to_string(), "-o", "comm="])?;
    if name.is_empty() {
        return Err(CycleError::WindowQuery(format!("ps не знает процесс {}", process_id)));
    }
    Ok(name)
}
