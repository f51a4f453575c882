use active_win_pos_rs::get_active_window;
use anyhow::Result;

use super::observer::ForegroundObserver;

#[derive(serde::Deserialize, Debug)]
struct WindowInfo {
    #[serde(default)]
    wm_class: String,
    #[serde(default)]
    focus: bool,
}

/// Foreground observer for the platform the process runs on.
pub struct AppMonitor {
    use_wayland: bool,
}

impl Default for AppMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMonitor {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        log::info!("=== PLATFORM: macOS ===");

        #[cfg(target_os = "windows")]
        log::info!("=== PLATFORM: Windows ===");

        #[cfg(target_os = "linux")]
        log::info!("=== PLATFORM: Linux ===");

        let use_wayland = Self::is_wayland();

        #[cfg(target_os = "linux")]
        {
            if use_wayland {
                log::info!("Session type: Wayland - using D-Bus for foreground detection");
            } else {
                log::info!("Session type: X11 - using X11 APIs for foreground detection");
            }
        }

        #[cfg(target_os = "macos")]
        log::info!("Using Cocoa APIs with AppleScript fallback for foreground detection");

        #[cfg(target_os = "windows")]
        log::info!("Using Win32 APIs for foreground detection");

        Self { use_wayland }
    }

    fn is_wayland() -> bool {
        #[cfg(target_os = "linux")]
        {
            std::env::var("WAYLAND_DISPLAY").is_ok()
                || std::env::var("XDG_SESSION_TYPE").map(|s| s == "wayland").unwrap_or(false)
        }

        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    }

    async fn frontmost_wayland() -> Result<Option<String>> {
        let connection = zbus::Connection::session().await?;

        let response = connection
            .call_method(
                Some("org.gnome.Shell"),
                "/org/gnome/Shell/Extensions/Windows",
                Some("org.gnome.Shell.Extensions.Windows"),
                "List",
                &(),
            )
            .await?;

        // The extension answers with a JSON string, not a variant
        let json_str: String = response.body().deserialize()?;
        let windows: Vec<WindowInfo> = serde_json::from_str(&json_str)?;

        Ok(windows
            .into_iter()
            .find(|w| w.focus)
            .map(|w| w.wm_class))
    }

    async fn frontmost_native() -> Result<Option<String>> {
        let active = tokio::task::spawn_blocking(get_active_window).await?;
        match active {
            Ok(window) if !window.app_name.trim().is_empty() => Ok(Some(window.app_name)),
            _ => {
                #[cfg(target_os = "macos")]
                {
                    return Self::frontmost_macos().await;
                }

                #[cfg(not(target_os = "macos"))]
                {
                    Ok(None)
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    async fn frontmost_macos() -> Result<Option<String>> {
        let script = r#"tell application "System Events" to get name of first application process whose frontmost is true"#;
        run_osascript(script).await
    }

    fn normalize_app_name(&self, app: String) -> String {
        let trimmed = app.trim();

        // Wayland wm_class comes as "org.gnome.Nautilus" or "firefox_firefox"
        #[cfg(target_os = "linux")]
        {
            if self.use_wayland {
                if trimmed.contains('.') {
                    return trimmed.rsplit('.').next().unwrap_or(trimmed).to_string();
                }
                if trimmed.contains('_') {
                    return trimmed.split('_').next().unwrap_or(trimmed).to_string();
                }
            }
        }

        trimmed.to_string()
    }
}

impl ForegroundObserver for AppMonitor {
    async fn current_frontmost_application(&self) -> Result<Option<String>> {
        let detected = if self.use_wayland {
            Self::frontmost_wayland().await?
        } else {
            Self::frontmost_native().await?
        };

        let app = detected
            .map(|name| self.normalize_app_name(name))
            .filter(|name| !name.is_empty());
        log::debug!("Frontmost application: {:?}", app);
        Ok(app)
    }
}

/// Runs a one-line AppleScript and returns its trimmed first line of output.
#[cfg(target_os = "macos")]
pub(crate) async fn run_osascript(script: &str) -> Result<Option<String>> {
    let output = tokio::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .kill_on_drop(true)
        .output()
        .await?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next().unwrap_or("").trim().to_string();
        if line.is_empty() {
            return Ok(None);
        }
        log::debug!("AppleScript returned: '{}'", line);
        Ok(Some(line))
    } else {
        let error = String::from_utf8_lossy(&output.stderr);
        log::warn!("AppleScript failed: {}", error.trim());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_frontmost_application() {
        let monitor = AppMonitor::new();
        // Headless machines have no frontmost window; the call must still return.
        match monitor.current_frontmost_application().await {
            Ok(Some(app)) => assert!(!app.is_empty()),
            Ok(None) | Err(_) => {}
        }
    }

    #[test]
    fn test_normalize_keeps_plain_names() {
        let monitor = AppMonitor { use_wayland: false };
        assert_eq!(monitor.normalize_app_name("  Google Chrome ".to_string()), "Google Chrome");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_normalize_wayland_wm_class() {
        let monitor = AppMonitor { use_wayland: true };
        assert_eq!(monitor.normalize_app_name("org.gnome.Nautilus".to_string()), "Nautilus");
        assert_eq!(monitor.normalize_app_name("firefox_firefox".to_string()), "firefox");
    }
}
