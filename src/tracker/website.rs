use anyhow::Result;

use super::observer::WebsiteObserver;

/// Reads the active tab of a Chromium-family browser through AppleScript.
///
/// Only macOS exposes the tab URL this way; elsewhere it never reports a domain.
pub struct ChromeWebsiteMonitor {
    browser_app: String,
}

impl ChromeWebsiteMonitor {
    pub fn new(browser_app: impl Into<String>) -> Self {
        Self {
            browser_app: browser_app.into(),
        }
    }

    pub fn browser_app(&self) -> &str {
        &self.browser_app
    }

    #[cfg(target_os = "macos")]
    async fn active_tab_url(&self) -> Result<Option<String>> {
        let script = format!(
            r#"tell application "{}" to get URL of active tab of front window"#,
            self.browser_app.replace('"', "")
        );
        super::monitor::run_osascript(&script).await
    }

    #[cfg(not(target_os = "macos"))]
    async fn active_tab_url(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

impl WebsiteObserver for ChromeWebsiteMonitor {
    async fn active_browser_domain(&self) -> Result<Option<String>> {
        let host = self
            .active_tab_url()
            .await?
            .and_then(|url| super::matcher::extract_host(&url));
        log::debug!("Active {} tab host: {:?}", self.browser_app, host);
        Ok(host)
    }
}
