//! Options for the application launched inside the runtime.

use serde::Serialize;

/// Default page loaded by the launched application.
pub const DEFAULT_APP_URL: &str =
    "http://demoappdirectory.openf.in/desktop/config/apps/OpenFin/HelloOpenFin/index.html";

/// Uuid (and main window name) of the launched application.
pub const DEFAULT_APP_UUID: &str = "proxy-auth-demo";

/// Main window placement and chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOptions {
    pub auto_show: bool,
    pub default_height: u32,
    pub default_width: u32,
    pub default_top: i32,
    pub default_left: i32,
    pub frame: bool,
    pub save_window_state: bool,
}

impl Default for WindowOptions {
    /// Fixed 395x525 frameless window at (200, 200) whose state is not saved.
    fn default() -> Self {
        Self {
            auto_show: true,
            default_height: 525,
            default_width: 395,
            default_top: 200,
            default_left: 200,
            frame: false,
            save_window_state: false,
        }
    }
}

/// Payload of `create-application`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOptions {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub main_window_options: WindowOptions,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self::new(DEFAULT_APP_UUID, DEFAULT_APP_URL)
    }
}

impl ApplicationOptions {
    /// Application whose name matches its uuid, with the default window.
    pub fn new(uuid: impl Into<String>, url: impl Into<String>) -> Self {
        let uuid = uuid.into();
        Self {
            name: uuid.clone(),
            uuid,
            url: url.into(),
            main_window_options: WindowOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_window_geometry() {
        let w = WindowOptions::default();
        assert_eq!((w.default_height, w.default_width), (525, 395));
        assert_eq!((w.default_top, w.default_left), (200, 200));
        assert!(!w.frame);
        assert!(!w.save_window_state);
    }

    #[test]
    fn test_serialized_field_names() {
        let app = ApplicationOptions::new("demo", "http://localhost/");
        let v: Value = serde_json::to_value(&app).unwrap();
        assert_eq!(v["uuid"], "demo");
        assert_eq!(v["name"], "demo");
        assert_eq!(v["mainWindowOptions"]["defaultHeight"], 525);
        assert_eq!(v["mainWindowOptions"]["saveWindowState"], false);
        assert_eq!(v["mainWindowOptions"]["autoShow"], true);
    }
}
