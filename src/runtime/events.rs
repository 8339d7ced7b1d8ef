//! Events delivered by the runtime.

use crate::base::error::RuntimeError;
use serde::Deserialize;
use serde_json::Value;

/// Application event names the coordinator subscribes to.
pub const WINDOW_AUTH_REQUESTED: &str = "window-auth-requested";
pub const APP_CLOSED: &str = "closed";

/// Identity of a runtime window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowIdentity {
    pub uuid: String,
    pub name: String,
}

impl WindowIdentity {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

/// The challenge that triggered an auth request. Informational only, so
/// every field is optional and a malformed one is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthInfo {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub realm: Option<String>,
    pub is_proxy: Option<bool>,
}

impl AuthInfo {
    /// Pick out the fields that have the expected shape. Ports sent as
    /// numeric strings are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let port = obj.get("port").and_then(|p| match p {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        Some(Self {
            scheme: text("scheme"),
            host: text("host"),
            port,
            realm: text("realm"),
            is_proxy: obj.get("isProxy").and_then(Value::as_bool),
        })
    }
}

/// One `process-desktop-event` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopEvent {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Filled from `raw`; never fails the event.
    #[serde(skip)]
    pub auth_info: Option<AuthInfo>,
    /// The payload as received, kept for logging.
    #[serde(skip)]
    pub raw: Value,
}

impl DesktopEvent {
    /// Parse a payload, keeping the original JSON alongside.
    pub fn from_value(payload: Value) -> Result<Self, RuntimeError> {
        let mut event: DesktopEvent = serde_json::from_value(payload.clone())?;
        event.auth_info = payload.get("authInfo").and_then(AuthInfo::from_value);
        event.raw = payload;
        Ok(event)
    }

    /// Event name as subscribed: window events forwarded to an application
    /// listener carry a `window-` prefix, everything else is the bare type.
    pub fn qualified_type(&self) -> String {
        if self.topic == "window" && !self.kind.starts_with("window-") {
            format!("window-{}", self.kind)
        } else {
            self.kind.clone()
        }
    }

    /// The window the event is about. The main window's name defaults to
    /// the application uuid.
    pub fn window(&self) -> Option<WindowIdentity> {
        let uuid = self.uuid.as_deref()?;
        let name = self.name.as_deref().unwrap_or(uuid);
        Some(WindowIdentity::new(uuid, name))
    }
}

/// Everything the connection reports to its owner, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Connected and authorized; requests may be sent.
    Ready,
    /// An event the coordinator subscribed to.
    Desktop(DesktopEvent),
    /// A connection-level failure. `Closed` follows if the link is gone.
    Error(RuntimeError),
    /// The connection is gone. Sent exactly once.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth_payload() -> Value {
        json!({
            "name": "demo",
            "topic": "window",
            "type": "auth-requested",
            "uuid": "demo-app",
            "authInfo": {
                "scheme": "basic",
                "port": 8888,
                "host": "proxy.mycompany.com",
                "realm": "Proxy Name",
                "isProxy": true
            }
        })
    }

    #[test]
    fn test_auth_requested_event() {
        let ev = DesktopEvent::from_value(auth_payload()).unwrap();
        assert_eq!(ev.qualified_type(), WINDOW_AUTH_REQUESTED);
        assert_eq!(ev.window(), Some(WindowIdentity::new("demo-app", "demo")));

        let info = ev.auth_info.as_ref().unwrap();
        assert_eq!(info.host.as_deref(), Some("proxy.mycompany.com"));
        assert_eq!(info.port, Some(8888));
        assert_eq!(info.is_proxy, Some(true));
        assert_eq!(ev.raw["realm"], Value::Null);
        assert_eq!(ev.raw["authInfo"]["realm"], "Proxy Name");
    }

    #[test]
    fn test_malformed_auth_info_keeps_event() {
        let mut payload = auth_payload();
        payload["authInfo"]["realm"] = Value::Null;
        payload["authInfo"]["port"] = json!("8888");
        payload["authInfo"]["scheme"] = json!(7);

        let ev = DesktopEvent::from_value(payload).unwrap();
        assert_eq!(ev.window(), Some(WindowIdentity::new("demo-app", "demo")));
        let info = ev.auth_info.unwrap();
        assert_eq!(info.realm, None);
        assert_eq!(info.scheme, None);
        assert_eq!(info.port, Some(8888));

        let ev = DesktopEvent::from_value(json!({
            "topic": "window", "type": "auth-requested", "uuid": "a", "authInfo": "basic"
        }))
        .unwrap();
        assert_eq!(ev.qualified_type(), WINDOW_AUTH_REQUESTED);
        assert!(ev.auth_info.is_none());
    }

    #[test]
    fn test_already_qualified_type() {
        let ev = DesktopEvent::from_value(json!({
            "topic": "window", "type": "window-auth-requested", "uuid": "a"
        }))
        .unwrap();
        assert_eq!(ev.qualified_type(), WINDOW_AUTH_REQUESTED);
        assert_eq!(ev.window(), Some(WindowIdentity::new("a", "a")));
    }

    #[test]
    fn test_application_closed() {
        let ev = DesktopEvent::from_value(json!({
            "topic": "application", "type": "closed", "uuid": "a"
        }))
        .unwrap();
        assert_eq!(ev.qualified_type(), APP_CLOSED);
        assert!(ev.auth_info.is_none());
    }

    #[test]
    fn test_missing_topic_is_error() {
        assert!(DesktopEvent::from_value(json!({"type": "closed"})).is_err());
    }
}
