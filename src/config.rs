//! Process configuration.
//!
//! Properties are read once at startup from `PROXYAUTH_*` environment
//! variables and `-D key=value` command-line definitions, then frozen into a
//! [`RuntimeConfig`].

use crate::base::error::ConfigError;
use crate::runtime::options::DEFAULT_APP_URL;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

/// Property names.
pub mod keys {
    pub const RUNTIME_VERSION: &str = "runtime.version";
    pub const RUNTIME_HOST: &str = "runtime.host";
    pub const RUNTIME_PORT: &str = "runtime.port";
    pub const RUNTIME_LAUNCHER: &str = "runtime.launcher";
    pub const PROXY_USERNAME: &str = "proxy.username";
    pub const PROXY_PASSWORD: &str = "proxy.password";
    pub const PROXY_LOCATION: &str = "proxy.location";
    pub const CONNECT_TIMEOUT: &str = "connect.timeout";
    pub const APP_URL: &str = "app.url";
}

/// Prefix of environment variables mapped onto properties.
pub const ENV_PREFIX: &str = "PROXYAUTH_";

pub const DEFAULT_RUNTIME_HOST: &str = "127.0.0.1";
pub const DEFAULT_RUNTIME_PORT: u16 = 9696;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime flags always passed: verbose logging, sandbox off.
const BASE_RUNTIME_ARGS: &str = "--v=1 --no-sandbox";

/// Flat property bag built from the environment and `-D` definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnvironment {
    properties: BTreeMap<String, String>,
}

impl ProcessEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `PROXYAUTH_*` variables from the process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_env() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Like [`from_vars`](Self::from_vars), skipping non-Unicode pairs.
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_vars(vars.into_iter().filter_map(|(name, value)| {
            Some((name.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Map `PROXYAUTH_RUNTIME_VERSION=x` style pairs to `runtime.version=x`.
    ///
    /// Variables without the prefix are ignored.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let properties = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix(ENV_PREFIX)?;
                if rest.is_empty() {
                    return None;
                }
                Some((rest.to_ascii_lowercase().replace('_', "."), value))
            })
            .collect();
        Self { properties }
    }

    /// Set a property, replacing any previous value.
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Builder form of [`define`](Self::define).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.define(key, value);
        self
    }

    /// Apply `key=value` definitions on top of what is already set.
    pub fn with_definitions<S: AsRef<str>>(mut self, defs: &[S]) -> Result<Self, ConfigError> {
        for def in defs {
            let (key, value) = parse_definition(def.as_ref())?;
            self.define(key, value);
        }
        Ok(self)
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Number of properties set.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no properties are set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Split a `key=value` definition. The value may itself contain `=`.
pub fn parse_definition(def: &str) -> Result<(String, String), ConfigError> {
    match def.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidDefinition(def.to_string())),
    }
}

/// A proxy server address in `host:port` form.
///
/// Displays as the address exactly as given (minus surrounding whitespace),
/// so the runtime sees what the user wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLocation {
    pub host: String,
    pub port: u16,
    address: String,
}

impl ProxyLocation {
    /// Parse `host:port`. The port must be numeric.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidProxyLocation(s.to_string());
        let address = s.trim();
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
            address: address.to_string(),
        })
    }

    /// The address as configured.
    pub fn as_str(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for ProxyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Proxy credentials submitted on the first auth request.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    /// Zeroized on drop.
    pub password: Option<Zeroizing<String>>,
}

impl Credentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username,
            password: password.map(Zeroizing::new),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything needed to start and talk to the runtime. Immutable once built.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub runtime_version: String,
    /// Additional command-line arguments handed to the runtime.
    pub extra_args: String,
    pub proxy: Option<ProxyLocation>,
    pub credentials: Credentials,
    pub runtime_host: String,
    pub runtime_port: u16,
    /// Launcher executable to spawn; `None` means the runtime is already up.
    pub launcher: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Page loaded by the launched application.
    pub app_url: String,
}

impl RuntimeConfig {
    /// Build the configuration from process properties.
    ///
    /// Fails if `runtime.version` is missing or blank, or if an optional
    /// property is malformed.
    pub fn from_environment(env: &ProcessEnvironment) -> Result<Self, ConfigError> {
        let runtime_version = env
            .get(keys::RUNTIME_VERSION)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingProperty(keys::RUNTIME_VERSION))?
            .to_string();

        let proxy = env
            .get(keys::PROXY_LOCATION)
            .map(ProxyLocation::parse)
            .transpose()?;

        let credentials = Credentials::new(
            env.get(keys::PROXY_USERNAME).map(str::to_string),
            env.get(keys::PROXY_PASSWORD).map(str::to_string),
        );

        let runtime_port = match env.get(keys::RUNTIME_PORT) {
            Some(v) => parse_number::<u16>(keys::RUNTIME_PORT, v)?,
            None => DEFAULT_RUNTIME_PORT,
        };

        let connect_timeout = match env.get(keys::CONNECT_TIMEOUT) {
            Some(v) => Duration::from_secs(parse_number::<u64>(keys::CONNECT_TIMEOUT, v)?),
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        Ok(Self {
            runtime_version,
            extra_args: runtime_arguments(proxy.as_ref()),
            proxy,
            credentials,
            runtime_host: env
                .get(keys::RUNTIME_HOST)
                .unwrap_or(DEFAULT_RUNTIME_HOST)
                .to_string(),
            runtime_port,
            launcher: env.get(keys::RUNTIME_LAUNCHER).map(PathBuf::from),
            connect_timeout,
            app_url: env.get(keys::APP_URL).unwrap_or(DEFAULT_APP_URL).to_string(),
        })
    }

    /// WebSocket URL of the runtime's control channel.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}", self.runtime_host, self.runtime_port)
    }
}

/// Launch arguments: the base flags, plus `--proxy-server` when a proxy is set.
pub fn runtime_arguments(proxy: Option<&ProxyLocation>) -> String {
    match proxy {
        Some(p) => format!("{} --proxy-server={}", BASE_RUNTIME_ARGS, p),
        None => BASE_RUNTIME_ARGS.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_mapping() {
        let env = ProcessEnvironment::from_vars(vec![
            ("PROXYAUTH_RUNTIME_VERSION".to_string(), "stable".to_string()),
            ("PROXYAUTH_PROXY_LOCATION".to_string(), "p:1".to_string()),
            ("PROXYAUTH_".to_string(), "ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(env.get("runtime.version"), Some("stable"));
        assert_eq!(env.get("proxy.location"), Some("p:1"));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_definitions_override_env() {
        let env = ProcessEnvironment::new()
            .with("runtime.version", "old")
            .with_definitions(&["runtime.version=new", "proxy.password=a=b"])
            .unwrap();
        assert_eq!(env.get("runtime.version"), Some("new"));
        assert_eq!(env.get("proxy.password"), Some("a=b"));
    }

    #[test]
    fn test_bad_definition() {
        assert!(matches!(
            parse_definition("noequals"),
            Err(ConfigError::InvalidDefinition(_))
        ));
        assert!(parse_definition("=value").is_err());
    }

    #[test]
    fn test_proxy_location_parse() {
        let loc = ProxyLocation::parse("proxy.mycompany.com:8888").unwrap();
        assert_eq!(loc.host, "proxy.mycompany.com");
        assert_eq!(loc.port, 8888);
        assert_eq!(loc.to_string(), "proxy.mycompany.com:8888");

        assert!(ProxyLocation::parse("proxy.mycompany.com").is_err());
        assert!(ProxyLocation::parse(":8888").is_err());
        assert!(ProxyLocation::parse("host:http").is_err());
    }

    #[test]
    fn test_proxy_location_kept_verbatim() {
        let loc = ProxyLocation::parse("  proxy.mycompany.com:08888 ").unwrap();
        assert_eq!(loc.port, 8888);
        assert_eq!(loc.as_str(), "proxy.mycompany.com:08888");
        assert_eq!(
            runtime_arguments(Some(&loc)),
            "--v=1 --no-sandbox --proxy-server=proxy.mycompany.com:08888"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_env_vars_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let env = ProcessEnvironment::from_os_vars(vec![
            (
                OsString::from("UNRELATED_VAR"),
                OsString::from_vec(vec![0x66, 0xff, 0x6f]),
            ),
            (
                OsString::from("PROXYAUTH_PROXY_PASSWORD"),
                OsString::from_vec(vec![0xff]),
            ),
            (
                OsString::from("PROXYAUTH_RUNTIME_VERSION"),
                OsString::from("stable"),
            ),
        ]);
        assert_eq!(env.get("runtime.version"), Some("stable"));
        assert_eq!(env.get("proxy.password"), None);
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new(Some("user".into()), Some("hunter2".into()));
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("user"));
        assert!(!dbg.contains("hunter2"));
        assert_eq!(creds.password(), Some("hunter2"));
    }

    #[test]
    fn test_runtime_arguments() {
        assert_eq!(runtime_arguments(None), "--v=1 --no-sandbox");
        let loc = ProxyLocation::parse("p.example:3128").unwrap();
        assert_eq!(
            runtime_arguments(Some(&loc)),
            "--v=1 --no-sandbox --proxy-server=p.example:3128"
        );
    }
}
