//! Server settings loaded via OrthoConfig, and the configuration handed to
//! [`super::create_server`].

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TREE_TABLE: &str = "planted_trees";
const DEFAULT_PHOTO_BUCKET: &str = "tree-photos";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const SAME_SITE_EXPECTED: &str = "Strict|Lax|None";

/// Settings for the HTTP server and its Supabase collaborators.
///
/// Every value can come from CLI flags, `CANOPY_*` environment variables or
/// a configuration file. Only the Supabase URL and service key are required.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CANOPY")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Base URL of the Supabase project.
    pub supabase_url: Option<String>,
    /// Service-role key used for every Supabase request.
    pub supabase_service_key: Option<String>,
    /// Table holding planted tree records.
    pub tree_table: Option<String>,
    /// Public bucket holding tree photos.
    pub photo_bucket: Option<String>,
    /// Timeout applied to each outbound request.
    pub request_timeout_secs: Option<u64>,
    /// Page the password recovery email links to.
    pub password_reset_redirect: Option<String>,
    /// File holding the session cookie key material.
    pub session_key_file: Option<PathBuf>,
    /// Mark session cookies `Secure`.
    pub cookie_secure: Option<bool>,
    /// `SameSite` policy for session cookies.
    pub same_site: Option<String>,
    /// Permit a generated session key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub allow_ephemeral_session: bool,
}

/// Errors raised while resolving [`ServerSettings`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    /// A setting is present but unusable.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// `SameSite=None` without `Secure` cookies is refused by browsers.
    #[error("same_site=None requires cookie_secure=true")]
    InsecureSameSiteNone,
}

impl ServerSettings {
    /// Socket address to bind, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Fails when the configured value is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "bind_addr",
            value: raw.to_owned(),
            expected: "host:port",
        })
    }

    /// Supabase project URL.
    ///
    /// # Errors
    ///
    /// Fails when unset or not an absolute http(s) URL.
    pub fn supabase_url(&self) -> Result<Url, ConfigError> {
        let raw = non_blank(self.supabase_url.as_deref()).ok_or(ConfigError::Missing {
            name: "supabase_url",
        })?;
        parse_http_url("supabase_url", raw)
    }

    /// Service key, moved into zeroizing storage.
    ///
    /// # Errors
    ///
    /// Fails when unset or blank.
    pub fn supabase_service_key(&self) -> Result<Zeroizing<String>, ConfigError> {
        non_blank(self.supabase_service_key.as_deref())
            .map(|key| Zeroizing::new(key.to_owned()))
            .ok_or(ConfigError::Missing {
                name: "supabase_service_key",
            })
    }

    /// Tree table name, defaulting to `planted_trees`.
    pub fn tree_table(&self) -> &str {
        non_blank(self.tree_table.as_deref()).unwrap_or(DEFAULT_TREE_TABLE)
    }

    /// Photo bucket name, defaulting to `tree-photos`.
    pub fn photo_bucket(&self) -> &str {
        non_blank(self.photo_bucket.as_deref()).unwrap_or(DEFAULT_PHOTO_BUCKET)
    }

    /// Outbound request timeout; zero is raised to one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                .max(1),
        )
    }

    /// Recovery redirect, when configured.
    ///
    /// # Errors
    ///
    /// Fails when set but not an absolute http(s) URL.
    pub fn password_reset_redirect(&self) -> Result<Option<Url>, ConfigError> {
        non_blank(self.password_reset_redirect.as_deref())
            .map(|raw| parse_http_url("password_reset_redirect", raw))
            .transpose()
    }

    /// Session key file path.
    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    /// Whether cookies are marked `Secure`; defaults to `true`.
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    /// `SameSite` policy, defaulting to `Lax`.
    ///
    /// # Errors
    ///
    /// Fails on unknown policies, and on `None` without secure cookies.
    pub fn same_site(&self) -> Result<SameSite, ConfigError> {
        let Some(raw) = non_blank(self.same_site.as_deref()) else {
            return Ok(SameSite::Lax);
        };
        match raw.to_ascii_lowercase().as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" if self.cookie_secure() => Ok(SameSite::None),
            "none" => Err(ConfigError::InsecureSameSiteNone),
            _ => Err(ConfigError::Invalid {
                name: "same_site",
                value: raw.to_owned(),
                expected: SAME_SITE_EXPECTED,
            }),
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind_addr", &self.bind_addr)
            .field("supabase_url", &self.supabase_url)
            .field(
                "supabase_service_key",
                &self.supabase_service_key.as_ref().map(|_| "<redacted>"),
            )
            .field("tree_table", &self.tree_table)
            .field("photo_bucket", &self.photo_bucket)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("password_reset_redirect", &self.password_reset_redirect)
            .field("session_key_file", &self.session_key_file)
            .field("cookie_secure", &self.cookie_secure)
            .field("same_site", &self.same_site)
            .field("allow_ephemeral_session", &self.allow_ephemeral_session)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name,
        value: raw.to_owned(),
        expected: "an absolute http(s) URL",
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if matches!(url.scheme(), "http" | "https") && url.has_host() {
        Ok(url)
    } else {
        Err(invalid())
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Construct a server configuration from resolved settings.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 11] = [
        "CANOPY_BIND_ADDR",
        "CANOPY_SUPABASE_URL",
        "CANOPY_SUPABASE_SERVICE_KEY",
        "CANOPY_TREE_TABLE",
        "CANOPY_PHOTO_BUCKET",
        "CANOPY_REQUEST_TIMEOUT_SECS",
        "CANOPY_PASSWORD_RESET_REDIRECT",
        "CANOPY_SESSION_KEY_FILE",
        "CANOPY_COOKIE_SECURE",
        "CANOPY_SAME_SITE",
        "CANOPY_ALLOW_EPHEMERAL_SESSION",
    ];

    fn load_with(overrides: &[(&str, &str)]) -> ServerSettings {
        let vars = VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        });
        let _guard = lock_env(vars);
        ServerSettings::load_from_iter([OsString::from("canopy")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let settings = load_with(&[]);
        assert_eq!(
            settings.bind_addr().expect("default bind"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(settings.tree_table(), DEFAULT_TREE_TABLE);
        assert_eq!(settings.photo_bucket(), DEFAULT_PHOTO_BUCKET);
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(
            settings.session_key_file(),
            PathBuf::from(DEFAULT_SESSION_KEY_FILE)
        );
        assert!(settings.cookie_secure());
        assert_eq!(settings.same_site().expect("default"), SameSite::Lax);
        assert!(!settings.allow_ephemeral_session);
        assert!(settings.password_reset_redirect().expect("unset").is_none());
    }

    #[rstest]
    fn supabase_credentials_are_required() {
        let settings = load_with(&[]);
        assert!(matches!(
            settings.supabase_url(),
            Err(ConfigError::Missing {
                name: "supabase_url"
            })
        ));
        assert!(matches!(
            settings.supabase_service_key(),
            Err(ConfigError::Missing {
                name: "supabase_service_key"
            })
        ));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let settings = load_with(&[
            ("CANOPY_BIND_ADDR", "127.0.0.1:9000"),
            ("CANOPY_SUPABASE_URL", "https://demo.supabase.co"),
            ("CANOPY_SUPABASE_SERVICE_KEY", "service-key"),
            ("CANOPY_TREE_TABLE", "arboles_sembrados"),
            ("CANOPY_REQUEST_TIMEOUT_SECS", "3"),
            ("CANOPY_PASSWORD_RESET_REDIRECT", "https://app.example.com/reset"),
            ("CANOPY_COOKIE_SECURE", "false"),
            ("CANOPY_SAME_SITE", "strict"),
            ("CANOPY_ALLOW_EPHEMERAL_SESSION", "true"),
        ]);
        assert_eq!(
            settings.bind_addr().expect("bind").to_string(),
            "127.0.0.1:9000"
        );
        assert_eq!(
            settings.supabase_url().expect("url").host_str(),
            Some("demo.supabase.co")
        );
        assert_eq!(
            settings.supabase_service_key().expect("key").as_str(),
            "service-key"
        );
        assert_eq!(settings.tree_table(), "arboles_sembrados");
        assert_eq!(settings.request_timeout(), Duration::from_secs(3));
        assert!(settings.password_reset_redirect().expect("redirect").is_some());
        assert!(!settings.cookie_secure());
        assert_eq!(settings.same_site().expect("strict"), SameSite::Strict);
        assert!(settings.allow_ephemeral_session);
    }

    #[rstest]
    #[case::bad_bind(("CANOPY_BIND_ADDR", "localhost"))]
    #[case::bad_url(("CANOPY_SUPABASE_URL", "ftp://demo.supabase.co"))]
    #[case::relative_url(("CANOPY_SUPABASE_URL", "demo.supabase.co"))]
    #[case::bad_same_site(("CANOPY_SAME_SITE", "sometimes"))]
    fn invalid_values_are_reported(#[case] override_var: (&str, &str)) {
        let settings = load_with(&[override_var]);
        let failed = match override_var.0 {
            "CANOPY_BIND_ADDR" => settings.bind_addr().is_err(),
            "CANOPY_SUPABASE_URL" => matches!(
                settings.supabase_url(),
                Err(ConfigError::Invalid { .. })
            ),
            _ => matches!(settings.same_site(), Err(ConfigError::Invalid { .. })),
        };
        assert!(failed, "{} should be rejected", override_var.0);
    }

    #[rstest]
    fn same_site_none_requires_secure_cookies() {
        let settings = load_with(&[
            ("CANOPY_SAME_SITE", "None"),
            ("CANOPY_COOKIE_SECURE", "false"),
        ]);
        assert!(matches!(
            settings.same_site(),
            Err(ConfigError::InsecureSameSiteNone)
        ));
    }

    #[rstest]
    fn zero_timeout_is_raised() {
        let settings = load_with(&[("CANOPY_REQUEST_TIMEOUT_SECS", "0")]);
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }

    #[rstest]
    fn debug_output_redacts_service_key() {
        let settings = load_with(&[("CANOPY_SUPABASE_SERVICE_KEY", "top-secret")]);
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
