//! Validated, process-wide auth configuration.
//!
//! Built once at startup from [`AuthSettings`] and shared read-only by the
//! middleware, the session endpoints and the redirect layer.

use super::policy::{AcceptsJson, AllowAll, AuthHooks, LoginPolicy, NoHooks, RedirectPolicy};
use axum::http::HeaderValue;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cartpal_platform_access::{AuthSettings, ConfigurationError, VerifiedToken};
use cookie::{CookieJar, Key};
use rootcause::prelude::Report;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time::Duration as TimeDuration;

/// Path of the session login endpoint, relative to the mount path.
pub const SESSION_LOGIN_PATH: &str = "/sessionLogin";

/// Path of the logged-in check, relative to the mount path.
pub const LOGGED_IN_PATH: &str = "/loggedIn";

/// Path of the logout endpoint, relative to the mount path.
pub const LOGOUT_PATH: &str = "/logout";

/// Query parameter carrying the refused request on a login redirect.
pub const REDIRECT_URL_PARAM: &str = "redirectUrl";

/// How the session cookie value is protected in transit.
#[derive(Clone)]
pub enum CookieCodec {
    /// Value sent as is.
    Plain,
    /// Value authenticated with an HMAC.
    Signed(Key),
    /// Value encrypted and authenticated.
    Private(Key),
}

impl CookieCodec {
    fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigurationError> {
        if let Some(encoded) = settings.encrypt_key() {
            return Ok(Self::Private(decode_key("encrypt_key", encoded)?));
        }
        if let Some(encoded) = settings.sign_key() {
            return Ok(Self::Signed(decode_key("sign_key", encoded)?));
        }
        Ok(Self::Plain)
    }

    /// Protects `value` for use as the cookie called `name`.
    #[must_use]
    pub fn seal(&self, name: &str, value: String) -> String {
        let key = match self {
            Self::Plain => return value,
            Self::Signed(key) | Self::Private(key) => key,
        };
        let mut jar = CookieJar::new();
        let cookie = Cookie::new(name.to_owned(), value);
        match self {
            Self::Signed(_) => jar.signed_mut(key).add(cookie),
            _ => jar.private_mut(key).add(cookie),
        }
        jar.get(name)
            .map(|sealed| sealed.value().to_owned())
            .unwrap_or_default()
    }

    /// Recovers the value sealed by [`CookieCodec::seal`]. Returns `None`
    /// when the value was tampered with or sealed under another key.
    #[must_use]
    pub fn open(&self, name: &str, value: &str) -> Option<String> {
        let key = match self {
            Self::Plain => return Some(value.to_owned()),
            Self::Signed(key) | Self::Private(key) => key,
        };
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(name.to_owned(), value.to_owned()));
        let opened = match self {
            Self::Signed(_) => jar.signed(key).get(name),
            _ => jar.private(key).get(name),
        };
        opened.map(|cookie| cookie.value().to_owned())
    }
}

impl fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "CookieCodec::Plain",
            Self::Signed(_) => "CookieCodec::Signed(<key>)",
            Self::Private(_) => "CookieCodec::Private(<key>)",
        })
    }
}

fn decode_key(field: &'static str, encoded: &str) -> Result<Key, ConfigurationError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ConfigurationError::InvalidField {
            field,
            reason: format!("not valid base64: {e}"),
        })?;
    Key::try_from(bytes.as_slice()).map_err(|_| ConfigurationError::InvalidField {
        field,
        reason: "key must be at least 64 bytes".to_string(),
    })
}

/// Auth configuration shared by every request.
pub struct AuthConfig {
    cookie_name: String,
    session_storage_path: PathBuf,
    login_url: String,
    realm: String,
    mount_path: String,
    session_ttl: Duration,
    verifier_timeout: Duration,
    cleanup_interval: Duration,
    codec: CookieCodec,
    login_policy: Arc<dyn LoginPolicy>,
    redirect_policy: Arc<dyn RedirectPolicy>,
    hooks: Arc<dyn AuthHooks>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("cookie_name", &self.cookie_name)
            .field("session_storage_path", &self.session_storage_path)
            .field("login_url", &self.login_url)
            .field("realm", &self.realm)
            .field("mount_path", &self.mount_path)
            .field("session_ttl", &self.session_ttl)
            .field("verifier_timeout", &self.verifier_timeout)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Starts building a configuration from raw settings.
    #[must_use]
    pub fn builder(settings: AuthSettings) -> AuthConfigBuilder {
        AuthConfigBuilder {
            settings,
            login_policy: None,
            redirect_policy: None,
            hooks: None,
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn session_storage_path(&self) -> &Path {
        &self.session_storage_path
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn verifier_timeout(&self) -> Duration {
        self.verifier_timeout
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    #[must_use]
    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    #[must_use]
    pub fn login_policy(&self) -> &dyn LoginPolicy {
        self.login_policy.as_ref()
    }

    #[must_use]
    pub fn redirect_policy(&self) -> &dyn RedirectPolicy {
        self.redirect_policy.as_ref()
    }

    /// `WWW-Authenticate` value sent with every 401.
    #[must_use]
    pub fn challenge_header(&self) -> HeaderValue {
        let realm = self.realm.replace(['"', '\\'], "");
        HeaderValue::from_str(&format!("Bearer realm=\"{realm}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
    }

    /// Builds the session cookie carrying `value`, after the cookie hook
    /// has had its say.
    #[must_use]
    pub fn session_cookie(&self, value: String, token: &VerifiedToken) -> Cookie<'static> {
        let sealed = self.codec.seal(&self.cookie_name, value);
        let max_age = i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX);
        let mut cookie = Cookie::build((self.cookie_name.clone(), sealed))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .max_age(TimeDuration::seconds(max_age))
            .build();
        self.hooks.customize_session_cookie(&mut cookie, token);
        cookie
    }

    /// Cookie that tells the browser to drop the session cookie.
    #[must_use]
    pub fn expired_session_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .max_age(TimeDuration::ZERO)
            .build()
    }

    /// Full path of one of the session endpoints.
    #[must_use]
    pub fn endpoint_path(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.mount_path)
    }

    /// Whether `path` is one of the session endpoints, which are never
    /// redirected to the login page.
    #[must_use]
    pub fn is_reserved_path(&self, path: &str) -> bool {
        [SESSION_LOGIN_PATH, LOGGED_IN_PATH, LOGOUT_PATH]
            .iter()
            .any(|endpoint| {
                path.strip_prefix(self.mount_path.as_str())
                    .is_some_and(|rest| rest == *endpoint)
            })
    }

    /// Location of the login page for a refused request. `original` is the
    /// refused path and query.
    #[must_use]
    pub fn login_redirect(&self, original: &str) -> String {
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        let mut location = format!(
            "{}{separator}{REDIRECT_URL_PARAM}={}",
            self.login_url,
            urlencoding::encode(original)
        );
        self.hooks.customize_login_redirect(&mut location, original);
        location
    }
}

/// Builder for [`AuthConfig`]; policies not supplied get their defaults.
pub struct AuthConfigBuilder {
    settings: AuthSettings,
    login_policy: Option<Arc<dyn LoginPolicy>>,
    redirect_policy: Option<Arc<dyn RedirectPolicy>>,
    hooks: Option<Arc<dyn AuthHooks>>,
}

impl AuthConfigBuilder {
    #[must_use]
    pub fn login_policy(mut self, policy: impl LoginPolicy + 'static) -> Self {
        self.login_policy = Some(Arc::new(policy));
        self
    }

    #[must_use]
    pub fn redirect_policy(mut self, policy: impl RedirectPolicy + 'static) -> Self {
        self.redirect_policy = Some(Arc::new(policy));
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: impl AuthHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Validates the settings and assembles the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory setting is missing, a value is out
    /// of range, or a cookie key cannot be decoded.
    pub fn build(self) -> Result<AuthConfig, Report<ConfigurationError>> {
        let settings = self.settings;
        settings.validate()?;
        let codec = CookieCodec::from_settings(&settings)?;

        let missing = |field| ConfigurationError::MissingField { field };
        Ok(AuthConfig {
            cookie_name: settings
                .cookie_name()
                .ok_or_else(|| missing("cookie_name"))?
                .to_owned(),
            session_storage_path: settings
                .session_storage_path()
                .ok_or_else(|| missing("session_storage_path"))?
                .to_path_buf(),
            login_url: settings
                .login_url()
                .ok_or_else(|| missing("login_url"))?
                .to_owned(),
            realm: settings.realm().to_owned(),
            mount_path: settings.mount_path().to_owned(),
            session_ttl: settings.session_ttl(),
            verifier_timeout: settings.verifier_timeout(),
            cleanup_interval: settings.cleanup_interval(),
            codec,
            login_policy: self.login_policy.unwrap_or_else(|| Arc::new(AllowAll)),
            redirect_policy: self.redirect_policy.unwrap_or_else(|| Arc::new(AcceptsJson)),
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
        })
    }
}
