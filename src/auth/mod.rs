//! Authentication and session cookie management.
//!
//! Cookies live in a [`SessionJar`] attached to the HTTP client and are
//! restored from, and explicitly saved to, a [`SessionStore`]. The
//! [`Authenticator`] performs the form-token login flow.

mod cookies;
mod jar;
mod login;
mod store;

pub use cookies::{
    CookieError, CookieLine, ParseResult, parse_netscape_cookies, write_netscape_cookies,
};
pub use jar::SessionJar;
pub use login::{AuthError, AuthResult, Authenticator, classify_login_response};
pub use store::{
    FileSessionStore, MemorySessionStore, SessionStore, StoreError, default_config_dir,
    default_cookie_path,
};
