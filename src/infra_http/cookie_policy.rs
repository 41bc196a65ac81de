use crate::domain_model::{AccessToken, RefreshToken};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Attributes of the two credential cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub path: String,
    pub access_max_age_secs: u64,
    pub refresh_max_age_secs: u64,
    pub remember_me_max_age_secs: u64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: true,
            path: "/".to_string(),
            access_max_age_secs: 60 * 60,
            refresh_max_age_secs: 7 * 24 * 60 * 60,
            remember_me_max_age_secs: 30 * 24 * 60 * 60,
        }
    }
}

impl CookiePolicy {
    fn render(&self, name: &str, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{name}={value}; Path={}; Max-Age={max_age}; HttpOnly; SameSite=Strict",
            self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn access_cookie(&self, token: &AccessToken) -> String {
        self.render(ACCESS_COOKIE, token.as_str(), self.access_max_age_secs)
    }

    pub fn refresh_cookie(&self, token: &RefreshToken, remember_me: bool) -> String {
        let max_age = if remember_me {
            self.remember_me_max_age_secs
        } else {
            self.refresh_max_age_secs
        };
        self.render(REFRESH_COOKIE, token.as_str(), max_age)
    }

    /// Cookies that make the browser drop both credentials.
    pub fn expired_cookies(&self) -> [String; 2] {
        [
            self.render(ACCESS_COOKIE, "", 0),
            self.render(REFRESH_COOKIE, "", 0),
        ]
    }
}

/// RFC 6265 cookie-octet, the value must survive a round trip unquoted.
pub fn is_cookie_safe(value: &str) -> bool {
    value.bytes().all(|b| {
        b == 0x21
            || (0x23..=0x2B).contains(&b)
            || (0x2D..=0x3A).contains(&b)
            || (0x3C..=0x5B).contains(&b)
            || (0x5D..=0x7E).contains(&b)
    })
}

/// Split a `Cookie` request header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// Turn `Set-Cookie` values into the `Cookie` header a browser would send back.
pub fn cookie_header_from_set_cookies<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> String {
    set_cookies
        .into_iter()
        .filter_map(|set_cookie| set_cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.split_once('=').is_some_and(|(_, v)| !v.is_empty()))
        .collect::<Vec<_>>()
        .join("; ")
}
