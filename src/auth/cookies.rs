use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::Duration;

use crate::config::AppConfig;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String, secure: bool, ttl: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .max_age(ttl)
        .build()
}

fn ttl(minutes: i64) -> Duration {
    Duration::minutes(minutes.max(0))
}

pub fn with_refresh(jar: CookieJar, cfg: &AppConfig, refresh_token: String) -> CookieJar {
    jar.add(session_cookie(
        REFRESH_COOKIE,
        refresh_token,
        cfg.cookie_secure,
        ttl(cfg.jwt.refresh_ttl_minutes),
    ))
}

pub fn with_session(
    jar: CookieJar,
    cfg: &AppConfig,
    access_token: String,
    refresh_token: String,
) -> CookieJar {
    let jar = jar.add(session_cookie(
        ACCESS_COOKIE,
        access_token,
        cfg.cookie_secure,
        ttl(cfg.jwt.ttl_minutes),
    ));
    with_refresh(jar, cfg, refresh_token)
}

pub fn cleared(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((ACCESS_COOKIE, "")).path("/"))
        .remove(Cookie::build((REFRESH_COOKIE, "")).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;

    #[test]
    fn session_cookies_are_http_only_and_follow_config() {
        let mut cfg = test_config();
        cfg.cookie_secure = true;
        let jar = with_session(CookieJar::new(), &cfg, "a".into(), "r".into());
        let access = jar.get(ACCESS_COOKIE).expect("access cookie");
        let refresh = jar.get(REFRESH_COOKIE).expect("refresh cookie");
        assert_eq!(access.value(), "a");
        assert_eq!(refresh.value(), "r");
        for c in [access, refresh] {
            assert_eq!(c.http_only(), Some(true));
            assert_eq!(c.secure(), Some(true));
        }
        assert_eq!(access.max_age(), Some(Duration::minutes(cfg.jwt.ttl_minutes)));
        assert_eq!(
            refresh.max_age(),
            Some(Duration::minutes(cfg.jwt.refresh_ttl_minutes))
        );
    }

    #[test]
    fn clearing_drops_both_cookies() {
        let cfg = test_config();
        let jar = with_session(CookieJar::new(), &cfg, "a".into(), "r".into());
        let jar = cleared(jar);
        assert!(jar.get(ACCESS_COOKIE).is_none());
        assert!(jar.get(REFRESH_COOKIE).is_none());
    }
}
