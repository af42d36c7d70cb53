use std::convert::Infallible;

use alcove_types::api::{AdminQuery, LoginForm, NextQuery};
use anyhow::anyhow;
use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};

use crate::age::safe_next;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::{LoginPage, encode_query, render};

pub const ADMIN_COOKIE: &str = "alcove_admin";

/// Compares a submitted credential against the configured one.
///
/// Handlers only ever hold a `dyn SecretCheck`, so a constant-time
/// implementation can replace [`PlainEquality`] without touching them.
pub trait SecretCheck: Send + Sync {
    fn matches(&self, submitted: &str, expected: &str) -> bool;
}

pub struct PlainEquality;

impl SecretCheck for PlainEquality {
    fn matches(&self, submitted: &str, expected: &str) -> bool {
        submitted == expected
    }
}

/// Cookie value granting admin rights: hex(HMAC-SHA256(secret, "alcove-admin")).
pub fn admin_token(secret: &str) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("invalid admin secret: {}", e))?;
    mac.update(b"alcove-admin");
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub(crate) fn session_cookie(
    name: impl Into<String>,
    value: impl Into<String>,
    max_age_secs: i64,
) -> Cookie<'static> {
    Cookie::build((name.into(), value.into()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Who is asking: admin or not, plus the query suffix that keeps a
/// query-token admin signed in across form posts.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub admin: bool,
    pub token_query: String,
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let by_cookie = jar
            .get(ADMIN_COOKIE)
            .is_some_and(|c| state.secret_check.matches(c.value(), &state.admin_token));
        if by_cookie {
            return Ok(Viewer {
                admin: true,
                token_query: String::new(),
            });
        }

        if state.config.admin_query_token {
            let submitted = Query::<AdminQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.admin);
            if let Some(token) = submitted {
                if state.secret_check.matches(&token, &state.config.admin_secret) {
                    return Ok(Viewer {
                        admin: true,
                        token_query: format!("?admin={}", encode_query(&token)),
                    });
                }
                warn!("Rejected admin query token");
            }
        }

        Ok(Viewer::default())
    }
}

/// GET /admin
pub async fn login_page(
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<impl IntoResponse, ApiError> {
    render(&LoginPage {
        admin: viewer.admin,
        next: safe_next(query.next.as_deref()),
        failed: false,
    })
}

/// POST /admin
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let next = safe_next(form.next.as_deref());
    if !state
        .secret_check
        .matches(&form.password, &state.config.admin_secret)
    {
        warn!("Rejected admin login");
        let page = render(&LoginPage {
            admin: false,
            next,
            failed: true,
        })?;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    info!("Admin logged in");
    let cookie = session_cookie(
        ADMIN_COOKIE,
        state.admin_token.clone(),
        state.config.cookie_max_age_secs,
    );
    Ok((jar.add(cookie), Redirect::to(&next)).into_response())
}

/// POST /admin/logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(ADMIN_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_token_is_stable_and_hides_the_secret() {
        let a = admin_token("correct horse").unwrap();
        let b = admin_token("correct horse").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("correct"));
        assert_ne!(a, admin_token("battery staple").unwrap());
    }

    #[test]
    fn plain_equality() {
        assert!(PlainEquality.matches("s3cret", "s3cret"));
        assert!(!PlainEquality.matches("s3cret ", "s3cret"));
        assert!(!PlainEquality.matches("", "s3cret"));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie(ADMIN_COOKIE, "abc", 60);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
    }
}
