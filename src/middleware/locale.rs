use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::domain::locale::{resolve, Locale, LOCALE_COOKIE};

fn detect(headers: &HeaderMap, path_locale: Option<Locale>) -> Locale {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(LOCALE_COOKIE).map(|c| c.value().to_string());
    let accept = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    resolve(path_locale, cookie.as_deref(), accept)
}

fn rewrite_uri(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Resolves the request locale and strips a leading `/{locale}` segment.
///
/// Must wrap the whole router so the rewritten path is what gets routed.
/// A locale taken from the path is persisted in the `preferred-language` cookie.
pub async fn resolve_locale(jar: CookieJar, mut req: Request, next: Next) -> Response {
    let mut path_locale = None;
    if let Some((locale, rest)) = Locale::strip_path_prefix(req.uri().path()) {
        if let Some(uri) = rewrite_uri(req.uri(), &rest) {
            *req.uri_mut() = uri;
            path_locale = Some(locale);
        }
    }

    let locale = detect(req.headers(), path_locale);
    tracing::trace!(%locale, "resolved request locale");
    req.extensions_mut().insert(locale);

    let response = next.run(req).await;

    let cookie_matches = jar
        .get(LOCALE_COOKIE)
        .is_some_and(|c| c.value() == locale.as_str());
    if path_locale.is_some() && !cookie_matches {
        let cookie = Cookie::build((LOCALE_COOKIE, locale.as_str()))
            .path("/")
            .same_site(SameSite::Lax)
            .permanent()
            .build();
        return (jar.add(cookie), response).into_response();
    }

    response
}

/// Locale of the current request, falling back to header detection when the
/// middleware did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

#[async_trait]
impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(locale) = parts.extensions.get::<Locale>() {
            return Ok(Self(*locale));
        }
        Ok(Self(detect(&parts.headers, None)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_keeps_query() {
        let uri: Uri = "/en/api/tasks?page=2".parse().unwrap();
        let rewritten = rewrite_uri(&uri, "/api/tasks").unwrap();
        assert_eq!(rewritten.to_string(), "/api/tasks?page=2");
    }

    #[test]
    fn detect_prefers_cookie_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "preferred-language=ru".parse().unwrap());
        headers.insert(header::ACCEPT_LANGUAGE, "en".parse().unwrap());
        assert_eq!(detect(&headers, None), Locale::Ru);
        assert_eq!(detect(&headers, Some(Locale::Uk)), Locale::Uk);
    }
}
