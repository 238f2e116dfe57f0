use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const LOCALE_COOKIE: &str = "preferred-language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Bg,
    En,
    Ru,
    Uk,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::Bg, Locale::En, Locale::Ru, Locale::Uk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Bg => "bg",
            Locale::En => "en",
            Locale::Ru => "ru",
            Locale::Uk => "uk",
        }
    }

    /// Language code accepted by DeepL.
    pub fn deepl_code(&self) -> &'static str {
        match self {
            Locale::Bg => "BG",
            Locale::En => "EN",
            Locale::Ru => "RU",
            Locale::Uk => "UK",
        }
    }

    /// Parses a language tag such as `ru`, `ru-RU` or `EN_us`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Locale::ALL.into_iter().find(|l| l.as_str() == primary)
    }

    /// Best supported match for an `Accept-Language` header.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut candidates: Vec<(f32, usize, Locale)> = header
            .split(',')
            .enumerate()
            .filter_map(|(idx, part)| {
                let mut pieces = part.split(';');
                let locale = Locale::from_tag(pieces.next()?)?;
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                (q > 0.0).then_some((q, idx, locale))
            })
            .collect();

        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        candidates.first().map(|(_, _, locale)| *locale)
    }

    /// Splits a leading `/{locale}` segment off `path`.
    pub fn strip_path_prefix(path: &str) -> Option<(Self, String)> {
        let rest = path.strip_prefix('/')?;
        let (segment, tail) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let locale = Locale::ALL.into_iter().find(|l| l.as_str() == segment)?;
        let tail = if tail.is_empty() { "/" } else { tail };
        Some((locale, tail.to_string()))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or_else(|| format!("unsupported locale '{}'", s))
    }
}

/// Resolution order: path prefix, cookie, `Accept-Language`, default.
pub fn resolve(
    path_locale: Option<Locale>,
    cookie: Option<&str>,
    accept_language: Option<&str>,
) -> Locale {
    path_locale
        .or_else(|| cookie.and_then(Locale::from_tag))
        .or_else(|| accept_language.and_then(Locale::from_accept_language))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags() {
        assert_eq!(Locale::from_tag("ru-RU"), Some(Locale::Ru));
        assert_eq!(Locale::from_tag("EN_us"), Some(Locale::En));
        assert_eq!(Locale::from_tag("de"), None);
    }

    #[test]
    fn accept_language_honours_quality() {
        assert_eq!(
            Locale::from_accept_language("de-DE,en;q=0.5,uk;q=0.9"),
            Some(Locale::Uk)
        );
        assert_eq!(Locale::from_accept_language("fr, de"), None);
        assert_eq!(Locale::from_accept_language("ru;q=0, en"), Some(Locale::En));
    }

    #[test]
    fn ties_keep_header_order() {
        assert_eq!(Locale::from_accept_language("ru, en"), Some(Locale::Ru));
    }

    #[test]
    fn strips_prefix() {
        assert_eq!(
            Locale::strip_path_prefix("/en/api/tasks"),
            Some((Locale::En, "/api/tasks".to_string()))
        );
        assert_eq!(
            Locale::strip_path_prefix("/uk"),
            Some((Locale::Uk, "/".to_string()))
        );
        assert_eq!(Locale::strip_path_prefix("/api/tasks"), None);
        assert_eq!(Locale::strip_path_prefix("/english/x"), None);
    }

    #[test]
    fn resolution_order() {
        assert_eq!(resolve(Some(Locale::Uk), Some("en"), Some("ru")), Locale::Uk);
        assert_eq!(resolve(None, Some("en"), Some("ru")), Locale::En);
        assert_eq!(resolve(None, Some("xx"), Some("ru")), Locale::Ru);
        assert_eq!(resolve(None, None, None), Locale::Bg);
    }
}
