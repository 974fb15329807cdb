//! Language codes accepted by the translation backend.

/// Source language assumed when the caller does not name one.
pub const DEFAULT_SOURCE_LANG: &str = "pt-BR";

/// Target language used when neither the caller nor the config names one.
pub const DEFAULT_TARGET_LANG: &str = "en-US";

/// Code and display name of every language the backend translates between.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("pt-BR", "Brazilian Portuguese"),
    ("en-US", "English (US)"),
    ("es-ES", "Spanish"),
    ("fr-FR", "French"),
    ("de-DE", "German"),
    ("it-IT", "Italian"),
    ("zh-CN", "Chinese (Simplified)"),
    ("ja-JP", "Japanese"),
    ("ko-KR", "Korean"),
    ("ru-RU", "Russian"),
];

/// Exact, case-sensitive match, as the backend validates.
pub fn is_supported(code: &str) -> bool {
    display_name(code).is_some()
}

pub fn display_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Same language for the purpose of skipping translation.
pub fn same_language(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert!(is_supported("pt-BR"));
        assert!(!is_supported("pt-br"));
        assert!(!is_supported("xx-XX"));
        assert_eq!(display_name("ja-JP"), Some("Japanese"));
        assert!(is_supported(DEFAULT_SOURCE_LANG));
        assert!(is_supported(DEFAULT_TARGET_LANG));
    }

    #[test]
    fn same_language_ignores_case() {
        assert!(same_language("en-US", "en-us"));
        assert!(!same_language("en-US", "pt-BR"));
    }
}
