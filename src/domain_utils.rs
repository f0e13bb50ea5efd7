use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{Cell, Normalized};
use crate::vocabulary::Vocabulary;

static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+://").unwrap());
static WWW_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^www\d*\.").unwrap());

/// Structural check: does this text look like a domain or a URL to one?
///
/// Only the host part is inspected. The top-level label must be 2-6
/// alphabetic characters.
pub fn is_domain_like(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();

    let without_scheme = match lowered.split_once("://") {
        Some((_, rest)) => rest,
        None => lowered.as_str(),
    };

    let host = without_scheme.split('/').next().unwrap_or("");

    if host.chars().any(char::is_whitespace) || !host.contains('.') {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let tld = labels[labels.len() - 1];
    let tld_len = tld.chars().count();
    !tld.is_empty() && tld.chars().all(char::is_alphabetic) && (2..=6).contains(&tld_len)
}

/// Reduces URLs and host names to their registrable domain.
#[derive(Debug, Clone)]
pub struct DomainNormalizer {
    multi_label_suffixes: Vec<String>,
}

impl Default for DomainNormalizer {
    fn default() -> Self {
        Self::from_vocabulary(&Vocabulary::builtin())
    }
}

impl DomainNormalizer {
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        Self {
            multi_label_suffixes: vocab.multi_label_suffixes.clone(),
        }
    }

    /// Canonical registrable domain of `text`, e.g.
    /// `HTTP://WWW.Example.CO.UK/path` -> `example.co.uk`.
    pub fn normalize(&self, text: &str) -> Normalized {
        let lowered = text.trim().to_lowercase();
        let without_scheme = SCHEME_PREFIX.replace(&lowered, "");
        let without_www = WWW_PREFIX.replace(&without_scheme, "");

        let host = without_www
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or("");

        // Suffixes never overlap, so the first hit is the only hit
        if let Some(suffix) = self
            .multi_label_suffixes
            .iter()
            .find(|suffix| host.ends_with(suffix.as_str()))
        {
            let base = &host[..host.len() - suffix.len()];
            let label = base.rsplit('.').next().unwrap_or("");
            if label.is_empty() {
                return Normalized::Unusable;
            }
            return Normalized::Value(format!("{}{}", label, suffix));
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Normalized::Unusable;
        }

        let registrable = &labels[labels.len() - 2..];
        if registrable.iter().any(|label| label.is_empty()) {
            return Normalized::Unusable;
        }

        Normalized::Value(registrable.join("."))
    }

    /// Missing cells are unusable.
    pub fn normalize_cell(&self, cell: &Cell) -> Normalized {
        match cell.as_str() {
            Some(text) => self.normalize(text),
            None => Normalized::Unusable,
        }
    }
}

/// Normalize with the built-in suffix list.
pub fn normalize_domain(text: &str) -> Normalized {
    static DEFAULT: Lazy<DomainNormalizer> = Lazy::new(DomainNormalizer::default);
    DEFAULT.normalize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> Normalized {
        Normalized::Value(s.to_string())
    }

    // ========================================================================
    // Domain likelihood
    // ========================================================================

    #[test]
    fn test_is_domain_like_accepts_hosts_and_urls() {
        assert!(is_domain_like("example.com"));
        assert!(is_domain_like("  Example.COM  "));
        assert!(is_domain_like("https://www.example.co.uk/path?q=1"));
        assert!(is_domain_like("shop.example.museum"));
        assert!(is_domain_like("example.com/about us"));
    }

    #[test]
    fn test_is_domain_like_rejects_non_domains() {
        assert!(!is_domain_like("Acme Inc"));
        assert!(!is_domain_like("acme"));
        assert!(!is_domain_like("acme inc.com"));
        assert!(!is_domain_like("example.c"));
        assert!(!is_domain_like("example.toolongtld"));
        assert!(!is_domain_like("example.c0m"));
        assert!(!is_domain_like("example."));
        assert!(!is_domain_like("1.5"));
        assert!(!is_domain_like(""));
    }

    #[test]
    fn test_is_domain_like_is_monotonic_under_stripping() {
        let accepted = [
            "http://www.example.com/a/b",
            "ftp://files.example.org",
            "example.co.uk/path",
            "https://shop.example.com.au",
        ];
        for input in accepted {
            assert!(is_domain_like(input), "{} should be domain-like", input);
            let host = input.split_once("://").map(|(_, r)| r).unwrap_or(input);
            let host = host.split('/').next().unwrap();
            assert!(is_domain_like(host), "stripped {} should stay domain-like", host);
        }
    }

    // ========================================================================
    // Domain normalization
    // ========================================================================

    #[test]
    fn test_normalize_domain_strips_scheme_www_and_path() {
        assert_eq!(normalize_domain("HTTP://WWW.Example.CO.UK/path?x=1"), value("example.co.uk"));
        assert_eq!(normalize_domain("https://www2.example.com#top"), value("example.com"));
        assert_eq!(normalize_domain("example.com?ref=x"), value("example.com"));
        assert_eq!(normalize_domain("  www.Globex.io  "), value("globex.io"));
    }

    #[test]
    fn test_normalize_domain_keeps_registrable_part() {
        assert_eq!(normalize_domain("shop.sub.example.com"), value("example.com"));
        assert_eq!(normalize_domain("mail.example.co.uk"), value("example.co.uk"));
        assert_eq!(normalize_domain("api.company.com.au"), value("company.com.au"));
        assert_eq!(normalize_domain("example.co.uk"), value("example.co.uk"));
    }

    #[test]
    fn test_normalize_domain_unusable_inputs() {
        assert_eq!(normalize_domain("not a domain"), Normalized::Unusable);
        assert_eq!(normalize_domain("localhost"), Normalized::Unusable);
        assert_eq!(normalize_domain(""), Normalized::Unusable);
        assert_eq!(normalize_domain(".co.uk"), Normalized::Unusable);
        assert_eq!(normalize_domain("example."), Normalized::Unusable);
    }

    #[test]
    fn test_missing_cell_is_unusable() {
        let normalizer = DomainNormalizer::default();
        assert_eq!(normalizer.normalize_cell(&Cell::Missing), Normalized::Unusable);
        assert_eq!(normalizer.normalize_cell(&Cell::present("www.acme.com")), value("acme.com"));
    }

    #[test]
    fn test_configured_suffix_is_honored() {
        let mut vocab = Vocabulary::builtin();
        vocab.multi_label_suffixes.push(".co.nz".to_string());
        let normalizer = DomainNormalizer::from_vocabulary(&vocab);

        assert_eq!(normalizer.normalize("www.shop.kiwi.co.nz"), value("kiwi.co.nz"));
        assert_eq!(normalize_domain("www.shop.kiwi.co.nz"), value("co.nz"));
    }

    #[test]
    fn test_normalize_domain_is_idempotent() {
        let inputs = [
            "HTTP://WWW.Example.CO.UK/path?x=1",
            "shop.sub.example.com",
            "https://www3.foo.com.br/x",
            "globex.io",
            "a.b.c.d.e.org",
        ];
        for input in inputs {
            let once = normalize_domain(input);
            let once_str = once.value().expect("should normalize").to_string();
            assert_eq!(normalize_domain(&once_str), once, "not idempotent for {}", input);
        }
    }
}
