//! Fixed word lists used by the normalizers, the column selector and the
//! pipeline's placeholder filter.
//!
//! The algorithms never hard-code these lists; they read them from a
//! [`Vocabulary`] so deployments can extend them through the `[vocabulary]`
//! config section without touching control flow.

use crate::config::{ConfigError, VocabularyConfig};

/// Legal and corporate-form tokens stripped from the end of company names.
/// Matching is case-insensitive and whole-word.
const LEGAL_SUFFIXES: &[&str] = &[
    "Inc", "Corp", "Corporation", "Incorporated", "Company", "Co", "Technologies",
    "Holdings", "Group", "Solutions", "Services", "Systems", "Associates",
    "LLC", "Ltd", "LLP", "LP", "PC", "PLC", "GmbH", "AG", "SARL", "SA",
    "AB", "BV", "SpA", "Srl", "SL", "SA de CV", "Platforms", "Stores",
    "Motors", "Wholesale", "Coffee", "International", "Service", "Association",
    "Business",
];

/// Trailing words of "The <X> Company" style wrappers.
const WRAPPER_WORDS: &[&str] = &["Company", "Group"];

/// Multi-label public suffixes honored by the domain normalizer.
/// None of these is a suffix of another.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    ".co.uk", ".org.uk", ".com.au", ".net.au", ".com.sa", ".com.br",
    ".com.mx", ".co.jp", ".co.za", ".co.in", ".com.cn", ".com.tw",
];

/// Capitalization fixes applied after title-casing, in order.
const BRAND_OVERRIDES: &[(&str, &str)] = &[
    ("Jpmorgan", "JPMorgan"),
    ("Hp", "HP"),
    ("Ibm", "IBM"),
];

const DOMAIN_KEYWORDS: &[&str] = &["domain", "website", "url", "web address"];

const NAME_KEYWORDS: &[&str] = &[
    "name", "account", "company", "organization", "customer", "prospect", "client",
];

/// Keywords that mark row 0 of a source as a header row.
const HEADER_KEYWORDS: &[&str] = &[
    "account", "company", "name", "domain", "website", "url", "list",
    "organization", "customer", "prospect",
];

/// Cell values that are header labels leaking into the data body.
const PLACEHOLDER_TOKENS: &[&str] = &[
    "name", "account", "company", "organization", "customer", "prospect", "client",
    "domain", "website", "url", "web address", "list",
    "company name", "account name", "customer name", "organization name",
    "domain name", "company domain", "company website", "website url",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    pub legal_suffixes: Vec<String>,
    pub wrapper_words: Vec<String>,
    pub multi_label_suffixes: Vec<String>,
    /// Ordered (wrong, right) literal replacements
    pub brand_overrides: Vec<(String, String)>,
    pub domain_keywords: Vec<String>,
    pub name_keywords: Vec<String>,
    pub header_keywords: Vec<String>,
    /// Stored lowercase
    pub placeholder_tokens: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn push_unique(target: &mut Vec<String>, extra: &[String], lowercase: bool) {
    for item in extra {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let item = if lowercase { item.to_lowercase() } else { item.to_string() };
        if !target.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
            target.push(item);
        }
    }
}

impl Vocabulary {
    /// The built-in word lists.
    pub fn builtin() -> Self {
        Self {
            legal_suffixes: owned(LEGAL_SUFFIXES),
            wrapper_words: owned(WRAPPER_WORDS),
            multi_label_suffixes: owned(MULTI_LABEL_SUFFIXES),
            brand_overrides: BRAND_OVERRIDES
                .iter()
                .map(|(w, r)| (w.to_string(), r.to_string()))
                .collect(),
            domain_keywords: owned(DOMAIN_KEYWORDS),
            name_keywords: owned(NAME_KEYWORDS),
            header_keywords: owned(HEADER_KEYWORDS),
            placeholder_tokens: owned(PLACEHOLDER_TOKENS),
        }
    }

    /// Built-in lists plus the entries configured in `[vocabulary]`.
    pub fn extended(config: &VocabularyConfig) -> Result<Self, ConfigError> {
        let mut vocab = Self::builtin();

        push_unique(&mut vocab.legal_suffixes, &config.legal_suffixes, false);
        push_unique(&mut vocab.domain_keywords, &config.domain_keywords, true);
        push_unique(&mut vocab.name_keywords, &config.name_keywords, true);
        push_unique(&mut vocab.header_keywords, &config.header_keywords, true);
        push_unique(&mut vocab.placeholder_tokens, &config.placeholder_tokens, true);
        push_unique(&mut vocab.multi_label_suffixes, &config.multi_label_suffixes, true);

        for (wrong, right) in &config.brand_overrides {
            match vocab.brand_overrides.iter_mut().find(|(w, _)| w == wrong) {
                Some(existing) => existing.1 = right.clone(),
                None => vocab.brand_overrides.push((wrong.clone(), right.clone())),
            }
        }

        vocab.validate()?;
        Ok(vocab)
    }

    /// Check the multi-label suffix invariants: every entry starts with a
    /// dot, has at least two labels, and none is a suffix of another.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for suffix in &self.multi_label_suffixes {
            let labels: Vec<&str> = suffix.trim_start_matches('.').split('.').collect();
            if !suffix.starts_with('.') || labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
                return Err(ConfigError::InvalidSuffix {
                    suffix: suffix.clone(),
                });
            }
        }

        for a in &self.multi_label_suffixes {
            for b in &self.multi_label_suffixes {
                if a != b && a.ends_with(b.as_str()) {
                    return Err(ConfigError::OverlappingSuffix {
                        suffix: a.clone(),
                        other: b.clone(),
                    });
                }
            }
        }

        if self.name_keywords.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "vocabulary.name_keywords".to_string(),
            });
        }
        if self.domain_keywords.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "vocabulary.domain_keywords".to_string(),
            });
        }

        Ok(())
    }

    /// True when a cell value is a header label echoed into the data body.
    pub fn is_placeholder(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        self.placeholder_tokens.iter().any(|t| *t == value)
    }

    /// True when a candidate header row contains a header-sniffing keyword.
    pub fn looks_like_header(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        self.header_keywords.iter().any(|k| value.contains(k.as_str()))
    }
}
