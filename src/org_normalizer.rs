//! Company Name Normalization
//!
//! Turns free-text company names into a canonical display form so that
//! exact-match deduplication catches the usual variations:
//! - Whitespace and trailing annotations: "Acme  (formerly X)" -> "Acme"
//! - Wrapper phrases: "The Widget Company" -> "Widget"
//! - Legal suffixes: "Acme Corp, Inc." -> "Acme"
//! - Residual country qualifiers: "Acme UK" -> "Acme"
//! - Casing: "macy's" -> "Macy's", "ibm" -> "IBM"
//!
//! Names that turn out to be domains are lowercased instead of title-cased.
//!
//! The passes run in a fixed order; each one assumes the earlier ones
//! already ran.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain_utils::is_domain_like;
use crate::table::{Cell, Normalized};
use crate::vocabulary::Vocabulary;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TRAILING_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*\)\s*$").unwrap());
static DASH_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–—]\s+.*").unwrap());
static TRAILING_COUNTRY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[A-Z]{2}$").unwrap());
static MANGLED_POSSESSIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z])['’]S\b").unwrap());

/// Number of legal-suffix stripping rounds ("Acme Co, Inc." needs two).
const SUFFIX_PASSES: usize = 2;

static BUILTIN: Lazy<OrgNormalizer> = Lazy::new(|| {
    OrgNormalizer::from_vocabulary(&Vocabulary::builtin())
        .expect("built-in vocabulary produces valid patterns")
});

/// Company name normalizer built from a [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct OrgNormalizer {
    /// `The <X> Company` style wrapper, `None` when no wrapper words are configured
    wrapper: Option<Regex>,
    /// Trailing legal-form token, `None` when the suffix list is empty
    legal_suffix: Option<Regex>,
    /// Ordered literal casing fixes
    brand_overrides: Vec<(String, String)>,
}

impl Default for OrgNormalizer {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

fn alternation(words: &[String]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    Some(
        words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

impl OrgNormalizer {
    /// Compile the word lists of `vocab` into matching patterns.
    pub fn from_vocabulary(vocab: &Vocabulary) -> Result<Self, regex::Error> {
        let wrapper = alternation(&vocab.wrapper_words)
            .map(|words| Regex::new(&format!(r"(?i)^The\s+(.+?)\s+(?:{})$", words)))
            .transpose()?;

        let legal_suffix = alternation(&vocab.legal_suffixes)
            .map(|words| Regex::new(&format!(r"(?i)[\s,&\-]+\b(?:{})\b\.?$", words)))
            .transpose()?;

        Ok(Self {
            wrapper,
            legal_suffix,
            brand_overrides: vocab.brand_overrides.clone(),
        })
    }

    /// Normalize one company name. Total over all inputs; the result may be
    /// empty when nothing meaningful is left.
    pub fn normalize(&self, name: &str) -> String {
        let mut result = squeeze(name);
        result = self.unwrap_wrapper(&result);
        result = self.strip_legal_suffixes(&result);
        result = self.strip_country_code(&result);
        result = self.fix_casing(&result);

        if is_domain_like(&result) {
            result = result.to_lowercase();
        }

        debug!("Normalized name '{}' to '{}'", name, result);
        result
    }

    /// Missing cells stay missing; names that clean up to nothing are unusable.
    pub fn normalize_cell(&self, cell: &Cell) -> Normalized {
        match cell.as_str() {
            Some(text) => {
                let normalized = self.normalize(text);
                if normalized.is_empty() {
                    Normalized::Unusable
                } else {
                    Normalized::Value(normalized)
                }
            }
            None => Normalized::Unusable,
        }
    }

    fn unwrap_wrapper(&self, name: &str) -> String {
        let Some(wrapper) = &self.wrapper else {
            return name.to_string();
        };
        match wrapper.captures(name).and_then(|caps| caps.get(1)) {
            Some(inner) => inner.as_str().trim().to_string(),
            None => name.to_string(),
        }
    }

    fn strip_legal_suffixes(&self, name: &str) -> String {
        let Some(suffix) = &self.legal_suffix else {
            return name.to_string();
        };
        let mut result = name.to_string();
        for _ in 0..SUFFIX_PASSES {
            result = suffix.replace(&result, "").trim().to_string();
        }
        result
    }

    /// "Acme UK" -> "Acme". A lone two-letter name such as "HP" is kept, and
    /// so is a trailing token that a brand override produces ("Acme HP").
    fn strip_country_code(&self, name: &str) -> String {
        let Some(found) = TRAILING_COUNTRY_CODE.find(name) else {
            return name.to_string();
        };
        let token = found.as_str().trim();
        if self.brand_overrides.iter().any(|(_, right)| right == token) {
            return name.to_string();
        }
        name[..found.start()].trim().to_string()
    }

    fn fix_casing(&self, name: &str) -> String {
        let titled = title_case(name);
        let mut result = MANGLED_POSSESSIVE.replace_all(&titled, "${1}'s").into_owned();

        for (wrong, right) in &self.brand_overrides {
            if result.contains(wrong.as_str()) {
                result = result.replace(wrong.as_str(), right);
            }
        }
        result
    }
}

/// Collapse whitespace, then drop a trailing parenthetical and anything after
/// a standalone dash separator.
fn squeeze(name: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(name, " ");
    let collapsed = collapsed.trim();
    let without_paren = TRAILING_PARENTHETICAL.replace(collapsed, "");
    let without_paren = without_paren.trim();
    DASH_SEPARATOR.replace(without_paren, "").trim().to_string()
}


/// Word-initial letters upper-cased, all other letters lower-cased. A letter
/// starts a word when the previous character is not a letter, so "macy's"
/// becomes "Macy'S" (repaired afterwards) and "3m" becomes "3M".
fn title_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut previous_is_letter = false;

    for c in name.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

/// Normalize with the built-in vocabulary.
pub fn normalize_name(name: &str) -> String {
    BUILTIN.normalize(name)
}
