//! # Stemming
//!
//! Reduz tokens alfabéticos ao seu radical aproximado e guarda o resultado na
//! anotação [`STEM`]. Os stemmers são por remoção de sufixo (o maior sufixo
//! aplicável vence), com um tamanho mínimo de radical para não destruir palavras
//! curtas.
//!
//! Como as listas de stopwords, os stemmers são criados sob demanda pelo
//! [`StemmerRegistry`] e guardados em cache (lock de leitura, depois de escrita
//! com nova verificação).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::annotation::STEM;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::pipeline::{Phase, Processor};
use crate::span::SpanId;
use crate::value::Value;

/// Algoritmo de stemming.
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;

    fn language(&self) -> &str;
}

/// Stemmer que remove o maior sufixo conhecido.
#[derive(Debug, Clone)]
pub struct SuffixStemmer {
    language: String,
    /// Ordenados do maior para o menor.
    suffixes: Vec<String>,
    min_stem: usize,
}

impl SuffixStemmer {
    pub fn new(language: impl Into<String>, suffixes: &[&str], min_stem: usize) -> Self {
        let mut suffixes: Vec<String> = suffixes.iter().map(|s| s.to_string()).collect();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));
        Self {
            language: language.into(),
            suffixes,
            min_stem,
        }
    }

    pub fn german() -> Self {
        Self::new(
            "de",
            &[
                "ungen", "heiten", "keiten", "ung", "heit", "keit", "lich", "isch", "chen", "lein",
                "ern", "em", "en", "er", "es", "e", "n", "s",
            ],
            3,
        )
    }

    pub fn english() -> Self {
        Self::new(
            "en",
            &[
                "ational", "ations", "ation", "ness", "ment", "ings", "ing", "edly", "ies", "ied",
                "ed", "ly", "es", "er", "s",
            ],
            3,
        )
    }
}

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        let word = word.to_lowercase();
        let len = word.chars().count();
        for suffix in &self.suffixes {
            let suffix_len = suffix.chars().count();
            if len >= self.min_stem + suffix_len && word.ends_with(suffix.as_str()) {
                return word[..word.len() - suffix.len()].to_string();
            }
        }
        word
    }

    fn language(&self) -> &str {
        &self.language
    }
}

type Factory = Arc<dyn Fn() -> Arc<dyn Stemmer> + Send + Sync>;

/// Stemmers por idioma, criados no primeiro uso.
#[derive(Default)]
pub struct StemmerRegistry {
    factories: HashMap<String, Factory>,
    cache: RwLock<HashMap<String, Arc<dyn Stemmer>>>,
}

impl std::fmt::Debug for StemmerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemmerRegistry")
            .field("languages", &self.languages())
            .field("loaded", &self.cache.read().len())
            .finish()
    }
}

impl StemmerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("de", || Arc::new(SuffixStemmer::german()));
        registry.register("en", || Arc::new(SuffixStemmer::english()));
        registry
    }

    pub fn register<F>(&mut self, language: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Stemmer> + Send + Sync + 'static,
    {
        let language = language.to_lowercase();
        self.cache.get_mut().remove(&language);
        self.factories.insert(language, Arc::new(factory));
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    pub fn get(&self, language: &str) -> Result<Arc<dyn Stemmer>> {
        let language = language.to_lowercase();
        if let Some(stemmer) = self.cache.read().get(&language) {
            return Ok(Arc::clone(stemmer));
        }

        let mut cache = self.cache.write();
        if let Some(stemmer) = cache.get(&language) {
            return Ok(Arc::clone(stemmer));
        }
        let factory = self
            .factories
            .get(&language)
            .ok_or_else(|| Error::UnknownLanguage(language.clone()))?;
        let stemmer = factory();
        info!(language = %language, "stemmer criado");
        cache.insert(language, Arc::clone(&stemmer));
        Ok(stemmer)
    }
}

/// Estágio que anota o radical de cada token alfabético.
#[derive(Debug, Clone)]
pub struct StemmerProcessor {
    registry: Arc<StemmerRegistry>,
}

impl StemmerProcessor {
    pub fn new(registry: Arc<StemmerRegistry>) -> Self {
        Self { registry }
    }
}

impl Processor for StemmerProcessor {
    fn name(&self) -> &str {
        "stemmer"
    }

    fn phase(&self) -> Phase {
        Phase::Annotate
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(language) = doc.language.as_deref() else {
            debug!("idioma desconhecido; stemming ignorado");
            return Ok(());
        };
        let stemmer = match self.registry.get(language) {
            Ok(stemmer) => stemmer,
            Err(Error::UnknownLanguage(_)) => {
                debug!(language, "sem stemmer para o idioma");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; stemming ignorado");
            return Ok(());
        };

        let tokens: Vec<SpanId> = at.tokens(at.root()).collect();
        for token in tokens {
            let form = at.span_text(token);
            if !form.chars().all(char::is_alphabetic) {
                continue;
            }
            let stem = stemmer.stem(form);
            at.annotations_mut(token).set_value(STEM, Value::new(stem));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerProcessor;

    #[test]
    fn test_german_suffixes() {
        let stemmer = SuffixStemmer::german();
        assert_eq!(stemmer.stem("Verspätungen"), "verspät");
        assert_eq!(stemmer.stem("Zeitung"), "zeit");
        assert_eq!(stemmer.stem("Kinder"), "kind");
        assert_eq!(stemmer.stem("Bus"), "bus");
    }

    #[test]
    fn test_english_suffixes() {
        let stemmer = SuffixStemmer::english();
        assert_eq!(stemmer.stem("trains"), "train");
        assert_eq!(stemmer.stem("running"), "runn");
        assert_eq!(stemmer.stem("is"), "is");
    }

    #[test]
    fn test_registry_caches_instances() {
        let registry = StemmerRegistry::with_defaults();
        let a = registry.get("de").unwrap();
        let b = registry.get("DE").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.language(), "de");
        assert!(matches!(registry.get("fi"), Err(Error::UnknownLanguage(_))));
    }

    #[test]
    fn test_processor_skips_non_alphabetic_tokens() {
        let mut doc = Document::new("ICE 1234 Verspätungen").with_language("de");
        TokenizerProcessor.process(&mut doc).unwrap();
        StemmerProcessor::new(Arc::new(StemmerRegistry::with_defaults()))
            .process(&mut doc)
            .unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        let stems: Vec<Option<&str>> = at
            .tokens(at.root())
            .map(|t| at.annotations(t).annotation(STEM).map(String::as_str))
            .collect();
        assert_eq!(stems, vec![Some("ice"), None, Some("verspät")]);
    }
}
