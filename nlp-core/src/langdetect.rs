//! # Detecção de Idioma por Stopwords
//!
//! Heurística simples: conta quantas palavras do texto aparecem na lista de
//! stopwords de cada idioma registrado. O idioma com mais acertos vence.
//!
//! Stopwords são as palavras mais frequentes de qualquer idioma, então mesmo
//! textos curtos ("Hat der ICE echt keine Verspätung?") costumam ter duas ou
//! três ocorrências. Não é um classificador estatístico, mas basta para
//! escolher entre as listas de regras, léxicos e stemmers configurados.
//!
//! Empates são resolvidos pela ordem alfabética do código do idioma, para que
//! o resultado seja determinístico.

use std::sync::Arc;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};
use crate::stopwords::StopwordRegistry;

#[derive(Debug, Clone)]
pub struct LanguageDetector {
    stopwords: Arc<StopwordRegistry>,
}

impl LanguageDetector {
    pub fn new(stopwords: Arc<StopwordRegistry>) -> Self {
        Self { stopwords }
    }

    /// Idioma com mais stopwords no texto, ou `None` sem nenhum acerto.
    pub fn detect(&self, text: &str) -> Result<Option<String>> {
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
        if words.is_empty() {
            return Ok(None);
        }

        let mut best: Option<(&str, usize)> = None;
        for language in self.stopwords.languages() {
            let list = self.stopwords.get(language, false)?;
            let hits = words.iter().filter(|w| list.contains(w)).count();
            debug!(language, hits, "pontuação de idioma");
            if hits > best.map_or(0, |(_, h)| h) {
                best = Some((language, hits));
            }
        }
        Ok(best.map(|(language, _)| language.to_string()))
    }
}

impl Processor for LanguageDetector {
    fn name(&self) -> &str {
        "language-detector"
    }

    fn phase(&self) -> Phase {
        Phase::LanguageDetection
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        if doc.language.is_some() {
            return Ok(());
        }
        let Some(text) = doc.text() else {
            return Ok(());
        };
        match self.detect(text)? {
            Some(language) => {
                debug!(language = %language, "idioma detectado");
                doc.language = Some(language);
            }
            None => debug!("nenhuma stopword encontrada; idioma indefinido"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> LanguageDetector {
        LanguageDetector::new(Arc::new(StopwordRegistry::with_defaults()))
    }

    #[test]
    fn test_detects_german() {
        let lang = detector()
            .detect("Hat der ICE 1234 echt keine Verspätung?")
            .unwrap();
        assert_eq!(lang.as_deref(), Some("de"));
    }

    #[test]
    fn test_detects_english() {
        let lang = detector()
            .detect("The train to Berlin is not on time.")
            .unwrap();
        assert_eq!(lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_no_stopwords_gives_none() {
        assert_eq!(detector().detect("ICE 1234").unwrap(), None);
        assert_eq!(detector().detect("").unwrap(), None);
    }

    #[test]
    fn test_existing_language_is_kept() {
        let mut doc = Document::new("The train is late.").with_language("de");
        detector().process(&mut doc).unwrap();
        assert_eq!(doc.language(), Some("de"));

        let mut doc = Document::new("The train is late.");
        detector().process(&mut doc).unwrap();
        assert_eq!(doc.language(), Some("en"));
    }

    #[test]
    fn test_tie_goes_to_first_language() {
        let mut registry = StopwordRegistry::new();
        registry.register_words("xb", ["zug"]);
        registry.register_words("xa", ["zug"]);
        let detector = LanguageDetector::new(Arc::new(registry));
        assert_eq!(detector.detect("Zug").unwrap().as_deref(), Some("xa"));
    }
}
