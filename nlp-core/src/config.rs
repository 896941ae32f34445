//! # Configuração do Pipeline
//!
//! [`PipelineConfig`] descreve, em JSON, quais idiomas e recursos o pipeline usa.
//! A montagem é explícita: [`PipelineConfig::build_pipeline`] cria os registros
//! compartilhados (tagsets, stopwords, stemmers, regras de negação) e os injeta
//! em cada processador.
//!
//! ```json
//! {
//!   "languages": ["de", "en"],
//!   "stopwords": { "case_sensitive": false, "pos_filter": true, "files": { "nl": "stop_nl.txt" } },
//!   "gazetteer": [{ "surface": "Deutsche Bahn", "entity_type": "ORG", "probability": 0.9 }],
//!   "patterns": [{ "name": "train", "pattern": "\\bICE \\d+\\b", "entity_type": "TRAIN" }]
//! }
//! ```
//!
//! Todos os campos são opcionais; o padrão é alemão + inglês com os recursos
//! embutidos.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::NamedEntityCollector;
use crate::corpus;
use crate::error::{Error, Result};
use crate::langdetect::LanguageDetector;
use crate::negation::{NegationResolver, NegationRuleRegistry};
use crate::pipeline::Pipeline;
use crate::pos::{Lexicon, LexiconPosTagger};
use crate::rule_based::{GazetteerDetector, GazetteerEntry, PatternDetector, PatternSpec};
use crate::stemmer::{StemmerProcessor, StemmerRegistry, SuffixStemmer};
use crate::stopwords::{StopwordMarker, StopwordRegistry};
use crate::tagset::TagSetRegistry;
use crate::tokenizer::TokenizerProcessor;

/// Padrões do marcador de stopwords e arquivos de listas extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopwordConfig {
    pub case_sensitive: bool,
    pub pos_filter: bool,
    /// Idioma → arquivo com uma palavra por linha.
    pub files: BTreeMap<String, PathBuf>,
}

impl Default for StopwordConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            pos_filter: true,
            files: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub languages: Vec<String>,
    /// Detecta o idioma quando o documento não informa um.
    pub detect_language: bool,
    pub stopwords: StopwordConfig,
    /// Inclui as entidades do corpus de demonstração no gazetteer.
    pub corpus_gazetteer: bool,
    pub gazetteer: Vec<GazetteerEntry>,
    pub patterns: Vec<PatternSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            languages: vec!["de".into(), "en".into()],
            detect_language: true,
            stopwords: StopwordConfig::default(),
            corpus_gazetteer: true,
            gazetteer: Vec::new(),
            patterns: default_patterns(),
        }
    }
}

fn default_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec {
            name: "train-number".into(),
            pattern: r"\b(?:ICE|IC|EC|RE|RB)\s?\d{1,5}\b".into(),
            entity_type: "TRAIN".into(),
            probability: Some(0.9),
        },
        PatternSpec {
            name: "clock-time".into(),
            pattern: r"\b(?:[01]?\d|2[0-3]):[0-5]\d\b".into(),
            entity_type: "TIME".into(),
            probability: Some(0.95),
        },
    ]
}

impl FromStr for PipelineConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = content.parse()?;
        info!(path = %path.display(), languages = ?config.languages, "configuração carregada");
        Ok(config)
    }

    /// Confere a consistência da configuração sem montar nada.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(Error::config("nenhum idioma habilitado"));
        }
        for language in &self.languages {
            let language = language.to_lowercase();
            let builtin = matches!(language.as_str(), "de" | "en");
            if !builtin && !self.stopwords.files.contains_key(&language) {
                return Err(Error::config(format!(
                    "idioma '{language}' não tem recursos embutidos nem lista de stopwords"
                )));
            }
        }
        let probabilities = self
            .gazetteer
            .iter()
            .map(|e| (e.surface.as_str(), e.probability))
            .chain(self.patterns.iter().map(|p| (p.name.as_str(), p.probability)));
        for (name, probability) in probabilities {
            if let Some(p) = probability {
                if !(p > 0.0 && p <= 1.0) {
                    return Err(Error::config(format!(
                        "probabilidade de '{name}' fora de (0, 1]: {p}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn enabled(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Monta o pipeline completo descrito pela configuração.
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        self.validate()?;

        let tag_sets = Arc::new(TagSetRegistry::with_defaults());

        let mut stopwords = StopwordRegistry::new();
        for language in &self.languages {
            stopwords.register_builtin(language);
        }
        for (language, path) in &self.stopwords.files {
            stopwords.register_file(language, path.clone());
        }
        let stopwords = Arc::new(stopwords);

        let mut stemmers = StemmerRegistry::new();
        if self.enabled("de") {
            stemmers.register("de", || Arc::new(SuffixStemmer::german()));
        }
        if self.enabled("en") {
            stemmers.register("en", || Arc::new(SuffixStemmer::english()));
        }

        let mut tagger = LexiconPosTagger::new(Arc::clone(&tag_sets));
        if self.enabled("de") {
            tagger = tagger.with_lexicon(Lexicon::german());
        }
        if self.enabled("en") {
            tagger = tagger.with_lexicon(Lexicon::english());
        }

        let mut gazetteer = GazetteerDetector::new("gazetteer");
        if self.corpus_gazetteer {
            for entry in corpus::gazetteer_entries() {
                gazetteer.add(entry);
            }
        }
        for entry in &self.gazetteer {
            gazetteer.add(entry.clone());
        }

        let mut patterns = PatternDetector::new();
        for spec in &self.patterns {
            patterns = patterns.pattern(spec)?;
        }

        let mut pipeline = Pipeline::new();
        if self.detect_language {
            pipeline = pipeline.with(LanguageDetector::new(Arc::clone(&stopwords)));
        }
        pipeline = pipeline
            .with(TokenizerProcessor)
            .with(tagger)
            .with(
                StopwordMarker::new(stopwords)
                    .case_sensitive(self.stopwords.case_sensitive)
                    .pos_filter(self.stopwords.pos_filter),
            )
            .with(StemmerProcessor::new(Arc::new(stemmers)));
        if !gazetteer.is_empty() {
            pipeline = pipeline.with(gazetteer);
        }
        if !patterns.is_empty() {
            pipeline = pipeline.with(patterns);
        }
        pipeline = pipeline
            .with(NamedEntityCollector::new())
            .with(NegationResolver::new(Arc::new(NegationRuleRegistry::with_defaults())));

        info!(stages = ?pipeline.stage_names(), "pipeline montado");
        Ok(pipeline)
    }
}
