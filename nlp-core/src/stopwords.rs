//! # Stopwords
//!
//! Listas de palavras funcionais por idioma e o estágio que marca tokens com
//! [`STOPWORD`].
//!
//! ## Cache preguiçoso
//!
//! O [`StopwordRegistry`] conhece as **fontes** (lista embutida ou arquivo) e só
//! materializa uma [`WordList`] na primeira vez que ela é pedida para um par
//! `(idioma, sensível a maiúsculas)`. A leitura usa um `RwLock`:
//!
//! 1. lock de leitura → achou? retorna;
//! 2. lock de escrita → confere de novo (outra thread pode ter carregado);
//! 3. carrega, insere, retorna.
//!
//! Cada lista é carregada no máximo uma vez durante a vida do processo.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::annotation::{POS, STOPWORD};
use crate::document::{Document, STOPWORD_CASE_SENSITIVE, STOPWORD_POS_FILTER};
use crate::error::{Error, Result};
use crate::pipeline::{Phase, Processor};
use crate::span::SpanId;
use crate::tagset::{LexicalCategory, Pos, PosTag};
use crate::value::Value;

const GERMAN: &[&str] = &[
    "aber", "alle", "als", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis", "bist", "da",
    "damit", "dann", "das", "dass", "dem", "den", "denn", "der", "des", "die", "dies", "doch",
    "du", "durch", "ein", "eine", "einem", "einen", "einer", "eines", "er", "es", "für", "hat",
    "hatte", "ich", "ihr", "im", "in", "ist", "ja", "kann", "man", "mit", "nach", "noch", "nur",
    "ob", "oder", "sich", "sie", "sind", "so", "über", "um", "und", "uns", "von", "vom", "war",
    "was", "weil", "wenn", "wie", "wir", "wird", "zu", "zum", "zur",
];

const ENGLISH: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "me", "my",
    "of", "on", "or", "our", "she", "so", "some", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "to", "us", "was", "we", "were", "what", "when", "which",
    "who", "will", "with", "would", "you", "your",
];

/// Conjunto de palavras carregado de uma fonte.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Uma palavra por linha; linhas vazias e linhas iniciadas por `#` são ignoradas.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut words = HashSet::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            words.insert(word.to_string());
        }
        Ok(Self { words })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Cópia com todas as palavras em minúsculas.
    pub fn lowercased(&self) -> Self {
        Self {
            words: self.words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Source {
    Builtin(&'static [&'static str]),
    Words(Vec<String>),
    File(PathBuf),
}

impl Source {
    fn load(&self) -> Result<WordList> {
        match self {
            Source::Builtin(words) => Ok(WordList::from_words(words.iter().copied())),
            Source::Words(words) => Ok(WordList::from_words(words.iter().cloned())),
            Source::File(path) => WordList::from_path(path),
        }
    }
}

/// Registro de listas de stopwords com cache preguiçoso por `(idioma, case)`.
#[derive(Debug, Default)]
pub struct StopwordRegistry {
    sources: HashMap<String, Source>,
    cache: RwLock<HashMap<(String, bool), Arc<WordList>>>,
}

impl StopwordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro com as listas embutidas de alemão e inglês.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_builtin("de");
        registry.register_builtin("en");
        registry
    }

    /// Registra a lista embutida do idioma; `false` se não houver uma.
    pub fn register_builtin(&mut self, language: &str) -> bool {
        let words = match language.to_lowercase().as_str() {
            "de" => GERMAN,
            "en" => ENGLISH,
            _ => return false,
        };
        self.insert_source(language, Source::Builtin(words));
        true
    }

    pub fn register_words<I, S>(&mut self, language: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words.into_iter().map(Into::into).collect();
        self.insert_source(language, Source::Words(words));
    }

    /// Registra um arquivo de palavras; ele só é lido no primeiro uso.
    pub fn register_file(&mut self, language: &str, path: impl Into<PathBuf>) {
        self.insert_source(language, Source::File(path.into()));
    }

    fn insert_source(&mut self, language: &str, source: Source) {
        let language = language.to_lowercase();
        self.cache.get_mut().retain(|(l, _), _| *l != language);
        self.sources.insert(language, source);
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Lista do idioma; sem `case_sensitive` todas as palavras ficam em minúsculas.
    pub fn get(&self, language: &str, case_sensitive: bool) -> Result<Arc<WordList>> {
        let key = (language.to_lowercase(), case_sensitive);
        if let Some(list) = self.cache.read().get(&key) {
            return Ok(Arc::clone(list));
        }

        let mut cache = self.cache.write();
        if let Some(list) = cache.get(&key) {
            return Ok(Arc::clone(list));
        }
        let source = self
            .sources
            .get(&key.0)
            .ok_or_else(|| Error::UnknownLanguage(key.0.clone()))?;
        let mut list = source.load()?;
        if !case_sensitive {
            list = list.lowercased();
        }
        info!(language = %key.0, case_sensitive, words = list.len(), "lista de stopwords carregada");
        let list = Arc::new(list);
        cache.insert(key, Arc::clone(&list));
        Ok(list)
    }
}

/// Estágio que marca stopwords.
///
/// Os padrões podem ser sobrescritos por documento com
/// [`STOPWORD_CASE_SENSITIVE`] e [`STOPWORD_POS_FILTER`].
#[derive(Debug, Clone)]
pub struct StopwordMarker {
    registry: Arc<StopwordRegistry>,
    case_sensitive: bool,
    pos_filter: bool,
}

impl StopwordMarker {
    pub fn new(registry: Arc<StopwordRegistry>) -> Self {
        Self {
            registry,
            case_sensitive: false,
            pos_filter: true,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn pos_filter(mut self, pos_filter: bool) -> Self {
        self.pos_filter = pos_filter;
        self
    }
}

/// Palavras de conteúdo nunca são stopwords quando o filtro POS está ativo.
fn is_content_word(pos: &PosTag) -> bool {
    let auxiliary = pos.has_any_pos(&[Pos::AuxiliaryVerb, Pos::ModalVerb]);
    pos.has_any_category(&[LexicalCategory::Noun, LexicalCategory::Adjective])
        || pos.has_pos(Pos::Numeral)
        || (pos.has_category(LexicalCategory::Verb) && !auxiliary)
}

impl Processor for StopwordMarker {
    fn name(&self) -> &str {
        "stopword-marker"
    }

    fn phase(&self) -> Phase {
        Phase::Annotate
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(language) = doc.language.as_deref() else {
            debug!("idioma desconhecido; marcação de stopwords ignorada");
            return Ok(());
        };
        let case_sensitive = doc
            .overrides
            .get_bool(STOPWORD_CASE_SENSITIVE)
            .unwrap_or(self.case_sensitive);
        let pos_filter = doc.overrides.get_bool(STOPWORD_POS_FILTER).unwrap_or(self.pos_filter);

        let list = match self.registry.get(language, case_sensitive) {
            Ok(list) => list,
            Err(Error::UnknownLanguage(_)) => {
                debug!(language, "sem lista de stopwords para o idioma");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; marcação de stopwords ignorada");
            return Ok(());
        };

        let tokens: Vec<SpanId> = at.tokens(at.root()).collect();
        let mut marked = 0usize;
        for token in tokens {
            if pos_filter && at.annotations(token).annotation(POS).is_some_and(is_content_word) {
                continue;
            }
            let form = at.span_text(token);
            let hit = if case_sensitive {
                list.contains(form)
            } else {
                list.contains(&form.to_lowercase())
            };
            if hit {
                at.annotations_mut(token).set_value(STOPWORD, Value::new(true));
                marked += 1;
            }
        }
        debug!(language, marked, "stopwords marcadas");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ConfigOverrides;
    use crate::pos::LexiconPosTagger;
    use crate::tagset::TagSetRegistry;
    use crate::tokenizer::TokenizerProcessor;
    use std::io::Write;

    fn marked(mut doc: Document, marker: &StopwordMarker, with_pos: bool) -> Vec<String> {
        TokenizerProcessor.process(&mut doc).unwrap();
        if with_pos {
            LexiconPosTagger::with_defaults(Arc::new(TagSetRegistry::with_defaults()))
                .process(&mut doc)
                .unwrap();
        }
        marker.process(&mut doc).unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        at.tokens(at.root())
            .filter(|&t| at.annotations(t).annotation(STOPWORD) == Some(&true))
            .map(|t| at.span_text(t).to_string())
            .collect()
    }

    #[test]
    fn test_marks_case_insensitive_by_default() {
        let marker = StopwordMarker::new(Arc::new(StopwordRegistry::with_defaults()));
        let doc = Document::new("Der Zug und die Bahn").with_language("de");
        assert_eq!(marked(doc, &marker, false), vec!["Der", "und", "die"]);
    }

    #[test]
    fn test_case_sensitive_override() {
        let marker = StopwordMarker::new(Arc::new(StopwordRegistry::with_defaults()));
        let mut overrides = ConfigOverrides::new();
        overrides.set(STOPWORD_CASE_SENSITIVE, true);
        let doc = Document::new("Der Zug und die Bahn")
            .with_language("de")
            .with_overrides(overrides);
        assert_eq!(marked(doc, &marker, false), vec!["und", "die"]);
    }

    #[test]
    fn test_pos_filter_keeps_content_words() {
        let mut registry = StopwordRegistry::new();
        registry.register_words("en", ["the", "train", "of"]);
        let marker = StopwordMarker::new(Arc::new(registry));

        // "Train" é NNP pela ortografia
        let doc = Document::new("The Train of Berlin.").with_language("en");
        assert_eq!(marked(doc, &marker, true), vec!["The", "of"]);

        let mut overrides = ConfigOverrides::new();
        overrides.set(STOPWORD_POS_FILTER, false);
        let doc = Document::new("The Train of Berlin.")
            .with_language("en")
            .with_overrides(overrides);
        assert_eq!(marked(doc, &marker, true), vec!["The", "Train", "of"]);
    }

    #[test]
    fn test_auxiliary_verbs_stay_stopwords() {
        let marker = StopwordMarker::new(Arc::new(StopwordRegistry::with_defaults()));
        let doc = Document::new("Er hat nichts").with_language("de");
        assert_eq!(marked(doc, &marker, true), vec!["Er", "hat"]);
    }

    #[test]
    fn test_unknown_language_is_skipped() {
        let marker = StopwordMarker::new(Arc::new(StopwordRegistry::with_defaults()));
        let doc = Document::new("le train").with_language("fr");
        assert!(marked(doc, &marker, false).is_empty());
    }

    #[test]
    fn test_file_source_is_loaded_once_per_case_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comentário\nZug\n\nBahn").unwrap();

        let mut registry = StopwordRegistry::new();
        registry.register_file("de", file.path());
        let insensitive = registry.get("de", false).unwrap();
        let sensitive = registry.get("DE", true).unwrap();
        assert!(insensitive.contains("zug"));
        assert!(!sensitive.contains("zug"));
        assert!(sensitive.contains("Zug"));
        assert_eq!(sensitive.len(), 2);
        assert!(Arc::ptr_eq(&insensitive, &registry.get("de", false).unwrap()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut registry = StopwordRegistry::new();
        registry.register_file("de", "/nonexistent/stopwords-de.txt");
        assert!(matches!(registry.get("de", false), Err(Error::Io(_))));
        assert!(matches!(registry.get("xx", false), Err(Error::UnknownLanguage(_))));
    }
}
