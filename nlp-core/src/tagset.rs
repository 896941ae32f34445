//! # Tag Sets — Interpretação das Tags dos Etiquetadores
//!
//! Etiquetadores morfossintáticos emitem códigos crus (`NN`, `PTKNEG`, `VBZ`...).
//! Um [`TagSet`] traduz esses códigos em **categorias semânticas** que o resto do
//! pipeline entende, independentemente do idioma ou do modelo usado.
//!
//! ## Níveis de categoria
//!
//! | Nível               | Exemplo                   | Uso                                   |
//! |---------------------|---------------------------|---------------------------------------|
//! | [`LexicalCategory`] | `Noun`, `Verb`, `Adverb`  | Filtros grossos (stopwords, negação)  |
//! | [`Pos`]             | `Negative`, `CoordinatingConjunction` | Regras finas (gatilhos de negação, limites de escopo) |
//!
//! Tag sets são montados uma vez na inicialização e nunca mais alterados; por isso
//! são compartilhados entre threads via `Arc` sem nenhuma sincronização.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Categoria lexical grossa (classe de palavra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LexicalCategory {
    Noun,
    Verb,
    Adjective,
    Adposition,
    Adverb,
    Conjunction,
    Interjection,
    PronounOrDeterminer,
    Punctuation,
    Quantifier,
    Residual,
}

/// Categoria morfossintática fina.
///
/// Uma tag pode carregar várias (ex: `PPER` é `Pronoun` e `PersonalPronoun`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pos {
    CommonNoun,
    ProperNoun,
    Pronoun,
    PersonalPronoun,
    PossessivePronoun,
    DemonstrativePronoun,
    IndefinitePronoun,
    RelativePronoun,
    InterrogativePronoun,
    ReflexivePronoun,
    Article,
    Determiner,
    Numeral,
    CardinalNumber,
    MainVerb,
    AuxiliaryVerb,
    ModalVerb,
    FiniteVerb,
    Infinitive,
    Imperative,
    Participle,
    AttributiveAdjective,
    PredicativeAdjective,
    ComparativeAdjective,
    CoordinatingConjunction,
    SubordinatingConjunction,
    /// Partícula ou advérbio de negação ("nicht", "not").
    Negative,
    Particle,
    SentenceMedialPunctuation,
    SentenceFinalPunctuation,
    ParentheticalPunctuation,
    Foreign,
}

/// Qualquer tag identificável por sua string crua.
pub trait TagLike {
    fn tag(&self) -> &str;
}

/// Tag morfossintática com suas categorias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PosTag {
    pub tag: String,
    pub categories: BTreeSet<LexicalCategory>,
    pub pos: BTreeSet<Pos>,
}

impl PosTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            categories: BTreeSet::new(),
            pos: BTreeSet::new(),
        }
    }

    pub fn category(mut self, category: LexicalCategory) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos.insert(pos);
        self
    }

    pub fn has_category(&self, category: LexicalCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn has_pos(&self, pos: Pos) -> bool {
        self.pos.contains(&pos)
    }

    /// Verdadeiro se a tag tem alguma das categorias informadas.
    pub fn has_any_category(&self, categories: &[LexicalCategory]) -> bool {
        categories.iter().any(|c| self.categories.contains(c))
    }

    pub fn has_any_pos(&self, pos: &[Pos]) -> bool {
        pos.iter().any(|p| self.pos.contains(p))
    }
}

impl TagLike for PosTag {
    fn tag(&self) -> &str {
        &self.tag
    }
}

/// Tag de entidade nomeada produzida por um detector.
///
/// `tag` é o rótulo cru do detector (ex: `"B-PER"`, `"person_gazetteer"`);
/// `entity_type` é o tipo normalizado (ex: `"PERSON"`), quando conhecido.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NerTag {
    pub tag: String,
    pub entity_type: Option<String>,
}

/// Tipo usado quando a tag não informa nem tipo nem rótulo.
pub const UNKNOWN_ENTITY_TYPE: &str = "unknown";

impl NerTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            entity_type: None,
        }
    }

    pub fn typed(tag: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            entity_type: Some(entity_type.into()),
        }
    }

    /// Chave de agrupamento: o tipo, senão a tag, senão `"unknown"`.
    pub fn entity_key(&self) -> &str {
        match &self.entity_type {
            Some(t) if !t.is_empty() => t.as_str(),
            _ if !self.tag.is_empty() => self.tag.as_str(),
            _ => UNKNOWN_ENTITY_TYPE,
        }
    }
}

impl TagLike for NerTag {
    fn tag(&self) -> &str {
        &self.tag
    }
}

impl std::fmt::Display for NerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entity_key())
    }
}

/// Conjunto nomeado e imutável de tags para um ou mais idiomas.
#[derive(Debug, Clone)]
pub struct TagSet<T> {
    name: String,
    languages: Vec<String>,
    tags: HashMap<String, T>,
}

impl<T: TagLike> TagSet<T> {
    pub fn builder(name: impl Into<String>) -> TagSetBuilder<T> {
        TagSetBuilder {
            name: name.into(),
            languages: Vec::new(),
            tags: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn get(&self, tag: &str) -> Option<&T> {
        self.tags.get(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

pub struct TagSetBuilder<T> {
    name: String,
    languages: Vec<String>,
    tags: HashMap<String, T>,
}

impl<T: TagLike> TagSetBuilder<T> {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    /// Adiciona uma tag; uma tag com a mesma string substitui a anterior.
    pub fn tag(mut self, tag: T) -> Self {
        self.tags.insert(tag.tag().to_string(), tag);
        self
    }

    pub fn build(self) -> TagSet<T> {
        TagSet {
            name: self.name,
            languages: self.languages,
            tags: self.tags,
        }
    }
}

/// Registro de tag sets POS por idioma, montado na inicialização e só lido depois.
#[derive(Debug, Clone, Default)]
pub struct TagSetRegistry {
    pos: HashMap<String, Arc<TagSet<PosTag>>>,
}

impl TagSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro com os tag sets embutidos (STTS para `de`, Penn para `en`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(stts());
        registry.register(penn());
        registry
    }

    /// Registra o tag set para cada idioma que ele declara.
    pub fn register(&mut self, tag_set: TagSet<PosTag>) {
        let tag_set = Arc::new(tag_set);
        for language in tag_set.languages() {
            self.pos.insert(language.to_lowercase(), Arc::clone(&tag_set));
        }
    }

    pub fn pos_tag_set(&self, language: &str) -> Option<Arc<TagSet<PosTag>>> {
        self.pos.get(&language.to_lowercase()).cloned()
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.pos.keys().map(String::as_str)
    }
}

fn tag(s: &str, category: LexicalCategory, pos: &[Pos]) -> PosTag {
    pos.iter().fold(PosTag::new(s).category(category), |t, p| t.with_pos(*p))
}

/// Stuttgart-Tübingen-Tagset (alemão).
pub fn stts() -> TagSet<PosTag> {
    use LexicalCategory as C;
    use Pos as P;
    TagSet::builder("STTS")
        .language("de")
        .tag(tag("ADJA", C::Adjective, &[P::AttributiveAdjective]))
        .tag(tag("ADJD", C::Adjective, &[P::PredicativeAdjective]))
        .tag(tag("ADV", C::Adverb, &[]))
        .tag(tag("APPR", C::Adposition, &[]))
        .tag(tag("APPRART", C::Adposition, &[P::Article]))
        .tag(tag("APPO", C::Adposition, &[]))
        .tag(tag("APZR", C::Adposition, &[]))
        .tag(tag("ART", C::PronounOrDeterminer, &[P::Article, P::Determiner]))
        .tag(tag("CARD", C::Quantifier, &[P::Numeral, P::CardinalNumber]))
        .tag(tag("FM", C::Residual, &[P::Foreign]))
        .tag(tag("ITJ", C::Interjection, &[]))
        .tag(tag("KOUI", C::Conjunction, &[P::SubordinatingConjunction]))
        .tag(tag("KOUS", C::Conjunction, &[P::SubordinatingConjunction]))
        .tag(tag("KON", C::Conjunction, &[P::CoordinatingConjunction]))
        .tag(tag("KOKOM", C::Conjunction, &[]))
        .tag(tag("NN", C::Noun, &[P::CommonNoun]))
        .tag(tag("NE", C::Noun, &[P::ProperNoun]))
        .tag(tag("PDS", C::PronounOrDeterminer, &[P::Pronoun, P::DemonstrativePronoun]))
        .tag(tag("PDAT", C::PronounOrDeterminer, &[P::Determiner, P::DemonstrativePronoun]))
        .tag(tag("PIS", C::PronounOrDeterminer, &[P::Pronoun, P::IndefinitePronoun]))
        .tag(tag("PIAT", C::PronounOrDeterminer, &[P::Determiner, P::IndefinitePronoun]))
        .tag(tag("PIDAT", C::PronounOrDeterminer, &[P::Determiner, P::IndefinitePronoun]))
        .tag(tag("PPER", C::PronounOrDeterminer, &[P::Pronoun, P::PersonalPronoun]))
        .tag(tag("PPOSS", C::PronounOrDeterminer, &[P::Pronoun, P::PossessivePronoun]))
        .tag(tag("PPOSAT", C::PronounOrDeterminer, &[P::Determiner, P::PossessivePronoun]))
        .tag(tag("PRELS", C::PronounOrDeterminer, &[P::Pronoun, P::RelativePronoun]))
        .tag(tag("PRELAT", C::PronounOrDeterminer, &[P::Determiner, P::RelativePronoun]))
        .tag(tag("PRF", C::PronounOrDeterminer, &[P::Pronoun, P::ReflexivePronoun]))
        .tag(tag("PWS", C::PronounOrDeterminer, &[P::Pronoun, P::InterrogativePronoun]))
        .tag(tag("PWAT", C::PronounOrDeterminer, &[P::Determiner, P::InterrogativePronoun]))
        .tag(tag("PWAV", C::Adverb, &[P::InterrogativePronoun]))
        .tag(tag("PTKZU", C::Adposition, &[P::Particle]))
        .tag(tag("PTKNEG", C::Adverb, &[P::Particle, P::Negative]))
        .tag(tag("PTKVZ", C::Adposition, &[P::Particle]))
        .tag(tag("PTKANT", C::Interjection, &[P::Particle]))
        .tag(tag("PTKA", C::Adverb, &[P::Particle]))
        .tag(tag("TRUNC", C::Residual, &[]))
        .tag(tag("VVFIN", C::Verb, &[P::MainVerb, P::FiniteVerb]))
        .tag(tag("VVIMP", C::Verb, &[P::MainVerb, P::Imperative]))
        .tag(tag("VVINF", C::Verb, &[P::MainVerb, P::Infinitive]))
        .tag(tag("VVIZU", C::Verb, &[P::MainVerb, P::Infinitive]))
        .tag(tag("VVPP", C::Verb, &[P::MainVerb, P::Participle]))
        .tag(tag("VAFIN", C::Verb, &[P::AuxiliaryVerb, P::FiniteVerb]))
        .tag(tag("VAIMP", C::Verb, &[P::AuxiliaryVerb, P::Imperative]))
        .tag(tag("VAINF", C::Verb, &[P::AuxiliaryVerb, P::Infinitive]))
        .tag(tag("VAPP", C::Verb, &[P::AuxiliaryVerb, P::Participle]))
        .tag(tag("VMFIN", C::Verb, &[P::ModalVerb, P::FiniteVerb]))
        .tag(tag("VMINF", C::Verb, &[P::ModalVerb, P::Infinitive]))
        .tag(tag("VMPP", C::Verb, &[P::ModalVerb, P::Participle]))
        .tag(tag("XY", C::Residual, &[]))
        .tag(tag("$,", C::Punctuation, &[P::SentenceMedialPunctuation]))
        .tag(tag("$.", C::Punctuation, &[P::SentenceFinalPunctuation]))
        .tag(tag("$(", C::Punctuation, &[P::ParentheticalPunctuation]))
        .build()
}

/// Subconjunto do tagset Penn Treebank (inglês).
pub fn penn() -> TagSet<PosTag> {
    use LexicalCategory as C;
    use Pos as P;
    TagSet::builder("Penn Treebank")
        .language("en")
        .tag(tag("NN", C::Noun, &[P::CommonNoun]))
        .tag(tag("NNS", C::Noun, &[P::CommonNoun]))
        .tag(tag("NNP", C::Noun, &[P::ProperNoun]))
        .tag(tag("NNPS", C::Noun, &[P::ProperNoun]))
        .tag(tag("PRP", C::PronounOrDeterminer, &[P::Pronoun, P::PersonalPronoun]))
        .tag(tag("PRP$", C::PronounOrDeterminer, &[P::Determiner, P::PossessivePronoun]))
        .tag(tag("WP", C::PronounOrDeterminer, &[P::Pronoun, P::InterrogativePronoun]))
        .tag(tag("DT", C::PronounOrDeterminer, &[P::Determiner]))
        .tag(tag("CD", C::Quantifier, &[P::Numeral, P::CardinalNumber]))
        .tag(tag("VB", C::Verb, &[P::MainVerb, P::Infinitive]))
        .tag(tag("VBD", C::Verb, &[P::MainVerb, P::FiniteVerb]))
        .tag(tag("VBG", C::Verb, &[P::MainVerb, P::Participle]))
        .tag(tag("VBN", C::Verb, &[P::MainVerb, P::Participle]))
        .tag(tag("VBP", C::Verb, &[P::MainVerb, P::FiniteVerb]))
        .tag(tag("VBZ", C::Verb, &[P::MainVerb, P::FiniteVerb]))
        .tag(tag("MD", C::Verb, &[P::ModalVerb]))
        .tag(tag("JJ", C::Adjective, &[]))
        .tag(tag("JJR", C::Adjective, &[P::ComparativeAdjective]))
        .tag(tag("JJS", C::Adjective, &[]))
        .tag(tag("RB", C::Adverb, &[]))
        .tag(tag("RBR", C::Adverb, &[]))
        .tag(tag("RBS", C::Adverb, &[]))
        .tag(tag("IN", C::Adposition, &[]))
        .tag(tag("TO", C::Adposition, &[P::Particle]))
        .tag(tag("CC", C::Conjunction, &[P::CoordinatingConjunction]))
        .tag(tag("UH", C::Interjection, &[]))
        .tag(tag("FW", C::Residual, &[P::Foreign]))
        .tag(tag(",", C::Punctuation, &[P::SentenceMedialPunctuation]))
        .tag(tag(":", C::Punctuation, &[P::SentenceMedialPunctuation]))
        .tag(tag(".", C::Punctuation, &[P::SentenceFinalPunctuation]))
        .tag(tag("-LRB-", C::Punctuation, &[P::ParentheticalPunctuation]))
        .tag(tag("-RRB-", C::Punctuation, &[P::ParentheticalPunctuation]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ner_tag_entity_key() {
        assert_eq!(NerTag::typed("B-PER", "PERSON").entity_key(), "PERSON");
        assert_eq!(NerTag::new("LOC").entity_key(), "LOC");
        assert_eq!(NerTag::new("").entity_key(), UNKNOWN_ENTITY_TYPE);
        let empty_type = NerTag {
            tag: "ORG".into(),
            entity_type: Some(String::new()),
        };
        assert_eq!(empty_type.entity_key(), "ORG");
    }

    #[test]
    fn test_stts_negation_particle() {
        let stts = stts();
        let ptkneg = stts.get("PTKNEG").unwrap();
        assert!(ptkneg.has_pos(Pos::Negative));
        assert!(ptkneg.has_category(LexicalCategory::Adverb));
        assert!(stts.get("KON").unwrap().has_pos(Pos::CoordinatingConjunction));
        assert!(stts.get("$,").unwrap().has_pos(Pos::SentenceMedialPunctuation));
        assert!(stts.get("NOPE").is_none());
    }

    #[test]
    fn test_registry_resolves_by_language() {
        let registry = TagSetRegistry::with_defaults();
        assert_eq!(registry.pos_tag_set("de").unwrap().name(), "STTS");
        assert_eq!(registry.pos_tag_set("EN").unwrap().name(), "Penn Treebank");
        assert!(registry.pos_tag_set("pt").is_none());
    }

    #[test]
    fn test_builder_replaces_duplicate_tag() {
        let set = TagSet::builder("t")
            .tag(PosTag::new("X").category(LexicalCategory::Noun))
            .tag(PosTag::new("X").category(LexicalCategory::Verb))
            .build();
        assert_eq!(set.len(), 1);
        assert!(set.get("X").unwrap().has_category(LexicalCategory::Verb));
    }
}
