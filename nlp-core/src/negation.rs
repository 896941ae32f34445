//! # Resolução de Negação
//!
//! Encontra **gatilhos de negação** ("nicht", "keine", "not"...) e marca o menor
//! trecho ao redor que contém palavras **negáveis** (substantivos, pronomes,
//! numerais, verbos e adjetivos).
//!
//! ## Algoritmo (por sentença)
//!
//! 1. Cada token é classificado como gatilho (pelas regras do idioma), negável,
//!    conjunção coordenativa ou pontuação medial (`,` `;` `:`).
//! 2. Para cada gatilho `i`, o **espaço de busca** `[floor, ceil)` vai da pontuação
//!    medial anterior até a próxima (ou até as bordas da sentença). O espaço é
//!    reaproveitado enquanto `i` continuar dentro dele.
//! 3. **Varredura para frente** a partir de `i + 1`: cada token negável estende o
//!    fim do trecho. Até [`MAX_GAP`] tokens não negáveis seguidos são tolerados; uma
//!    conjunção devolve uma unidade de lacuna.
//! 4. Se nada foi encontrado à frente, a mesma varredura é feita **para trás**.
//! 5. O chunk `[start, end]` recebe `NEGATION = true`.
//!
//! ```text
//! Eine  Pizzaria  bitte  nicht  .
//!       ^^^^^^^^^^^^^^^^^^^^^^        ← varredura para trás (gatilho "nicht")
//! ```
//!
//! Vários gatilhos na mesma sentença geram chunks independentes, que podem se
//! sobrepor.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::annotation::{LEMMA, NEGATION, POS};
use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};
use crate::span::{AnalysedText, SpanId};
use crate::tagset::{LexicalCategory, Pos, PosTag};
use crate::value::Value;

/// Máximo de tokens não negáveis seguidos tolerados durante a varredura.
pub const MAX_GAP: usize = 2;
/// Quanto uma conjunção coordenativa reduz a lacuna acumulada.
pub const CONJUNCTION_REFUND: usize = 1;

/// O que uma regra de negação enxerga de um token.
#[derive(Debug, Clone, Copy)]
pub struct TokenView<'a> {
    pub text: &'a str,
    pub pos: Option<&'a PosTag>,
    pub lemma: Option<&'a str>,
}

/// Regra que decide se um token é gatilho de negação.
pub trait NegationRule: Send + Sync {
    fn is_negation(&self, token: &TokenView<'_>) -> bool;

    /// Idioma da regra; `None` = regra padrão.
    fn language(&self) -> Option<&str>;
}

/// Gatilho = tag POS com [`Pos::Negative`].
#[derive(Debug, Clone, Default)]
pub struct PosNegationRule {
    language: Option<String>,
}

impl PosNegationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into().to_lowercase()),
        }
    }
}

impl NegationRule for PosNegationRule {
    fn is_negation(&self, token: &TokenView<'_>) -> bool {
        token.pos.is_some_and(|pos| pos.has_pos(Pos::Negative))
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Gatilho por forma da palavra (ou lema), sem diferenciar maiúsculas.
#[derive(Debug, Clone)]
pub struct LexicalNegationRule {
    language: String,
    words: Vec<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl LexicalNegationRule {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into().to_lowercase(),
            words: Vec::new(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    pub fn words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.words.extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefixes.push(prefix.to_lowercase());
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffixes.push(suffix.to_lowercase());
        self
    }

    /// "kein*", "nicht", "nichts", "nie", "niemals", "niemand", "keinerlei".
    pub fn german() -> Self {
        Self::new("de")
            .words(["nicht", "nichts", "nie", "niemals", "niemand", "keinerlei"])
            .prefix("kein")
    }

    pub fn english() -> Self {
        Self::new("en")
            .words(["not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "cannot"])
            .suffix("n't")
    }

    fn matches(&self, form: &str) -> bool {
        let form = form.to_lowercase();
        self.words.iter().any(|w| *w == form)
            || self.prefixes.iter().any(|p| form.starts_with(p.as_str()))
            || self.suffixes.iter().any(|s| form.ends_with(s.as_str()))
    }
}

impl NegationRule for LexicalNegationRule {
    fn is_negation(&self, token: &TokenView<'_>) -> bool {
        self.matches(token.text) || token.lemma.is_some_and(|l| self.matches(l))
    }

    fn language(&self) -> Option<&str> {
        Some(&self.language)
    }
}

type RuleList = Vec<Arc<dyn NegationRule>>;

/// Regras de negação agrupadas por idioma, com um grupo padrão (`None`).
#[derive(Clone, Default)]
pub struct NegationRuleRegistry {
    rules: HashMap<Option<String>, RuleList>,
}

impl NegationRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regra POS como padrão; alemão e inglês com regra léxica + POS.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PosNegationRule::new());
        registry.register(LexicalNegationRule::german());
        registry.register(PosNegationRule::for_language("de"));
        registry.register(LexicalNegationRule::english());
        registry.register(PosNegationRule::for_language("en"));
        registry
    }

    pub fn register(&mut self, rule: impl NegationRule + 'static) {
        let language = rule.language().map(str::to_lowercase);
        self.rules.entry(language).or_default().push(Arc::new(rule));
    }

    /// Regras do idioma; sem idioma ou sem regras registradas para ele, o grupo padrão.
    pub fn rules_for(&self, language: Option<&str>) -> &[Arc<dyn NegationRule>] {
        language
            .and_then(|l| self.rules.get(&Some(l.to_lowercase())))
            .or_else(|| self.rules.get(&None))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TokenClass {
    trigger: bool,
    negatable: bool,
    conjunction: bool,
    medial: bool,
}

fn classify(view: &TokenView<'_>, rules: &[Arc<dyn NegationRule>]) -> TokenClass {
    let pos = view.pos;
    TokenClass {
        trigger: rules.iter().any(|r| r.is_negation(view)),
        negatable: pos.is_some_and(|p| {
            p.has_any_category(&[LexicalCategory::Noun, LexicalCategory::Verb, LexicalCategory::Adjective])
                || p.has_any_pos(&[Pos::Pronoun, Pos::Numeral])
        }),
        conjunction: pos.is_some_and(|p| p.has_pos(Pos::CoordinatingConjunction)),
        medial: pos.is_some_and(|p| p.has_pos(Pos::SentenceMedialPunctuation)),
    }
}

/// Estende o trecho a partir de `i` na direção dada, retornando o índice do último
/// token negável alcançado (ou `i`).
fn scan(classes: &[TokenClass], i: usize, floor: usize, ceil: usize, forward: bool) -> usize {
    let mut found = i;
    let mut gap: usize = 0;
    let mut j = i;
    loop {
        j = match forward {
            true if j + 1 < ceil => j + 1,
            false if j > floor => j - 1,
            _ => break,
        };
        let class = classes[j];
        if class.negatable {
            found = j;
            gap = 0;
        } else if class.conjunction {
            gap = gap.saturating_sub(CONJUNCTION_REFUND);
        } else {
            gap += 1;
            if gap > MAX_GAP {
                break;
            }
        }
    }
    found
}

/// Trechos negados `(primeiro token, último token)` de uma sentença.
fn resolve_sentence(classes: &[TokenClass]) -> Vec<(usize, usize)> {
    let mut scopes = Vec::new();
    let mut search: Option<(usize, usize)> = None;

    for i in (0..classes.len()).filter(|&i| classes[i].trigger) {
        let (floor, ceil) = match search {
            Some((floor, ceil)) if i >= floor && i < ceil => (floor, ceil),
            _ => {
                let floor = classes[..i]
                    .iter()
                    .rposition(|c| c.medial)
                    .map_or(0, |p| p + 1);
                let ceil = classes[i + 1..]
                    .iter()
                    .position(|c| c.medial)
                    .map_or(classes.len(), |p| i + 1 + p);
                search = Some((floor, ceil));
                (floor, ceil)
            }
        };

        let end = scan(classes, i, floor, ceil, true);
        let start = if end == i {
            scan(classes, i, floor, ceil, false)
        } else {
            i
        };
        scopes.push((start, end));
    }
    scopes
}

/// Estágio de negação. Roda na fase `Post`, depois do coletor de entidades.
#[derive(Clone)]
pub struct NegationResolver {
    rules: Arc<NegationRuleRegistry>,
}

impl NegationResolver {
    pub const PRIORITY: i32 = -100;

    pub fn new(rules: Arc<NegationRuleRegistry>) -> Self {
        Self { rules }
    }

    fn resolve(&self, at: &mut AnalysedText, language: Option<&str>) -> Result<usize> {
        let rules = self.rules.rules_for(language);
        if rules.is_empty() {
            debug!(?language, "nenhuma regra de negação registrada");
            return Ok(0);
        }

        let mut sentences: Vec<SpanId> = at.sentences().collect();
        if sentences.is_empty() {
            sentences.push(at.root());
        }

        let mut marked = 0;
        for sentence in sentences {
            let tokens: Vec<SpanId> = at.tokens(sentence).collect();
            let classes: Vec<TokenClass> = tokens
                .iter()
                .map(|&t| {
                    let annotations = at.annotations(t);
                    let view = TokenView {
                        text: at.span_text(t),
                        pos: annotations.annotation(POS),
                        lemma: annotations.annotation(LEMMA).map(String::as_str),
                    };
                    classify(&view, rules)
                })
                .collect();

            for (first, last) in resolve_sentence(&classes) {
                let start = at.span(tokens[first]).start();
                let end = at.span(tokens[last]).end();
                let chunk = at.add_chunk(start, end)?;
                at.annotations_mut(chunk).set_value(NEGATION, Value::new(true));
                trace!(start, end, text = at.span_text(chunk), "trecho negado");
                marked += 1;
            }
        }
        Ok(marked)
    }
}

impl Processor for NegationResolver {
    fn name(&self) -> &str {
        "negation-resolver"
    }

    fn phase(&self) -> Phase {
        Phase::Post
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let language = doc.language.clone();
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; negação ignorada");
            return Ok(());
        };
        let marked = self.resolve(at, language.as_deref())?;
        debug!(marked, "negação resolvida");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanType;
    use crate::tagset::stts;
    use crate::tokenizer::TokenizerProcessor;

    fn tagged(text: &str, tags: &[&str], language: Option<&str>) -> Document {
        let mut doc = Document::new(text);
        if let Some(language) = language {
            doc = doc.with_language(language);
        }
        TokenizerProcessor.process(&mut doc).unwrap();
        let stts = stts();
        let at = doc.analysed_text.as_mut().unwrap();
        let tokens: Vec<SpanId> = at.tokens(at.root()).collect();
        assert_eq!(tokens.len(), tags.len(), "tokens: {tokens:?}");
        for (token, tag) in tokens.into_iter().zip(tags) {
            let pos = stts.get(tag).unwrap().clone();
            at.annotations_mut(token).set_value(POS, Value::new(pos));
        }
        doc
    }

    fn negated(doc: &mut Document) -> Vec<String> {
        let resolver = NegationResolver::new(Arc::new(NegationRuleRegistry::with_defaults()));
        resolver.process(doc).unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        at.enclosed(at.root(), &[SpanType::Chunk])
            .filter(|&c| at.annotations(c).annotation(NEGATION) == Some(&true))
            .map(|c| at.span_text(c).to_string())
            .collect()
    }

    #[test]
    fn test_backward_scan_over_adverb() {
        let mut doc = tagged(
            "Eine Pizzaria bitte nicht.",
            &["ART", "NN", "ADV", "PTKNEG", "$."],
            Some("de"),
        );
        assert_eq!(negated(&mut doc), vec!["Pizzaria bitte nicht"]);
    }

    #[test]
    fn test_german_lexical_trigger_scans_forward() {
        let mut doc = tagged(
            "Hat der ICE 1234 echt keine Verspätung?",
            &["VAFIN", "ART", "NN", "CARD", "ADJD", "PIAT", "NN", "$."],
            Some("de"),
        );
        assert_eq!(negated(&mut doc), vec!["keine Verspätung"]);
    }

    #[test]
    fn test_no_trigger_no_chunks() {
        let mut doc = tagged("Der Zug kommt pünktlich.", &["ART", "NN", "VVFIN", "ADJD", "$."], Some("de"));
        assert!(negated(&mut doc).is_empty());
    }

    #[test]
    fn test_without_language_only_default_rule_applies() {
        let mut doc = tagged(
            "Hat der ICE 1234 echt keine Verspätung?",
            &["VAFIN", "ART", "NN", "CARD", "ADJD", "PIAT", "NN", "$."],
            None,
        );
        assert!(negated(&mut doc).is_empty());
    }

    #[test]
    fn test_unknown_language_falls_back_to_default_rule() {
        let mut doc = tagged("Eine Pizzaria bitte nicht.", &["ART", "NN", "ADV", "PTKNEG", "$."], Some("fr"));
        assert_eq!(negated(&mut doc), vec!["Pizzaria bitte nicht"]);
    }

    #[test]
    fn test_medial_punctuation_bounds_scope() {
        let mut doc = tagged("Kein Geld, aber Zeit.", &["PIAT", "NN", "$,", "KON", "NN", "$."], Some("de"));
        assert_eq!(negated(&mut doc), vec!["Kein Geld"]);
    }

    #[test]
    fn test_conjunction_continues_scope() {
        let mut doc = tagged(
            "Er mag nicht Käse und Wein.",
            &["PPER", "VVFIN", "PTKNEG", "NN", "KON", "NN", "$."],
            Some("de"),
        );
        assert_eq!(negated(&mut doc), vec!["nicht Käse und Wein"]);
    }

    #[test]
    fn test_gap_limit() {
        let mut within = tagged("nicht sehr sehr gut", &["PTKNEG", "ADV", "ADV", "ADJD"], Some("de"));
        assert_eq!(negated(&mut within), vec!["nicht sehr sehr gut"]);

        let mut beyond = tagged("nicht sehr sehr sehr gut", &["PTKNEG", "ADV", "ADV", "ADV", "ADJD"], Some("de"));
        assert_eq!(negated(&mut beyond), vec!["nicht"]);
    }

    #[test]
    fn test_lexical_rule_forms() {
        let german = LexicalNegationRule::german();
        let view = |text| TokenView { text, pos: None, lemma: None };
        assert!(german.is_negation(&view("Keinen")));
        assert!(german.is_negation(&view("niemals")));
        assert!(!german.is_negation(&view("nie-mand")));
        let english = LexicalNegationRule::english();
        assert!(english.is_negation(&view("isn't")));
        assert!(english.is_negation(&view("Never")));
    }

    #[test]
    fn test_resolve_sentence_multiple_triggers_overlap() {
        let t = TokenClass { trigger: true, ..TokenClass::default() };
        let n = TokenClass { negatable: true, ..TokenClass::default() };
        assert_eq!(resolve_sentence(&[t, n, t, n]), vec![(0, 3), (2, 3)]);
    }
}
