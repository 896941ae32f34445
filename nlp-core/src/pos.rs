//! # Etiquetador Morfossintático por Léxico
//!
//! Etiquetador determinístico e propositalmente simples: um léxico de palavras
//! de classe fechada (artigos, pronomes, conjunções, auxiliares, partículas de
//! negação) por idioma, mais um **fallback ortográfico** para o resto:
//!
//! | Forma                    | Tag (de)  | Tag (en)  |
//! |--------------------------|-----------|-----------|
//! | `.` `!` `?`              | `$.`      | `.`       |
//! | `,` `;` `:`              | `$,`      | `,`       |
//! | `(` `)` `"` ...          | `$(`      | `-LRB-`   |
//! | Só dígitos               | `CARD`    | `CD`      |
//! | Inicial maiúscula        | `NN`      | `NNP`     |
//!
//! Palavras desconhecidas em minúsculas ficam **sem** anotação: é melhor não
//! etiquetar do que inventar uma classe. As tags são interpretadas pelo
//! [`TagSet`] do idioma, então os estágios seguintes só veem [`PosTag`]s com
//! categorias.
//!
//! Tokens que já têm `POS` (vindos de um etiquetador externo) não são tocados.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::annotation::POS;
use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};
use crate::span::SpanId;
use crate::tagset::{PosTag, TagSet, TagSetRegistry};
use crate::value::Value;

/// Probabilidade atribuída a tags vindas do léxico.
const LEXICON_PROBABILITY: f64 = 0.95;
/// Probabilidade atribuída a tags adivinhadas pela ortografia.
const GUESS_PROBABILITY: f64 = 0.6;

/// Tags usadas no fallback ortográfico.
#[derive(Debug, Clone)]
pub struct OrthographyTags {
    pub capitalized: String,
    pub number: String,
    pub final_punctuation: String,
    pub medial_punctuation: String,
    pub parenthetical: String,
}

/// Léxico de um idioma: forma em minúsculas → tag crua.
#[derive(Debug, Clone)]
pub struct Lexicon {
    language: String,
    entries: HashMap<String, String>,
    orthography: OrthographyTags,
}

impl Lexicon {
    pub fn new(language: impl Into<String>, orthography: OrthographyTags) -> Self {
        Self {
            language: language.into().to_lowercase(),
            entries: HashMap::new(),
            orthography,
        }
    }

    /// Associa todas as `words` à `tag`.
    pub fn entries(mut self, tag: &str, words: &[&str]) -> Self {
        for word in words {
            self.entries.insert(word.to_lowercase(), tag.to_string());
        }
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Tag crua para a forma, com a probabilidade associada à origem da decisão.
    pub fn lookup(&self, form: &str) -> Option<(&str, f64)> {
        if let Some(tag) = self.entries.get(&form.to_lowercase()) {
            return Some((tag.as_str(), LEXICON_PROBABILITY));
        }
        let o = &self.orthography;
        let first = form.chars().next()?;

        let tag = if form.chars().count() == 1 && !first.is_alphanumeric() {
            match first {
                '.' | '!' | '?' => &o.final_punctuation,
                ',' | ';' | ':' => &o.medial_punctuation,
                '(' | ')' | '[' | ']' | '"' | '\'' | '«' | '»' | '„' | '“' | '”' | '-' | '–' => {
                    &o.parenthetical
                }
                _ => return None,
            }
        } else if form.chars().all(|c| c.is_numeric() || c == '.' || c == ',') {
            &o.number
        } else if first.is_uppercase() {
            &o.capitalized
        } else {
            return None;
        };
        Some((tag.as_str(), GUESS_PROBABILITY))
    }

    pub fn german() -> Self {
        Self::new(
            "de",
            OrthographyTags {
                capitalized: "NN".into(),
                number: "CARD".into(),
                final_punctuation: "$.".into(),
                medial_punctuation: "$,".into(),
                parenthetical: "$(".into(),
            },
        )
        .entries("ART", &["der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "eines"])
        .entries("PPER", &["ich", "du", "er", "sie", "es", "wir", "ihr", "mich", "dich", "ihn", "uns", "euch", "ihm", "ihnen", "mir", "dir"])
        .entries("PPOSAT", &["mein", "meine", "dein", "deine", "sein", "seine", "unser", "unsere", "ihre"])
        .entries("PDS", &["dies", "dieses", "jenes"])
        .entries("PIAT", &["kein", "keine", "keinen", "keinem", "keiner", "keines", "keinerlei", "alle", "einige", "manche"])
        .entries("PIS", &["nichts", "niemand", "jemand", "etwas", "man"])
        .entries("PTKNEG", &["nicht"])
        .entries("PTKZU", &["zu"])
        .entries("ADV", &["bitte", "sehr", "auch", "noch", "schon", "nie", "niemals", "immer", "hier", "dort", "heute", "gestern", "morgen", "jetzt", "nur", "sogar", "wieder"])
        .entries("ADJD", &["echt", "gut", "schlecht", "pünktlich", "spät", "früh", "schnell", "langsam"])
        .entries("KON", &["und", "oder", "aber", "sondern", "denn", "sowie"])
        .entries("KOUS", &["dass", "weil", "wenn", "ob", "obwohl", "als"])
        .entries("APPR", &["in", "an", "auf", "mit", "von", "für", "bei", "nach", "aus", "über", "unter", "ohne", "gegen", "um", "durch", "seit"])
        .entries("APPRART", &["im", "am", "zum", "zur", "vom", "beim", "ins", "ans"])
        .entries("VAFIN", &["ist", "sind", "war", "waren", "bin", "bist", "hat", "habe", "haben", "hatte", "hatten", "hast", "wird", "werden", "wurde", "wurden"])
        .entries("VMFIN", &["kann", "können", "muss", "müssen", "soll", "sollen", "will", "wollen", "darf", "dürfen", "mag", "mögen"])
        .entries("VVFIN", &["kommt", "kam", "geht", "ging", "fährt", "fuhr", "gibt", "bleibt", "steht", "spielt", "zahlt"])
    }

    pub fn english() -> Self {
        Self::new(
            "en",
            OrthographyTags {
                capitalized: "NNP".into(),
                number: "CD".into(),
                final_punctuation: ".".into(),
                medial_punctuation: ",".into(),
                parenthetical: "-LRB-".into(),
            },
        )
        .entries("DT", &["the", "a", "an", "this", "that", "these", "those", "no", "every", "some", "any"])
        .entries("PRP", &["i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them"])
        .entries("PRP$", &["my", "your", "his", "its", "our", "their"])
        .entries("WP", &["who", "what", "whom"])
        .entries("RB", &["not", "never", "very", "also", "too", "here", "there", "now", "today", "always", "only", "n't"])
        .entries("JJ", &["good", "bad", "late", "early", "new", "old", "big", "small"])
        .entries("CC", &["and", "or", "but", "nor"])
        .entries("IN", &["in", "on", "at", "with", "from", "of", "by", "for", "about", "into", "over", "after", "before", "because", "if"])
        .entries("TO", &["to"])
        .entries("VBZ", &["is", "has", "does"])
        .entries("VBP", &["are", "am", "have", "do"])
        .entries("VBD", &["was", "were", "had", "did"])
        .entries("VB", &["be"])
        .entries("VBN", &["been"])
        .entries("MD", &["can", "could", "will", "would", "shall", "should", "may", "might", "must", "cannot"])
    }
}

/// Etiquetador por léxico com fallback ortográfico.
#[derive(Debug, Clone)]
pub struct LexiconPosTagger {
    lexicons: HashMap<String, Arc<Lexicon>>,
    tag_sets: Arc<TagSetRegistry>,
}

impl LexiconPosTagger {
    pub fn new(tag_sets: Arc<TagSetRegistry>) -> Self {
        Self {
            lexicons: HashMap::new(),
            tag_sets,
        }
    }

    /// Etiquetador com os léxicos embutidos (`de`, `en`).
    pub fn with_defaults(tag_sets: Arc<TagSetRegistry>) -> Self {
        Self::new(tag_sets).with_lexicon(Lexicon::german()).with_lexicon(Lexicon::english())
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicons.insert(lexicon.language.clone(), Arc::new(lexicon));
        self
    }

    fn tag_token(&self, lexicon: &Lexicon, tag_set: &TagSet<PosTag>, form: &str) -> Option<Value<PosTag>> {
        let (raw, probability) = lexicon.lookup(form)?;
        let tag = tag_set.get(raw)?;
        Some(Value::with_probability(tag.clone(), probability))
    }
}

impl Processor for LexiconPosTagger {
    fn name(&self) -> &str {
        "lexicon-pos-tagger"
    }

    fn phase(&self) -> Phase {
        Phase::Pos
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(language) = doc.language.as_deref() else {
            debug!("idioma desconhecido; etiquetagem POS ignorada");
            return Ok(());
        };
        let (Some(lexicon), Some(tag_set)) = (self.lexicons.get(language), self.tag_sets.pos_tag_set(language)) else {
            debug!(language, "sem léxico ou tag set para o idioma");
            return Ok(());
        };
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; etiquetagem POS ignorada");
            return Ok(());
        };

        let tokens: Vec<SpanId> = at.tokens(at.root()).collect();
        let mut tagged = 0usize;
        for token in tokens {
            if at.annotations(token).contains(POS) {
                continue;
            }
            if let Some(value) = self.tag_token(lexicon, &tag_set, at.span_text(token)) {
                at.annotations_mut(token).set_value(POS, value);
                tagged += 1;
            }
        }
        debug!(language, tagged, "tokens etiquetados");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagset::{LexicalCategory, Pos};
    use crate::tokenizer::TokenizerProcessor;

    fn tags(text: &str, language: &str) -> Vec<Option<String>> {
        let mut doc = Document::new(text).with_language(language);
        TokenizerProcessor.process(&mut doc).unwrap();
        LexiconPosTagger::with_defaults(Arc::new(TagSetRegistry::with_defaults()))
            .process(&mut doc)
            .unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        at.tokens(at.root())
            .map(|t| at.annotations(t).annotation(POS).map(|p| p.tag.clone()))
            .collect()
    }

    fn strs(tags: &[&str]) -> Vec<Option<String>> {
        tags.iter().map(|t| Some(t.to_string())).collect()
    }

    #[test]
    fn test_german_sentence() {
        assert_eq!(
            tags("Hat der ICE 1234 echt keine Verspätung?", "de"),
            strs(&["VAFIN", "ART", "NN", "CARD", "ADJD", "PIAT", "NN", "$."])
        );
        assert_eq!(
            tags("Eine Pizzaria bitte nicht.", "de"),
            strs(&["ART", "NN", "ADV", "PTKNEG", "$."])
        );
    }

    #[test]
    fn test_english_sentence_with_unknown_word() {
        assert_eq!(
            tags("The train was not late, sadly.", "en"),
            vec![
                Some("DT".into()),
                None,
                Some("VBD".into()),
                Some("RB".into()),
                Some("JJ".into()),
                Some(",".into()),
                None,
                Some(".".into()),
            ]
        );
    }

    #[test]
    fn test_existing_pos_is_kept() {
        let mut doc = Document::new("Bahn").with_language("de");
        TokenizerProcessor.process(&mut doc).unwrap();
        let ne = crate::tagset::stts().get("NE").unwrap().clone();
        {
            let at = doc.analysed_text.as_mut().unwrap();
            let token = at.tokens(at.root()).next().unwrap();
            at.annotations_mut(token).set_value(POS, Value::new(ne));
        }
        LexiconPosTagger::with_defaults(Arc::new(TagSetRegistry::with_defaults()))
            .process(&mut doc)
            .unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        let token = at.tokens(at.root()).next().unwrap();
        let pos = at.annotations(token).annotation(POS).unwrap();
        assert_eq!(pos.tag, "NE");
        assert!(pos.has_pos(Pos::ProperNoun));
    }

    #[test]
    fn test_categories_come_from_tag_set() {
        let lexicon = Lexicon::german();
        let stts = crate::tagset::stts();
        let tagger = LexiconPosTagger::new(Arc::new(TagSetRegistry::new()));
        let value = tagger.tag_token(&lexicon, &stts, "nicht").unwrap();
        assert!(value.value.has_pos(Pos::Negative));
        assert!(value.value.has_category(LexicalCategory::Adverb));
        assert_eq!(value.probability, Some(0.95));
    }

    #[test]
    fn test_without_language_nothing_is_tagged() {
        let mut doc = Document::new("Hallo Welt");
        TokenizerProcessor.process(&mut doc).unwrap();
        LexiconPosTagger::with_defaults(Arc::new(TagSetRegistry::with_defaults()))
            .process(&mut doc)
            .unwrap();
        let at = doc.analysed_text.as_ref().unwrap();
        assert!(at.tokens(at.root()).all(|t| !at.annotations(t).contains(POS)));
    }
}
