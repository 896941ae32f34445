//! # Corpus de Demonstração com Anotações BIO
//!
//! Pequeno corpus em alemão e inglês (domínio de viagens e transporte), anotado
//! manualmente no formato BIO. Ele serve a dois propósitos:
//!
//! - alimentar o gazetteer padrão ([`gazetteer_entries`]);
//! - fornecer textos de exemplo para a interface web ([`demo_texts`]).
//!
//! ## Formato BIO
//! - **B-TYPE**: início de uma entidade do tipo TYPE.
//! - **I-TYPE**: continuação da entidade.
//! - **O**: fora de qualquer entidade.

use std::collections::HashSet;

use serde::Serialize;

use crate::rule_based::GazetteerEntry;

/// Confiança atribuída às entradas extraídas do corpus.
pub const CORPUS_PROBABILITY: f64 = 0.85;

/// Uma sentença anotada no formato BIO.
pub struct AnnotatedSentence {
    pub text: &'static str,
    pub language: &'static str,
    /// Pares (palavra, tag_BIO).
    pub annotations: &'static [(&'static str, &'static str)],
}

pub fn get_corpus() -> Vec<AnnotatedSentence> {
    vec![
        AnnotatedSentence {
            text: "Die Deutsche Bahn verbindet Berlin und München.",
            language: "de",
            annotations: &[
                ("Die", "O"), ("Deutsche", "B-ORG"), ("Bahn", "I-ORG"), ("verbindet", "O"),
                ("Berlin", "B-LOC"), ("und", "O"), ("München", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Angela Merkel fuhr mit dem ICE nach Hamburg.",
            language: "de",
            annotations: &[
                ("Angela", "B-PER"), ("Merkel", "I-PER"), ("fuhr", "O"), ("mit", "O"),
                ("dem", "O"), ("ICE", "O"), ("nach", "O"), ("Hamburg", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Siemens baut neue Züge für die Strecke Frankfurt Köln.",
            language: "de",
            annotations: &[
                ("Siemens", "B-ORG"), ("baut", "O"), ("neue", "O"), ("Züge", "O"), ("für", "O"),
                ("die", "O"), ("Strecke", "O"), ("Frankfurt", "B-LOC"), ("Köln", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Olaf Scholz eröffnete den Bahnhof in Stuttgart.",
            language: "de",
            annotations: &[
                ("Olaf", "B-PER"), ("Scholz", "I-PER"), ("eröffnete", "O"), ("den", "O"),
                ("Bahnhof", "O"), ("in", "O"), ("Stuttgart", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "British Airways cancelled the flight from London to Berlin.",
            language: "en",
            annotations: &[
                ("British", "B-ORG"), ("Airways", "I-ORG"), ("cancelled", "O"), ("the", "O"),
                ("flight", "O"), ("from", "O"), ("London", "B-LOC"), ("to", "O"),
                ("Berlin", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Marie Curie lived in Paris for most of her life.",
            language: "en",
            annotations: &[
                ("Marie", "B-PER"), ("Curie", "I-PER"), ("lived", "O"), ("in", "O"),
                ("Paris", "B-LOC"), ("for", "O"), ("most", "O"), ("of", "O"), ("her", "O"),
                ("life", "O"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The Eurostar leaves London at 9:45.",
            language: "en",
            annotations: &[
                ("The", "O"), ("Eurostar", "B-ORG"), ("leaves", "O"), ("London", "B-LOC"),
                ("at", "O"), ("9:45", "O"), (".", "O"),
            ],
        },
    ]
}

/// Entidades do corpus, sem repetição, como entradas de gazetteer.
///
/// Percorre as sequências B-/I- de cada sentença; a ordem de saída é a de
/// primeira aparição.
pub fn gazetteer_entries() -> Vec<GazetteerEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    let mut flush = |words: &mut Vec<&str>, entity_type: &str| {
        if words.is_empty() {
            return;
        }
        let surface = words.join(" ");
        words.clear();
        if seen.insert((surface.to_lowercase(), entity_type.to_string())) {
            entries.push(GazetteerEntry::new(surface, entity_type, CORPUS_PROBABILITY));
        }
    };

    for sentence in get_corpus() {
        let mut words: Vec<&str> = Vec::new();
        let mut current = "";
        for &(word, tag) in sentence.annotations {
            if let Some(entity_type) = tag.strip_prefix("B-") {
                flush(&mut words, current);
                words.push(word);
                current = entity_type;
            } else if tag.starts_with("I-") && !words.is_empty() {
                words.push(word);
            } else {
                flush(&mut words, current);
            }
        }
        flush(&mut words, current);
    }
    entries
}

/// Texto de exemplo para a interface web.
#[derive(Debug, Clone, Serialize)]
pub struct DemoText {
    pub title: &'static str,
    pub language: &'static str,
    pub text: &'static str,
}

pub fn demo_texts() -> Vec<DemoText> {
    vec![
        DemoText {
            title: "Bestellung",
            language: "de",
            text: "Eine Pizzaria bitte nicht.",
        },
        DemoText {
            title: "Verspätung",
            language: "de",
            text: "Hat der ICE 1234 echt keine Verspätung? Die Deutsche Bahn meldet Probleme zwischen Berlin und Hamburg.",
        },
        DemoText {
            title: "Politik",
            language: "de",
            text: "Angela Merkel und Olaf Scholz besuchten Stuttgart. Merkel sprach nicht über die Bahn.",
        },
        DemoText {
            title: "Travel",
            language: "en",
            text: "British Airways cancelled the flight from London. The Eurostar leaves London at 9:45 and is never late.",
        },
        DemoText {
            title: "Science",
            language: "en",
            text: "Marie Curie lived in Paris. She did not return to Warsaw.",
        },
    ]
}
