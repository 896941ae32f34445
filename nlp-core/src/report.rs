//! # Relatório de Análise
//!
//! Fotografia serializável de um documento já processado. É o formato de saída
//! do servidor web: spans viram listas planas com offsets e texto, e as
//! anotações relevantes viram campos.
//!
//! Só entram em `chunks` os chunks que carregam alguma anotação de NER ou de
//! negação.

use serde::Serialize;

use crate::annotation::{LEMMA, NAMED_ENTITY, NEGATION, NER, POS, STEM, STOPWORD};
use crate::collector::NamedEntity;
use crate::document::Document;
use crate::span::{AnalysedText, SpanId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceReport {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenReport {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub pos: Option<String>,
    pub pos_probability: Option<f64>,
    pub lemma: Option<String>,
    pub stem: Option<String>,
    pub stopword: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NerReport {
    pub tag: String,
    pub entity_type: Option<String>,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub ner: Vec<NerReport>,
    pub negated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub text: String,
    pub language: Option<String>,
    pub sentences: Vec<SentenceReport>,
    pub tokens: Vec<TokenReport>,
    pub chunks: Vec<ChunkReport>,
    pub entities: Vec<NamedEntity>,
}

fn bounds(at: &AnalysedText, id: SpanId) -> (usize, usize, String) {
    let span = at.span(id);
    (span.start(), span.end(), at.span_text(id).to_string())
}

impl AnalysisReport {
    pub fn from_document(doc: &Document) -> Self {
        let entities = doc
            .annotations
            .values(NAMED_ENTITY)
            .map(|v| v.value.clone())
            .collect();
        let mut report = Self {
            language: doc.language.clone(),
            entities,
            ..Self::default()
        };
        let Some(at) = doc.analysed_text.as_ref() else {
            return report;
        };
        report.text = at.text().to_string();

        report.sentences = at
            .sentences()
            .map(|id| {
                let (start, end, text) = bounds(at, id);
                SentenceReport { start, end, text }
            })
            .collect();

        report.tokens = at
            .tokens(at.root())
            .map(|id| {
                let (start, end, text) = bounds(at, id);
                let annotations = at.annotations(id);
                let pos = annotations.value(POS);
                TokenReport {
                    start,
                    end,
                    text,
                    pos: pos.as_ref().map(|v| v.value.tag.clone()),
                    pos_probability: pos.and_then(|v| v.probability),
                    lemma: annotations.annotation(LEMMA).cloned(),
                    stem: annotations.annotation(STEM).cloned(),
                    stopword: annotations.annotation(STOPWORD).copied().unwrap_or(false),
                }
            })
            .collect();

        report.chunks = at
            .chunks(at.root())
            .filter_map(|id| {
                let annotations = at.annotations(id);
                let ner: Vec<NerReport> = annotations
                    .values(NER)
                    .map(|v| NerReport {
                        tag: v.value.tag.clone(),
                        entity_type: v.value.entity_type.clone(),
                        probability: v.probability,
                    })
                    .collect();
                let negated = annotations.annotation(NEGATION).copied().unwrap_or(false);
                if ner.is_empty() && !negated {
                    return None;
                }
                let (start, end, text) = bounds(at, id);
                Some(ChunkReport {
                    start,
                    end,
                    text,
                    ner,
                    negated,
                })
            })
            .collect();

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[test]
    fn test_report_for_processed_document() {
        let pipeline = PipelineConfig::default().build_pipeline().unwrap();
        let mut doc = Document::new("Eine Pizzaria bitte nicht.");
        pipeline.process(&mut doc).unwrap();
        let report = AnalysisReport::from_document(&doc);

        assert_eq!(report.language.as_deref(), Some("de"));
        assert_eq!(report.sentences.len(), 1);
        assert_eq!(report.tokens.len(), 5);
        assert_eq!(report.tokens[1].pos.as_deref(), Some("NN"));
        assert!(report.tokens[0].stopword);
        assert!(!report.tokens[1].stopword);

        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].text, "Pizzaria bitte nicht");
        assert!(report.chunks[0].negated);
        assert!(report.chunks[0].ner.is_empty());
        assert!(report.entities.is_empty());
    }

    #[test]
    fn test_report_serializes_entities() {
        let pipeline = PipelineConfig::default().build_pipeline().unwrap();
        let mut doc = Document::new("Angela Merkel fuhr nach Hamburg.");
        pipeline.process(&mut doc).unwrap();
        let report = AnalysisReport::from_document(&doc);

        let json = serde_json::to_value(&report).unwrap();
        let names: Vec<&str> = json["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Angela Merkel", "Hamburg"]);
        assert_eq!(json["chunks"][0]["ner"][0]["entity_type"], "PER");
    }

    #[test]
    fn test_report_without_text() {
        let report = AnalysisReport::from_document(&Document::default());
        assert!(report.text.is_empty());
        assert!(report.tokens.is_empty());
    }
}
