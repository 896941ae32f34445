//! # Detectores por Regras — Gazetteers e Padrões Regex
//!
//! Os detectores desta seção não classificam tokens um a um: eles criam
//! **Chunks** sobre o trecho reconhecido e anexam um valor [`NER`] com o tipo
//! da entidade e uma probabilidade.
//!
//! Vários detectores podem marcar o mesmo trecho (ou trechos sobrepostos). Quem
//! resolve os conflitos é o [`NamedEntityCollector`](crate::collector::NamedEntityCollector),
//! que roda depois, na fase `Post`.
//!
//! ## Gazetteer
//!
//! Lista de nomes conhecidos, possivelmente com várias palavras
//! ("Deutsche Bahn"). A comparação é por token e sem diferenciar maiúsculas;
//! em cada posição vence a entrada mais longa.
//!
//! ## Padrões
//!
//! Expressões regulares sobre o texto inteiro (ex: número de trem
//! `ICE 1234`). Quando o documento já tem tokens, o trecho casado é ajustado
//! para as bordas dos tokens que ele toca.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::annotation::NER;
use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};
use crate::span::AnalysedText;
use crate::tagset::NerTag;
use crate::tokenizer::tokenize;
use crate::value::Value;

/// Uma entrada de gazetteer: forma de superfície, tipo e confiança.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub surface: String,
    pub entity_type: String,
    #[serde(default)]
    pub probability: Option<f64>,
}

impl GazetteerEntry {
    pub fn new(surface: impl Into<String>, entity_type: impl Into<String>, probability: f64) -> Self {
        Self {
            surface: surface.into(),
            entity_type: entity_type.into(),
            probability: Some(probability),
        }
    }
}

/// Um padrão regex nomeado, na forma em que aparece na configuração.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
    pub entity_type: String,
    #[serde(default)]
    pub probability: Option<f64>,
}

fn ner_value(entity_type: &str, probability: Option<f64>) -> Value<NerTag> {
    let tag = NerTag::typed(entity_type, entity_type);
    match probability {
        Some(p) => Value::with_probability(tag, p),
        None => Value::new(tag),
    }
}

fn emit(at: &mut AnalysedText, start: usize, end: usize, value: Value<NerTag>) -> Result<()> {
    let chunk = at.add_chunk(start, end)?;
    trace!(start, end, tag = %value.value.tag, "chunk NER emitido");
    at.annotations_mut(chunk).add_value(NER, value);
    Ok(())
}

/// Detector de entidades por lista de nomes.
#[derive(Debug, Clone)]
pub struct GazetteerDetector {
    name: String,
    /// Entradas já tokenizadas e em minúsculas.
    entries: Vec<(Vec<String>, GazetteerEntry)>,
}

impl GazetteerDetector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: GazetteerEntry) -> Self {
        self.add(entry);
        self
    }

    pub fn add(&mut self, entry: GazetteerEntry) {
        let parts: Vec<String> = tokenize(&entry.surface)
            .into_iter()
            .map(|t| t.text.to_lowercase())
            .collect();
        if parts.is_empty() {
            debug!(surface = %entry.surface, "entrada de gazetteer vazia ignorada");
            return;
        }
        self.entries.push((parts, entry));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entrada mais longa que casa a partir de `words[i]`.
    fn longest_match(&self, words: &[String], i: usize) -> Option<(usize, &GazetteerEntry)> {
        self.entries
            .iter()
            .filter(|(parts, _)| {
                i + parts.len() <= words.len()
                    && parts.iter().enumerate().all(|(j, part)| words[i + j] == *part)
            })
            .max_by_key(|(parts, _)| parts.len())
            .map(|(parts, entry)| (parts.len(), entry))
    }
}

impl Processor for GazetteerDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        Phase::Ner
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!(detector = %self.name, "documento sem texto analisado");
            return Ok(());
        };
        if self.entries.is_empty() || !at.has_tokens() {
            return Ok(());
        }

        let tokens: Vec<(usize, usize)> = at
            .tokens(at.root())
            .map(|t| (at.span(t).start(), at.span(t).end()))
            .collect();
        let words: Vec<String> = tokens
            .iter()
            .map(|&(s, e)| at.text()[s..e].to_lowercase())
            .collect();

        let mut found = Vec::new();
        let mut i = 0;
        while i < words.len() {
            match self.longest_match(&words, i) {
                Some((n, entry)) => {
                    found.push((tokens[i].0, tokens[i + n - 1].1, entry));
                    i += n;
                }
                None => i += 1,
            }
        }

        for &(start, end, entry) in &found {
            emit(at, start, end, ner_value(&entry.entity_type, entry.probability))?;
        }
        debug!(detector = %self.name, matches = found.len(), "gazetteer aplicado");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    name: String,
    regex: Regex,
    entity_type: String,
    probability: Option<f64>,
}

/// Detector de entidades por expressões regulares.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    patterns: Vec<CompiledPattern>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adiciona um padrão; falha com [`Error::Pattern`](crate::error::Error::Pattern)
    /// se a regex for inválida.
    pub fn pattern(mut self, spec: &PatternSpec) -> Result<Self> {
        self.patterns.push(CompiledPattern {
            name: spec.name.clone(),
            regex: Regex::new(&spec.pattern)?,
            entity_type: spec.entity_type.clone(),
            probability: spec.probability,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Ajusta `[start, end)` às bordas dos tokens que ele toca.
fn snap(at: &AnalysedText, start: usize, end: usize) -> Option<(usize, usize)> {
    let mut touched = at
        .tokens(at.root())
        .map(|t| at.span(t))
        .filter(|t| t.start() < end && t.end() > start);
    let first = touched.next()?;
    let last = touched.last().unwrap_or(first);
    Some((first.start(), last.end()))
}

impl Processor for PatternDetector {
    fn name(&self) -> &str {
        "pattern-detector"
    }

    fn phase(&self) -> Phase {
        Phase::Ner
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; padrões ignorados");
            return Ok(());
        };

        let mut found = Vec::new();
        let has_tokens = at.has_tokens();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(at.text()) {
                if m.start() == m.end() {
                    continue;
                }
                let range = if has_tokens {
                    snap(at, m.start(), m.end())
                } else {
                    Some((m.start(), m.end()))
                };
                if let Some((start, end)) = range {
                    trace!(pattern = %pattern.name, start, end, "padrão casou");
                    found.push((start, end, pattern));
                }
            }
        }

        for &(start, end, pattern) in &found {
            emit(at, start, end, ner_value(&pattern.entity_type, pattern.probability))?;
        }
        debug!(matches = found.len(), "padrões aplicados");
        Ok(())
    }
}
