//! # Coletor de Entidades Nomeadas
//!
//! Vários detectores (gazetteer, regex, modelos externos) marcam **chunks** com
//! anotações [`NER`], muitas vezes sobrepostas ou repetidas. O coletor consolida
//! essas marcações em um conjunto canônico:
//!
//! 1. **Escopo**: cada `Section` é tratada isoladamente (ou o texto inteiro, se não
//!    houver seções).
//! 2. **Menções**: os chunks são percorridos na ordem do índice. Para cada tipo de
//!    entidade existe no máximo uma menção **ativa**.
//!    - Chunk estritamente menor e contido na menção ativa do seu tipo: absorvido,
//!      com a probabilidade somada ao contêiner.
//!    - Senão, contido em uma menção ativa de outro tipo: absorvido sem somar.
//!    - Chunk que sobrepõe a menção ativa do seu tipo: a menção cresce até a união
//!      e as probabilidades são combinadas.
//!    - Caso contrário a menção ativa é finalizada e uma nova começa.
//! 3. **Nome**: concatenação do lema (ou forma de superfície) de cada token coberto,
//!    preservando o texto original entre tokens não adjacentes.
//! 4. **Agrupamento**: menções com o mesmo nome e tipo formam uma
//!    [`NamedEntity`]; a probabilidade do grupo é a combinação de todas as menções.
//!
//! ## Saída
//!
//! - Um valor [`NAMED_ENTITY`] por grupo nas anotações do documento.
//! - As anotações `NER` cruas dos chunks do escopo são removidas. A união de cada
//!   menção e cada chunk que contribuiu para ela recebem de volta um único `NER`
//!   com a probabilidade do grupo.
//!
//! A combinação de probabilidades usa [`combine_probabilities`]: evidências
//! repetidas elevam a confiança sem nunca passar de 1.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::annotation::{LEMMA, NAMED_ENTITY, NER};
use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};
use crate::span::{AnalysedText, SpanId};
use crate::tagset::NerTag;
use crate::value::{combine_all, combine_probabilities, Value};

/// Intervalo de bytes de uma menção.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

/// Entidade consolidada no nível do documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
    pub entity_type: String,
    /// Tag da primeira menção.
    pub tag: NerTag,
    pub probability: Option<f64>,
    pub mention_count: usize,
    /// Menções em ordem de offset; a primeira é o span de resumo.
    pub mentions: Vec<TextRange>,
}

/// Menção em construção.
#[derive(Debug, Clone)]
struct NamedEntityData {
    start: usize,
    end: usize,
    entity_type: String,
    probability: Option<f64>,
    tag: NerTag,
    /// Chunks que contribuíram para a menção.
    mentions: Vec<TextRange>,
    /// Tokens cobertos, ordenados por offset.
    tokens: BTreeSet<(usize, SpanId)>,
}

impl NamedEntityData {
    fn new(start: usize, end: usize, value: Value<NerTag>, tokens: &[(usize, SpanId)]) -> Self {
        Self {
            start,
            end,
            entity_type: value.value.entity_key().to_string(),
            probability: value.probability,
            tag: value.value,
            mentions: vec![TextRange { start, end }],
            tokens: tokens.iter().copied().collect(),
        }
    }

    fn strictly_encloses(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end && end - start < self.end - self.start
    }

    fn absorb(&mut self, start: usize, end: usize, probability: Option<f64>) {
        self.probability = combine_probabilities(self.probability, probability);
        let range = TextRange { start, end };
        if !self.mentions.contains(&range) {
            self.mentions.push(range);
        }
    }

    fn merge(&mut self, start: usize, end: usize, probability: Option<f64>, tokens: &[(usize, SpanId)]) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
        self.absorb(start, end, probability);
        self.tokens.extend(tokens.iter().copied());
    }
}

/// Menção finalizada, já com nome.
#[derive(Debug, Clone)]
struct Mention {
    name: String,
    data: NamedEntityData,
}

/// Estágio de consolidação de entidades. Roda na fase `Post`, antes da negação.
#[derive(Debug, Clone, Default)]
pub struct NamedEntityCollector;

impl NamedEntityCollector {
    pub const PRIORITY: i32 = 100;

    pub fn new() -> Self {
        Self
    }
}

impl Processor for NamedEntityCollector {
    fn name(&self) -> &str {
        "named-entity-collector"
    }

    fn phase(&self) -> Phase {
        Phase::Post
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; coleta de entidades ignorada");
            return Ok(());
        };

        let mut scopes: Vec<SpanId> = at.sections().collect();
        if scopes.is_empty() {
            scopes.push(at.root());
        }

        let mut mentions = Vec::new();
        for scope in scopes {
            mentions.extend(collect_scope(at, scope));
        }
        mentions.sort_by(|a, b| {
            (a.data.start, a.data.end, &a.data.entity_type).cmp(&(b.data.start, b.data.end, &b.data.entity_type))
        });

        for entity in summarize(at, mentions)? {
            trace!(
                name = %entity.name,
                entity_type = %entity.entity_type,
                mentions = entity.mention_count,
                "entidade consolidada"
            );
            let probability = entity.probability;
            doc.annotations.add_value(
                NAMED_ENTITY,
                Value {
                    value: entity,
                    probability,
                },
            );
        }
        Ok(())
    }
}

/// Percorre os chunks de um escopo e devolve as menções finalizadas.
fn collect_scope(at: &mut AnalysedText, scope: SpanId) -> Vec<Mention> {
    let chunks: Vec<SpanId> = at.chunks(scope).collect();
    let mut active: BTreeMap<String, NamedEntityData> = BTreeMap::new();
    let mut flushed = Vec::new();

    for chunk in chunks {
        let values: Vec<Value<NerTag>> = at
            .annotations(chunk)
            .values(NER)
            .map(|v| Value {
                value: v.value.clone(),
                probability: v.probability,
            })
            .collect();
        if values.is_empty() {
            continue;
        }
        let (start, end) = {
            let span = at.span(chunk);
            (span.start(), span.end())
        };
        let tokens: Vec<(usize, SpanId)> = at
            .tokens(chunk)
            .map(|token| (at.span(token).start(), token))
            .collect();

        for value in values {
            let key = value.value.entity_key().to_string();

            // o contêiner do mesmo tipo tem precedência sobre os demais
            if let Some(container) = active.get_mut(&key).filter(|m| m.strictly_encloses(start, end)) {
                container.absorb(start, end, value.probability);
                continue;
            }
            if active.values().any(|m| m.strictly_encloses(start, end)) {
                continue;
            }

            match active.get_mut(&key) {
                Some(mention) if start < mention.end => mention.merge(start, end, value.probability, &tokens),
                _ => {
                    if let Some(done) = active.insert(key, NamedEntityData::new(start, end, value, &tokens)) {
                        flushed.push(done);
                    }
                }
            }
        }
        at.annotations_mut(chunk).remove(NER);
    }
    flushed.extend(active.into_values());

    flushed
        .into_iter()
        .map(|data| Mention {
            name: mention_name(at, &data),
            data,
        })
        .collect()
}

/// Lema (ou superfície) dos tokens cobertos, com o texto original entre tokens
/// não adjacentes. Sem tokens, o próprio trecho do texto.
fn mention_name(at: &AnalysedText, data: &NamedEntityData) -> String {
    let text = at.text();
    let mut name = String::new();
    let mut last_end: Option<usize> = None;

    for &(_, token) in &data.tokens {
        let span = at.span(token);
        if let Some(prev) = last_end {
            if span.start() > prev {
                name.push_str(&text[prev..span.start()]);
            } else if span.start() < prev {
                // token sobreposto ao anterior
                continue;
            }
        }
        match span.annotations().annotation(LEMMA) {
            Some(lemma) => name.push_str(lemma),
            None => name.push_str(at.span_text(token)),
        }
        last_end = Some(span.end());
    }

    if last_end.is_none() {
        name.push_str(&text[data.start..data.end]);
    }
    name
}

/// Agrupa menções por (nome, tipo), reanota os chunks e devolve as entidades
/// na ordem da primeira menção.
fn summarize(at: &mut AnalysedText, mentions: Vec<Mention>) -> Result<Vec<NamedEntity>> {
    let mut groups: Vec<Vec<Mention>> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    for mention in mentions {
        let key = (mention.name.clone(), mention.data.entity_type.clone());
        match index.get(&key) {
            Some(&i) => groups[i].push(mention),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![mention]);
            }
        }
    }

    let mut entities = Vec::with_capacity(groups.len());
    for group in groups {
        let probability = combine_all(group.iter().map(|m| m.data.probability));
        let first = &group[0];
        let tag = first.data.tag.clone();

        let mut ranges: Vec<TextRange> = Vec::with_capacity(group.len());
        let mut annotated: Vec<TextRange> = Vec::new();
        for mention in &group {
            let range = TextRange {
                start: mention.data.start,
                end: mention.data.end,
            };
            if !ranges.contains(&range) {
                ranges.push(range);
            }
            for &part in std::iter::once(&range).chain(&mention.data.mentions) {
                if annotated.contains(&part) {
                    continue;
                }
                let chunk = at.add_chunk(part.start, part.end)?;
                at.annotations_mut(chunk).add_value(
                    NER,
                    Value {
                        value: tag.clone(),
                        probability,
                    },
                );
                annotated.push(part);
            }
        }

        entities.push(NamedEntity {
            name: first.name.clone(),
            entity_type: first.data.entity_type.clone(),
            tag,
            probability,
            mention_count: group.len(),
            mentions: ranges,
        });
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanType;
    use crate::tokenizer::TokenizerProcessor;

    fn doc(text: &str) -> Document {
        let mut doc = Document::new(text);
        TokenizerProcessor.process(&mut doc).unwrap();
        doc
    }

    fn tag_chunk(doc: &mut Document, start: usize, end: usize, entity_type: &str, p: Option<f64>) -> SpanId {
        let at = doc.analysed_text.as_mut().unwrap();
        let chunk = at.add_chunk(start, end).unwrap();
        at.annotations_mut(chunk).add_value(
            NER,
            Value {
                value: NerTag::typed(entity_type.to_lowercase(), entity_type),
                probability: p,
            },
        );
        chunk
    }

    fn entities(doc: &Document) -> Vec<NamedEntity> {
        doc.annotations.values(NAMED_ENTITY).map(|v| v.value.clone()).collect()
    }

    #[test]
    fn test_two_detectors_same_span_merge_into_one_mention() {
        let mut d = doc("Heute kam Anna Maria zu Besuch.");
        tag_chunk(&mut d, 10, 20, "PERSON", Some(0.6));
        tag_chunk(&mut d, 10, 20, "PERSON", Some(0.7));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Anna Maria");
        assert_eq!(found[0].entity_type, "PERSON");
        assert_eq!(found[0].mention_count, 1);
        assert!((found[0].probability.unwrap() - 0.915).abs() < 0.001);

        let at = d.analysed_text.as_ref().unwrap();
        let chunk = at.find(SpanType::Chunk, 10, 20).unwrap();
        let ner: Vec<_> = at.annotations(chunk).values(NER).collect();
        assert_eq!(ner.len(), 1);
        assert_eq!(ner[0].probability, found[0].probability);
    }

    #[test]
    fn test_disjoint_chunks_are_separate_mentions() {
        let mut d = doc("Paris und Paris!");
        tag_chunk(&mut d, 0, 5, "LOCATION", Some(0.5));
        tag_chunk(&mut d, 10, 15, "LOCATION", Some(0.5));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mention_count, 2);
        assert_eq!(
            found[0].mentions,
            vec![TextRange { start: 0, end: 5 }, TextRange { start: 10, end: 15 }]
        );
        assert!((found[0].probability.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_chunks_extend_to_union() {
        let mut d = doc("Die Deutsche Bahn AG fährt.");
        tag_chunk(&mut d, 4, 17, "ORGANIZATION", Some(0.4));
        tag_chunk(&mut d, 13, 20, "ORGANIZATION", Some(0.4));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Deutsche Bahn AG");
        assert_eq!(found[0].mentions, vec![TextRange { start: 4, end: 20 }]);

        // união e chunks originais carregam o NER do grupo
        let at = d.analysed_text.as_ref().unwrap();
        for (start, end) in [(4, 20), (4, 17), (13, 20)] {
            let chunk = at.find(SpanType::Chunk, start, end).unwrap();
            let ner: Vec<_> = at.annotations(chunk).values(NER).collect();
            assert_eq!(ner.len(), 1, "chunk {start}..{end}");
            assert_eq!(ner[0].probability, found[0].probability);
        }
    }

    #[test]
    fn test_contained_chunk_is_absorbed() {
        let mut d = doc("Deutsche Bahn AG fährt.");
        tag_chunk(&mut d, 0, 16, "ORGANIZATION", Some(0.5));
        tag_chunk(&mut d, 9, 13, "ORGANIZATION", Some(0.5));
        tag_chunk(&mut d, 9, 13, "LOCATION", Some(0.9));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_type, "ORGANIZATION");
        assert_eq!(found[0].mention_count, 1);
        // só a evidência do mesmo tipo é somada: combine(0.5, 0.5)
        assert!((found[0].probability.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_absorbed_chunk_gets_group_ner_back() {
        let mut d = doc("Deutsche Bahn AG fährt.");
        tag_chunk(&mut d, 0, 16, "ORGANIZATION", Some(0.5));
        tag_chunk(&mut d, 9, 13, "ORGANIZATION", Some(0.5));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mentions, vec![TextRange { start: 0, end: 16 }]);

        let at = d.analysed_text.as_ref().unwrap();
        let inner = at.find(SpanType::Chunk, 9, 13).unwrap();
        let ner: Vec<_> = at.annotations(inner).values(NER).collect();
        assert_eq!(ner.len(), 1);
        assert_eq!(ner[0].value.entity_type.as_deref(), Some("ORGANIZATION"));
        assert_eq!(ner[0].probability, found[0].probability);
    }

    #[test]
    fn test_nested_chunk_folds_into_container_of_its_type() {
        // ORG [9,13) está dentro de ORG [0,16) e de LOC [4,20)
        let mut d = doc("Die Deutsche Bahn AG fährt.");
        tag_chunk(&mut d, 0, 16, "ORGANIZATION", Some(0.5));
        tag_chunk(&mut d, 4, 20, "LOCATION", Some(0.5));
        tag_chunk(&mut d, 9, 13, "ORGANIZATION", Some(0.5));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 2);
        let org = found.iter().find(|e| e.entity_type == "ORGANIZATION").unwrap();
        let loc = found.iter().find(|e| e.entity_type == "LOCATION").unwrap();
        assert_eq!(org.mention_count, 1);
        assert!((org.probability.unwrap() - 0.8).abs() < 1e-9);
        assert!((loc.probability.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_different_types_on_same_span_stay_separate() {
        let mut d = doc("Jordan spielt.");
        tag_chunk(&mut d, 0, 6, "PERSON", Some(0.6));
        tag_chunk(&mut d, 0, 6, "LOCATION", Some(0.3));
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 2);
        let at = d.analysed_text.as_ref().unwrap();
        let chunk = at.find(SpanType::Chunk, 0, 6).unwrap();
        assert_eq!(at.annotations(chunk).values(NER).count(), 2);
    }

    #[test]
    fn test_sections_are_scoped_independently() {
        let mut d = doc("Anna kommt. Anna geht.");
        {
            let at = d.analysed_text.as_mut().unwrap();
            at.add_section(0, 11).unwrap();
            at.add_section(12, 22).unwrap();
        }
        tag_chunk(&mut d, 0, 4, "PERSON", None);
        tag_chunk(&mut d, 12, 16, "PERSON", None);
        NamedEntityCollector.process(&mut d).unwrap();

        let found = entities(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mention_count, 2);
        // desconhecida + desconhecida continua desconhecida
        assert_eq!(found[0].probability, None);
    }

    #[test]
    fn test_name_prefers_lemma_and_keeps_gaps() {
        let mut d = doc("Müllers Haus");
        {
            let at = d.analysed_text.as_mut().unwrap();
            let token = at.find(SpanType::Token, 0, 8).unwrap();
            at.annotations_mut(token).set_value(LEMMA, Value::new("Müller".to_string()));
        }
        tag_chunk(&mut d, 0, 13, "LOCATION", Some(0.9));
        NamedEntityCollector.process(&mut d).unwrap();
        assert_eq!(entities(&d)[0].name, "Müller Haus");
    }

    #[test]
    fn test_untyped_tag_groups_by_tag() {
        let mut d = doc("ICE 1234");
        {
            let at = d.analysed_text.as_mut().unwrap();
            let chunk = at.add_chunk(0, 8).unwrap();
            at.annotations_mut(chunk).add_value(NER, Value::with_probability(NerTag::new("TRAIN"), 0.7));
        }
        NamedEntityCollector.process(&mut d).unwrap();
        let found = entities(&d);
        assert_eq!(found[0].entity_type, "TRAIN");
        assert_eq!(found[0].name, "ICE 1234");
    }

    #[test]
    fn test_no_chunks_no_entities() {
        let mut d = doc("Nichts zu sehen.");
        NamedEntityCollector.process(&mut d).unwrap();
        assert!(entities(&d).is_empty());
    }
}
