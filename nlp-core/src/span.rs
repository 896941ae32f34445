//! # Modelo de Spans
//!
//! Todo o pipeline escreve em um único [`AnalysedText`]: o texto imutável do
//! documento mais um conjunto de **spans** (intervalos de bytes `[start, end)`)
//! de cinco tipos:
//!
//! | Tipo       | Papel                                                       |
//! |------------|-------------------------------------------------------------|
//! | `Text`     | O texto inteiro (criado junto com o `AnalysedText`).        |
//! | `Section`  | Divisões opcionais do documento (parágrafos, campos...).    |
//! | `Sentence` | Sentenças.                                                  |
//! | `Chunk`    | Trechos arbitrários: entidades, frases negadas.             |
//! | `Token`    | Unidades léxicas (folhas).                                  |
//!
//! ## Contenção derivada de offsets
//!
//! Não existe árvore explícita. Um span "contém" outro quando o intervalo do
//! segundo cai dentro do primeiro; isso é calculado na consulta, a partir de um
//! índice ordenado. Assim chunks podem se sobrepor livremente (vários detectores
//! marcando a mesma região) sem nenhum custo de reestruturação.
//!
//! ## Ordem
//!
//! O índice ordena por `start` crescente, depois `end` **decrescente** (quem
//! envolve vem antes), depois tipo (`Text < Section < Sentence < Chunk < Token`)
//! e, por fim, ordem de inserção. Toda iteração segue essa ordem e é
//! determinística.
//!
//! ```rust
//! use nlp_core::span::{AnalysedText, SpanType};
//!
//! let mut at = AnalysedText::new("Eine Pizzaria bitte nicht.");
//! let sentence = at.add_sentence(0, 26).unwrap();
//! at.add_token(0, 4).unwrap();
//! at.add_token(5, 13).unwrap();
//!
//! let tokens: Vec<&str> = at.tokens(sentence).map(|t| at.span_text(t)).collect();
//! assert_eq!(tokens, vec!["Eine", "Pizzaria"]);
//! ```

use std::cmp::Reverse;
use std::collections::btree_set;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::annotation::Annotations;
use crate::error::{Error, Result};

/// Tipo de um span. A ordem das variantes é a ordem de desempate do índice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanType {
    Text,
    Section,
    Sentence,
    Chunk,
    Token,
}

/// Identificador de um span dentro do seu `AnalysedText`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpanId(usize);

impl SpanId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Um intervalo do texto com suas anotações.
///
/// Os offsets são fixos após a criação; só as anotações podem mudar.
#[derive(Debug, Clone)]
pub struct Span {
    id: SpanId,
    span_type: SpanType,
    start: usize,
    end: usize,
    annotations: Annotations,
}

impl Span {
    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn span_type(&self) -> SpanType {
        self.span_type
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `other` cai inteiramente dentro deste span.
    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SpanKey {
    start: usize,
    end: Reverse<usize>,
    span_type: SpanType,
    id: SpanId,
}

/// Texto de um documento e todos os seus spans.
#[derive(Debug, Clone)]
pub struct AnalysedText {
    text: String,
    spans: Vec<Span>,
    index: BTreeSet<SpanKey>,
    lookup: HashMap<(SpanType, usize, usize), SpanId>,
}

impl AnalysedText {
    /// Cria o texto analisado com o span `Text` cobrindo tudo.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut at = Self {
            spans: Vec::new(),
            index: BTreeSet::new(),
            lookup: HashMap::new(),
            text,
        };
        let len = at.text.len();
        at.register(SpanType::Text, 0, len);
        at
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Span `Text` que cobre o texto inteiro.
    pub fn root(&self) -> SpanId {
        SpanId(0)
    }

    pub fn add_section(&mut self, start: usize, end: usize) -> Result<SpanId> {
        self.add_span(SpanType::Section, start, end)
    }

    pub fn add_sentence(&mut self, start: usize, end: usize) -> Result<SpanId> {
        self.add_span(SpanType::Sentence, start, end)
    }

    pub fn add_chunk(&mut self, start: usize, end: usize) -> Result<SpanId> {
        self.add_span(SpanType::Chunk, start, end)
    }

    pub fn add_token(&mut self, start: usize, end: usize) -> Result<SpanId> {
        self.add_span(SpanType::Token, start, end)
    }

    /// Registra um span; se já existir um span do mesmo tipo com os mesmos
    /// offsets, retorna o existente.
    ///
    /// Falha com [`Error::InvalidSpan`] se `start > end`, `end > len` ou se algum
    /// offset cair no meio de um caractere UTF-8.
    fn add_span(&mut self, span_type: SpanType, start: usize, end: usize) -> Result<SpanId> {
        if start > end
            || end > self.text.len()
            || !self.text.is_char_boundary(start)
            || !self.text.is_char_boundary(end)
        {
            return Err(Error::InvalidSpan {
                start,
                end,
                len: self.text.len(),
            });
        }
        Ok(self.register(span_type, start, end))
    }

    fn register(&mut self, span_type: SpanType, start: usize, end: usize) -> SpanId {
        if let Some(id) = self.lookup.get(&(span_type, start, end)) {
            return *id;
        }
        let id = SpanId(self.spans.len());
        self.spans.push(Span {
            id,
            span_type,
            start,
            end,
            annotations: Annotations::new(),
        });
        self.index.insert(SpanKey {
            start,
            end: Reverse(end),
            span_type,
            id,
        });
        self.lookup.insert((span_type, start, end), id);
        id
    }

    /// Busca um span existente pelo tipo e offsets.
    pub fn find(&self, span_type: SpanType, start: usize, end: usize) -> Option<SpanId> {
        self.lookup.get(&(span_type, start, end)).copied()
    }

    /// Acesso ao span.
    ///
    /// # Panics
    /// Se `id` não pertence a este texto.
    pub fn span(&self, id: SpanId) -> &Span {
        &self.spans[id.0]
    }

    pub fn get(&self, id: SpanId) -> Option<&Span> {
        self.spans.get(id.0)
    }

    /// Acesso mutável às anotações do span (os offsets continuam imutáveis).
    ///
    /// # Panics
    /// Se `id` não pertence a este texto.
    pub fn annotations_mut(&mut self, id: SpanId) -> &mut Annotations {
        &mut self.spans[id.0].annotations
    }

    pub fn annotations(&self, id: SpanId) -> &Annotations {
        &self.spans[id.0].annotations
    }

    /// Texto coberto pelo span.
    pub fn span_text(&self, id: SpanId) -> &str {
        let span = self.span(id);
        &self.text[span.start..span.end]
    }

    /// Número de spans registrados (inclui o span `Text`).
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Spans dos tipos `kinds` contidos em `container` (exceto ele mesmo), na ordem
    /// do índice. Com `kinds` vazio, todos os tipos são aceitos.
    ///
    /// O iterador é preguiçoso e pode ser recriado a qualquer momento; como ele
    /// empresta o texto, colete os ids antes de mutar anotações.
    pub fn enclosed<'a>(&'a self, container: SpanId, kinds: &'a [SpanType]) -> Enclosed<'a> {
        let span = self.span(container);
        // spans de mesmo intervalo e tipo mais alto (ex.: o `Text` raiz sob uma
        // sentença que cobre tudo) ficam antes da chave do container
        let from = SpanKey {
            start: span.start,
            end: Reverse(span.end),
            span_type: span.span_type,
            id: container,
        };
        self.enclosed_from(Bound::Excluded(from), span.end, kinds)
    }

    /// Spans dos tipos `kinds` contidos no intervalo `[start, end)`.
    pub fn enclosed_in_range<'a>(
        &'a self,
        start: usize,
        end: usize,
        kinds: &'a [SpanType],
    ) -> Enclosed<'a> {
        let from = SpanKey {
            start,
            end: Reverse(end),
            span_type: SpanType::Text,
            id: SpanId(0),
        };
        self.enclosed_from(Bound::Included(from), end, kinds)
    }

    fn enclosed_from<'a>(
        &'a self,
        from: Bound<SpanKey>,
        end: usize,
        kinds: &'a [SpanType],
    ) -> Enclosed<'a> {
        Enclosed {
            range: self.index.range((from, Bound::Unbounded)),
            end,
            kinds,
        }
    }

    pub fn sections(&self) -> Enclosed<'_> {
        self.enclosed(self.root(), &[SpanType::Section])
    }

    pub fn sentences(&self) -> Enclosed<'_> {
        self.enclosed(self.root(), &[SpanType::Sentence])
    }

    pub fn tokens(&self, container: SpanId) -> Enclosed<'_> {
        self.enclosed(container, &[SpanType::Token])
    }

    pub fn chunks(&self, container: SpanId) -> Enclosed<'_> {
        self.enclosed(container, &[SpanType::Chunk])
    }

    /// Verdadeiro se o texto já tem pelo menos um token.
    pub fn has_tokens(&self) -> bool {
        self.tokens(self.root()).next().is_some()
    }
}

/// Iterador preguiçoso sobre spans contidos em um intervalo.
pub struct Enclosed<'a> {
    range: btree_set::Range<'a, SpanKey>,
    end: usize,
    kinds: &'a [SpanType],
}

impl<'a> Iterator for Enclosed<'a> {
    type Item = SpanId;

    fn next(&mut self) -> Option<SpanId> {
        loop {
            let key = self.range.next()?;
            if key.start > self.end {
                return None;
            }
            if key.end.0 > self.end {
                continue;
            }
            if !self.kinds.is_empty() && !self.kinds.contains(&key.span_type) {
                continue;
            }
            return Some(key.id);
        }
    }
}
