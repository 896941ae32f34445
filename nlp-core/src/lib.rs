//! # nlp-core — Pipeline Plugável de Anotação Linguística
//!
//! Este crate implementa um pipeline de Processamento de Linguagem Natural em que
//! cada estágio enriquece um mesmo **grafo de anotações** sobre o texto. Ele foi
//! escrito para ser didático e extensível: cada estágio é um [`Processor`]
//! independente, e novos estágios entram no pipeline sem alterar os existentes.
//!
//! ## Arquitetura do Sistema
//!
//! O texto nunca é copiado nem alterado. Tudo é um **span** (intervalo de
//! offsets) sobre o mesmo buffer, e cada span carrega anotações tipadas:
//!
//! 1.  **Detecção de idioma** ([`langdetect`]): escolhe o idioma pelas stopwords.
//! 2.  **Tokenização** ([`tokenizer`]): sentenças e tokens, preservando offsets.
//! 3.  **POS** ([`pos`]): léxico + ortografia, interpretados por um [`tagset`].
//! 4.  **Anotação** ([`stopwords`], [`stemmer`]): marcas por token.
//! 5.  **NER** ([`rule_based`]): gazetteers e regex criam Chunks com tags NER.
//! 6.  **Pós-processamento**:
//!     *   [`collector`]: funde menções sobrepostas e resume entidades.
//!     *   [`negation`]: marca o escopo das negações.
//! 7.  **Saída**: [`AnalysisReport`] ou consulta direta ao [`AnalysedText`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nlp_core::{AnalysisReport, Document, PipelineConfig};
//!
//! // 1. Monta o pipeline com os recursos embutidos (alemão + inglês)
//! let pipeline = PipelineConfig::default().build_pipeline().unwrap();
//!
//! // 2. Processa um documento
//! let mut doc = Document::new("Hat der ICE 1234 echt keine Verspätung?");
//! pipeline.process(&mut doc).unwrap();
//!
//! // 3. Lê o resultado
//! let report = AnalysisReport::from_document(&doc);
//! for chunk in report.chunks.iter().filter(|c| c.negated) {
//!     println!("Negação: {}", chunk.text);
//! }
//! for entity in &report.entities {
//!     println!("Entidade: {} ({}) x{}", entity.name, entity.entity_type, entity.mention_count);
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`span`]: modelo de spans e índice ordenado por offsets.
//! - [`annotation`] e [`value`]: armazenamento tipado de valores com confiança.
//! - [`pipeline`]: orquestrador por fase e prioridade, com eventos.
//! - [`config`]: configuração JSON e montagem explícita do pipeline.

pub mod annotation;
pub mod collector;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod langdetect;
pub mod negation;
pub mod pipeline;
pub mod pos;
pub mod report;
pub mod rule_based;
pub mod span;
pub mod stemmer;
pub mod stopwords;
pub mod tagset;
pub mod tokenizer;
pub mod value;

pub use annotation::{Annotation, Annotations};
pub use collector::{NamedEntity, NamedEntityCollector};
pub use config::PipelineConfig;
pub use document::{ConfigOverrides, Document};
pub use error::{Error, Result};
pub use negation::{NegationResolver, NegationRule, NegationRuleRegistry};
pub use pipeline::{Phase, Pipeline, PipelineEvent, Processor};
pub use report::AnalysisReport;
pub use span::{AnalysedText, SpanId, SpanType};
pub use tagset::{NerTag, PosTag, TagSet};
pub use value::Value;
