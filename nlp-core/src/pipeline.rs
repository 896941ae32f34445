//! # Pipeline — Orquestrador de Processadores com Eventos Observáveis
//!
//! O pipeline é uma lista ordenada de [`Processor`]s. Cada processador declara
//! uma **fase** ([`Phase`]) e uma **prioridade**; a ordem de execução é:
//!
//! 1. Fase crescente (`Pre` → `LanguageDetection` → ... → `Post`).
//! 2. Dentro da fase, prioridade **decrescente** (maior roda primeiro).
//! 3. Empate: ordem de registro.
//!
//! Um documento passa por todos os estágios de forma síncrona, em uma única
//! thread. O paralelismo vem de processar **vários documentos** ao mesmo tempo
//! ([`Pipeline::process_batch`], via `rayon`).
//!
//! ## Modos de uso
//! - **Sync**: [`Pipeline::process`].
//! - **Streaming**: [`Pipeline::process_streaming`] empurra [`PipelineEvent`]s por
//!   um canal `mpsc`, permitindo que o servidor WebSocket transmita o progresso.
//! - **Lote**: [`Pipeline::process_batch`].

use std::cmp::Reverse;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{Error, Result};

/// Fases do pipeline, na ordem de execução.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pre,
    LanguageDetection,
    Tokenize,
    Pos,
    Annotate,
    Ner,
    Post,
}

/// Um estágio do pipeline.
///
/// Processadores são compartilhados entre threads (`Send + Sync`); todo estado
/// mutável compartilhado (caches) deve ficar atrás de um lock.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    fn phase(&self) -> Phase;

    /// Maior prioridade roda primeiro dentro da fase.
    fn priority(&self) -> i32 {
        0
    }

    fn process(&self, doc: &mut Document) -> Result<()>;
}

/// Eventos emitidos durante o processamento de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    StageStarted {
        stage: String,
        phase: Phase,
    },
    StageFinished {
        stage: String,
        elapsed_ms: u64,
    },
    /// Todos os estágios concluíram.
    Done {
        stages: usize,
        processing_ms: u64,
    },
    /// Um estágio falhou; nenhum estágio posterior rodou.
    Error {
        stage: Option<String>,
        message: String,
    },
}

#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Processor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um processador na posição dada por fase e prioridade.
    pub fn add(&mut self, processor: Arc<dyn Processor>) {
        let key = (processor.phase(), Reverse(processor.priority()));
        let at = self
            .stages
            .partition_point(|p| (p.phase(), Reverse(p.priority())) <= key);
        self.stages.insert(at, processor);
    }

    pub fn with(mut self, processor: impl Processor + 'static) -> Self {
        self.add(Arc::new(processor));
        self
    }

    /// Nomes dos estágios na ordem de execução.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Executa todos os estágios sobre o documento.
    ///
    /// O primeiro estágio que falhar interrompe a execução com
    /// [`Error::Processing`]; as mutações feitas pelos estágios anteriores permanecem.
    pub fn process(&self, doc: &mut Document) -> Result<()> {
        self.run(doc, None)
    }

    /// Igual a [`Pipeline::process`], enviando eventos de progresso por `tx`.
    ///
    /// Um receptor desconectado não interrompe o processamento.
    pub fn process_streaming(&self, doc: &mut Document, tx: &mpsc::Sender<PipelineEvent>) -> Result<()> {
        self.run(doc, Some(tx))
    }

    /// Processa vários documentos em paralelo; um resultado por documento, na mesma ordem.
    pub fn process_batch(&self, docs: &mut [Document]) -> Vec<Result<()>> {
        docs.par_iter_mut().map(|doc| self.process(doc)).collect()
    }

    fn run(&self, doc: &mut Document, tx: Option<&mpsc::Sender<PipelineEvent>>) -> Result<()> {
        let emit = |event: PipelineEvent| {
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
        };
        let start = Instant::now();

        for stage in &self.stages {
            emit(PipelineEvent::StageStarted {
                stage: stage.name().to_string(),
                phase: stage.phase(),
            });
            let stage_start = Instant::now();

            if let Err(err) = stage.process(doc) {
                warn!(stage = stage.name(), error = %err, "estágio falhou");
                let err = Error::processing(stage.name(), err);
                emit(PipelineEvent::Error {
                    stage: Some(stage.name().to_string()),
                    message: err.to_string(),
                });
                return Err(err);
            }

            let elapsed_ms = stage_start.elapsed().as_millis() as u64;
            debug!(stage = stage.name(), elapsed_ms, "estágio concluído");
            emit(PipelineEvent::StageFinished {
                stage: stage.name().to_string(),
                elapsed_ms,
            });
        }

        emit(PipelineEvent::Done {
            stages: self.stages.len(),
            processing_ms: start.elapsed().as_millis() as u64,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, NEGATION};
    use crate::value::Value;

    const TRACE: Annotation<String> = Annotation::new("trace");

    struct Mark {
        name: &'static str,
        phase: Phase,
        priority: i32,
    }

    impl Processor for Mark {
        fn name(&self) -> &str {
            self.name
        }

        fn phase(&self) -> Phase {
            self.phase
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn process(&self, doc: &mut Document) -> Result<()> {
            doc.annotations.add_value(TRACE, Value::new(self.name.to_string()));
            Ok(())
        }
    }

    struct Fail;

    impl Processor for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn phase(&self) -> Phase {
            Phase::Ner
        }

        fn process(&self, doc: &mut Document) -> Result<()> {
            let at = doc.analysed_text.as_mut().ok_or_else(|| Error::config("sem texto"))?;
            at.add_chunk(3, 1)?;
            Ok(())
        }
    }

    fn mark(name: &'static str, phase: Phase, priority: i32) -> Mark {
        Mark { name, phase, priority }
    }

    fn trace(doc: &Document) -> Vec<String> {
        doc.annotations.values(TRACE).map(|v| v.value.clone()).collect()
    }

    #[test]
    fn test_stages_ordered_by_phase_then_priority() {
        let pipeline = Pipeline::new()
            .with(mark("negation", Phase::Post, -10))
            .with(mark("tokenizer", Phase::Tokenize, 0))
            .with(mark("collector", Phase::Post, 10))
            .with(mark("gazetteer", Phase::Ner, 0))
            .with(mark("regex", Phase::Ner, 0));
        assert_eq!(
            pipeline.stage_names(),
            vec!["tokenizer", "gazetteer", "regex", "collector", "negation"]
        );

        let mut doc = Document::new("x");
        pipeline.process(&mut doc).unwrap();
        assert_eq!(trace(&doc), vec!["tokenizer", "gazetteer", "regex", "collector", "negation"]);
    }

    #[test]
    fn test_failing_stage_aborts_and_keeps_earlier_mutations() {
        let pipeline = Pipeline::new()
            .with(mark("before", Phase::Pre, 0))
            .with(Fail)
            .with(mark("after", Phase::Post, 0));
        let mut doc = Document::new("abcdef");
        let err = pipeline.process(&mut doc).unwrap_err();
        assert_eq!(err.stage(), Some("fail"));
        assert_eq!(trace(&doc), vec!["before"]);
        assert!(!doc.annotations.contains(NEGATION));
    }

    #[test]
    fn test_streaming_events() {
        let pipeline = Pipeline::new()
            .with(mark("a", Phase::Pre, 0))
            .with(mark("b", Phase::Post, 0));
        let (tx, rx) = mpsc::channel();
        let mut doc = Document::new("x");
        pipeline.process_streaming(&mut doc, &tx).unwrap();
        drop(tx);

        let events: Vec<PipelineEvent> = rx.iter().collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], PipelineEvent::StageStarted { stage, .. } if stage == "a"));
        assert!(matches!(&events[3], PipelineEvent::StageFinished { stage, .. } if stage == "b"));
        assert!(matches!(events.last(), Some(PipelineEvent::Done { stages: 2, .. })));
    }

    #[test]
    fn test_streaming_reports_error_event() {
        let pipeline = Pipeline::new().with(Fail);
        let (tx, rx) = mpsc::channel();
        let mut doc = Document::new("abcdef");
        assert!(pipeline.process_streaming(&mut doc, &tx).is_err());
        drop(tx);
        let last = rx.iter().last().unwrap();
        assert!(matches!(last, PipelineEvent::Error { stage: Some(ref s), .. } if s == "fail"));
    }

    #[test]
    fn test_batch_processes_each_document() {
        let pipeline = Pipeline::new().with(mark("a", Phase::Pre, 0));
        let mut docs: Vec<Document> = (0..8).map(|i| Document::new(format!("doc {i}"))).collect();
        let results = pipeline.process_batch(&mut docs);
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(docs.iter().all(|d| trace(d) == vec!["a"]));
    }
}
