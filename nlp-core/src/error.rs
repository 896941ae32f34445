//! # Erros do pipeline
//!
//! Três famílias de falha aparecem no pipeline:
//!
//! - **Violação de pré-condição** (`InvalidSpan`): offsets inválidos ao criar um span.
//!   A chamada falha imediatamente e nada é registrado.
//! - **Falha de estágio** (`Processing`): um processador retornou erro. O pipeline
//!   aborta o documento e identifica o estágio culpado.
//! - **Falhas de recurso** (`Config`, `Io`, `Json`, `Pattern`): carregamento de
//!   configuração, listas de palavras ou padrões regex.
//!
//! Entradas opcionais ausentes (sem texto analisado, sem idioma) **não** são erros:
//! o estágio registra um log de diagnóstico e segue sem alterar o documento.

use thiserror::Error;

/// Tipo `Result` do crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Offsets fora de `0 <= start <= end <= len` ou fora de fronteira UTF-8.
    #[error("span inválido [{start}, {end}) para texto de {len} bytes")]
    InvalidSpan { start: usize, end: usize, len: usize },

    /// Um estágio do pipeline falhou; o documento não foi processado por completo.
    #[error("estágio '{stage}' falhou: {source}")]
    Processing {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    /// Configuração inválida ou incompleta.
    #[error("configuração inválida: {0}")]
    Config(String),

    /// Idioma sem recursos registrados (tag set, stemmer, lista de stopwords).
    #[error("idioma sem suporte: {0}")]
    UnknownLanguage(String),

    #[error("expressão regular inválida: {0}")]
    Pattern(#[from] regex::Error),

    #[error("erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Cria um erro de configuração.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Envolve o erro de um estágio com o nome do estágio.
    pub fn processing(stage: impl Into<String>, source: Error) -> Self {
        Error::Processing {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Nome do estágio que falhou, se o erro veio do pipeline.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Error::Processing { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_keeps_stage_and_cause() {
        let cause = Error::InvalidSpan { start: 5, end: 2, len: 10 };
        let err = Error::processing("tokenizer", cause);
        assert_eq!(err.stage(), Some("tokenizer"));
        let msg = err.to_string();
        assert!(msg.contains("tokenizer"));
        assert!(msg.contains("[5, 2)"));
    }
}
