//! # Documento (contexto de processamento)
//!
//! Um [`Document`] é o que atravessa o pipeline: o texto analisado (opcional até
//! alguém criá-lo), o idioma (opcional até a detecção), sobrescritas de
//! configuração por documento e anotações no nível do documento (as entidades
//! consolidadas, por exemplo).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotation::Annotations;
use crate::span::AnalysedText;

/// Sobrescreve `StopwordMarker::case_sensitive` para um documento.
pub const STOPWORD_CASE_SENSITIVE: &str = "stopword.case-sensitive";
/// Sobrescreve `StopwordMarker::pos_filter` para um documento.
pub const STOPWORD_POS_FILTER: &str = "stopword.pos-filter";

/// Mapa chave → valor JSON com ajustes de configuração válidos só para um documento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigOverrides(BTreeMap<String, serde_json::Value>);

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Lê um booleano. Aceita `true`/`false` e as strings `"true"`/`"false"`;
    /// qualquer outra coisa é tratada como ausente.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub analysed_text: Option<AnalysedText>,
    /// Código ISO 639-1 em minúsculas (`"de"`, `"en"`...).
    pub language: Option<String>,
    pub overrides: ConfigOverrides,
    pub annotations: Annotations,
}

impl Document {
    /// Documento novo com o texto já envolvido em um `AnalysedText`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            analysed_text: Some(AnalysedText::new(text)),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into().to_lowercase());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.analysed_text.as_ref().map(AnalysedText::text)
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_bool_parsing() {
        let overrides: ConfigOverrides = serde_json::from_str(
            r#"{"stopword.case-sensitive": true, "stopword.pos-filter": "false", "other": 3}"#,
        )
        .unwrap();
        assert_eq!(overrides.get_bool(STOPWORD_CASE_SENSITIVE), Some(true));
        assert_eq!(overrides.get_bool(STOPWORD_POS_FILTER), Some(false));
        assert_eq!(overrides.get_bool("other"), None);
        assert_eq!(overrides.get_bool("missing"), None);
    }

    #[test]
    fn test_document_language_is_lowercased() {
        let doc = Document::new("Hallo Welt").with_language("DE");
        assert_eq!(doc.language(), Some("de"));
        assert_eq!(doc.text(), Some("Hallo Welt"));
    }
}
