//! # Armazenamento de Anotações Tipadas
//!
//! Cada span (e o próprio documento) carrega um [`Annotations`]: um multimapa
//! ordenado `chave → [Value, Value, ...]`. Várias anotações com a mesma chave
//! convivem, o que permite que dois detectores marquem o mesmo trecho com tipos
//! diferentes de entidade.
//!
//! ## Chaves tipadas
//!
//! Uma [`Annotation<T>`] é só um nome estático com um tipo fantasma. O tipo
//! garante em tempo de compilação que `POS` guarda [`PosTag`], `NEGATION` guarda
//! `bool` etc. Internamente os valores ficam em uma união fechada
//! ([`AnnotationValue`]); novas chaves podem ser declaradas fora deste módulo
//! para qualquer tipo que implemente [`AnnotationKind`].
//!
//! ```rust
//! use nlp_core::annotation::{Annotations, NEGATION};
//! use nlp_core::value::Value;
//!
//! let mut annotations = Annotations::new();
//! annotations.add_value(NEGATION, Value::new(true));
//! assert_eq!(annotations.annotation(NEGATION), Some(&true));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::collector::NamedEntity;
use crate::tagset::{NerTag, PosTag};
use crate::value::Value;

/// União fechada dos tipos que podem ser guardados como anotação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnnotationValue {
    Bool(bool),
    Text(String),
    Pos(PosTag),
    Ner(NerTag),
    Entity(NamedEntity),
}

/// Tipos que sabem se converter de/para [`AnnotationValue`].
pub trait AnnotationKind: Clone {
    fn into_value(self) -> AnnotationValue;
    fn from_value(value: &AnnotationValue) -> Option<&Self>;
}

macro_rules! annotation_kind {
    ($ty:ty, $variant:ident) => {
        impl AnnotationKind for $ty {
            fn into_value(self) -> AnnotationValue {
                AnnotationValue::$variant(self)
            }

            fn from_value(value: &AnnotationValue) -> Option<&Self> {
                match value {
                    AnnotationValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

annotation_kind!(bool, Bool);
annotation_kind!(String, Text);
annotation_kind!(PosTag, Pos);
annotation_kind!(NerTag, Ner);
annotation_kind!(NamedEntity, Entity);

/// Chave tipada de anotação.
pub struct Annotation<T> {
    name: &'static str,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Annotation<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _kind: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Annotation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Annotation<T> {}

impl<T> fmt::Debug for Annotation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Annotation({})", self.name)
    }
}

/// Tag morfossintática de um token.
pub const POS: Annotation<PosTag> = Annotation::new("pos");
/// Tag de entidade nomeada de um chunk.
pub const NER: Annotation<NerTag> = Annotation::new("ner");
/// Chunk negado.
pub const NEGATION: Annotation<bool> = Annotation::new("negation");
/// Token marcado como stopword.
pub const STOPWORD: Annotation<bool> = Annotation::new("stopword");
/// Radical (stem) de um token.
pub const STEM: Annotation<String> = Annotation::new("stem");
/// Lema de um token (fornecido por um lematizador externo).
pub const LEMMA: Annotation<String> = Annotation::new("lemma");
/// Entidade nomeada consolidada, no nível do documento.
pub const NAMED_ENTITY: Annotation<NamedEntity> = Annotation::new("named_entity");

/// Multimapa ordenado de anotações.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    values: BTreeMap<&'static str, Vec<Value<AnnotationValue>>>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acrescenta um valor ao fim da lista da chave, sem remover os existentes.
    pub fn add_value<T: AnnotationKind>(&mut self, key: Annotation<T>, value: Value<T>) {
        self.values
            .entry(key.name)
            .or_default()
            .push(value.map(T::into_value));
    }

    pub fn add_values<T: AnnotationKind>(
        &mut self,
        key: Annotation<T>,
        values: impl IntoIterator<Item = Value<T>>,
    ) {
        for value in values {
            self.add_value(key, value);
        }
    }

    /// Substitui toda a lista da chave por um único valor.
    pub fn set_value<T: AnnotationKind>(&mut self, key: Annotation<T>, value: Value<T>) {
        self.values.insert(key.name, vec![value.map(T::into_value)]);
    }

    /// Substitui toda a lista da chave. Uma lista vazia limpa a chave.
    pub fn set_values<T: AnnotationKind>(
        &mut self,
        key: Annotation<T>,
        values: impl IntoIterator<Item = Value<T>>,
    ) {
        let values: Vec<_> = values.into_iter().map(|v| v.map(T::into_value)).collect();
        if values.is_empty() {
            self.values.remove(key.name);
        } else {
            self.values.insert(key.name, values);
        }
    }

    /// Remove todos os valores da chave, retornando quantos foram removidos.
    pub fn remove<T>(&mut self, key: Annotation<T>) -> usize {
        self.values.remove(key.name).map_or(0, |v| v.len())
    }

    /// Primeiro valor da chave.
    pub fn value<T: AnnotationKind>(&self, key: Annotation<T>) -> Option<Value<&T>> {
        self.values(key).next()
    }

    /// Todos os valores da chave, na ordem de inserção.
    pub fn values<'a, T: AnnotationKind + 'a>(
        &'a self,
        key: Annotation<T>,
    ) -> impl Iterator<Item = Value<&'a T>> + 'a {
        self.values
            .get(key.name)
            .into_iter()
            .flatten()
            .filter_map(|v| {
                T::from_value(&v.value).map(|value| Value {
                    value,
                    probability: v.probability,
                })
            })
    }

    /// Valor (sem probabilidade) do primeiro item da chave.
    pub fn annotation<T: AnnotationKind>(&self, key: Annotation<T>) -> Option<&T> {
        self.value(key).map(|v| v.value)
    }

    pub fn contains<T>(&self, key: Annotation<T>) -> bool {
        self.values.contains_key(key.name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_order_and_existing_values() {
        let mut a = Annotations::new();
        a.add_value(NER, Value::with_probability(NerTag::typed("x", "PERSON"), 0.6));
        a.add_value(NER, Value::with_probability(NerTag::typed("y", "ORG"), 0.7));
        let values: Vec<_> = a.values(NER).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value.entity_key(), "PERSON");
        assert_eq!(values[1].value.entity_key(), "ORG");
        assert_eq!(values[1].probability, Some(0.7));
    }

    #[test]
    fn test_set_replaces_and_empty_set_clears() {
        let mut a = Annotations::new();
        a.add_value(STEM, Value::new("a".to_string()));
        a.add_value(STEM, Value::new("b".to_string()));
        a.set_value(STEM, Value::new("c".to_string()));
        assert_eq!(a.values(STEM).count(), 1);
        assert_eq!(a.annotation(STEM).map(String::as_str), Some("c"));

        a.set_values(STEM, Vec::new());
        assert!(!a.contains(STEM));
        assert!(a.value(STEM).is_none());
    }

    #[test]
    fn test_keys_with_same_value_type_are_independent() {
        let mut a = Annotations::new();
        a.set_value(NEGATION, Value::new(true));
        assert!(a.value(STOPWORD).is_none());
        assert_eq!(a.remove(NEGATION), 1);
        assert_eq!(a.remove(NEGATION), 0);
        assert!(a.is_empty());
    }

    #[test]
    fn test_custom_key() {
        const SENTIMENT_LABEL: Annotation<String> = Annotation::new("sentiment_label");
        let mut a = Annotations::new();
        a.add_value(SENTIMENT_LABEL, Value::with_probability("positive".to_string(), 0.9));
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["sentiment_label"]);
        assert_eq!(a.value(SENTIMENT_LABEL).unwrap().probability, Some(0.9));
    }
}
