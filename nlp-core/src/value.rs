//! # Valores anotados e combinação de probabilidades
//!
//! Toda anotação guardada em um span é um [`Value`]: o valor em si mais uma
//! probabilidade opcional. `None` representa a probabilidade **desconhecida**
//! (o detector não informou confiança). Uma probabilidade conhecida está sempre
//! em `(0, 1]`; zero, negativos e `NaN` são guardados como desconhecida.
//!
//! ## Combinação saturante
//!
//! Quando várias evidências confirmam a mesma entidade, as probabilidades são
//! combinadas par a par por:
//!
//! $$ p = \frac{p_1 + p_2}{1 + p_1 \cdot p_2} $$
//!
//! O resultado fica em `[max(p1, p2), 1]` e se aproxima de 1 conforme mais
//! evidência é acumulada. A operação é comutativa, então a ordem em que as
//! menções são fundidas não altera o resultado (a menos de erro de ponto flutuante).

use serde::{Deserialize, Serialize};

/// Probabilidade assumida para um lado desconhecido quando o outro é conhecido.
pub const DEFAULT_PROBABILITY: f64 = 0.8;

/// Um valor de anotação com sua probabilidade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value<T> {
    pub value: T,
    /// `None` = desconhecida.
    pub probability: Option<f64>,
}

impl<T> Value<T> {
    /// Valor sem probabilidade conhecida.
    pub fn new(value: T) -> Self {
        Self {
            value,
            probability: None,
        }
    }

    /// Valor com probabilidade. Acima de 1 é limitado a 1; zero, negativos e `NaN`
    /// viram desconhecida.
    pub fn with_probability(value: T, probability: f64) -> Self {
        Self {
            value,
            probability: clamp_probability(probability),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        Value {
            value: f(self.value),
            probability: self.probability,
        }
    }

    pub fn as_ref(&self) -> Value<&T> {
        Value {
            value: &self.value,
            probability: self.probability,
        }
    }
}

fn clamp_probability(p: f64) -> Option<f64> {
    if p > 0.0 {
        Some(p.min(1.0))
    } else {
        None
    }
}

/// Combina duas probabilidades (cada uma possivelmente desconhecida).
///
/// - ambas desconhecidas → desconhecida
/// - uma desconhecida → substituída por [`DEFAULT_PROBABILITY`]
/// - caso contrário → `(p1 + p2) / (1 + p1·p2)`
///
/// Um resultado zero (as duas entradas em `0.0`) vira desconhecida.
pub fn combine_probabilities(p1: Option<f64>, p2: Option<f64>) -> Option<f64> {
    match (p1, p2) {
        (None, None) => None,
        _ => {
            let a = p1.unwrap_or(DEFAULT_PROBABILITY);
            let b = p2.unwrap_or(DEFAULT_PROBABILITY);
            clamp_probability((a + b) / (1.0 + a * b))
        }
    }
}

/// Dobra uma sequência de probabilidades com [`combine_probabilities`].
pub fn combine_all(probabilities: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let mut iter = probabilities.into_iter();
    let first = iter.next()?;
    iter.fold(first, combine_probabilities)
}
