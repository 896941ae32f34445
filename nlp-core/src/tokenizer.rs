//! # Tokenizador e Segmentador de Sentenças
//!
//! Divide o texto bruto em **sentenças** e **tokens**, registrando ambos como
//! spans no [`AnalysedText`](crate::span::AnalysedText). Cada token preserva seu offset original, então
//! nenhum estágio posterior precisa re-tokenizar.
//!
//! ## Esquema de Tokenização
//!
//! - Sequências alfanuméricas formam um token; hífen e apóstrofo internos são
//!   preservados (`"E-Mail"`, `"don't"`).
//! - Abreviações conhecidas mantêm o ponto (`"Dr."`, `"bzw."`, `"Mrs."`).
//! - Números decimais e com separador de milhar ficam juntos (`"1.234"`, `"1,5"`).
//! - Qualquer outro caractere não-espaço vira um token de um caractere.
//!
//! ## Sentenças
//!
//! As fronteiras vêm das regras de segmentação Unicode (UAX #29, crate
//! `unicode-segmentation`). Como essas regras quebram depois de `"Dr. "` seguido
//! de maiúscula, uma sentença que termina em abreviação é unida à seguinte.
//!
//! ```rust
//! use nlp_core::tokenizer::tokenize;
//!
//! let tokens = tokenize("Dr. Müller kam um 10.30 Uhr.");
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Dr.", "Müller", "kam", "um", "10.30", "Uhr", "."]);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use unicode_segmentation::UnicodeSegmentation;

use crate::document::Document;
use crate::error::Result;
use crate::pipeline::{Phase, Processor};

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub text: String,
    /// Byte inicial (inclusivo).
    pub start: usize,
    /// Byte final (exclusivo).
    pub end: usize,
    /// Posição do token na sequência.
    pub index: usize,
}

/// Abreviações (alemão e inglês) que não terminam sentença.
const ABBREVIATIONS: &[&str] = &[
    // de
    "Dr", "Prof", "Hr", "Hrn", "Fr", "Nr", "Str", "bzw", "ca", "usw", "vgl", "evtl", "ggf",
    "inkl", "zzgl", "Mio", "Mrd", "Abs", "Bd", "geb", "gest", "Tel", "St", "etc",
    // en
    "Mr", "Mrs", "Ms", "Jr", "Sr", "Inc", "Ltd", "Corp", "vs", "No", "Jan", "Feb", "Aug",
    "Sept", "Oct", "Nov", "Dec", "approx", "dept",
];

pub fn is_abbreviation(word: &str) -> bool {
    ABBREVIATIONS.contains(&word)
}

/// Tokeniza o texto inteiro.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(byte_pos, ch)) in chars.iter().enumerate() {
        let next = chars.get(i + 1).map(|(_, c)| *c);
        let next_is_num = next.is_some_and(char::is_numeric);
        let current_is_num = !current_text.is_empty() && current_text.chars().all(|c| c.is_numeric() || c == '.' || c == ',');

        if ch.is_alphanumeric() || (ch == '-' && !current_text.is_empty() && next.is_some_and(char::is_alphanumeric)) {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if (ch == '.' || ch == ',') && current_is_num && next_is_num {
            current_text.push(ch);
        } else if ch == '.' && is_abbreviation(&current_text) {
            current_text.push('.');
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos + 1);
        } else if (ch == '\'' || ch == '\u{2019}') && !current_text.is_empty() && next.is_some_and(char::is_alphabetic) {
            current_text.push(ch);
        } else if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
        } else {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
            push_token(&mut tokens, ch.to_string(), byte_pos, byte_pos + ch.len_utf8());
        }
    }
    flush_token(&mut tokens, &mut current_text, current_start, text.len());

    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        tokens.push(Token {
            text: std::mem::take(text),
            start,
            end,
            index: 0,
        });
    }
}

fn push_token(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    tokens.push(Token {
        text,
        start,
        end,
        index: 0,
    });
}

/// Fronteiras de sentença `[start, end)`, sem espaços nas bordas.
pub fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let mut sentences: Vec<(usize, usize)> = Vec::new();
    let mut merge_next = false;

    for (offset, segment) in text.split_sentence_bound_indices() {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        let start = offset + (segment.len() - segment.trim_start().len());
        let end = start + trimmed.len();

        match sentences.last_mut() {
            Some(last) if merge_next => last.1 = end,
            _ => sentences.push((start, end)),
        }
        merge_next = ends_with_abbreviation(trimmed);
    }
    sentences
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let Some(body) = sentence.strip_suffix('.') else {
        return false;
    };
    let last_word = body
        .rsplit(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default();
    is_abbreviation(last_word)
}

/// Estágio que cria sentenças e tokens.
///
/// Se o documento já tiver tokens (texto pré-tokenizado), nada é feito. Sentenças
/// só são criadas quando o documento ainda não tem nenhuma.
#[derive(Debug, Clone, Default)]
pub struct TokenizerProcessor;

impl Processor for TokenizerProcessor {
    fn name(&self) -> &str {
        "tokenizer"
    }

    fn phase(&self) -> Phase {
        Phase::Tokenize
    }

    fn process(&self, doc: &mut Document) -> Result<()> {
        let Some(at) = doc.analysed_text.as_mut() else {
            debug!("documento sem texto analisado; tokenização ignorada");
            return Ok(());
        };
        if at.has_tokens() {
            trace!("documento já tokenizado");
            return Ok(());
        }

        if at.sentences().next().is_none() {
            for (start, end) in split_sentences(at.text()) {
                at.add_sentence(start, end)?;
            }
        }
        let tokens = tokenize(at.text());
        for token in &tokens {
            at.add_token(token.start, token.end)?;
        }
        debug!(tokens = tokens.len(), "texto tokenizado");
        Ok(())
    }
}
