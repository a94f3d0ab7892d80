//! Разбор выражений предикатов
//!
//! Выражение имеет форму `lhs [predicate [quantifier]] [rhs]`.
//! Разбор выполняется одним проходом слева направо: первое совпадение
//! символьного оператора или словесной фразы делит строку на части.
//! Просмотр вперед ограничен тремя словами, возврата нет.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Символьные операторы в порядке убывания длины
const SYMBOL_OPERATORS: &[(&str, Predicate)] = &[
    ("!~*", Predicate::NotMatchCi),
    ("<=", Predicate::Le),
    (">=", Predicate::Ge),
    ("<>", Predicate::Ne),
    ("!=", Predicate::Ne),
    ("!~", Predicate::NotMatch),
    ("~*", Predicate::MatchCi),
    ("<", Predicate::Lt),
    (">", Predicate::Gt),
    ("=", Predicate::Eq),
    ("~", Predicate::Match),
];

/// Предикат сравнения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Match,
    MatchCi,
    NotMatch,
    NotMatchCi,
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
    IsUnknown,
    IsNotUnknown,
    Like,
    NotLike,
    ILike,
    NotILike,
    Similar,
    NotSimilar,
    In,
    NotIn,
    Between,
    NotBetween,
    BetweenSym,
    NotBetweenSym,
}

impl Predicate {
    /// Унарный предикат не принимает правый операнд
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Self::IsNull
                | Self::IsNotNull
                | Self::IsTrue
                | Self::IsNotTrue
                | Self::IsFalse
                | Self::IsNotFalse
                | Self::IsUnknown
                | Self::IsNotUnknown
        )
    }

    /// Проверка на NULL
    pub fn is_null_check(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Унарная проверка булева значения
    pub fn is_boolean_check(&self) -> bool {
        self.is_unary() && !self.is_null_check()
    }

    /// Интервальный предикат, требующий два операнда-границы
    pub fn is_between(&self) -> bool {
        matches!(
            self,
            Self::Between | Self::NotBetween | Self::BetweenSym | Self::NotBetweenSym
        )
    }

    /// Симметричный интервальный предикат
    pub fn is_symmetric_between(&self) -> bool {
        matches!(self, Self::BetweenSym | Self::NotBetweenSym)
    }

    /// Предикат вхождения, требующий последовательность справа
    pub fn is_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Имя оператора каталога для проверки сравнимости типов
    ///
    /// Унарные предикаты не сверяются с каталогом операторов.
    pub fn operator_name(&self) -> Option<&'static str> {
        match self {
            Self::Eq | Self::In | Self::NotIn => Some("="),
            Self::Ne => Some("<>"),
            Self::Lt => Some("<"),
            Self::Gt => Some(">"),
            Self::Le => Some("<="),
            Self::Ge => Some(">="),
            Self::Match | Self::Similar => Some("~"),
            Self::MatchCi => Some("~*"),
            Self::NotMatch | Self::NotSimilar => Some("!~"),
            Self::NotMatchCi => Some("!~*"),
            Self::Like => Some("~~"),
            Self::NotLike => Some("!~~"),
            Self::ILike => Some("~~*"),
            Self::NotILike => Some("!~~*"),
            Self::Between | Self::NotBetween | Self::BetweenSym | Self::NotBetweenSym => {
                Some("<=")
            }
            _ => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Match => "~",
            Self::MatchCi => "~*",
            Self::NotMatch => "!~",
            Self::NotMatchCi => "!~*",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::IsTrue => "is true",
            Self::IsNotTrue => "is not true",
            Self::IsFalse => "is false",
            Self::IsNotFalse => "is not false",
            Self::IsUnknown => "is unknown",
            Self::IsNotUnknown => "is not unknown",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::NotILike => "not ilike",
            Self::Similar => "similar",
            Self::NotSimilar => "not similar",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Between => "between",
            Self::NotBetween => "not between",
            Self::BetweenSym => "betweensym",
            Self::NotBetweenSym => "not betweensym",
        };
        write!(f, "{}", text)
    }
}

/// Квантификатор предиката
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    Any,
    Some,
    All,
}

impl Quantifier {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "any" => Some(Self::Any),
            "some" => Some(Self::Some),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Any => "any",
            Self::Some => "some",
            Self::All => "all",
        };
        write!(f, "{}", text)
    }
}

/// Результат разбора выражения предиката
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPredicate {
    /// Левый операнд (вся строка, если оператор не найден)
    pub lhs: String,
    /// Найденный предикат
    pub predicate: Option<Predicate>,
    /// Квантификатор после оператора
    pub quantifier: Option<Quantifier>,
    /// Правый операнд
    pub rhs: String,
}

/// Одно слово и его границы в исходной строке
struct Word<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

/// Читает слово, начинающееся в позиции `start`
fn read_word(input: &str, start: usize) -> Option<Word<'_>> {
    let bytes = input.as_bytes();
    if start >= bytes.len() {
        return None;
    }
    let first = bytes[start] as char;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() {
        let c = bytes[end] as char;
        if c.is_ascii_alphanumeric() || c == '_' {
            end += 1;
        } else {
            break;
        }
    }
    Some(Word {
        text: &input[start..end],
        start,
        end,
    })
}

/// Читает следующее слово после позиции `from`, пропуская пробелы
fn next_word(input: &str, from: usize) -> Option<Word<'_>> {
    let mut pos = from;
    let bytes = input.as_bytes();
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    read_word(input, pos)
}

/// Словесный оператор из одного слова
fn single_word_predicate(word: &str) -> Option<Predicate> {
    match word.to_ascii_lowercase().as_str() {
        "isnull" => Some(Predicate::IsNull),
        "notnull" => Some(Predicate::IsNotNull),
        "like" => Some(Predicate::Like),
        "ilike" => Some(Predicate::ILike),
        "similar" => Some(Predicate::Similar),
        "in" => Some(Predicate::In),
        "between" => Some(Predicate::Between),
        "betweensym" => Some(Predicate::BetweenSym),
        _ => None,
    }
}

/// Отрицательная форма словесного оператора
fn negated_word_predicate(word: &str) -> Option<Predicate> {
    match word.to_ascii_lowercase().as_str() {
        "like" => Some(Predicate::NotLike),
        "ilike" => Some(Predicate::NotILike),
        "similar" => Some(Predicate::NotSimilar),
        "in" => Some(Predicate::NotIn),
        "between" => Some(Predicate::NotBetween),
        "betweensym" => Some(Predicate::NotBetweenSym),
        _ => None,
    }
}

/// Завершение фразы `is [not] ...`
fn is_phrase_predicate(word: &str, negated: bool) -> Option<Predicate> {
    match (word.to_ascii_lowercase().as_str(), negated) {
        ("null", false) => Some(Predicate::IsNull),
        ("null", true) => Some(Predicate::IsNotNull),
        ("true", false) => Some(Predicate::IsTrue),
        ("true", true) => Some(Predicate::IsNotTrue),
        ("false", false) => Some(Predicate::IsFalse),
        ("false", true) => Some(Predicate::IsNotFalse),
        ("unknown", false) => Some(Predicate::IsUnknown),
        ("unknown", true) => Some(Predicate::IsNotUnknown),
        _ => None,
    }
}

/// Разбирает выражение предиката
pub fn parse_predicate(input: &str) -> Result<ParsedPredicate> {
    let trimmed = input.trim();
    let mut pos = 0;
    let bytes = trimmed.as_bytes();
    let mut prev_is_word = false;

    while pos < bytes.len() {
        // Позиции внутри многобайтовых символов пропускаются
        if !trimmed.is_char_boundary(pos) {
            pos += 1;
            continue;
        }

        // Символьные операторы распознаются в любой позиции
        for (symbol, predicate) in SYMBOL_OPERATORS {
            if trimmed[pos..].starts_with(symbol) {
                return finish(trimmed, pos, pos + symbol.len(), *predicate);
            }
        }

        // Словесные операторы распознаются только на границе слова
        if !prev_is_word {
            if let Some(word) = read_word(trimmed, pos) {
                let lower = word.text.to_ascii_lowercase();
                match lower.as_str() {
                    "is" => {
                        let second = next_word(trimmed, word.end).ok_or_else(|| {
                            malformed(trimmed, "dangling 'is'")
                        })?;
                        if second.text.eq_ignore_ascii_case("not") {
                            let third = next_word(trimmed, second.end).ok_or_else(|| {
                                malformed(trimmed, "dangling 'is not'")
                            })?;
                            let predicate =
                                is_phrase_predicate(third.text, true).ok_or_else(|| {
                                    malformed(trimmed, "bad 'is not' completion")
                                })?;
                            return finish(trimmed, word.start, third.end, predicate);
                        }
                        let predicate =
                            is_phrase_predicate(second.text, false).ok_or_else(|| {
                                malformed(trimmed, "bad 'is' completion")
                            })?;
                        return finish(trimmed, word.start, second.end, predicate);
                    }
                    "not" => {
                        let second = next_word(trimmed, word.end).ok_or_else(|| {
                            malformed(trimmed, "dangling 'not'")
                        })?;
                        let predicate =
                            negated_word_predicate(second.text).ok_or_else(|| {
                                malformed(trimmed, "bad 'not' completion")
                            })?;
                        return finish(trimmed, word.start, second.end, predicate);
                    }
                    _ => {
                        if let Some(predicate) = single_word_predicate(&lower) {
                            // Слово-оператор должно быть отделено от левого операнда
                            if word.start > 0 {
                                return finish(trimmed, word.start, word.end, predicate);
                            }
                        }
                        pos = word.end;
                        prev_is_word = true;
                        continue;
                    }
                }
            }
        }

        let c = bytes[pos] as char;
        prev_is_word = c.is_ascii_alphanumeric() || c == '_';
        pos += 1;
    }

    // Оператор не найден: вся строка является левым операндом
    Ok(ParsedPredicate {
        lhs: trimmed.to_string(),
        predicate: None,
        quantifier: None,
        rhs: String::new(),
    })
}

/// Завершает разбор после найденного оператора
fn finish(
    input: &str,
    op_start: usize,
    op_end: usize,
    predicate: Predicate,
) -> Result<ParsedPredicate> {
    let lhs = input[..op_start].trim().to_string();
    let mut rest = input[op_end..].trim_start();

    // Квантификатор: слово any/some/all, за которым следует пробел
    // или конец выражения (операндом тогда служит значение поля)
    let mut quantifier = None;
    if let Some(word) = read_word(rest, 0) {
        if let Some(q) = Quantifier::from_word(word.text) {
            let after = &rest[word.end..];
            if after.is_empty() || after.starts_with(|c: char| c.is_whitespace()) {
                quantifier = Some(q);
                rest = after.trim_start();
            }
        }
    }

    let rhs = rest.trim().to_string();

    if predicate.is_unary() && !rhs.is_empty() {
        return Err(malformed(input, "unary predicate takes no right-hand side"));
    }
    if predicate.is_unary() && quantifier.is_some() {
        return Err(malformed(input, "unary predicate takes no quantifier"));
    }

    Ok(ParsedPredicate {
        lhs,
        predicate: Some(predicate),
        quantifier,
        rhs,
    })
}

fn malformed(input: &str, reason: &str) -> Error {
    Error::grammar(format!("bad predicate expression: {}", reason)).with_annotation(input)
}
