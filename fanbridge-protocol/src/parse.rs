//! Token Parsers
//!
//! Lines are split on ASCII whitespace. Each parser takes the next token
//! (or `None` when the line ran out) and maps a bad token to the error code
//! the host expects for that position.

use core::str::SplitAsciiWhitespace;

use crate::errors::{ProtocolError, ProtocolResult};

/// Whitespace-separated tokens of one line
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    inner: SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    /// Tokenize `line`
    pub fn new(line: &'a str) -> Self {
        Self { inner: line.split_ascii_whitespace() }
    }

    /// Next token, if any
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    /// Fail with [`ProtocolError::ExtraData`] if anything is left
    pub fn finish(mut self) -> ProtocolResult<()> {
        match self.inner.next() {
            Some(_) => Err(ProtocolError::ExtraData),
            None => Ok(()),
        }
    }
}

/// `F<n>` with `n` in `1..=fans`; returns the zero-based index
pub fn fan(token: Option<&str>, fans: usize) -> ProtocolResult<usize> {
    let rest = token
        .ok_or(ProtocolError::Syntax)?
        .strip_prefix('F')
        .ok_or(ProtocolError::SyntaxFan)?;
    fan_number(rest, fans)
}

/// Plain decimal digits: no sign, not empty
fn is_unsigned(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn fan_number(digits: &str, fans: usize) -> ProtocolResult<usize> {
    if !is_unsigned(digits) || digits.starts_with('0') {
        return Err(ProtocolError::FanNumber);
    }
    match digits.parse::<usize>() {
        Ok(n) if (1..=fans).contains(&n) => Ok(n - 1),
        _ => Err(ProtocolError::FanNumber),
    }
}

fn duty_value(token: &str) -> Option<u8> {
    if !is_unsigned(token) {
        return None;
    }
    token.parse::<u8>().ok().filter(|&v| v <= 100)
}

/// `T:<celsius>`, non-negative
pub fn temp(token: Option<&str>) -> ProtocolResult<i16> {
    let digits = token
        .and_then(|t| t.strip_prefix("T:"))
        .ok_or(ProtocolError::SyntaxTemp)?;
    if !is_unsigned(digits) {
        return Err(ProtocolError::SyntaxTemp);
    }
    digits.parse::<i16>().map_err(|_| ProtocolError::SyntaxTemp)
}

/// `F<n>:<duty>`; returns the zero-based fan index and the duty
pub fn fan_duty(token: Option<&str>, fans: usize) -> ProtocolResult<(usize, u8)> {
    let rest = token
        .ok_or(ProtocolError::SyntaxFanPwm)?
        .strip_prefix('F')
        .ok_or(ProtocolError::SyntaxFan)?;
    let (number, value) = rest.split_once(':').ok_or(ProtocolError::SyntaxFanPwm)?;
    let index = fan_number(number, fans)?;
    let duty = duty_value(value).ok_or(ProtocolError::SyntaxPwmValue)?;
    Ok((index, duty))
}

/// Temperature weight: a finite, non-negative float
pub fn weight(token: Option<&str>) -> ProtocolResult<f32> {
    match token.map(str::parse::<f32>) {
        Some(Ok(w)) if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(ProtocolError::SyntaxTempWeight),
    }
}

/// Filter weight: a float in [0, 1]
pub fn filter_weight(token: Option<&str>) -> ProtocolResult<f32> {
    match token.map(str::parse::<f32>) {
        Some(Ok(w)) if (0.0..=1.0).contains(&w) => Ok(w),
        _ => Err(ProtocolError::SyntaxPwmFilter),
    }
}

/// Mapping table cell: an integer duty in 0..=100
pub fn map_cell(token: Option<&str>) -> ProtocolResult<u8> {
    token.and_then(duty_value).ok_or(ProtocolError::SyntaxPwmTable)
}
