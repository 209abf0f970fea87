// src/parse.rs

//! Minimal command-line parser.
//!
//! Understands words separated by whitespace, `|` between stages, `< file`
//! on the first stage, `> file` on the last stage and a trailing `&`. There
//! is no quoting, globbing or variable expansion.

use std::path::PathBuf;

use crate::errors::{Result, ShellError};
use crate::types::{Pipeline, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Pipe,
    In,
    Out,
    Background,
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        let op = match ch {
            '|' => Some(Token::Pipe),
            '<' => Some(Token::In),
            '>' => Some(Token::Out),
            '&' => Some(Token::Background),
            _ => None,
        };

        if op.is_some() || ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&line[start..idx]));
            }
            tokens.extend(op);
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&line[start..]));
    }

    tokens
}

/// Parse one input line. A blank line yields `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>> {
    let mut tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut pipeline = Pipeline::default();
    if tokens.last() == Some(&Token::Background) {
        tokens.pop();
        pipeline.background = true;
    }

    let groups: Vec<&[Token<'_>]> = tokens.split(|t| *t == Token::Pipe).collect();
    let last = groups.len() - 1;

    for (i, group) in groups.iter().enumerate() {
        let mut argv = Vec::new();
        let mut iter = group.iter();

        while let Some(token) = iter.next() {
            match token {
                Token::Word(word) => argv.push(word.to_string()),
                Token::In if i == 0 && pipeline.input.is_none() => {
                    pipeline.input = Some(redirect_target(iter.next())?);
                }
                Token::Out if i == last && pipeline.output.is_none() => {
                    pipeline.output = Some(redirect_target(iter.next())?);
                }
                _ => return Err(ShellError::InvalidSyntax),
            }
        }

        if argv.is_empty() {
            return Err(ShellError::InvalidSyntax);
        }
        pipeline.stages.push(Stage { argv });
    }

    Ok(Some(pipeline))
}

fn redirect_target(token: Option<&Token<'_>>) -> Result<PathBuf> {
    match token {
        Some(Token::Word(path)) => Ok(PathBuf::from(path)),
        _ => Err(ShellError::InvalidSyntax),
    }
}
