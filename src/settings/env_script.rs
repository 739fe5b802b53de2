//! Reads variable assignments out of an installation env script.
//!
//! The script is parsed with brush-parser so that quoting, comments and
//! `export` forms are handled the way a shell would. Only plain
//! assignments are evaluated; every other command is skipped.

use brush_parser::ast;

/// Errors from reading an env script.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EnvScriptError {
    #[error("failed to read env script {path}: {source}")]
    #[diagnostic(code(env_script::read))]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("invalid shell syntax: {0}")]
    #[diagnostic(code(env_script::syntax))]
    Syntax(String),

    #[error("line {line}: {name} uses {construct}, which is not evaluated at install time")]
    #[diagnostic(
        code(env_script::unsupported),
        help("assign a literal value or a $VARIABLE reference instead")
    )]
    Unsupported {
        line: usize,
        name: String,
        construct: &'static str,
    },

    #[error("line {line}: unterminated quote in value of {name}")]
    #[diagnostic(code(env_script::quote))]
    UnterminatedQuote { line: usize, name: String },
}

/// One `NAME=value` assignment found in the script, already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub name: String,
    pub value: String,
}

/// Builtins whose arguments are assignments.
const DECLARATION_BUILTINS: &[&str] = &["export", "readonly", "declare", "typeset"];

/// Parse `source` and evaluate its assignments in order.
///
/// `$NAME` and `${NAME}` resolve against earlier assignments first, then
/// `lookup`. Unset names expand to the empty string, as in a shell.
pub(crate) fn evaluate(
    source: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<Assignment>, EnvScriptError> {
    if source.trim().is_empty() {
        return Ok(vec![]);
    }

    let mut parser = brush_parser::Parser::builder()
        .reader(std::io::Cursor::new(source.to_string()))
        .build();

    let program = parser
        .parse_program()
        .map_err(|e| EnvScriptError::Syntax(e.to_string()))?;

    let mut raw = Vec::new();
    visit_program(&program, &mut raw);

    let mut lines = LineFinder { source, cursor: 0 };
    let mut assignments: Vec<Assignment> = Vec::new();
    for text in raw {
        let Some((name, value)) = text.split_once('=') else {
            continue;
        };
        if !is_identifier(name) {
            log::debug!("skipping non-variable assignment '{text}'");
            continue;
        }
        let line = lines.locate(&text);
        let value = expand(value, name, line, &|key: &str| {
            assignments
                .iter()
                .rev()
                .find(|a| a.name == key)
                .map(|a| a.value.clone())
                .or_else(|| lookup(key))
        })?;
        log::trace!("env script: {name}={value}");
        assignments.push(Assignment {
            name: name.to_string(),
            value,
        });
    }
    Ok(assignments)
}

fn visit_program(program: &ast::Program, out: &mut Vec<String>) {
    for complete_command in &program.complete_commands {
        for item in &complete_command.0 {
            visit_and_or_list(&item.0, out);
        }
    }
}

fn visit_and_or_list(list: &ast::AndOrList, out: &mut Vec<String>) {
    visit_pipeline(&list.first, out);
    for and_or in &list.additional {
        match and_or {
            ast::AndOr::And(pipeline) | ast::AndOr::Or(pipeline) => visit_pipeline(pipeline, out),
        }
    }
}

fn visit_pipeline(pipeline: &ast::Pipeline, out: &mut Vec<String>) {
    for command in &pipeline.seq {
        match command {
            ast::Command::Simple(simple) => visit_simple(simple, out),
            _ => log::debug!("skipping compound command in env script"),
        }
    }
}

fn visit_simple(simple: &ast::SimpleCommand, out: &mut Vec<String>) {
    let program = simple.word_or_name.as_ref().map(|w| w.flatten());

    match program.as_deref() {
        // Bare `NAME=value` lines: the assignments live in the prefix.
        None => {
            if let Some(prefix) = &simple.prefix {
                collect_assignments(&prefix.0, out);
            }
        }
        Some(builtin) if DECLARATION_BUILTINS.contains(&builtin) => {
            if let Some(suffix) = &simple.suffix {
                collect_assignments(&suffix.0, out);
            }
        }
        // `FOO=bar cmd` only scopes FOO to `cmd`, so nothing leaks.
        Some(other) => log::debug!("skipping command '{other}' in env script"),
    }
}

fn collect_assignments(items: &[ast::CommandPrefixOrSuffixItem], out: &mut Vec<String>) {
    for item in items {
        match item {
            ast::CommandPrefixOrSuffixItem::AssignmentWord(_, word) => out.push(word.flatten()),
            // Declaration builtins may hand arguments through as plain words.
            ast::CommandPrefixOrSuffixItem::Word(word) => {
                let text = word.flatten();
                if text.contains('=') && !text.starts_with('-') {
                    out.push(text);
                }
            }
            _ => {}
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Maps assignments back to source lines. Assignments come out of the AST
/// in source order, so each search starts after the previous match.
struct LineFinder<'a> {
    source: &'a str,
    cursor: usize,
}

impl LineFinder<'_> {
    /// 1-based line of the next uncommented occurrence of `needle`.
    fn locate(&mut self, needle: &str) -> usize {
        let mut from = self.cursor;
        while let Some(found) = self.source[from..].find(needle) {
            let at = from + found;
            from = at + needle.len();
            let line_start = self.source[..at].rfind('\n').map_or(0, |i| i + 1);
            if !is_commented(&self.source[line_start..at]) {
                self.cursor = from;
                return self.line_at(at);
            }
        }
        self.line_at(self.cursor)
    }

    fn line_at(&self, offset: usize) -> usize {
        self.source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
    }
}

/// Whether text following `prefix` on the same line sits inside a comment.
fn is_commented(prefix: &str) -> bool {
    prefix.trim_start().starts_with('#') || prefix.contains(" #") || prefix.contains("\t#")
}

/// Strip shell quoting from `raw` and expand variable references.
fn expand(
    raw: &str,
    name: &str,
    line: usize,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, EnvScriptError> {
    let unsupported = |construct| EnvScriptError::Unsupported {
        line,
        name: name.to_string(),
        construct,
    };
    let unterminated = || EnvScriptError::UnterminatedQuote {
        line,
        name: name.to_string(),
    };

    let mut out = String::new();
    let mut chars = raw.chars().peekable();
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(literal) => out.push(literal),
                    None => return Err(unterminated()),
                }
            },
            '"' => in_double = !in_double,
            // Inside double quotes a backslash only escapes `$`, `` ` ``, `"`
            // and `\`; before anything else it stays literal.
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(escaped) if !in_double || matches!(escaped, '$' | '`' | '"' | '\\') => {
                    out.push(escaped)
                }
                Some(literal) => {
                    out.push('\\');
                    out.push(literal);
                }
                None => out.push('\\'),
            },
            '`' => return Err(unsupported("command substitution")),
            '$' => match chars.peek().copied() {
                Some('(') => return Err(unsupported("command substitution")),
                Some('{') => {
                    chars.next();
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(k) if k.is_ascii_alphanumeric() || k == '_' => key.push(k),
                            Some(_) => return Err(unsupported("parameter expansion operators")),
                            None => return Err(unterminated()),
                        }
                    }
                    out.push_str(&resolve(&key, lookup));
                }
                Some(k) if k.is_ascii_alphabetic() || k == '_' => {
                    let mut key = String::new();
                    while let Some(&k) = chars.peek() {
                        if !(k.is_ascii_alphanumeric() || k == '_') {
                            break;
                        }
                        key.push(k);
                        chars.next();
                    }
                    out.push_str(&resolve(&key, lookup));
                }
                _ => out.push('$'),
            },
            other => out.push(other),
        }
    }

    if in_double {
        return Err(unterminated());
    }
    Ok(out)
}

fn resolve(key: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    lookup(key).unwrap_or_else(|| {
        log::warn!("${key} is not set; expanding to an empty string");
        String::new()
    })
}
