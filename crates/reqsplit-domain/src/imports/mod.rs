//! Static discovery of the top-level modules a Python source file imports.
//!
//! Nothing is executed. Source text is lexed into logical lines (see
//! [`lexer`]) and each simple statement is checked for `import ...` or
//! `from ... import ...`. Relative imports name local modules and never
//! contribute.

mod lexer;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::names::NameNormalizer;

/// Statement keywords that may carry a simple statement after their `:` on
/// the same line (`try: import ujson as json`).
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "with", "for", "while", "def", "class",
    "async",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanErrorKind {
    UnterminatedString,
    UnbalancedBracket,
    MissingModule,
    InvalidModule,
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ScanErrorKind::UnterminatedString => "unterminated string literal",
            ScanErrorKind::UnbalancedBracket => "unbalanced bracket",
            ScanErrorKind::MissingModule => "import statement without a module name",
            ScanErrorKind::InvalidModule => "import statement with an invalid module name",
        };
        f.write_str(text)
    }
}

/// A file-level syntax problem. The caller skips the file.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ScanError {
    pub line: usize,
    pub kind: ScanErrorKind,
}

impl ScanError {
    pub(crate) fn new(line: usize, kind: ScanErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Distinct top-level module names referenced by a source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSet {
    names: BTreeSet<String>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the top-level component of `module`.
    pub fn insert(&mut self, module: &str) -> bool {
        let top = module.split('.').next().unwrap_or(module).trim();
        if top.is_empty() {
            return false;
        }
        self.names.insert(top.to_string())
    }

    pub fn merge(&mut self, other: ImportSet) {
        self.names.extend(other.names);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The import names mapped through `normalizer`; the classification
    /// oracle used by the partitioner.
    pub fn normalized(&self, normalizer: &NameNormalizer) -> BTreeSet<String> {
        self.names
            .iter()
            .map(|name| normalizer.normalize(name))
            .collect()
    }

    /// One module name per line, sorted.
    pub fn to_listing(&self) -> String {
        let mut out = String::new();
        for name in &self.names {
            out.push_str(name);
            out.push('\n');
        }
        out
    }
}

impl<S: AsRef<str>> FromIterator<S> for ImportSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = ImportSet::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Collects the absolute imports of one Python source file.
pub fn scan_source(source: &str) -> Result<ImportSet, ScanError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut imports = ImportSet::new();
    for logical in lexer::logical_lines(source)? {
        for statement in logical.text.split(';') {
            scan_statement(statement, logical.line, &mut imports)?;
        }
    }
    Ok(imports)
}

fn scan_statement(statement: &str, line: usize, imports: &mut ImportSet) -> Result<(), ScanError> {
    let statement = statement.trim();
    match leading_word(statement) {
        "import" => scan_import(&statement["import".len()..], line, imports),
        "from" => scan_from(&statement["from".len()..], line, imports),
        word if COMPOUND_KEYWORDS.contains(&word) => match header_body(statement) {
            Some(body) => scan_statement(body, line, imports),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

/// `import a.b as c, d`
fn scan_import(rest: &str, line: usize, imports: &mut ImportSet) -> Result<(), ScanError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(ScanError::new(line, ScanErrorKind::MissingModule));
    }
    for item in rest.split(',') {
        let parts: Vec<&str> = item.split_whitespace().collect();
        let module = match parts.as_slice() {
            [module] => *module,
            [module, "as", alias] if is_identifier(alias) => *module,
            [] => return Err(ScanError::new(line, ScanErrorKind::MissingModule)),
            _ => return Err(ScanError::new(line, ScanErrorKind::InvalidModule)),
        };
        if !is_dotted_name(module) {
            return Err(ScanError::new(line, ScanErrorKind::InvalidModule));
        }
        imports.insert(module);
    }
    Ok(())
}

/// `from a.b import x`, `from . import x`, `from .import x`,
/// `from __future__ import y`
fn scan_from(rest: &str, line: usize, imports: &mut ImportSet) -> Result<(), ScanError> {
    let rest = rest.trim_start();
    let unprefixed = rest.trim_start_matches(|ch: char| ch == '.' || ch.is_whitespace());
    let relative = unprefixed.len() != rest.len();

    let Some(keyword) = find_keyword(unprefixed, "import") else {
        return Err(ScanError::new(line, ScanErrorKind::InvalidModule));
    };
    if unprefixed[keyword + "import".len()..].trim().is_empty() {
        return Err(ScanError::new(line, ScanErrorKind::MissingModule));
    }
    let module = join_dotted(&unprefixed[..keyword])
        .ok_or_else(|| ScanError::new(line, ScanErrorKind::InvalidModule))?;

    if module.is_empty() {
        return if relative {
            Ok(())
        } else {
            Err(ScanError::new(line, ScanErrorKind::MissingModule))
        };
    }
    if !is_dotted_name(&module) {
        return Err(ScanError::new(line, ScanErrorKind::InvalidModule));
    }
    if !relative && module != "__future__" {
        imports.insert(&module);
    }
    Ok(())
}

/// Byte offset of `word` standing on its own, not as part of a longer name.
fn find_keyword(text: &str, word: &str) -> Option<usize> {
    let is_name_char = |ch: char| ch.is_alphanumeric() || ch == '_';
    text.match_indices(word).map(|(idx, _)| idx).find(|&idx| {
        let before = text[..idx].chars().next_back();
        let after = text[idx + word.len()..].chars().next();
        !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char)
    })
}

/// Joins `a . b` into `a.b`. Whitespace is only allowed next to a dot.
fn join_dotted(text: &str) -> Option<String> {
    let mut joined = String::new();
    for piece in text.split_whitespace() {
        if !joined.is_empty() && !joined.ends_with('.') && !piece.starts_with('.') {
            return None;
        }
        joined.push_str(piece);
    }
    Some(joined)
}

fn leading_word(statement: &str) -> &str {
    let end = statement
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(statement.len());
    &statement[..end]
}

/// Text after the colon that ends a compound statement header, when a simple
/// statement follows on the same line.
fn header_body(statement: &str) -> Option<&str> {
    let mut depth: usize = 0;
    let mut chars = statement.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                if matches!(chars.peek(), Some((_, '='))) {
                    continue;
                }
                let body = statement[idx + 1..].trim();
                return (!body.is_empty()).then_some(body);
            }
            _ => {}
        }
    }
    None
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

fn is_dotted_name(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        scan_source(source)
            .expect("scan")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn collects_plain_and_aliased_imports() {
        let found = names("import os\nimport numpy as np, cv2\nimport xml.etree.ElementTree as ET\n");
        assert_eq!(found, vec!["cv2", "numpy", "os", "xml"]);
    }

    #[test]
    fn collects_from_imports_and_skips_relative() {
        let found = names(
            "from requests.exceptions import RequestException\nfrom . import settings\nfrom ..base import logger\nfrom .cli_parser import Parser\n",
        );
        assert_eq!(found, vec!["requests"]);
    }

    #[test]
    fn relative_import_without_space_keeps_file_imports() {
        assert_eq!(names("import numpy\nfrom .import helpers\n"), vec!["numpy"]);
        assert_eq!(names("from ..import base\nfrom . . pkg import x\nimport os\n"), vec!["os"]);
    }

    #[test]
    fn crlf_files_with_continued_strings_scan() {
        assert_eq!(names("import numpy\r\nx = 'a\\\r\nb'\r\n"), vec!["numpy"]);
    }

    #[test]
    fn spaced_dotted_module_is_joined() {
        assert_eq!(names("from xml . etree import ElementTree\n"), vec!["xml"]);
        assert_eq!(names("from important import x\n"), vec!["important"]);
    }

    #[test]
    fn future_imports_do_not_count() {
        assert!(names("from __future__ import annotations\n").is_empty());
    }

    #[test]
    fn parenthesized_from_imports_span_lines() {
        let found = names("from typing import (\n    Any,\n    Iterator,\n)\n");
        assert_eq!(found, vec!["typing"]);
    }

    #[test]
    fn imports_in_blocks_and_after_semicolons() {
        let source = "\
def load():
    import json
    try: import ujson as fast
    except ImportError: fast = None
    x = 1; import re
if TYPE_CHECKING: from logging import Logger
";
        assert_eq!(names(source), vec!["json", "logging", "re", "ujson"]);
    }

    #[test]
    fn imports_inside_strings_and_comments_are_ignored() {
        let source = "\
\"\"\"Module docstring.

import secret_module
\"\"\"
# import commented
text = 'from fake import thing'
import real
";
        assert_eq!(names(source), vec!["real"]);
    }

    #[test]
    fn identifiers_starting_with_keywords_are_not_imports() {
        assert!(names("imported = 1\nfromage = 'brie'\nimport_path = None\n").is_empty());
    }

    #[test]
    fn walrus_in_header_does_not_split_statement() {
        assert!(names("if (n := 10) > 5: pass\n").is_empty());
    }

    #[test]
    fn missing_module_is_a_scan_error() {
        let err = scan_source("import os\nimport\n").unwrap_err();
        assert_eq!(err, ScanError::new(2, ScanErrorKind::MissingModule));
    }

    #[test]
    fn invalid_module_is_a_scan_error() {
        let err = scan_source("import 3d_tools\n").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidModule);
        let err = scan_source("from numpy array\n").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidModule);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert_eq!(names("\u{feff}import numpy\n"), vec!["numpy"]);
    }

    #[test]
    fn import_set_collapses_duplicates_to_top_level() {
        let set: ImportSet = ["requests.adapters", "requests", "numpy.linalg"]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("requests"));
        assert_eq!(set.to_listing(), "numpy\nrequests\n");
    }

    #[test]
    fn normalized_set_applies_aliases() {
        let set: ImportSet = ["cv2", "some_package"].into_iter().collect();
        let normalized = set.normalized(&NameNormalizer::default());
        assert!(normalized.contains("opencv-python-headless"));
        assert!(normalized.contains("some-package"));
    }
}
