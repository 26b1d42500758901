//! Document name classification
//!
//! Maps a free-text document name to a typed descriptor via an ordered,
//! data-driven rule list (most specific first, first match wins). Adding a
//! new legal-document type means adding one rule, not new branches.
//! Classification is total: any string that matches nothing lands in the
//! `Other`/`General` bucket, never an error.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Kind of legal document inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentType {
    /// Resolução
    Resolution,
    /// Portaria
    Ordinance,
    /// Regimento / instrução normativa
    Bylaw,
    Other,
}

impl DocumentType {
    /// Folder segment used in the remote taxonomy.
    pub fn folder_segment(&self) -> &'static str {
        match self {
            Self::Resolution => "RESOLUCAO",
            Self::Ordinance => "PORTARIA",
            Self::Bylaw => "REGIMENTO",
            Self::Other => "OUTROS_TIPOS",
        }
    }
}

/// Broad taxonomy category a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentCategory {
    Deliberative,
    Normative,
    General,
}

impl DocumentCategory {
    pub fn folder_segment(&self) -> &'static str {
        match self {
            Self::Deliberative => "ATOS_DELIBERATIVOS",
            Self::Normative => "ATOS_NORMATIVOS",
            Self::General => "DOCUMENTOS_GERAIS",
        }
    }
}

/// Everything the classifier could infer from one document name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentDescriptor {
    pub source_url: String,
    pub raw_name: String,
    pub sanitized_name: String,
    pub inferred_type: DocumentType,
    pub inferred_category: DocumentCategory,
    pub inferred_year: Option<u16>,
    pub sequence_number: Option<u32>,
}

struct ClassificationRule {
    pattern: Regex,
    doc_type: DocumentType,
    category: DocumentCategory,
}

fn rule(pattern: &str, doc_type: DocumentType, category: DocumentCategory) -> ClassificationRule {
    ClassificationRule {
        // Patterns are fixed literals
        pattern: Regex::new(pattern).unwrap(),
        doc_type,
        category,
    }
}

/// Ordered rule list, most specific first. Evaluated top to bottom; the
/// first match decides type and category.
static RULES: Lazy<Vec<ClassificationRule>> = Lazy::new(|| {
    vec![
        rule(
            r"(?i)instru[çc][ãa]o[\s_-]*normativa",
            DocumentType::Bylaw,
            DocumentCategory::Normative,
        ),
        rule(
            r"(?i)resolu[çc][ãa]o",
            DocumentType::Resolution,
            DocumentCategory::Deliberative,
        ),
        rule(
            r"(?i)portaria",
            DocumentType::Ordinance,
            DocumentCategory::Normative,
        ),
        rule(
            r"(?i)regimento",
            DocumentType::Bylaw,
            DocumentCategory::Normative,
        ),
    ]
});

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const MIN_PLAUSIBLE_YEAR: u16 = 1950;

/// Classifies a document name. Total and deterministic: never fails, and the
/// same input always yields the identical descriptor.
pub fn classify(raw_name: &str) -> DocumentDescriptor {
    let stem = raw_name.trim().trim_end_matches(".pdf").trim_end_matches(".PDF");

    let matched = RULES.iter().find(|r| r.pattern.is_match(stem));
    let (doc_type, category) = match matched {
        Some(r) => (r.doc_type, r.category),
        None => (DocumentType::Other, DocumentCategory::General),
    };

    // Year and sequence tokens only mean anything once a rule identified the
    // document; unmatched names go to the undated fallback bucket.
    let (year, sequence) = if matched.is_some() {
        extract_year_and_sequence(stem, max_plausible_year())
    } else {
        (None, None)
    };

    DocumentDescriptor {
        source_url: String::new(),
        raw_name: raw_name.to_string(),
        sanitized_name: sanitize_filename(raw_name),
        inferred_type: doc_type,
        inferred_category: category,
        inferred_year: year,
        sequence_number: sequence,
    }
}

/// Classifies a document by URL, deriving the name from the last
/// percent-decoded path segment.
pub fn classify_url(url: &str) -> DocumentDescriptor {
    let raw_name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()))
        .and_then(|r| r.ok())
        .unwrap_or_else(|| url.to_string());

    let mut descriptor = classify(&raw_name);
    descriptor.source_url = url.to_string();
    descriptor
}

fn max_plausible_year() -> u16 {
    (Utc::now().year() + 1) as u16
}

/// Picks the year (first 4-digit token inside the plausible range) and the
/// sequence number (first other numeric token) out of a name.
fn extract_year_and_sequence(stem: &str, max_year: u16) -> (Option<u16>, Option<u32>) {
    let mut year: Option<u16> = None;
    let mut sequence: Option<u32> = None;

    for token in NUMBER_TOKEN.find_iter(stem) {
        let text = token.as_str();
        if year.is_none() && text.len() == 4 {
            if let Ok(value) = text.parse::<u16>() {
                if (MIN_PLAUSIBLE_YEAR..=max_year).contains(&value) {
                    year = Some(value);
                    continue;
                }
            }
        }
        if sequence.is_none() {
            if let Ok(value) = text.parse::<u32>() {
                sequence = Some(value);
            }
        }
        if year.is_some() && sequence.is_some() {
            break;
        }
    }

    (year, sequence)
}

/// Folds accents and punctuation into filesystem-safe names, preserving the
/// `.pdf` extension when present.
pub fn sanitize_filename(filename: &str) -> String {
    let (stem, had_pdf) = match filename.strip_suffix(".pdf") {
        Some(stem) => (stem, true),
        None => (filename, false),
    };

    let mut name = String::with_capacity(stem.len());
    for c in stem.chars() {
        let replacement: Option<char> = match c {
            ' ' | ';' | ':' | '.' | '(' | ')' | '[' | ']' | '/' | '\\' => Some('_'),
            'ç' => Some('c'),
            'ã' | 'á' | 'â' | 'à' => Some('a'),
            'é' | 'ê' => Some('e'),
            'í' => Some('i'),
            'õ' | 'ó' | 'ô' => Some('o'),
            'ú' => Some('u'),
            'Ç' => Some('C'),
            'Ã' | 'Á' | 'Â' | 'À' => Some('A'),
            'É' | 'Ê' => Some('E'),
            'Í' => Some('I'),
            'Õ' | 'Ó' | 'Ô' => Some('O'),
            'Ú' => Some('U'),
            _ => None,
        };
        name.push(replacement.unwrap_or(c));
    }

    // Collapse runs of underscores left by replacements
    while name.contains("__") {
        name = name.replace("__", "_");
    }
    let name = name.trim_matches('_');

    if had_pdf {
        format!("{name}.pdf")
    } else {
        name.to_string()
    }
}
