// src/models/bank.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::question::{Question, QuestionTemplate, QuestionType};

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*[\s\S]*?\*/").expect("block comment pattern is valid")
});

/// Errors raised while loading the static bank or a supplementary pack.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Exam bank validation failed at `{path}`: {reason}")]
    Validation { path: String, reason: String },

    #[error("Failed to read exam bank: {0}")]
    Io(#[from] std::io::Error),
}

impl BankError {
    fn at(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BankError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSection {
    pub name: String,
    /// Catalog question ids or template ids, in presentation order.
    pub question_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_each: Option<f64>,
}

/// Named, fixed legacy structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSet {
    pub duration_minutes: i64,
    pub target_points: f64,
    pub sections: Vec<ExamSection>,
}

impl ExamSet {
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.question_ids.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grading {
    pub total_points: f64,
}

/// The full static catalog. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub version: String,
    pub module: String,
    pub assessment: String,
    pub duration_minutes: i64,
    pub grading: Grading,
    pub question_types: Vec<QuestionType>,
    pub bank: Vec<Question>,
    pub exam_sets: BTreeMap<String, ExamSet>,
    #[serde(default)]
    pub templates: Vec<QuestionTemplate>,

    /// Pack name -> entry ids, filled by `merge_pack`.
    #[serde(default)]
    pub packs: BTreeMap<String, Vec<String>>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Bank {
    fn reindex(&mut self) {
        self.index = self
            .bank
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.bank[i])
    }

    pub fn template(&self, id: &str) -> Option<&QuestionTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn questions_of(&self, question_type: QuestionType) -> impl Iterator<Item = &Question> {
        self.bank
            .iter()
            .filter(move |q| q.question_type() == question_type)
    }

    pub fn count_by_type(&self) -> BTreeMap<QuestionType, usize> {
        let mut counts = BTreeMap::new();
        for q in &self.bank {
            *counts.entry(q.question_type()).or_insert(0) += 1;
        }
        counts
    }

    /// Adds pack entries to the catalog. Entries whose id already exists are
    /// dropped (the base bank wins). Returns how many entries were added.
    pub fn merge_pack(&mut self, pack: SupplementaryPack) -> usize {
        let mut added = 0;
        let mut member_ids = Vec::with_capacity(pack.entries.len());
        for entry in pack.entries {
            member_ids.push(entry.id.clone());
            if self.index.contains_key(&entry.id) {
                tracing::debug!("Pack '{}' entry {} already in bank, keeping base", pack.pack, entry.id);
                continue;
            }
            self.index.insert(entry.id.clone(), self.bank.len());
            self.bank.push(entry);
            added += 1;
        }
        let members = self.packs.entry(pack.pack).or_default();
        for id in member_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        members.sort();
        added
    }
}

/// Optional extension document: `{ pack, source?, entries: [...] }`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplementaryPack {
    #[validate(length(min = 1, max = 100))]
    pub pack: String,
    #[serde(default)]
    pub source: Option<String>,
    pub entries: Vec<Question>,
}

/// Removes `/* ... */` comments from a bank document.
pub fn strip_json_comments(raw: &str) -> String {
    BLOCK_COMMENT.replace_all(raw, "").trim().to_string()
}

fn first_validation_error(prefix: &str, errors: &ValidationErrors) -> BankError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    match fields.first() {
        Some((field, errs)) => {
            let reason = errs
                .first()
                .map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("failed `{}` check", e.code),
                })
                .unwrap_or_else(|| "invalid value".to_string());
            BankError::at(format!("{}.{}", prefix, field), reason)
        }
        None => BankError::at(prefix, "invalid value"),
    }
}

fn require<'a>(obj: &'a serde_json::Map<String, Value>, path: &str, field: &str) -> Result<&'a Value, BankError> {
    obj.get(field)
        .ok_or_else(|| BankError::at(format!("{}{}", path, field), "missing required field"))
}

fn expect_kind(value: &Value, path: &str, kind: &str) -> Result<(), BankError> {
    let ok = match kind {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(BankError::at(path, format!("expected {}", kind)))
    }
}

fn parse_question(value: &Value, path: &str) -> Result<Question, BankError> {
    let obj = value
        .as_object()
        .ok_or_else(|| BankError::at(path, "expected object"))?;
    let prefix = format!("{}.", path);
    for (field, kind) in [
        ("id", "string"),
        ("type", "string"),
        ("topic", "string"),
        ("points", "number"),
        ("prompt", "string"),
    ] {
        expect_kind(require(obj, &prefix, field)?, &format!("{}{}", prefix, field), kind)?;
    }

    let question: Question = serde_json::from_value(value.clone())
        .map_err(|e| BankError::at(path, e.to_string()))?;
    question
        .validate()
        .map_err(|e| first_validation_error(path, &e))?;
    question
        .check_answer_keys()
        .map_err(|(field, reason)| BankError::at(format!("{}.{}", path, field), reason))?;
    Ok(question)
}

/// Parses and validates a bank document.
///
/// The error names the first offending field path (`bank[3].points`) rather
/// than a generic parse failure.
pub fn parse_bank(raw: &str) -> Result<Bank, BankError> {
    let cleaned = strip_json_comments(raw);
    let root: Value = serde_json::from_str(&cleaned).map_err(BankError::InvalidJson)?;
    let obj = root
        .as_object()
        .ok_or_else(|| BankError::at("$", "expected object"))?;

    for (field, kind) in [
        ("version", "string"),
        ("module", "string"),
        ("assessment", "string"),
        ("duration_minutes", "integer"),
        ("grading", "object"),
        ("question_types", "array"),
        ("bank", "array"),
        ("exam_sets", "object"),
    ] {
        expect_kind(require(obj, "", field)?, field, kind)?;
    }

    let mut questions = Vec::new();
    let mut seen = HashSet::new();
    for (i, entry) in obj["bank"].as_array().into_iter().flatten().enumerate() {
        let path = format!("bank[{}]", i);
        let question = parse_question(entry, &path)?;
        if !seen.insert(question.id.clone()) {
            return Err(BankError::at(
                format!("{}.id", path),
                format!("duplicate question id `{}`", question.id),
            ));
        }
        questions.push(question);
    }

    let mut templates = Vec::new();
    if let Some(raw_templates) = obj.get("templates") {
        let list = raw_templates
            .as_array()
            .ok_or_else(|| BankError::at("templates", "expected array"))?;
        for (i, entry) in list.iter().enumerate() {
            let path = format!("templates[{}]", i);
            let template: QuestionTemplate = serde_json::from_value(entry.clone())
                .map_err(|e| BankError::at(&path, e.to_string()))?;
            template
                .validate()
                .map_err(|e| first_validation_error(&path, &e))?;
            templates.push(template);
        }
    }

    for (set_id, set) in obj["exam_sets"].as_object().into_iter().flatten() {
        let path = format!("exam_sets.{}", set_id);
        let set_obj = set
            .as_object()
            .ok_or_else(|| BankError::at(&path, "expected object"))?;
        let prefix = format!("{}.", path);
        for (field, kind) in [
            ("duration_minutes", "integer"),
            ("target_points", "number"),
            ("sections", "array"),
        ] {
            expect_kind(require(set_obj, &prefix, field)?, &format!("{}{}", prefix, field), kind)?;
        }
        for (i, section) in set_obj["sections"].as_array().into_iter().flatten().enumerate() {
            let section_path = format!("{}sections[{}]", prefix, i);
            let section_obj = section
                .as_object()
                .ok_or_else(|| BankError::at(&section_path, "expected object"))?;
            let section_prefix = format!("{}.", section_path);
            expect_kind(require(section_obj, &section_prefix, "name")?, &format!("{}name", section_prefix), "string")?;
            let ids = require(section_obj, &section_prefix, "question_ids")?;
            let ids_path = format!("{}question_ids", section_prefix);
            expect_kind(ids, &ids_path, "array")?;
            for (j, id) in ids.as_array().into_iter().flatten().enumerate() {
                expect_kind(id, &format!("{}[{}]", ids_path, j), "string")?;
            }
            if let Some(points) = section_obj.get("points_each").filter(|v| !v.is_null()) {
                expect_kind(points, &format!("{}points_each", section_prefix), "number")?;
            }
        }
    }

    let mut rest = obj.clone();
    rest.insert("bank".to_string(), Value::Array(Vec::new()));
    rest.remove("templates");
    let mut bank: Bank = serde_json::from_value(Value::Object(rest))
        .map_err(|e| BankError::at("$", e.to_string()))?;
    if bank.duration_minutes <= 0 {
        return Err(BankError::at("duration_minutes", "must be positive"));
    }
    bank.bank = questions;
    bank.templates = templates;
    bank.packs.clear();
    bank.reindex();
    Ok(bank)
}

/// Strict pack parser. Most callers want `parse_supplementary_pack`.
pub fn try_parse_supplementary_pack(raw: &str) -> Result<SupplementaryPack, BankError> {
    let root: Value = serde_json::from_str(&strip_json_comments(raw)).map_err(BankError::InvalidJson)?;
    let obj = root
        .as_object()
        .ok_or_else(|| BankError::at("$", "expected object"))?;
    expect_kind(require(obj, "", "pack")?, "pack", "string")?;
    expect_kind(require(obj, "", "entries")?, "entries", "array")?;

    let mut entries = Vec::new();
    for (i, entry) in obj["entries"].as_array().into_iter().flatten().enumerate() {
        entries.push(parse_question(entry, &format!("entries[{}]", i))?);
    }
    let pack = SupplementaryPack {
        pack: obj["pack"].as_str().unwrap_or_default().to_string(),
        source: obj.get("source").and_then(Value::as_str).map(str::to_string),
        entries,
    };
    pack.validate().map_err(|e| first_validation_error("$", &e))?;
    Ok(pack)
}

/// Lenient pack parser: a malformed pack degrades to `None` with a warning
/// instead of failing the whole load.
pub fn parse_supplementary_pack(raw: &str) -> Option<SupplementaryPack> {
    match try_parse_supplementary_pack(raw) {
        Ok(pack) => Some(pack),
        Err(e) => {
            tracing::warn!("Ignoring supplementary pack: {}", e);
            None
        }
    }
}
