//! # Dictionary source compiler
//!
//! Turns the line-oriented text sources (`.asc`) of ellipsoids, datums and
//! coordinate systems into binary dictionaries.
//!
//! Compilation is all-or-nothing: every record is validated, every
//! diagnostic is collected, and the binary dictionary is written only when
//! none was raised. Warnings are handed to a caller callback which may cancel
//! the compilation.
//!
//! ```rust, no_run
//! use camino::Utf8Path;
//! use geoframe::compiler::{compile, CompileOptions, WarningAction};
//! use geoframe::dictionary::ellipsoid_def::EllipsoidDef;
//!
//! let source = "EL_NAME: WGS84\n  E_RAD: 6378137.0\n  P_RAD: 6356752.3142\n";
//! let report = compile::<EllipsoidDef>(
//!     source,
//!     Utf8Path::new("Elipsoid.CSD"),
//!     &CompileOptions::default(),
//!     &mut |_| WarningAction::Continue,
//! )
//! .unwrap();
//! assert_eq!(report.records, 1);
//! ```

pub mod builtin;
pub mod coordsys;
pub mod datum;
pub mod ellipsoid;
pub mod lexer;

use std::{cmp::Ordering, collections::HashSet};

use camino::Utf8Path;
use tracing::{info, warn};

use crate::{
    constants::KEY_NAME_LEN,
    dictionary::{
        store::{write_sorted, DictionaryFile, WriteOptions},
        DictRecord,
    },
    geoframe_errors::{Diagnostic, GeoframeError, ValidationErrors},
    key_name::{cmp_key, validate_key_name},
};

use self::lexer::{lex, split_records, SourceBlock, SourceLine};

pub use self::builtin::compile_builtin;

/// Answer of the warning callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningAction {
    Continue,
    Cancel,
}

/// Names known to the dictionaries a source refers to.
///
/// A `None` list disables the corresponding cross-check.
#[derive(Debug, Clone, Default)]
pub struct Companions {
    ellipsoids: Option<HashSet<String>>,
    datums: Option<HashSet<String>>,
}

fn fold_names<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().to_ascii_uppercase())
        .collect()
}

impl Companions {
    pub fn with_ellipsoids<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ellipsoids = Some(fold_names(names));
        self
    }

    pub fn with_datums<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.datums = Some(fold_names(names));
        self
    }

    /// Read the key names of already compiled dictionaries.
    pub fn from_dictionaries<E: DictRecord, D: DictRecord>(
        ellipsoids: Option<&DictionaryFile<E>>,
        datums: Option<&DictionaryFile<D>>,
    ) -> Result<Self, GeoframeError> {
        let mut companions = Companions::default();
        if let Some(file) = ellipsoids {
            companions = companions.with_ellipsoids(file.key_names()?);
        }
        if let Some(file) = datums {
            companions = companions.with_datums(file.key_names()?);
        }
        Ok(companions)
    }

    pub fn knows_ellipsoid(&self, name: &str) -> bool {
        self.ellipsoids
            .as_ref()
            .map_or(true, |set| set.contains(&name.to_ascii_uppercase()))
    }

    pub fn knows_datum(&self, name: &str) -> bool {
        self.datums
            .as_ref()
            .map_or(true, |set| set.contains(&name.to_ascii_uppercase()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Mark every compiled record as distribution-owned.
    pub distribution: bool,
    pub write: WriteOptions,
    pub companions: Companions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileReport {
    pub records: usize,
    pub warnings: usize,
}

/// Per-record state handed to [`SourceRecord::from_source`].
pub struct RecordContext<'a> {
    key: String,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    options: &'a CompileOptions,
}

impl<'a> RecordContext<'a> {
    fn new(key: &str, options: &'a CompileOptions) -> Self {
        RecordContext {
            key: key.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
            options,
        }
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(&self.key, line, message));
    }

    pub fn warn(&mut self, line: usize, message: impl Into<String>) {
        self.warnings.push(Diagnostic::new(&self.key, line, message));
    }

    pub fn companions(&self) -> &Companions {
        &self.options.companions
    }

    /// Protection flag of the records being compiled.
    pub fn protect(&self) -> i16 {
        i16::from(self.options.distribution)
    }

    /// Parse a decimal value; a bad value is reported and read as `0`.
    pub fn number(&mut self, line: &SourceLine) -> f64 {
        match line.value.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                self.error(
                    line.number,
                    format!("{}: '{}' is not a number", line.keyword, line.value),
                );
                0.0
            }
        }
    }

    pub fn integer(&mut self, line: &SourceLine) -> i32 {
        match line.value.parse::<i32>() {
            Ok(v) => v,
            Err(_) => {
                self.error(
                    line.number,
                    format!("{}: '{}' is not an integer", line.keyword, line.value),
                );
                0
            }
        }
    }

    /// Copy a text value, reporting it when longer than `max` bytes.
    pub fn text(&mut self, line: &SourceLine, max: usize) -> String {
        if line.value.len() >= max {
            self.error(
                line.number,
                format!("{} is longer than {} characters", line.keyword, max - 1),
            );
        }
        line.value.clone()
    }

    pub fn unknown_keyword(&mut self, line: &SourceLine) {
        self.error(line.number, format!("unknown keyword {}", line.keyword));
    }
}

/// A dictionary record that can be compiled from text.
pub trait SourceRecord: DictRecord {
    /// Keyword opening a record, besides the generic `NAME`.
    const NAME_KEYWORD: &'static str;

    /// Build a record from its source lines. Problems go to `ctx`; the
    /// returned record is discarded when any error was raised.
    fn from_source(block: &SourceBlock, ctx: &mut RecordContext) -> Self;
}

/// Compile `source` into records without writing anything.
///
/// Arguments
/// -----------------
/// * `source`: the full text of the source file
/// * `options`: protection flag and companion names
/// * `on_warning`: called for every warning, in source order
///
/// Return
/// ----------
/// * The records in source order, [`GeoframeError::Validation`] listing every
///   error found, or [`GeoframeError::Cancelled`] when the callback cancelled.
pub fn parse_source<R: SourceRecord>(
    source: &str,
    options: &CompileOptions,
    on_warning: &mut dyn FnMut(&Diagnostic) -> WarningAction,
) -> Result<Vec<R>, GeoframeError> {
    let (lines, mut diagnostics) = lex(source);
    let (blocks, misplaced) = split_records(lines, &[R::NAME_KEYWORD, "NAME"]);
    diagnostics.extend(misplaced);

    let mut records = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let mut ctx = RecordContext::new(&block.name, options);
        if let Err(reason) = validate_key_name(&block.name, KEY_NAME_LEN) {
            ctx.error(block.line, reason);
        }
        let record = R::from_source(block, &mut ctx);

        for warning in &ctx.warnings {
            warn!(kind = %R::KIND, %warning, "compile warning");
            if on_warning(warning) == WarningAction::Cancel {
                return Err(GeoframeError::Cancelled(block.name.clone()));
            }
        }
        diagnostics.extend(ctx.errors);
        records.push(record);
    }

    let mut names: Vec<(&str, usize)> = blocks.iter().map(|b| (b.name.as_str(), b.line)).collect();
    names.sort_by(|a, b| cmp_key(a.0, b.0).then(a.1.cmp(&b.1)));
    for pair in names.windows(2) {
        if cmp_key(pair[0].0, pair[1].0) == Ordering::Equal {
            diagnostics.push(Diagnostic::new(
                pair[1].0,
                pair[1].1,
                format!("duplicate {} name, first defined at line {}", R::KIND, pair[0].1),
            ));
        }
    }

    if diagnostics.is_empty() {
        Ok(records)
    } else {
        diagnostics.sort_by_key(|d| d.line);
        Err(GeoframeError::Validation(ValidationErrors(diagnostics)))
    }
}

/// Compile `source` and write the binary dictionary to `output`.
///
/// Nothing is written unless the whole source compiles; an existing file at
/// `output` is left untouched on failure.
pub fn compile<R: SourceRecord>(
    source: &str,
    output: &Utf8Path,
    options: &CompileOptions,
    on_warning: &mut dyn FnMut(&Diagnostic) -> WarningAction,
) -> Result<CompileReport, GeoframeError> {
    let mut warnings = 0;
    let records = parse_source::<R>(source, options, &mut |w| {
        warnings += 1;
        on_warning(w)
    })?;
    let written = write_sorted(output, records, options.write)?;
    info!(%output, kind = %R::KIND, records = written, warnings, "source compiled");
    Ok(CompileReport {
        records: written,
        warnings,
    })
}
