//! Line lexer of the dictionary source format.
//!
//! Every meaningful line reads `KEYWORD: value`. A `#` starts a comment that
//! runs to the end of the line, `##` stands for a literal `#`. Records are
//! opened by their name keyword and run until the next one.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, space0},
    sequence::{preceded, terminated},
    IResult, Parser,
};

use crate::{geoframe_errors::Diagnostic, key_name::eq_key};

/// One `KEYWORD: value` line. The keyword is upper-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub number: usize,
    pub keyword: String,
    pub value: String,
}

/// The lines of one record, opener excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBlock {
    pub name: String,
    /// Line of the name keyword.
    pub line: usize,
    pub fields: Vec<SourceLine>,
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_keyword(input: &str) -> IResult<&str, &str> {
    preceded(space0, terminated(take_while1(is_keyword_char), (space0, char(':')))).parse(input)
}

/// Remove the comment part of `line`, turning `##` into `#`.
pub fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '#' {
            if chars.peek() == Some(&'#') {
                chars.next();
                out.push('#');
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Lex one physical line.
///
/// Return
/// ----------
/// * `Ok(None)` for blank and comment-only lines, a diagnostic for a line
///   without a keyword.
pub fn lex_line(number: usize, raw: &str) -> Result<Option<SourceLine>, Diagnostic> {
    let text = strip_comment(raw);
    if text.trim().is_empty() {
        return Ok(None);
    }
    match parse_keyword(&text) {
        Ok((rest, keyword)) => Ok(Some(SourceLine {
            number,
            keyword: keyword.to_ascii_uppercase(),
            value: rest.trim().to_string(),
        })),
        Err(_) => Err(Diagnostic::new(
            "",
            number,
            format!("expected 'KEYWORD: value', found '{}'", text.trim()),
        )),
    }
}

/// Lex a whole source text; lines are numbered from 1.
pub fn lex(source: &str) -> (Vec<SourceLine>, Vec<Diagnostic>) {
    let mut lines = Vec::new();
    let mut diagnostics = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        match lex_line(i + 1, raw) {
            Ok(Some(line)) => lines.push(line),
            Ok(None) => {}
            Err(diag) => diagnostics.push(diag),
        }
    }
    (lines, diagnostics)
}

/// Group lexed lines into records opened by one of `openers`.
pub fn split_records(lines: Vec<SourceLine>, openers: &[&str]) -> (Vec<SourceBlock>, Vec<Diagnostic>) {
    let mut blocks: Vec<SourceBlock> = Vec::new();
    let mut diagnostics = Vec::new();
    for line in lines {
        if openers.iter().any(|o| eq_key(o, &line.keyword)) {
            blocks.push(SourceBlock {
                name: line.value,
                line: line.number,
                fields: Vec::new(),
            });
        } else if let Some(block) = blocks.last_mut() {
            block.fields.push(line);
        } else {
            diagnostics.push(Diagnostic::new(
                "",
                line.number,
                format!("{} appears before the first record name", line.keyword),
            ));
        }
    }
    (blocks, diagnostics)
}

#[cfg(test)]
mod test_lexer {
    use super::*;

    #[test]
    fn test_comments() {
        assert_eq!(strip_comment("DESCR: Lot ##5 # surveyed 1921"), "DESCR: Lot #5 ");
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(lex_line(3, "   # nothing here").unwrap(), None);
    }

    #[test]
    fn test_keyword_line() {
        let line = lex_line(7, "  e_rad :  6378137.0  # meters").unwrap().unwrap();
        assert_eq!(line.number, 7);
        assert_eq!(line.keyword, "E_RAD");
        assert_eq!(line.value, "6378137.0");

        let empty = lex_line(8, "DESCR:").unwrap().unwrap();
        assert_eq!(empty.value, "");

        let err = lex_line(9, "no colon on this line").unwrap_err();
        assert_eq!(err.line, 9);
    }

    #[test]
    fn test_split_records() {
        let source = "\
GROUP: orphan
EL_NAME: WGS84
  E_RAD: 6378137.0
NAME: CLRK66
  E_RAD: 6378206.4
  P_RAD: 6356583.8
";
        let (lines, diags) = lex(source);
        assert!(diags.is_empty());
        let (blocks, diags) = split_records(lines, &["EL_NAME", "NAME"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 1);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "WGS84");
        assert_eq!(blocks[0].line, 2);
        assert_eq!(blocks[1].fields.len(), 2);
    }
}
