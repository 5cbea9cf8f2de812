//! Datum source records.
//!
//! ```text
//! DT_NAME: ED50-7P
//!   DESCR: European 1950, seven parameter
//!   ELLIPSOID: INTNL
//!   USE: BURSAWOLF
//!   DELTA_X: -87.0
//!   DELTA_Y: -98.0
//!   DELTA_Z: -121.0
//!   ROT_X: 0.0
//!   ROT_Y: 0.0
//!   ROT_Z: 0.814
//!   BWSCALE: -0.38
//! ```
//!
//! The parameters present must be exactly those consumed by the `USE`
//! method: all three of a group, or none of it.

use crate::{
    constants::{CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN, WGS84_DATUM},
    dictionary::datum_def::{DatumDef, To84Via},
};

use super::{lexer::SourceBlock, RecordContext, SourceRecord};

pub const MAX_TRANSLATION: f64 = 50_000.0;
pub const MAX_ROTATION: f64 = 50_000.0;
pub const MAX_SCALE_PPM: f64 = 2_000.0;

/// Line numbers of the parameters seen, per slot.
#[derive(Default)]
struct Seen {
    delta: [Option<usize>; 3],
    rotation: [Option<usize>; 3],
    scale: Option<usize>,
}

fn check_group(
    ctx: &mut RecordContext,
    method: To84Via,
    used: bool,
    seen: &[Option<usize>],
    names: &[&str],
    block_line: usize,
) {
    let present: Vec<usize> = seen.iter().flatten().copied().collect();
    if used && present.len() < seen.len() {
        ctx.error(
            block_line,
            format!("method {method} requires {}", names.join(", ")),
        );
    } else if !used {
        if let Some(&line) = present.first() {
            ctx.error(line, format!("method {method} does not use {}", names.join(", ")));
        }
    }
}

impl SourceRecord for DatumDef {
    const NAME_KEYWORD: &'static str = "DT_NAME";

    fn from_source(block: &SourceBlock, ctx: &mut RecordContext) -> Self {
        let mut def = DatumDef {
            key_nm: block.name.clone(),
            protect: ctx.protect(),
            ..Default::default()
        };
        let mut seen = Seen::default();
        let mut method = None;

        for line in &block.fields {
            match line.keyword.as_str() {
                "GROUP" => def.group = ctx.text(line, KEY_NAME_LEN),
                "DESCR" => def.desc_nm = ctx.text(line, DESC_LEN),
                "SOURCE" => def.source = ctx.text(line, DESC_LEN),
                "LOCATION" => def.locatn = ctx.text(line, KEY_NAME_LEN),
                "CNTRY_ST" => def.cntry_st = ctx.text(line, CNTRY_ST_LEN),
                "ELLIPSOID" => def.ell_knm = ctx.text(line, KEY_NAME_LEN),
                "EPSG" => def.epsg = ctx.integer(line),
                "USE" => match line.value.parse::<To84Via>() {
                    Ok(via) => method = Some(via),
                    Err(_) => ctx.error(
                        line.number,
                        format!("unknown transformation method {}", line.value),
                    ),
                },
                "DELTA_X" | "DELTA_Y" | "DELTA_Z" => {
                    let i = axis(&line.keyword);
                    def.delta[i] = ctx.number(line);
                    seen.delta[i] = Some(line.number);
                    if def.delta[i].abs() >= MAX_TRANSLATION {
                        ctx.error(line.number, format!("translation {} out of range", def.delta[i]));
                    }
                }
                "ROT_X" | "ROT_Y" | "ROT_Z" => {
                    let i = axis(&line.keyword);
                    def.rotation[i] = ctx.number(line);
                    seen.rotation[i] = Some(line.number);
                    if def.rotation[i].abs() >= MAX_ROTATION {
                        ctx.error(line.number, format!("rotation {} out of range", def.rotation[i]));
                    }
                }
                "BWSCALE" => {
                    def.bwscale = ctx.number(line);
                    seen.scale = Some(line.number);
                    if def.bwscale.abs() >= MAX_SCALE_PPM {
                        ctx.error(line.number, format!("scale {} ppm out of range", def.bwscale));
                    }
                }
                _ => ctx.unknown_keyword(line),
            }
        }

        if def.ell_knm.is_empty() {
            ctx.error(block.line, "no ellipsoid specified");
        } else if !ctx.companions().knows_ellipsoid(&def.ell_knm) {
            let msg = format!("ellipsoid {} is not defined", def.ell_knm);
            ctx.error(block.line, msg);
        }

        let Some(method) = method else {
            ctx.error(block.line, "no transformation method specified");
            return def;
        };
        def.to84_via = method;

        let (translation, rotation, scale) = method.parameter_usage();
        check_group(ctx, method, translation, &seen.delta, &["DELTA_X", "DELTA_Y", "DELTA_Z"], block.line);
        check_group(ctx, method, rotation, &seen.rotation, &["ROT_X", "ROT_Y", "ROT_Z"], block.line);
        check_group(ctx, method, scale, &[seen.scale], &["BWSCALE"], block.line);

        if method.needs_transform_record() {
            ctx.warn(
                block.line,
                format!("method {method} needs a geodetic transformation record to {WGS84_DATUM}"),
            );
        }
        if def.desc_nm.is_empty() {
            ctx.warn(block.line, "no description");
        }
        def
    }
}

fn axis(keyword: &str) -> usize {
    match keyword.as_bytes().last() {
        Some(b'Y') => 1,
        Some(b'Z') => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod test_datum_source {
    use super::*;
    use crate::{
        compiler::{parse_source, Companions, CompileOptions, WarningAction},
        geoframe_errors::{Diagnostic, GeoframeError, ValidationErrors},
    };

    fn errors(source: &str, options: &CompileOptions) -> ValidationErrors {
        match parse_source::<DatumDef>(source, options, &mut |_| WarningAction::Continue) {
            Err(GeoframeError::Validation(diags)) => diags,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_method() {
        let diags = errors("NAME: TEST1\nELLIPSOID: WGS84\n", &CompileOptions::default());
        assert_eq!(
            diags.0,
            vec![Diagnostic::new("TEST1", 1, "no transformation method specified")]
        );
    }

    #[test]
    fn test_seven_parameters() {
        let source = "\
DT_NAME: ED50-7P
  DESCR: European 1950
  ELLIPSOID: INTNL
  USE: BURSAWOLF
  DELTA_X: -87.0
  DELTA_Y: -98.0
  DELTA_Z: -121.0
  ROT_X: 0.0
  ROT_Y: 0.0
  ROT_Z: 0.814
  BWSCALE: -0.38
";
        let defs = parse_source::<DatumDef>(source, &CompileOptions::default(), &mut |_| {
            WarningAction::Continue
        })
        .unwrap();
        assert_eq!(defs[0].to84_via, To84Via::BursaWolf);
        assert_eq!(defs[0].delta, [-87.0, -98.0, -121.0]);
        assert_eq!(defs[0].rotation[2], 0.814);
        assert_eq!(defs[0].bwscale, -0.38);
    }

    #[test]
    fn test_parameter_count() {
        let incomplete = "DT_NAME: X\n DESCR: x\n ELLIPSOID: WGS84\n USE: MOLODENSKY\n DELTA_X: 1\n DELTA_Y: 2\n";
        let diags = errors(incomplete, &CompileOptions::default());
        assert!(diags.0[0].message.contains("requires DELTA_X, DELTA_Y, DELTA_Z"));

        let extra = "DT_NAME: X\n DESCR: x\n ELLIPSOID: WGS84\n USE: MOLODENSKY\n DELTA_X: 1\n DELTA_Y: 2\n DELTA_Z: 3\n ROT_Z: 1\n";
        let diags = errors(extra, &CompileOptions::default());
        assert_eq!(diags.0[0].line, 8);
    }

    #[test]
    fn test_ranges_and_companions() {
        let source = "DT_NAME: X\n DESCR: x\n ELLIPSOID: NOPE\n USE: MOLODENSKY\n DELTA_X: 60000\n DELTA_Y: 2\n DELTA_Z: 3\n";
        let options = CompileOptions {
            companions: Companions::default().with_ellipsoids(["WGS84"]),
            ..Default::default()
        };
        let diags = errors(source, &options);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().any(|d| d.message.contains("NOPE is not defined")));
        assert!(diags.iter().any(|d| d.message.contains("translation 60000 out of range")));
    }
}
