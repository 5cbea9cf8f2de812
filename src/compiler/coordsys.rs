//! Coordinate system source records.
//!
//! ```text
//! CS_NAME: UTM84-31N
//!   GROUP: UTM
//!   DESCR: UTM zone 31 North, WGS84
//!   DT_NAME: WGS84
//!   PROJ: UTM
//!   UNIT: METER
//!   ZONE_NBR: 31
//!   HEMISPHERE: NORTH
//!   MIN_LNG: 0.0
//!   MIN_LAT: 0.0
//!   MAX_LNG: 6.0
//!   MAX_LAT: 84.0
//! ```
//!
//! Projection parameters are given either by slot (`PARM1` … `PARM24`) or
//! through the role keywords `CNTRL_MER`, `STD_PARLL_1`, `STD_PARLL_2`,
//! `AZIMUTH`, `ZONE_NBR` and `HEMISPHERE`.

use crate::{
    constants::{CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN, PRJ_PARAM_COUNT, UNIT_NAME_LEN},
    dictionary::{coordsys_def::CoordSysDef, groups::is_known_group},
    projection::{
        param_roles::{ParamKind, ParamRole},
        projection_by_key,
        quadrant::Quadrant,
        ProjFlags, ProjectionInfo,
    },
    units::{unit_by_name, UnitKind},
};

use super::{
    lexer::{SourceBlock, SourceLine},
    RecordContext, SourceRecord,
};

#[derive(Debug, Clone, Copy)]
enum ParamTarget {
    Slot(usize),
    Role(ParamRole),
}

fn param_target(keyword: &str) -> Option<ParamTarget> {
    if let Some(n) = keyword.strip_prefix("PARM") {
        return match n.parse::<usize>() {
            Ok(n) if (1..=PRJ_PARAM_COUNT).contains(&n) => Some(ParamTarget::Slot(n - 1)),
            _ => None,
        };
    }
    let role = match keyword {
        "CNTRL_MER" => ParamRole::CentralMeridian,
        "STD_PARLL_1" => ParamRole::StandardParallel1,
        "STD_PARLL_2" => ParamRole::StandardParallel2,
        "AZIMUTH" => ParamRole::Azimuth,
        "ZONE_NBR" => ParamRole::UtmZone,
        "HEMISPHERE" => ParamRole::Hemisphere,
        _ => return None,
    };
    Some(ParamTarget::Role(role))
}

fn hemisphere(ctx: &mut RecordContext, line: &SourceLine) -> f64 {
    match line.value.to_ascii_uppercase().as_str() {
        "N" | "NORTH" => 1.0,
        "S" | "SOUTH" => -1.0,
        _ => ctx.number(line),
    }
}

/// Resolve and range-check the parameter lines against `proj`.
fn assign_parameters(
    def: &mut CoordSysDef,
    proj: &ProjectionInfo,
    params: &[(ParamTarget, &SourceLine)],
    block_line: usize,
    ctx: &mut RecordContext,
) {
    let mut given = [false; PRJ_PARAM_COUNT];
    for &(target, line) in params {
        let slot = match target {
            ParamTarget::Slot(slot) if proj.uses_slot(slot) => slot,
            ParamTarget::Slot(slot) => {
                ctx.error(line.number, format!("projection {} does not use PARM{}", proj.key, slot + 1));
                continue;
            }
            ParamTarget::Role(role) => match proj.slot_of(role) {
                Some(slot) => slot,
                None => {
                    ctx.error(line.number, format!("projection {} has no {}", proj.key, role.label()));
                    continue;
                }
            },
        };
        let role = proj.params[slot];
        let value = if role == ParamRole::Hemisphere {
            hemisphere(ctx, line)
        } else {
            ctx.number(line)
        };
        if role.kind() == ParamKind::Integer && value.fract() != 0.0 {
            ctx.error(line.number, format!("{} must be a whole number", role.label()));
        }
        if let Some((lo, hi)) = role.valid_range() {
            if value < lo || value > hi {
                ctx.error(line.number, format!("{} {value} is outside [{lo}, {hi}]", role.label()));
            }
        }
        def.prm[slot] = value;
        given[slot] = true;
    }

    for (slot, role) in proj.params.iter().enumerate() {
        if !given[slot] && !role.is_optional() {
            ctx.error(block_line, format!("{} is required by projection {}", role.label(), proj.key));
        }
    }
}

impl SourceRecord for CoordSysDef {
    const NAME_KEYWORD: &'static str = "CS_NAME";

    fn from_source(block: &SourceBlock, ctx: &mut RecordContext) -> Self {
        let mut def = CoordSysDef {
            key_nm: block.name.clone(),
            protect: ctx.protect(),
            ..Default::default()
        };
        let mut params = Vec::new();
        let mut origin_lines = Vec::new();
        let mut quad_line = None;

        for line in &block.fields {
            match line.keyword.as_str() {
                "GROUP" => def.group = ctx.text(line, KEY_NAME_LEN),
                "DESCR" => def.desc_nm = ctx.text(line, DESC_LEN),
                "SOURCE" => def.source = ctx.text(line, DESC_LEN),
                "LOCATION" => def.locatn = ctx.text(line, KEY_NAME_LEN),
                "CNTRY_ST" => def.cntry_st = ctx.text(line, CNTRY_ST_LEN),
                "DT_NAME" => def.dat_knm = ctx.text(line, KEY_NAME_LEN),
                "EL_NAME" => def.elp_knm = ctx.text(line, KEY_NAME_LEN),
                "PROJ" => def.prj_knm = ctx.text(line, KEY_NAME_LEN),
                "UNIT" => def.unit = ctx.text(line, UNIT_NAME_LEN),
                "EPSG" => def.epsg = ctx.integer(line),
                "SRID" => def.srid = ctx.integer(line),
                "ORG_LNG" => {
                    def.org_lng = ctx.number(line);
                    origin_lines.push((ProjFlags::ORG_LNG, line));
                }
                "ORG_LAT" => {
                    def.org_lat = ctx.number(line);
                    origin_lines.push((ProjFlags::ORG_LAT, line));
                }
                "SCL_RED" => {
                    def.scl_red = ctx.number(line);
                    origin_lines.push((ProjFlags::SCL_RED, line));
                    if def.scl_red <= 0.0 || def.scl_red > 2.0 {
                        ctx.error(line.number, format!("scale reduction {} is out of range", def.scl_red));
                    }
                }
                "FALSE_EAST" => def.x_off = ctx.number(line),
                "FALSE_NORTH" => def.y_off = ctx.number(line),
                "MAP_SCL" => {
                    def.map_scl = ctx.number(line);
                    if def.map_scl <= 0.0 {
                        ctx.error(line.number, "map scale must be positive");
                    }
                }
                "QUAD" => {
                    def.quad = i16::try_from(ctx.integer(line)).unwrap_or(i16::MAX);
                    quad_line = Some(line.number);
                }
                "ZERO_X" => def.zero[0] = ctx.number(line),
                "ZERO_Y" => def.zero[1] = ctx.number(line),
                "MIN_LNG" => def.ll_min[0] = ctx.number(line),
                "MIN_LAT" => def.ll_min[1] = ctx.number(line),
                "MAX_LNG" => def.ll_max[0] = ctx.number(line),
                "MAX_LAT" => def.ll_max[1] = ctx.number(line),
                "MIN_X" => def.xy_min[0] = ctx.number(line),
                "MIN_Y" => def.xy_min[1] = ctx.number(line),
                "MAX_X" => def.xy_max[0] = ctx.number(line),
                "MAX_Y" => def.xy_max[1] = ctx.number(line),
                keyword => match param_target(keyword) {
                    Some(target) => params.push((target, line)),
                    None => ctx.unknown_keyword(line),
                },
            }
        }

        match (def.dat_knm.is_empty(), def.elp_knm.is_empty()) {
            (true, true) => ctx.error(block.line, "either DT_NAME or EL_NAME is required"),
            (false, false) => ctx.error(block.line, "DT_NAME and EL_NAME are mutually exclusive"),
            (false, true) => {
                if !ctx.companions().knows_datum(&def.dat_knm) {
                    let msg = format!("datum {} is not defined", def.dat_knm);
                    ctx.error(block.line, msg);
                }
            }
            (true, false) => {
                if !ctx.companions().knows_ellipsoid(&def.elp_knm) {
                    let msg = format!("ellipsoid {} is not defined", def.elp_knm);
                    ctx.error(block.line, msg);
                }
            }
        }

        if let Some(line) = quad_line {
            if Quadrant::from_code(def.quad).is_err() {
                ctx.error(line, format!("quadrant code {} is outside -4..=4", def.quad));
            }
        }
        check_extents(&def, block.line, ctx);
        if !is_known_group(&def.group) {
            let msg = format!("unknown group {}", def.group);
            ctx.warn(block.line, msg);
        }
        if def.desc_nm.is_empty() {
            ctx.warn(block.line, "no description");
        }

        if def.prj_knm.is_empty() {
            ctx.error(block.line, "PROJ is required");
            return def;
        }
        let proj = match projection_by_key(&def.prj_knm) {
            Ok(proj) => proj,
            Err(err) => {
                ctx.error(block.line, err.to_string());
                return def;
            }
        };

        if def.unit.is_empty() {
            ctx.error(block.line, "UNIT is required");
        } else {
            match unit_by_name(&def.unit) {
                Ok(unit) => {
                    let wanted = if proj.is_geographic() {
                        UnitKind::Angular
                    } else {
                        UnitKind::Linear
                    };
                    if unit.kind != wanted {
                        let msg = format!("unit {} cannot be used with projection {}", unit.name, proj.key);
                        ctx.error(block.line, msg);
                    }
                }
                Err(err) => ctx.error(block.line, err.to_string()),
            }
        }

        for (flag, line) in origin_lines {
            if !proj.has(flag) && !(flag == ProjFlags::ORG_LNG && proj.is_geographic()) {
                ctx.warn(line.number, format!("{} is not used by projection {}", line.keyword, proj.key));
            }
        }
        assign_parameters(&mut def, proj, &params, block.line, ctx);
        def
    }
}

fn check_extents(def: &CoordSysDef, line: usize, ctx: &mut RecordContext) {
    if !def.ll_extents_empty() {
        let [min_lng, min_lat] = def.ll_min;
        let [max_lng, max_lat] = def.ll_max;
        if min_lng >= max_lng || min_lat >= max_lat {
            ctx.error(line, "geographic extents are empty or inverted");
        }
        if min_lat < -90.0 || max_lat > 90.0 || min_lng < -270.0 || max_lng > 270.0 {
            ctx.error(line, "geographic extents are out of range");
        }
    }
    if def.xy_min != [0.0; 2] || def.xy_max != [0.0; 2] {
        if def.xy_min[0] >= def.xy_max[0] || def.xy_min[1] >= def.xy_max[1] {
            ctx.error(line, "cartesian extents are empty or inverted");
        }
    }
}

#[cfg(test)]
mod test_coordsys_source {
    use super::*;
    use crate::{
        compiler::{parse_source, Companions, CompileOptions, WarningAction},
        geoframe_errors::GeoframeError,
    };

    fn parse(source: &str, options: &CompileOptions) -> (Result<Vec<CoordSysDef>, GeoframeError>, Vec<String>) {
        let mut warnings = Vec::new();
        let res = parse_source::<CoordSysDef>(source, options, &mut |w| {
            warnings.push(w.message.clone());
            WarningAction::Continue
        });
        (res, warnings)
    }

    fn messages(res: Result<Vec<CoordSysDef>, GeoframeError>) -> Vec<String> {
        match res {
            Err(GeoframeError::Validation(diags)) => diags.iter().map(|d| d.message.clone()).collect(),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    const UTM: &str = "\
CS_NAME: UTM84-31N
  GROUP: UTM
  DESCR: UTM zone 31 North, WGS84
  DT_NAME: WGS84
  PROJ: UTM
  UNIT: METER
  ZONE_NBR: 31
  HEMISPHERE: NORTH
  MIN_LNG: 0.0
  MIN_LAT: 0.0
  MAX_LNG: 6.0
  MAX_LAT: 84.0
";

    #[test]
    fn test_utm_record() {
        let options = CompileOptions {
            companions: Companions::default().with_datums(["WGS84"]),
            ..Default::default()
        };
        let (res, warnings) = parse(UTM, &options);
        let def = &res.unwrap()[0];
        assert!(warnings.is_empty());
        assert_eq!(def.prm[0], 31.0);
        assert_eq!(def.prm[1], 1.0);
        assert_eq!(def.ll_max, [6.0, 84.0]);
        assert!(def.is_geodetic());
    }

    #[test]
    fn test_slot_and_role_checks() {
        let source = "\
CS_NAME: LCC
  DESCR: x
  EL_NAME: CLRK66
  PROJ: LM2SP
  UNIT: METER
  ORG_LNG: -96
  ORG_LAT: 23
  PARM1: 33
  PARM3: 45
  ZONE_NBR: 12
";
        let msgs = messages(parse(source, &CompileOptions::default()).0);
        assert!(msgs.contains(&"projection LM2SP does not use PARM3".to_string()));
        assert!(msgs.contains(&"projection LM2SP has no UTM zone".to_string()));
        assert!(msgs.contains(&"second standard parallel is required by projection LM2SP".to_string()));
    }

    #[test]
    fn test_reference_and_units() {
        let both = UTM.replace("  PROJ: UTM\n", "  PROJ: UTM\n  EL_NAME: WGS84\n");
        let msgs = messages(parse(&both, &CompileOptions::default()).0);
        assert_eq!(msgs, vec!["DT_NAME and EL_NAME are mutually exclusive"]);

        let degrees = UTM.replace("UNIT: METER", "UNIT: DEGREE");
        let msgs = messages(parse(&degrees, &CompileOptions::default()).0);
        assert_eq!(msgs, vec!["unit DEGREE cannot be used with projection UTM"]);

        let unknown = CompileOptions {
            companions: Companions::default().with_datums(["NAD83"]),
            ..Default::default()
        };
        let msgs = messages(parse(UTM, &unknown).0);
        assert_eq!(msgs, vec!["datum WGS84 is not defined"]);
    }

    #[test]
    fn test_ranges() {
        let source = UTM
            .replace("ZONE_NBR: 31", "ZONE_NBR: 61")
            .replace("MAX_LAT: 84.0", "MAX_LAT: -1.0");
        let msgs = messages(parse(&source, &CompileOptions::default()).0);
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().any(|m| m.starts_with("UTM zone 61 is outside")));

        let source = UTM.replace("  UNIT: METER\n", "  UNIT: METER\n  QUAD: 7\n");
        assert_eq!(messages(parse(&source, &CompileOptions::default()).0).len(), 1);
    }

    #[test]
    fn test_unused_origin_warns() {
        let source = UTM.replace("  UNIT: METER\n", "  UNIT: METER\n  SCL_RED: 0.9996\n  GROUP: NOWHERE\n");
        let (res, warnings) = parse(&source, &CompileOptions::default());
        assert!(res.is_ok());
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w == "SCL_RED is not used by projection UTM"));
        assert!(warnings.iter().any(|w| w == "unknown group NOWHERE"));
    }
}
