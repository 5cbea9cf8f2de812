//! Ellipsoid source records.
//!
//! ```text
//! EL_NAME: CLRK66
//!   DESCR: Clarke 1866, Benoit ratio
//!   SOURCE: US Defense Mapping Agency, TR-8350.2-B
//!   E_RAD: 6378206.4
//!   P_RAD: 6356583.8          # or INV_FLAT: 294.9786982
//!   EPSG: 7008
//! ```

use crate::{
    constants::{DESC_LEN, KEY_NAME_LEN},
    dictionary::ellipsoid_def::EllipsoidDef,
};

use super::{lexer::SourceBlock, RecordContext, SourceRecord};

/// Eccentricity above which a definition is rejected.
pub const MAX_ECCENTRICITY: f64 = 0.2;

/// Equatorial radius window outside of which a warning is raised, meters.
pub const EARTH_RADIUS_RANGE: (f64, f64) = (6_350_000.0, 6_400_000.0);

impl SourceRecord for EllipsoidDef {
    const NAME_KEYWORD: &'static str = "EL_NAME";

    fn from_source(block: &SourceBlock, ctx: &mut RecordContext) -> Self {
        let mut def = EllipsoidDef {
            key_nm: block.name.clone(),
            protect: ctx.protect(),
            ..Default::default()
        };
        let mut e_rad = None;
        let mut p_rad = None;
        let mut inv_flat = None;

        for line in &block.fields {
            match line.keyword.as_str() {
                "GROUP" => def.group = ctx.text(line, KEY_NAME_LEN),
                "DESCR" => def.desc_nm = ctx.text(line, DESC_LEN),
                "SOURCE" => def.source = ctx.text(line, DESC_LEN),
                "E_RAD" => e_rad = Some((line.number, ctx.number(line))),
                "P_RAD" => p_rad = Some((line.number, ctx.number(line))),
                "INV_FLAT" => inv_flat = Some((line.number, ctx.number(line))),
                "EPSG" => def.epsg = ctx.integer(line),
                _ => ctx.unknown_keyword(line),
            }
        }

        let Some((e_line, e_rad)) = e_rad else {
            ctx.error(block.line, "E_RAD is required");
            return def;
        };
        if e_rad <= 0.0 {
            ctx.error(e_line, format!("equatorial radius {e_rad} must be positive"));
            return def;
        }
        let p_rad = match (p_rad, inv_flat) {
            (Some(_), Some((line, _))) => {
                ctx.error(line, "P_RAD and INV_FLAT are mutually exclusive");
                return def;
            }
            (Some((line, p)), None) => {
                if p <= 0.0 || p > e_rad {
                    ctx.error(line, format!("polar radius {p} must be positive and at most {e_rad}"));
                    return def;
                }
                p
            }
            (None, Some((line, rf))) => {
                // zero inverse flattening is the conventional sphere
                if rf == 0.0 {
                    e_rad
                } else if rf < 1.0 {
                    ctx.error(line, format!("inverse flattening {rf} is out of range"));
                    return def;
                } else {
                    e_rad * (1.0 - 1.0 / rf)
                }
            }
            (None, None) => {
                ctx.error(block.line, "one of P_RAD or INV_FLAT is required");
                return def;
            }
        };

        def.e_rad = e_rad;
        def.p_rad = p_rad;
        def.derive_shape();

        if def.ecent >= MAX_ECCENTRICITY {
            ctx.error(
                block.line,
                format!("eccentricity {:.6} is not below {MAX_ECCENTRICITY}", def.ecent),
            );
        }
        if e_rad < EARTH_RADIUS_RANGE.0 || e_rad > EARTH_RADIUS_RANGE.1 {
            ctx.warn(e_line, format!("equatorial radius {e_rad} is not earth sized"));
        }
        if def.desc_nm.is_empty() {
            ctx.warn(block.line, "no description");
        }
        def
    }
}

#[cfg(test)]
mod test_ellipsoid_source {
    use super::*;
    use crate::{
        compiler::{parse_source, CompileOptions, WarningAction},
        geoframe_errors::GeoframeError,
    };
    use approx::assert_relative_eq;

    fn parse(source: &str) -> (Result<Vec<EllipsoidDef>, GeoframeError>, Vec<String>) {
        let mut warnings = Vec::new();
        let result = parse_source::<EllipsoidDef>(source, &CompileOptions::default(), &mut |w| {
            warnings.push(w.message.clone());
            WarningAction::Continue
        });
        (result, warnings)
    }

    #[test]
    fn test_inverse_flattening() {
        let (defs, warnings) = parse("EL_NAME: GRS1980\n DESCR: GRS 1980\n E_RAD: 6378137.0\n INV_FLAT: 298.257222101\n EPSG: 7019\n");
        let def = &defs.unwrap()[0];
        assert_relative_eq!(def.p_rad, 6_356_752.314_14, epsilon = 1e-3);
        assert_relative_eq!(def.ecent, 0.081_819_191, epsilon = 1e-9);
        assert_eq!(def.epsg, 7019);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_non_earth_body_warns() {
        let (defs, warnings) = parse("EL_NAME: MARS\n DESCR: Mars IAU 2000\n E_RAD: 3396190.0\n P_RAD: 3376200.0\n");
        assert!(defs.is_ok());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("not earth sized"));
    }

    #[test]
    fn test_rejections() {
        let (res, _) = parse("EL_NAME: FLAT\n DESCR: x\n E_RAD: 6378137.0\n P_RAD: 6000000.0\n");
        let GeoframeError::Validation(diags) = res.unwrap_err() else { panic!() };
        assert!(diags.0[0].message.contains("eccentricity"));

        let (res, _) = parse("EL_NAME: BOTH\n E_RAD: 6378137.0\n P_RAD: 6356752.0\n INV_FLAT: 298.25\n");
        assert!(res.is_err());

        let (res, _) = parse("EL_NAME: ODD\n E_RAD: 6378137.0\n P_RAD: 6356752.0\n COLOR: blue\n");
        let GeoframeError::Validation(diags) = res.unwrap_err() else { panic!() };
        assert_eq!(diags.0[0].message, "unknown keyword COLOR");
        assert_eq!(diags.0[0].line, 4);

        let (res, _) = parse("EL_NAME: bad  name\n E_RAD: 6378137.0\n P_RAD: 6356752.0\n");
        assert!(res.is_err());
    }
}
