//! # OGC WKT1 interop
//!
//! [`to_wkt`] writes a resolved coordinate system as a `GEOGCS[...]` or
//! `PROJCS[...]` string; [`from_wkt`] reads one back into definitions that
//! can be handed to the context.
//!
//! Only projections with a WKT name in the projection table can be
//! exchanged. UTM and Gauss-Kruger are written as plain Transverse Mercator,
//! Mercator variant B as variant A, with their implied values spelled out.

use std::fmt::Write as _;

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0, one_of},
    combinator::{all_consuming, map},
    multi::separated_list0,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};

use crate::{
    comparator::{effective_shift, normalize},
    constants::RADEG,
    dictionary::{
        coordsys_def::CoordSysDef,
        datum_def::{DatumDef, To84Via},
        ellipsoid_def::EllipsoidDef,
    },
    geoframe_errors::GeoframeError,
    key_name::eq_key,
    projection::{quadrant::Quadrant, ParamRole, ProjFlags, ProjectionInfo, PROJECTIONS},
    resolved::ResolvedCoordSys,
    units::{unit_by_factor, unit_by_name, UnitInfo, UnitKind, UNITS},
};

/// Datum name prefix marking a cartographically referenced system.
pub const ELLIPSOID_ONLY_PREFIX: &str = "Not_specified_based_on_";

/// Definitions read from a WKT string.
#[derive(Debug, Clone, PartialEq)]
pub struct WktDefinition {
    pub coordsys: CoordSysDef,
    /// `None` for a system referenced to an ellipsoid only. A datum without
    /// `TOWGS84` carries [`To84Via::None`].
    pub datum: Option<DatumDef>,
    pub ellipsoid: EllipsoidDef,
}

fn wkt_error(msg: impl Into<String>) -> GeoframeError {
    GeoframeError::Wkt(msg.into())
}

// ---------------------------------------------------------------------------
// Parameter names
// ---------------------------------------------------------------------------

fn role_wkt_name(role: ParamRole) -> Option<&'static str> {
    Some(match role {
        ParamRole::CentralMeridian => "central_meridian",
        ParamRole::StandardParallel1 => "standard_parallel_1",
        ParamRole::StandardParallel2 => "standard_parallel_2",
        ParamRole::Azimuth => "azimuth",
        ParamRole::PointLongitude1 => "longitude_of_point_1",
        ParamRole::PointLatitude1 => "latitude_of_point_1",
        ParamRole::PointLongitude2 => "longitude_of_point_2",
        ParamRole::PointLatitude2 => "latitude_of_point_2",
        _ => return None,
    })
}

fn canonical_param_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "longitude_of_center" | "longitude_of_origin" => "central_meridian".into(),
        "latitude_of_center" => "latitude_of_origin".into(),
        "scale_factor_at_natural_origin" => "scale_factor".into(),
        "standard_parallel1" => "standard_parallel_1".into(),
        "standard_parallel2" => "standard_parallel_2".into(),
        _ => lower,
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn spheroid(ellipsoid: &EllipsoidDef) -> String {
    let rf = if ellipsoid.flat == 0.0 { 0.0 } else { 1.0 / ellipsoid.flat };
    format!("SPHEROID[\"{}\",{},{}]", ellipsoid.key_nm, ellipsoid.e_rad, rf)
}

fn datum_node(cs: &ResolvedCoordSys) -> String {
    let ellipsoid = cs.ellipsoid();
    match cs.datum() {
        Some(datum) => {
            let mut node = format!("DATUM[\"{}\",{}", datum.key_name(), spheroid(ellipsoid));
            if let Some(([dx, dy, dz], [rx, ry, rz], ppm)) = effective_shift(&datum.def) {
                let _ = write!(node, ",TOWGS84[{dx},{dy},{dz},{rx},{ry},{rz},{ppm}]");
            }
            node.push(']');
            node
        }
        None => format!(
            "DATUM[\"{ELLIPSOID_ONLY_PREFIX}{}\",{}]",
            ellipsoid.key_nm,
            spheroid(ellipsoid)
        ),
    }
}

fn unit_node(unit: &UnitInfo) -> String {
    match unit.kind {
        UnitKind::Linear => format!("UNIT[\"{}\",{}]", unit.wkt_name, unit.factor),
        UnitKind::Angular => format!("UNIT[\"{}\",{}]", unit.wkt_name, unit.factor * RADEG),
    }
}

fn authority(epsg: i32) -> String {
    if epsg > 0 {
        format!(",AUTHORITY[\"EPSG\",\"{epsg}\"]")
    } else {
        String::new()
    }
}

fn projection_parameters(def: &CoordSysDef, proj: &ProjectionInfo) -> Result<Vec<(&'static str, f64)>, GeoframeError> {
    let mut params = Vec::new();
    if proj.has(ProjFlags::ORG_LAT) {
        params.push(("latitude_of_origin", def.org_lat));
    }
    if proj.has(ProjFlags::ORG_LNG) {
        params.push(("central_meridian", def.org_lng));
    }
    for (slot, &role) in proj.params.iter().enumerate() {
        match role_wkt_name(role) {
            Some(name) => params.push((name, def.prm[slot])),
            None if role.is_optional() && def.prm[slot] == 0.0 => {}
            None => {
                return Err(wkt_error(format!(
                    "{} of projection {} has no WKT parameter",
                    role.label(),
                    proj.key
                )))
            }
        }
    }
    if proj.has(ProjFlags::SCL_RED) {
        params.push(("scale_factor", def.scl_red));
    }
    params.push(("false_easting", def.x_off));
    params.push(("false_northing", def.y_off));
    Ok(params)
}

/// Write `cs` as an OGC WKT1 string.
///
/// Return
/// ----------
/// * The WKT text, or [`GeoframeError::Wkt`] when the projection has no WKT
///   name, a parameter has no WKT equivalent or the axes are not the
///   standard east/north pair.
pub fn to_wkt(cs: &ResolvedCoordSys) -> Result<String, GeoframeError> {
    if !Quadrant::from_code(cs.def.quad)?.is_standard() {
        return Err(wkt_error(format!("{}: axis orientation cannot be expressed", cs.key_name())));
    }

    if cs.is_geographic() {
        return Ok(format!(
            "GEOGCS[\"{}\",{},PRIMEM[\"Greenwich\",0],{}{}]",
            cs.key_name(),
            datum_node(cs),
            unit_node(cs.unit),
            authority(cs.def.epsg)
        ));
    }

    let (def, proj) = normalize(&cs.def, cs.ellipsoid().shape())?;
    let wkt_name = proj
        .wkt_name
        .ok_or_else(|| wkt_error(format!("projection {} has no WKT name", proj.key)))?;
    let degree = unit_by_name("DEGREE")?;
    let geog_name = cs
        .datum()
        .map_or_else(|| cs.ellipsoid().key_nm.clone(), |d| d.key_name().to_string());

    let mut out = format!(
        "PROJCS[\"{}\",GEOGCS[\"{}\",{},PRIMEM[\"Greenwich\",0],{}],PROJECTION[\"{}\"]",
        cs.key_name(),
        geog_name,
        datum_node(cs),
        unit_node(degree),
        wkt_name
    );
    for (name, value) in projection_parameters(&def, proj)? {
        let _ = write!(out, ",PARAMETER[\"{name}\",{value}]");
    }
    let _ = write!(out, ",{}{}]", unit_node(cs.unit), authority(cs.def.epsg));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Argument of a WKT node.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    Node(WktNode),
}

/// One bracketed WKT node: `KEYWORD[arg, arg, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

fn parse_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

fn parse_value(input: &str) -> IResult<&str, WktValue> {
    alt((
        map(parse_quoted, |s: &str| WktValue::Text(s.to_string())),
        map(parse_node, WktValue::Node),
        map(double, WktValue::Number),
    ))
    .parse(input)
}

fn parse_node(input: &str) -> IResult<&str, WktNode> {
    let (input, keyword) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)?;
    let (input, args) = delimited(
        preceded(multispace0, one_of("[(")),
        separated_list0(
            (multispace0, char(','), multispace0),
            preceded(multispace0, parse_value),
        ),
        preceded(multispace0, one_of("])")),
    )
    .parse(input)?;
    Ok((
        input,
        WktNode {
            keyword: keyword.to_ascii_uppercase(),
            args,
        },
    ))
}

/// Parse WKT text into its node tree.
pub fn parse_wkt_tree(text: &str) -> Result<WktNode, GeoframeError> {
    all_consuming(delimited(multispace0, parse_node, multispace0))
        .parse(text)
        .map(|(_, node)| node)
        .map_err(|e| GeoframeError::NomParsingError(e.to_string()))
}

impl WktNode {
    fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.args.iter().find_map(|a| match a {
            WktValue::Node(n) if n.keyword == keyword => Some(n),
            _ => None,
        })
    }

    fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.args.iter().filter_map(move |a| match a {
            WktValue::Node(n) if n.keyword == keyword => Some(n),
            _ => None,
        })
    }

    fn text(&self, i: usize) -> Result<&str, GeoframeError> {
        match self.args.get(i) {
            Some(WktValue::Text(s)) => Ok(s),
            _ => Err(wkt_error(format!("{}: argument {} must be a string", self.keyword, i + 1))),
        }
    }

    fn number(&self, i: usize) -> Result<f64, GeoframeError> {
        match self.args.get(i) {
            Some(WktValue::Number(v)) => Ok(*v),
            _ => Err(wkt_error(format!("{}: argument {} must be a number", self.keyword, i + 1))),
        }
    }

    fn require(&self, keyword: &str) -> Result<&WktNode, GeoframeError> {
        self.child(keyword)
            .ok_or_else(|| wkt_error(format!("{} has no {keyword}", self.keyword)))
    }

    fn epsg(&self) -> i32 {
        self.child("AUTHORITY")
            .filter(|a| a.text(0).is_ok_and(|auth| auth.eq_ignore_ascii_case("EPSG")))
            .and_then(|a| match a.args.get(1) {
                Some(WktValue::Text(code)) => code.parse().ok(),
                Some(WktValue::Number(code)) => Some(*code as i32),
                _ => None,
            })
            .unwrap_or(0)
    }
}

fn read_unit(node: &WktNode, kind: UnitKind) -> Result<&'static UnitInfo, GeoframeError> {
    let unit = node.require("UNIT")?;
    let name = unit.text(0)?;
    let factor = match kind {
        UnitKind::Linear => unit.number(1)?,
        UnitKind::Angular => unit.number(1)? / RADEG,
    };
    UNITS
        .iter()
        .find(|u| u.kind == kind && (eq_key(u.wkt_name, name) || eq_key(u.name, name)))
        .or_else(|| unit_by_factor(kind, factor))
        .ok_or_else(|| wkt_error(format!("unit '{name}' ({factor}) is not known")))
}

fn read_geogcs(geogcs: &WktNode) -> Result<(Option<DatumDef>, EllipsoidDef), GeoframeError> {
    let datum = geogcs.require("DATUM")?;
    let sph = datum.require("SPHEROID")?;
    let (a, rf) = (sph.number(1)?, sph.number(2)?);
    if a <= 0.0 || (rf != 0.0 && rf <= 1.0) {
        return Err(wkt_error(format!("spheroid {a}, {rf} is not valid")));
    }
    let p_rad = if rf == 0.0 { a } else { a * (1.0 - 1.0 / rf) };
    let ellipsoid = EllipsoidDef::new(sph.text(0)?, a, p_rad);

    let name = datum.text(0)?;
    if name.starts_with(ELLIPSOID_ONLY_PREFIX) {
        return Ok((None, ellipsoid));
    }
    let mut def = DatumDef::new(name, &ellipsoid.key_nm, To84Via::None);
    def.epsg = datum.epsg();
    if let Some(towgs) = datum.child("TOWGS84") {
        let p: Vec<f64> = (0..towgs.args.len()).map(|i| towgs.number(i)).collect::<Result<_, _>>()?;
        let get = |i: usize| p.get(i).copied().unwrap_or(0.0);
        def.delta = [get(0), get(1), get(2)];
        def.rotation = [get(3), get(4), get(5)];
        def.bwscale = get(6);
        def.to84_via = if def.rotation == [0.0; 3] && def.bwscale == 0.0 {
            if def.delta == [0.0; 3] {
                To84Via::Wgs84Equivalent
            } else {
                To84Via::ThreeParameter
            }
        } else {
            To84Via::BursaWolf
        };
        def.clear_unused_parameters();
    }
    Ok((Some(def), ellipsoid))
}

fn assign_parameter(
    def: &mut CoordSysDef,
    proj: &ProjectionInfo,
    name: &str,
    value: f64,
) -> Result<(), GeoframeError> {
    let slot = proj
        .params
        .iter()
        .position(|&role| role_wkt_name(role) == Some(name));
    match (name, slot) {
        (_, Some(slot)) => def.prm[slot] = value,
        ("central_meridian", None) => def.org_lng = value,
        ("latitude_of_origin", None) => def.org_lat = value,
        ("scale_factor", None) => def.scl_red = value,
        ("false_easting", None) => def.x_off = value,
        ("false_northing", None) => def.y_off = value,
        _ => {
            return Err(wkt_error(format!(
                "parameter {name} does not apply to projection {}",
                proj.key
            )))
        }
    }
    Ok(())
}

/// Read an OGC WKT1 `GEOGCS` or `PROJCS` string.
///
/// The returned coordinate system references the datum (or, for the
/// `Not_specified_based_on_` convention, the ellipsoid) by the names found
/// in the text.
pub fn from_wkt(text: &str) -> Result<WktDefinition, GeoframeError> {
    let root = parse_wkt_tree(text)?;
    let (geogcs, projected) = match root.keyword.as_str() {
        "GEOGCS" => (&root, false),
        "PROJCS" => (root.require("GEOGCS")?, true),
        other => return Err(wkt_error(format!("{other} is not a supported WKT object"))),
    };
    let (datum, ellipsoid) = read_geogcs(geogcs)?;

    let mut coordsys = if projected {
        let wkt_name = root.require("PROJECTION")?.text(0)?;
        let proj = PROJECTIONS
            .iter()
            .find(|p| p.wkt_name.is_some_and(|n| n.eq_ignore_ascii_case(wkt_name)))
            .ok_or_else(|| wkt_error(format!("projection {wkt_name} has no equivalent")))?;
        let unit = read_unit(&root, UnitKind::Linear)?;
        let mut def = CoordSysDef::new(root.text(0)?, proj.key, unit.name);
        for param in root.children("PARAMETER") {
            let name = canonical_param_name(param.text(0)?);
            assign_parameter(&mut def, proj, &name, param.number(1)?)?;
        }
        def
    } else {
        let unit = read_unit(geogcs, UnitKind::Angular)?;
        CoordSysDef::new(geogcs.text(0)?, "LL", unit.name)
    };

    coordsys.epsg = root.epsg();
    match &datum {
        Some(d) => coordsys.dat_knm = d.key_nm.clone(),
        None => coordsys.elp_knm = ellipsoid.key_nm.clone(),
    }
    Ok(WktDefinition {
        coordsys,
        datum,
        ellipsoid,
    })
}

#[cfg(test)]
mod test_wkt {
    use super::*;
    use crate::{
        comparator::compare_coordsys,
        dictionary::coordsys_def::test_coordsys_def::utm31n,
        resolved::{test_resolved::wgs84_datum, Reference},
    };
    use approx::assert_relative_eq;

    const LAMBERT_93: &str = r#"PROJCS["RGF93 / Lambert-93",
        GEOGCS["RGF93",
            DATUM["Reseau_Geodesique_Francais_1993",
                SPHEROID["GRS 1980",6378137,298.257222101],
                TOWGS84[0,0,0,0,0,0,0]],
            PRIMEM["Greenwich",0],
            UNIT["degree",0.0174532925199433]],
        PROJECTION["Lambert_Conformal_Conic_2SP"],
        PARAMETER["standard_parallel_1",49],
        PARAMETER["standard_parallel_2",44],
        PARAMETER["latitude_of_origin",46.5],
        PARAMETER["central_meridian",3],
        PARAMETER["false_easting",700000],
        PARAMETER["false_northing",6600000],
        UNIT["metre",1],
        AUTHORITY["EPSG","2154"]]"#;

    #[test]
    fn test_read_lambert_93() {
        let wkt = from_wkt(LAMBERT_93).unwrap();
        let cs = &wkt.coordsys;
        assert_eq!(cs.prj_knm, "LM2SP");
        assert_eq!(cs.unit, "METER");
        assert_eq!(cs.prm[0], 49.0);
        assert_eq!(cs.prm[1], 44.0);
        assert_eq!(cs.org_lng, 3.0);
        assert_eq!(cs.org_lat, 46.5);
        assert_eq!(cs.y_off, 6_600_000.0);
        assert_eq!(cs.epsg, 2154);
        assert_eq!(cs.dat_knm, "Reseau_Geodesique_Francais_1993");
        let datum = wkt.datum.unwrap();
        assert_eq!(datum.to84_via, To84Via::Wgs84Equivalent);
        assert_relative_eq!(wkt.ellipsoid.p_rad, 6_356_752.314_14, epsilon = 1e-3);
    }

    #[test]
    fn test_utm_round_trip() {
        let cs = ResolvedCoordSys::new(&utm31n(), Reference::Datum(wgs84_datum())).unwrap();
        let text = to_wkt(&cs).unwrap();
        assert!(text.starts_with("PROJCS[\"UTM84-31N\""));
        assert!(text.contains("PROJECTION[\"Transverse_Mercator\"]"));
        assert!(text.contains("PARAMETER[\"central_meridian\",3]"));
        assert!(text.contains("PARAMETER[\"scale_factor\",0.9996]"));

        let back = from_wkt(&text).unwrap();
        assert_eq!(back.coordsys.prj_knm, "TM");
        let cmp = compare_coordsys(&utm31n(), &back.coordsys).unwrap();
        assert!(cmp.is_equivalent(), "{cmp}");
    }

    #[test]
    fn test_geographic_and_ellipsoid_only() {
        let wkt = r#"GEOGCS["NTF (Paris)",DATUM["Not_specified_based_on_CLRK80IGN",SPHEROID["CLRK80IGN",6378249.2,293.4660212936269]],PRIMEM["Greenwich",0],UNIT["grad",0.01570796326794897]]"#;
        let def = from_wkt(wkt).unwrap();
        assert!(def.datum.is_none());
        assert_eq!(def.coordsys.elp_knm, "CLRK80IGN");
        assert_eq!(def.coordsys.prj_knm, "LL");
        assert_eq!(def.coordsys.unit, "GRAD");
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(from_wkt("PROJCS[\"x\""), Err(GeoframeError::NomParsingError(_))));
        assert!(matches!(from_wkt("VERT_CS[\"x\"]"), Err(GeoframeError::Wkt(_))));

        let mut def = CoordSysDef::new("AFFINE-TM", "TRMERAF", "METER");
        def.dat_knm = "WGS84".into();
        let cs = ResolvedCoordSys::new(&def, Reference::Datum(wgs84_datum())).unwrap();
        assert!(matches!(to_wkt(&cs), Err(GeoframeError::Wkt(_))));
    }
}
