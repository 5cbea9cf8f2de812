//! Meaning of the generic projection parameter slots.

use std::fmt;

/// What one of the 24 generic parameter slots of a coordinate system means
/// for a given projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    CentralMeridian,
    StandardParallel1,
    StandardParallel2,
    /// Azimuth of the y axis (or central line) measured from north.
    Azimuth,
    UtmZone,
    /// `+1` north, `-1` south.
    Hemisphere,
    /// Longitude / latitude of an auxiliary point.
    PointLongitude1,
    PointLatitude1,
    PointLongitude2,
    PointLatitude2,
    /// Bipolar oblique conic poles.
    PoleALongitude,
    PoleALatitude,
    PoleBLongitude,
    PoleBLatitude,
    /// Angular distance between the two poles.
    PoleDistance,
    /// Angular distance from a pole to a standard circle.
    PoleParallelDistance1,
    PoleParallelDistance2,
    /// Working origin azimuth derived by [`fill_in`](super::fill_in::fill_in).
    OriginAzimuth,
    ObliquePoleLongitude,
    ObliquePoleLatitude,
    ObliqueConeParallel,
    EasternMeridian,
    NorthernParallel,
    SouthernParallel,
    /// Post projection affine transformation coefficients.
    AffineA0,
    AffineB0,
    AffineA1,
    AffineA2,
    AffineB1,
    AffineB2,
    /// Central meridian of one lobe of an interrupted projection.
    LobeMeridian,
    GeoidSeparation,
    AverageElevation,
    /// Planar rotation of a non-earth system.
    Rotation,
    /// Planar scale of a non-earth system.
    PlanarScale,
    /// Zone or region number of a zoned planar system.
    Region,
}

/// Physical kind of a parameter, driving range validation and comparison
/// tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Longitude,
    Latitude,
    Azimuth,
    /// Angular distance in degrees.
    AngularDistance,
    /// Linear quantity in the units of the coordinate system.
    Linear,
    /// Dimensionless coefficient.
    Coefficient,
    /// Small integer (zone, hemisphere, region).
    Integer,
}

impl ParamRole {
    pub fn kind(self) -> ParamKind {
        use ParamRole::*;
        match self {
            CentralMeridian | PointLongitude1 | PointLongitude2 | PoleALongitude
            | PoleBLongitude | ObliquePoleLongitude | EasternMeridian | LobeMeridian => {
                ParamKind::Longitude
            }
            StandardParallel1 | StandardParallel2 | PointLatitude1 | PointLatitude2
            | PoleALatitude | PoleBLatitude | ObliquePoleLatitude | ObliqueConeParallel
            | NorthernParallel | SouthernParallel => ParamKind::Latitude,
            Azimuth | OriginAzimuth | Rotation => ParamKind::Azimuth,
            PoleDistance | PoleParallelDistance1 | PoleParallelDistance2 => {
                ParamKind::AngularDistance
            }
            AffineA0 | AffineB0 | GeoidSeparation | AverageElevation => ParamKind::Linear,
            AffineA1 | AffineA2 | AffineB1 | AffineB2 | PlanarScale => ParamKind::Coefficient,
            UtmZone | Hemisphere | Region => ParamKind::Integer,
        }
    }

    /// Inclusive validity range applied by the compiler, `None` when any
    /// finite value is acceptable.
    pub fn valid_range(self) -> Option<(f64, f64)> {
        match self {
            ParamRole::UtmZone => Some((1.0, 60.0)),
            ParamRole::Hemisphere => Some((-1.0, 1.0)),
            ParamRole::Region => Some((1.0, 9999.0)),
            _ => match self.kind() {
                ParamKind::Longitude => Some((-360.0, 360.0)),
                ParamKind::Latitude => Some((-90.0, 90.0)),
                ParamKind::Azimuth => Some((-360.0, 360.0)),
                ParamKind::AngularDistance => Some((0.0, 180.0)),
                _ => None,
            },
        }
    }

    /// Whether a zero value means "not supplied" for this role.
    pub fn is_optional(self) -> bool {
        use ParamRole::*;
        matches!(
            self,
            OriginAzimuth
                | AffineA0
                | AffineB0
                | GeoidSeparation
                | AverageElevation
                | Rotation
                | LobeMeridian
        )
    }

    pub fn label(self) -> &'static str {
        use ParamRole::*;
        match self {
            CentralMeridian => "central meridian",
            StandardParallel1 => "first standard parallel",
            StandardParallel2 => "second standard parallel",
            Azimuth => "azimuth",
            UtmZone => "UTM zone",
            Hemisphere => "hemisphere",
            PointLongitude1 => "first point longitude",
            PointLatitude1 => "first point latitude",
            PointLongitude2 => "second point longitude",
            PointLatitude2 => "second point latitude",
            PoleALongitude => "pole A longitude",
            PoleALatitude => "pole A latitude",
            PoleBLongitude => "pole B longitude",
            PoleBLatitude => "pole B latitude",
            PoleDistance => "pole distance",
            PoleParallelDistance1 => "first standard circle distance",
            PoleParallelDistance2 => "second standard circle distance",
            OriginAzimuth => "origin azimuth",
            ObliquePoleLongitude => "oblique pole longitude",
            ObliquePoleLatitude => "oblique pole latitude",
            ObliqueConeParallel => "oblique cone standard parallel",
            EasternMeridian => "eastern meridian",
            NorthernParallel => "northern parallel",
            SouthernParallel => "southern parallel",
            AffineA0 => "affine A0",
            AffineB0 => "affine B0",
            AffineA1 => "affine A1",
            AffineA2 => "affine A2",
            AffineB1 => "affine B1",
            AffineB2 => "affine B2",
            LobeMeridian => "lobe central meridian",
            GeoidSeparation => "geoid separation",
            AverageElevation => "average elevation",
            Rotation => "rotation",
            PlanarScale => "planar scale",
            Region => "region",
        }
    }
}

impl fmt::Display for ParamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
