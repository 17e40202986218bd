//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference systems understood by the extraction pipeline.
///
/// Uploaded vector data and remote rasters may arrive in any of these;
/// everything is normalized to [`CrsCode::Epsg4326`] before it is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees). The canonical CRS.
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 / UTM (EPSG:326zz north, EPSG:327zz south)
    Utm { zone: u8, north: bool },
    /// MODIS sinusoidal grid on a sphere of radius 6371007.181 m (SR-ORG:6974)
    Sinusoidal,
}

impl CrsCode {
    /// Build from a numeric EPSG code.
    ///
    /// SIRGAS 2000 codes map onto their WGS84 counterparts; the two frames
    /// agree to well under a metre.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        match code {
            4326 | 4674 => Ok(CrsCode::Epsg4326),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            32601..=32660 => Ok(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            // SIRGAS 2000 / UTM zones 11N..22N and 17S..25S
            31965..=31976 => Ok(CrsCode::Utm {
                zone: (code - 31954) as u8,
                north: true,
            }),
            31977..=31985 => Ok(CrsCode::Utm {
                zone: (code - 31960) as u8,
                north: false,
            }),
            _ => Err(CrsParseError::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Parse a CRS identifier string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:32619"
    /// - "CRS:84" and "urn:ogc:def:crs:OGC:1.3:CRS84" (lon/lat WGS84)
    /// - "urn:ogc:def:crs:EPSG::32619"
    /// - "http://www.opengis.net/def/crs/EPSG/0/3857"
    pub fn from_identifier(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" || normalized.ends_with("CRS84") {
            return Ok(CrsCode::Epsg4326);
        }

        if normalized == "SR-ORG:6974" {
            return Ok(CrsCode::Sinusoidal);
        }

        let code = if let Some(rest) = normalized.strip_prefix("EPSG:") {
            rest
        } else if normalized.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            normalized.rsplit(':').next().unwrap_or_default()
        } else if normalized.contains("/DEF/CRS/EPSG/") {
            normalized.rsplit('/').next().unwrap_or_default()
        } else {
            return Err(CrsParseError::UnsupportedCrs(s.to_string()));
        };

        let code: u32 = code
            .parse()
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))?;
        Self::from_epsg(code)
    }

    /// Recognize a CRS from WKT1 (including ESRI `.prj` flavour) or WKT2 text.
    ///
    /// An EPSG authority on the outermost CRS node decides: a code outside
    /// [`CrsCode::from_epsg`] is rejected rather than guessed from the name.
    /// Without one, names are matched against the supported projections, but
    /// only on a WGS84 or SIRGAS 2000 datum. Sinusoidal definitions must
    /// describe the MODIS grid.
    ///
    /// Bare citations such as `WGS 84 / UTM zone 20S` (no `DATUM` node) are
    /// judged by the datum named in the text itself.
    pub fn from_wkt(wkt: &str) -> Result<Self, CrsParseError> {
        let upper = wkt.to_uppercase();
        let name: String = wkt.chars().take(64).collect();

        if let Some(code) = root_epsg_authority(&upper) {
            return Self::from_epsg(code);
        }

        if upper.contains("SINUSOIDAL") {
            let params = SinusoidalParams::from_wkt(&upper);
            return if params.is_modis() {
                Ok(CrsCode::Sinusoidal)
            } else {
                Err(CrsParseError::UnsupportedCrs(format!(
                    "sinusoidal grid other than MODIS: {}",
                    name
                )))
            };
        }

        let datum = quoted_after(&upper, "DATUM[\"")
            .or_else(|| quoted_after(&upper, "ENSEMBLE[\""))
            .unwrap_or(&upper);
        if !is_wgs84_equivalent(datum) {
            return Err(CrsParseError::UnsupportedCrs(format!(
                "datum {}",
                datum.chars().take(64).collect::<String>()
            )));
        }

        if upper.contains("PSEUDO-MERCATOR")
            || upper.contains("PSEUDO_MERCATOR")
            || upper.contains("MERCATOR_AUXILIARY_SPHERE")
            || upper.contains("POPULAR VISUALISATION")
        {
            return Ok(CrsCode::Epsg3857);
        }

        if let Some(crs) = utm_from_name(&upper) {
            return Ok(crs);
        }

        let geographic = upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS");
        if geographic {
            return Ok(CrsCode::Epsg4326);
        }

        Err(CrsParseError::UnrecognizedWkt(name))
    }

    /// Numeric EPSG code, if this CRS has one.
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CrsCode::Epsg4326 => Some(4326),
            CrsCode::Epsg3857 => Some(3857),
            CrsCode::Utm { zone, north: true } => Some(32600 + *zone as u32),
            CrsCode::Utm { zone, north: false } => Some(32700 + *zone as u32),
            CrsCode::Sinusoidal => None,
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg_code() {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "SR-ORG:6974"),
        }
    }
}

/// Sphere radius of the MODIS sinusoidal grid.
pub const MODIS_SPHERE_RADIUS: f64 = 6_371_007.181;

/// Parameters of a sinusoidal definition, as far as the source states them.
///
/// Anything left `None` is taken to be the MODIS value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SinusoidalParams {
    pub semi_major: Option<f64>,
    pub semi_minor: Option<f64>,
    pub inverse_flattening: Option<f64>,
    pub central_meridian: Option<f64>,
    pub false_easting: Option<f64>,
    pub false_northing: Option<f64>,
}

impl SinusoidalParams {
    /// Whether these parameters describe SR-ORG:6974.
    pub fn is_modis(&self) -> bool {
        let on_sphere = |v: Option<f64>| v.map_or(true, |r| (r - MODIS_SPHERE_RADIUS).abs() < 0.01);
        let zero = |v: Option<f64>| v.map_or(true, |x| x.abs() < 1e-6);

        on_sphere(self.semi_major)
            && on_sphere(self.semi_minor)
            && zero(self.inverse_flattening)
            && zero(self.central_meridian)
            && zero(self.false_easting)
            && zero(self.false_northing)
    }

    fn from_wkt(upper: &str) -> Self {
        let mut params = SinusoidalParams::default();

        let ellipsoid = quoted_node_numbers(upper, "SPHEROID[\"")
            .or_else(|| quoted_node_numbers(upper, "ELLIPSOID[\""))
            .unwrap_or_default();
        params.semi_major = ellipsoid.first().copied();
        params.inverse_flattening = ellipsoid.get(1).copied();

        let mut rest = upper;
        while let Some(pos) = rest.find("PARAMETER[\"") {
            rest = &rest[pos + "PARAMETER[\"".len()..];
            let name = rest.split('"').next().unwrap_or_default();
            let value = quoted_node_numbers(rest, "").and_then(|v| v.first().copied());
            let name = name.replace('_', " ");
            if name.contains("CENTRAL MERIDIAN") || name.contains("LONGITUDE OF") {
                params.central_meridian = value;
            } else if name.contains("FALSE EASTING") {
                params.false_easting = value;
            } else if name.contains("FALSE NORTHING") {
                params.false_northing = value;
            }
        }
        params
    }
}

/// Find the EPSG code attached to the outermost CRS node.
///
/// Only `AUTHORITY[...]` (WKT1) or `ID[...]` (WKT2) children of the root
/// count; codes on the base CRS, datum or units sit deeper.
fn root_epsg_authority(upper: &str) -> Option<u32> {
    let markers = ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","];
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut prev = ' ';

    for (pos, c) in upper.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '[' | '(' if !in_quote => depth += 1,
            ']' | ')' if !in_quote => depth = depth.saturating_sub(1),
            _ if !in_quote && depth == 1 && prev == ',' => {
                if let Some(marker) = markers.iter().find(|m| upper[pos..].starts_with(*m)) {
                    let digits: String = upper[pos + marker.len()..]
                        .chars()
                        .skip_while(|c| *c == '"' || c.is_whitespace())
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    return digits.parse().ok();
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev = c;
        }
    }
    None
}

/// Text of the quoted name that follows `marker`.
fn quoted_after<'a>(upper: &'a str, marker: &str) -> Option<&'a str> {
    let start = upper.find(marker)? + marker.len();
    upper[start..].split('"').next()
}

/// Numbers following the quoted name of the node that starts at `marker`,
/// e.g. `[6371007.181, 0]` for `SPHEROID["Custom",6371007.181,0,...]`.
fn quoted_node_numbers(upper: &str, marker: &str) -> Option<Vec<f64>> {
    let start = upper.find(marker)? + marker.len();
    let after_name = &upper[start..];
    let close = after_name.find('"')?;
    let numbers = after_name[close + 1..]
        .split(|c| c == ',' || c == ']' || c == ')')
        .skip(1)
        .map_while(|token| token.trim().parse::<f64>().ok())
        .collect();
    Some(numbers)
}

fn is_wgs84_equivalent(datum: &str) -> bool {
    let squashed: String = datum
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    squashed.contains("WGS1984")
        || squashed.contains("WGS84")
        || squashed.contains("WORLDGEODETICSYSTEM1984")
        || squashed.contains("SIRGAS2000")
}

/// Match names like `WGS_1984_UTM_Zone_19N` or `WGS 84 / UTM zone 19S`.
fn utm_from_name(upper: &str) -> Option<CrsCode> {
    let idx = upper.find("UTM_ZONE_").or_else(|| upper.find("UTM ZONE "))?;
    let rest = &upper[idx + "UTM_ZONE_".len()..];

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone: u8 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }

    let north = match rest[digits.len()..].chars().next() {
        Some('N') => true,
        Some('S') => false,
        _ => return None,
    };

    Some(CrsCode::Utm { zone, north })
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Unrecognized CRS definition: {0}")]
    UnrecognizedWkt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(
            CrsCode::from_identifier("EPSG:4326").unwrap(),
            CrsCode::Epsg4326
        );
        assert_eq!(
            CrsCode::from_identifier("epsg:3857").unwrap(),
            CrsCode::Epsg3857
        );
        assert_eq!(
            CrsCode::from_identifier("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            CrsCode::Epsg4326
        );
        assert_eq!(
            CrsCode::from_identifier("urn:ogc:def:crs:EPSG::32719").unwrap(),
            CrsCode::Utm {
                zone: 19,
                north: false
            }
        );
        assert_eq!(
            CrsCode::from_identifier("http://www.opengis.net/def/crs/EPSG/0/32619").unwrap(),
            CrsCode::Utm {
                zone: 19,
                north: true
            }
        );
        assert!(CrsCode::from_identifier("EPSG:99999").is_err());
        assert!(CrsCode::from_identifier("not a crs").is_err());
    }

    #[test]
    fn test_esri_prj_utm() {
        let prj = r#"PROJCS["WGS_1984_UTM_Zone_19N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-69.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        assert_eq!(
            CrsCode::from_wkt(prj).unwrap(),
            CrsCode::Utm {
                zone: 19,
                north: true
            }
        );
    }

    #[test]
    fn test_esri_prj_geographic() {
        let prj = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(CrsCode::from_wkt(prj).unwrap(), CrsCode::Epsg4326);
    }

    #[test]
    fn test_wkt_outer_authority_wins() {
        // The GEOGCS authority (4326) appears first; the PROJCS one is the CRS.
        let wkt = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","3857"]]"#;
        assert_eq!(CrsCode::from_wkt(wkt).unwrap(), CrsCode::Epsg3857);
    }

    #[test]
    fn test_wkt2_sinusoidal() {
        let wkt = r#"PROJCRS["unnamed",BASEGEOGCRS["Unknown datum based upon the custom spheroid"],CONVERSION["unnamed",METHOD["Sinusoidal"]]]"#;
        assert_eq!(CrsCode::from_wkt(wkt).unwrap(), CrsCode::Sinusoidal);
    }

    #[test]
    fn test_unsupported_outer_authority_is_rejected() {
        let prj = r#"PROJCS["NAD27 / UTM zone 17N",GEOGCS["NAD27",DATUM["North_American_Datum_1927",SPHEROID["Clarke 1866",6378206.4,294.9786982138982,AUTHORITY["EPSG","7008"]],AUTHORITY["EPSG","6267"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4267"]],PROJECTION["Transverse_Mercator"],PARAMETER["central_meridian",-81],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","26717"]]"#;
        assert!(matches!(
            CrsCode::from_wkt(prj),
            Err(CrsParseError::UnsupportedCrs(msg)) if msg == "EPSG:26717"
        ));
    }

    #[test]
    fn test_utm_name_on_foreign_datum_is_rejected() {
        let prj = r#"PROJCS["SAD_1969_UTM_Zone_22S",GEOGCS["GCS_South_American_1969",DATUM["D_South_American_1969",SPHEROID["GRS_1967_Truncated",6378160.0,298.25]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-51.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        assert!(matches!(
            CrsCode::from_wkt(prj),
            Err(CrsParseError::UnsupportedCrs(_))
        ));

        let nad27 = prj
            .replace("SAD_1969_UTM_Zone_22S", "NAD_1927_UTM_Zone_17N")
            .replace("D_South_American_1969", "D_North_American_1927");
        assert!(CrsCode::from_wkt(&nad27).is_err());
        assert!(CrsCode::from_wkt("SAD69 / UTM zone 22S").is_err());
    }

    #[test]
    fn test_nested_authority_does_not_name_the_crs() {
        // Only the GEOGCS carries a code; the projected CRS itself is NAD83.
        let wkt = r#"PROJCS["NAD83 / UTM zone 19N",GEOGCS["NAD83",DATUM["North_American_Datum_1983"],AUTHORITY["EPSG","4269"]],UNIT["metre",1,AUTHORITY["EPSG","9001"]]]"#;
        assert!(CrsCode::from_wkt(wkt).is_err());
    }

    #[test]
    fn test_sirgas_2000_treated_as_wgs84() {
        let prj = r#"PROJCS["SIRGAS_2000_UTM_Zone_19S",GEOGCS["GCS_SIRGAS_2000",DATUM["D_SIRGAS_2000",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["Central_Meridian",-69.0],UNIT["Meter",1.0]]"#;
        assert_eq!(
            CrsCode::from_wkt(prj).unwrap(),
            CrsCode::Utm {
                zone: 19,
                north: false
            }
        );
        assert_eq!(
            CrsCode::from_epsg(31979).unwrap(),
            CrsCode::Utm {
                zone: 19,
                north: false
            }
        );
        assert_eq!(
            CrsCode::from_epsg(31976).unwrap(),
            CrsCode::Utm {
                zone: 22,
                north: true
            }
        );
        assert_eq!(CrsCode::from_epsg(4674).unwrap(), CrsCode::Epsg4326);
    }

    #[test]
    fn test_modis_sinusoidal_wkt2() {
        let wkt = r#"PROJCRS["unnamed",BASEGEOGCRS["Unknown datum based upon the custom spheroid",DATUM["Not specified (based on custom spheroid)",ELLIPSOID["Custom spheroid",6371007.181,0,LENGTHUNIT["metre",1,ID["EPSG",9001]]]],PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433,ID["EPSG",9122]]]],CONVERSION["unnamed",METHOD["Sinusoidal"],PARAMETER["Longitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433],ID["EPSG",8802]],PARAMETER["False easting",0,LENGTHUNIT["metre",1],ID["EPSG",8806]],PARAMETER["False northing",0,LENGTHUNIT["metre",1],ID["EPSG",8807]]],CS[Cartesian,2],LENGTHUNIT["metre",1,ID["EPSG",9001]]]"#;
        assert_eq!(CrsCode::from_wkt(wkt).unwrap(), CrsCode::Sinusoidal);
    }

    #[test]
    fn test_other_sinusoidal_grids_are_rejected() {
        let world = r#"PROJCS["World_Sinusoidal",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Sinusoidal"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],UNIT["Meter",1.0]]"#;
        assert!(CrsCode::from_wkt(world).is_err());

        let shifted = r#"PROJCS["MODIS",GEOGCS["Sphere",DATUM["Custom",SPHEROID["Custom",6371007.181,0.0]]],PROJECTION["Sinusoidal"],PARAMETER["False_Easting",1000000.0],PARAMETER["Central_Meridian",-54.0]]"#;
        assert!(CrsCode::from_wkt(shifted).is_err());

        assert!(!SinusoidalParams {
            semi_major: Some(6378137.0),
            ..Default::default()
        }
        .is_modis());
        assert!(SinusoidalParams::default().is_modis());
    }

    #[test]
    fn test_display_round_trip() {
        for code in [4326, 3857, 32619, 32733] {
            let crs = CrsCode::from_epsg(code).unwrap();
            assert_eq!(CrsCode::from_identifier(&crs.to_string()).unwrap(), crs);
        }
        assert_eq!(CrsCode::Sinusoidal.to_string(), "SR-ORG:6974");
    }
}
