use crate::error::{Error, Result};

use core::slice::Iter;
use geo_types::Coord;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Number of implied decimal digits in the provider's coordinate encoding
pub const FIXED_POINT_DIGITS: usize = 6;

// Column positions in a feature row
const COL_LONGITUDE: usize = 0;
const COL_LATITUDE: usize = 1;
const COL_ELEVATION: usize = 2;
const COL_DISTANCE: usize = 3;
const COL_COST: usize = 4;
const COL_WAY_TAGS: usize = 9;
const COL_NODE_TAGS: usize = 10;

/// Decode a fixed-point coordinate by inserting the decimal point
/// [`FIXED_POINT_DIGITS`] digits from the end, e.g. `"123456789"` becomes
/// `123.456789`. Inputs shorter than that are zero padded.
pub fn decode_fixed_point(text: &str) -> Result<f64> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", text.strip_prefix('+').unwrap_or(text)),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Route(
            format!("invalid fixed-point coordinate '{}'", text)));
    }

    // Keep at least one digit in front of the decimal point
    let padded = format!("{:0>width$}", digits, width = FIXED_POINT_DIGITS + 1);
    let split = padded.len() - FIXED_POINT_DIGITS;
    let decimal = format!("{}{}.{}", sign, &padded[..split], &padded[split..]);

    decimal.parse().map_err(|_| {
        Error::Route(format!("invalid fixed-point coordinate '{}'", text))
    })
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackPoint {
    pub pos: Coord<f64>,
    pub ele: f64,
}

impl TrackPoint {
    pub fn new(lon: f64, lat: f64, ele: f64) -> Self {
        Self {
            pos: Coord { x: lon, y: lat },
            ele: ele,
        }
    }

    pub fn lon(&self) -> f64 {
        self.pos.x
    }

    pub fn lat(&self) -> f64 {
        self.pos.y
    }

    fn from_position(position: &[f64], i: usize) -> Result<Self> {
        match position {
            [lon, lat] => Ok(TrackPoint::new(*lon, *lat, 0.0)),
            [lon, lat, ele, ..] => Ok(TrackPoint::new(*lon, *lat, *ele)),
            _ => Err(Error::Route(
                format!("coordinate {} has {} members, expected 2 or 3",
                        i, position.len()))),
        }
    }
}

impl fmt::Display for TrackPoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({}, {}, {})", self.lon(), self.lat(), self.ele)
    }
}

/// One annotated row from the route's feature list.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureAnnotation {
    pub longitude: String,
    pub latitude: String,
    pub elevation: f64,
    pub distance: i64,
    pub cost: String,
    pub tags: [String; 2],
}

impl FeatureAnnotation {
    pub fn from_row(row: &[Value], i: usize) -> Result<Self> {
        let elevation = required_cell(row, COL_ELEVATION, "elevation", i)?;
        let distance = required_cell(row, COL_DISTANCE, "distance", i)?;

        Ok(Self {
            longitude: cell_text(
                required_cell(row, COL_LONGITUDE, "longitude", i)?),
            latitude: cell_text(
                required_cell(row, COL_LATITUDE, "latitude", i)?),
            elevation: cell_f64(elevation).ok_or_else(|| {
                Error::Route(format!("feature {}: invalid elevation {}", i,
                                     elevation))
            })?,
            distance: cell_f64(distance).map(|d| d as i64).ok_or_else(|| {
                Error::Route(format!("feature {}: invalid distance {}", i,
                                     distance))
            })?,
            cost: row.get(COL_COST).map(cell_text).unwrap_or_default(),
            tags: [
                row.get(COL_WAY_TAGS).map(cell_text).unwrap_or_default(),
                row.get(COL_NODE_TAGS).map(cell_text).unwrap_or_default(),
            ],
        })
    }

    pub fn position(&self) -> Result<Coord<f64>> {
        Ok(Coord {
            x: decode_fixed_point(&self.longitude)?,
            y: decode_fixed_point(&self.latitude)?,
        })
    }

    pub fn note(&self) -> String {
        format!("Distance={}m; CostPerKm={}; Tags: {} {}", self.distance,
                self.cost, self.tags[0], self.tags[1])
    }
}

fn required_cell<'a>(row: &'a [Value], col: usize, name: &str, i: usize)
                     -> Result<&'a Value> {
    row.get(col).ok_or_else(|| {
        Error::Route(format!("feature {} has no {} column", i, name))
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

fn cell_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Where a coordinate was found on the route.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Exact(usize),
    // Not on the route; index of the second to last point
    NearEnd(usize),
}

impl Location {
    pub fn index(&self) -> usize {
        match *self {
            Location::Exact(i) | Location::NearEnd(i) => i,
        }
    }
}

#[derive(Deserialize)]
struct GeoJson {
    features: Vec<GeoFeature>,
}

#[derive(Deserialize)]
struct GeoFeature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(default)]
    messages: Vec<Vec<Value>>,
}

/// Dense track of coordinates plus the sparse annotated features along it.
///
/// The first row of the feature list stands for the route start. BRouter
/// writes its column headers there, so it is never decoded and
/// [`Route::features`] holds only the rows after it.
#[derive(Clone, Debug)]
pub struct Route {
    points: Vec<TrackPoint>,
    features: Vec<FeatureAnnotation>,
}

impl Route {
    pub fn new(points: Vec<TrackPoint>, features: Vec<FeatureAnnotation>)
               -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::Route(
                format!("route needs at least 2 coordinates, got {}",
                        points.len())));
        }

        Ok(Self {
            points: points,
            features: features,
        })
    }

    pub fn read_geojson(fname: &Path) -> Result<Self> {
        let file = File::open(fname).map_err(|e| Error::file(fname, e))?;
        let reader = BufReader::new(file);

        let geo_json: GeoJson = serde_json::from_reader(reader).map_err(|e| {
            Error::Route(format!("{}: {}", fname.display(), e))
        })?;

        Route::from_geojson(geo_json)
    }

    pub fn from_geojson_str(data: &str) -> Result<Self> {
        let geo_json: GeoJson = serde_json::from_str(data)
            .map_err(|e| Error::Route(e.to_string()))?;

        Route::from_geojson(geo_json)
    }

    fn from_geojson(geo_json: GeoJson) -> Result<Self> {
        // Assume first feature in file is the track to use.
        let track = geo_json.features.into_iter().next().ok_or_else(|| {
            Error::Route("no features in GeoJSON".to_string())
        })?;

        let mut rows = track.properties.messages.into_iter();

        if rows.next().is_none() {
            return Err(Error::Route(
                "feature list is missing or empty".to_string()));
        }

        let features = rows.enumerate()
            .map(|(i, row)| FeatureAnnotation::from_row(&row, i + 1))
            .collect::<Result<Vec<_>>>()?;

        let points = track.geometry.coordinates.iter().enumerate()
            .map(|(i, p)| TrackPoint::from_position(p, i))
            .collect::<Result<Vec<_>>>()?;

        Route::new(points, features)
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn features(&self) -> &[FeatureAnnotation] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    // Find the first point at exactly (lon, lat). The final featured point
    // usually has no exact match, so fall back to the penultimate point.
    pub fn locate_index(&self, lon: f64, lat: f64) -> Location {
        for (i, p) in self.points.iter().enumerate() {
            if p.lon() == lon && p.lat() == lat {
                return Location::Exact(i);
            }
        }

        return Location::NearEnd(self.points.len() - 2);
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a TrackPoint;

    type IntoIter = Iter<'a, TrackPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.points.len();
        formatter.write_fmt(format_args!("{} -> {} ({} pts, {} features)",
                                         self.points[0], self.points[c - 1],
                                         c, self.features.len()))
    }
}
