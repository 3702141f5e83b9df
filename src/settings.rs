use crate::error::{Error, Result};

use lazy_regex::regex_captures;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

fn default_size() -> ImageSize { ImageSize::new(640, 640) }
fn default_fov() -> u32 { 90 }
fn default_pitch() -> i32 { 0 }
fn default_min_distance() -> i64 { 100 }
fn default_marker_gap() -> i64 { 1000 }
fn default_min_marker_gap() -> i64 { 300 }
fn default_api_base() -> String {
    "https://maps.googleapis.com/maps/api/streetview".to_string()
}
fn default_timeout_secs() -> u64 { 30 }

// Advanced keys are only written back when the user set them
fn is_default_api_base(v: &String) -> bool { *v == default_api_base() }
fn is_default_timeout_secs(v: &u64) -> bool { *v == default_timeout_secs() }

/// Street View image dimensions, written as `WxH` in the settings file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width,
            height: height,
        }
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("Invalid image size '{}', expected WxH", s);

        let (_, w, h) = regex_captures!(r"^\s*(\d+)\s*x\s*(\d+)\s*$", s)
            .ok_or_else(invalid)?;
        let size = ImageSize::new(w.parse().map_err(|_| invalid())?,
                                  h.parse().map_err(|_| invalid())?);

        if size.width == 0 || size.height == 0 {
            return Err(invalid());
        }

        Ok(size)
    }
}

impl TryFrom<String> for ImageSize {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageSize> for String {
    fn from(size: ImageSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}x{}", self.width, self.height)
    }
}

/// Persistent settings shared between runs. `file_counter` numbers the
/// output of each successful run and is written back afterwards.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_size")]
    pub size: ImageSize,
    #[serde(default = "default_fov")]
    pub fov: u32,
    #[serde(default = "default_pitch")]
    pub pitch: i32,
    #[serde(default = "default_min_distance")]
    pub min_distance: i64,
    #[serde(default = "default_marker_gap")]
    pub marker_gap: i64,
    #[serde(default = "default_min_marker_gap")]
    pub min_marker_gap: i64,
    #[serde(default)]
    pub file_counter: u64,
    #[serde(default = "default_api_base",
            skip_serializing_if = "is_default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs",
            skip_serializing_if = "is_default_timeout_secs")]
    pub timeout_secs: u64,
    // Keys this tool doesn't know about survive a rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            size: default_size(),
            fov: default_fov(),
            pitch: default_pitch(),
            min_distance: default_min_distance(),
            marker_gap: default_marker_gap(),
            min_marker_gap: default_min_marker_gap(),
            file_counter: 0,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    pub fn from_file(fname: &Path) -> Result<Settings> {
        let file = File::open(fname).map_err(|e| Error::file(fname, e))?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader).map_err(|e| {
            Error::Settings(format!("{}: {}", fname.display(), e))
        })
    }

    /// Read and validate the settings file.
    pub fn load(fname: &Path) -> Result<Settings> {
        let settings = Settings::from_file(fname)?;

        if settings.api_key.trim().is_empty() {
            return Err(Error::Settings(format!(
                "You need to add a Google Street View API key to {}!",
                fname.display())));
        }

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker_gap <= 0 {
            return Err(Error::Settings(
                format!("marker_gap must be positive, got {}",
                        self.marker_gap)));
        }

        if self.min_distance < 0 || self.min_marker_gap < 0 {
            return Err(Error::Settings(
                "min_distance and min_marker_gap must not be negative"
                    .to_string()));
        }

        if !(-90..=90).contains(&self.pitch) {
            return Err(Error::Settings(
                format!("pitch must be within -90..90, got {}", self.pitch)));
        }

        Ok(())
    }

    // Keys are written sorted and indented by four spaces.
    pub fn write(&self, fname: &Path) -> Result<()> {
        let sorted: BTreeMap<String, Value> = match serde_json::to_value(self)? {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };

        let mut data = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut data,
                                                             formatter);
        sorted.serialize(&mut ser)?;
        data.push(b'\n');

        fs::write(fname, data).map_err(|e| Error::file(fname, e))
    }

    pub fn log_summary(&self) {
        log::debug!("size:           {}", self.size);
        log::debug!("fov:            {}", self.fov);
        log::debug!("pitch:          {}", self.pitch);
        log::debug!("min_distance:   {}", self.min_distance);
        log::debug!("marker_gap:     {}", self.marker_gap);
        log::debug!("min_marker_gap: {}", self.min_marker_gap);
        log::debug!("file_counter:   {}", self.file_counter);
        log::debug!("api_base:       {}", self.api_base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_size() {
        assert_eq!("640x480".parse::<ImageSize>().unwrap(),
                   ImageSize::new(640, 480));
        assert_eq!(" 300 x 200 ".parse::<ImageSize>().unwrap(),
                   ImageSize::new(300, 200));
        assert!("640".parse::<ImageSize>().is_err());
        assert!("0x480".parse::<ImageSize>().is_err());
        assert!("axb".parse::<ImageSize>().is_err());
        assert_eq!(ImageSize::new(600, 400).to_string(), "600x400");
    }

    #[test]
    fn fills_in_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{"api_key": "k", "file_counter": 7, "size": "320x240"}"#)
            .unwrap();

        assert_eq!(settings.file_counter, 7);
        assert_eq!(settings.size, ImageSize::new(320, 240));
        assert_eq!(settings.fov, 90);
        assert_eq!(settings.marker_gap, 1000);
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn rejects_bad_size_string() {
        let res: serde_json::Result<Settings> =
            serde_json::from_str(r#"{"api_key": "k", "size": "big"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn write_keeps_unknown_keys_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let fname = dir.path().join("config.json");
        fs::write(&fname, r#"{"zoom": 3, "api_key": "k", "file_counter": 2}"#)
            .unwrap();

        let mut settings = Settings::load(&fname).unwrap();
        settings.file_counter += 1;
        settings.write(&fname).unwrap();

        let data = fs::read_to_string(&fname).unwrap();
        assert!(data.starts_with("{\n    \"api_key\""));
        assert!(data.find("\"api_key\"").unwrap()
                < data.find("\"zoom\"").unwrap());

        let reread = Settings::load(&fname).unwrap();
        assert_eq!(reread.file_counter, 3);
        assert_eq!(reread.extra.get("zoom"), Some(&Value::from(3)));
    }

    #[test]
    fn write_leaves_out_unset_advanced_keys() {
        let dir = tempfile::tempdir().unwrap();
        let fname = dir.path().join("config.json");
        fs::write(&fname, r#"{"api_key": "k", "timeout_secs": 5}"#).unwrap();

        let settings = Settings::load(&fname).unwrap();
        settings.write(&fname).unwrap();

        let data = fs::read_to_string(&fname).unwrap();
        assert!(!data.contains("api_base"));
        assert!(data.contains("\"timeout_secs\": 5"));
        assert!(data.contains("\"marker_gap\": 1000"));

        let reread = Settings::load(&fname).unwrap();
        assert_eq!(reread.api_base, default_api_base());
        assert_eq!(reread.timeout_secs, 5);
    }

    #[test]
    fn load_requires_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let fname = dir.path().join("config.json");
        fs::write(&fname, r#"{"api_key": "  "}"#).unwrap();

        let err = Settings::load(&fname).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn validate_rejects_zero_marker_gap() {
        let settings = Settings {
            marker_gap: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }
}
