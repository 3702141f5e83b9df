use clap::arg;
use config::{*, ext::*};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Serialize, Debug)]
pub struct Config {
    pub input: String,
    pub settings_fname: String,
    pub output_dir: String,
    pub dry_run: bool,
    pub verbose: bool,
}

pub const CLAP_STYLING: clap::builder::styling::Styles =
    clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const DEFAULT_SETTINGS: &str = "config.json";
pub const DEFAULT_OUTPUT_DIR: &str = "routes";

impl Config {
    /// Parse the process arguments. Prints usage and exits on bad input.
    pub fn new() -> Self {
        match Config::try_from_args(env::args_os()) {
            Ok(config) => config,
            Err(e) => e.exit(),
        }
    }

    pub fn try_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        // Parse command line
        let clap = clap::Command::new("streetview-route")
            .bin_name("streetview-route")
            .about("Turn a BRouter GeoJSON route into a GPX track with \
                    Street View waypoints")
            .styles(CLAP_STYLING)
            .args([
                arg!(<INPUT> "GeoJSON route file"),
                arg!([SETTINGS] "Settings file with API key and gaps")
                    .default_value(DEFAULT_SETTINGS),
                arg!(-o --"output-dir" <DIR> "Folder for tracks and images")
                    .default_value(DEFAULT_OUTPUT_DIR),
                arg!(--"dry-run" "Select waypoints only, write nothing"),
                arg!(-v --verbose "Log every generated waypoint"),
            ]);

        let matches = clap.try_get_matches_from(args)?;

        let input = matches.get_one::<String>("INPUT")
            .map(String::as_str)
            .unwrap_or_default();
        let settings_fname = matches.get_one::<String>("SETTINGS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SETTINGS);
        let output_dir = matches.get_one::<String>("output-dir")
            .map(String::as_str)
            .unwrap_or(DEFAULT_OUTPUT_DIR);
        let dry_run = matches.get_flag("dry-run");
        let verbose = matches.get_flag("verbose");

        // Create config with default settings
        let config = DefaultConfigurationBuilder::new()
            .add_in_memory(&[
                ("input", input),
                ("settings_fname", settings_fname),
                ("output_dir", output_dir),
                ("dry_run", &dry_run.to_string()),
                ("verbose", &verbose.to_string()),
            ])
            .build()
            .map_err(|e| clap::Error::raw(clap::error::ErrorKind::Io,
                                          format!("{:?}\n", e)))?;

        Ok(config.reify())
    }

    pub fn input_path(&self) -> &Path {
        Path::new(&self.input)
    }

    pub fn settings_path(&self) -> &Path {
        Path::new(&self.settings_fname)
    }

    // Output folder with a trailing slash, as used in image references.
    pub fn output_dir(&self) -> String {
        let mut od = self.output_dir.clone();
        if !od.ends_with("/") {
            od.push('/');
        }

        od
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}
