use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::RouteExporter;
use crate::provider::{ImageAvailability, ImageFetcher, StreetViewClient};
use crate::route::Route;
use crate::selector::{Marker, SelectionParams, WaypointSelector};
use crate::settings::Settings;

use std::fs;
use std::path::{Path, PathBuf};

const VIEWER_URL: &str = "http://0.0.0.0:8000/routestreetviewer.html";

/// Where a run puts its track and images. Both carry the run counter so
/// successive runs never overwrite each other.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutputs {
    pub track_name: String,
    pub track_file: PathBuf,
    pub images_dir: PathBuf,
    // Image folder as referenced from inside the track
    pub images_ref: String,
}

impl RunOutputs {
    pub fn new(config: &Config, counter: u64) -> Result<Self> {
        let stem = config.input_path()
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Route(format!("invalid input file name '{}'",
                                     config.input))
            })?;

        let track_name = format!("{}_{}.xml", stem, counter);
        let images_name = format!("images_{}", counter);

        Ok(Self {
            track_file: config.output_path().join(&track_name),
            images_dir: config.output_path().join(&images_name),
            images_ref: format!("{}{}", config.output_dir(), images_name),
            track_name: track_name,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub markers: usize,
    pub featured: usize,
    pub missing: usize,
    pub downloaded: usize,
    pub track_file: Option<PathBuf>,
}

impl RunSummary {
    fn from_markers(markers: &[Marker]) -> Self {
        Self {
            markers: markers.len(),
            featured: markers.iter().filter(|m| m.featured).count(),
            missing: markers.iter().filter(|m| !m.image_available).count(),
            downloaded: 0,
            track_file: None,
        }
    }
}

/// One conversion run. Owns the settings for the duration of the run and
/// writes the advanced run counter back only when everything succeeded.
pub struct App<P> {
    config: Config,
    settings: Settings,
    provider: P,
}

impl App<StreetViewClient> {
    pub fn new(config: Config) -> Result<Self> {
        let settings = Settings::load(config.settings_path())?;
        let client = StreetViewClient::new(&settings)?;

        Ok(App::with_settings(config, settings, client))
    }
}

impl<P: ImageAvailability + ImageFetcher> App<P> {
    pub fn with_provider(config: Config, provider: P) -> Result<Self> {
        let settings = Settings::load(config.settings_path())?;

        Ok(App::with_settings(config, settings, provider))
    }

    fn with_settings(config: Config, settings: Settings, provider: P) -> Self {
        Self {
            config: config,
            settings: settings,
            provider: provider,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        self.settings.log_summary();

        let route = Route::read_geojson(self.config.input_path())?;
        log::info!("Route: {}", route);

        let outputs = RunOutputs::new(&self.config, self.settings.file_counter)?;

        let markers = WaypointSelector::new(&route,
                                            SelectionParams::from(&self.settings),
                                            &self.provider).select()?;
        let mut summary = RunSummary::from_markers(&markers);

        if self.config.dry_run {
            for m in &markers {
                log::info!("{}", m);
            }
            log::info!("Dry run, nothing written");

            return Ok(summary);
        }

        summary.downloaded = self.download_images(&markers, &outputs.images_dir)?;

        RouteExporter::new(&outputs.track_name, &outputs.images_ref)
            .write_file(&outputs.track_file, &markers, route.points())?;
        log::info!("Track written to {}", outputs.track_file.display());

        // Only a complete run advances the counter
        self.settings.file_counter += 1;
        self.settings.write(self.config.settings_path())?;

        log::info!("Route URL: {}?filename={}", VIEWER_URL, outputs.track_name);
        log::info!("Preloaded: {}?filename={}&preloaded", VIEWER_URL,
                   outputs.track_name);
        log::info!("{} waypoints ({} featured), {} without image",
                   summary.markers, summary.featured, summary.missing);

        summary.track_file = Some(outputs.track_file);

        Ok(summary)
    }

    fn download_images(&self, markers: &[Marker], images_dir: &Path)
                       -> Result<usize> {
        fs::create_dir_all(images_dir).map_err(|e| Error::file(images_dir, e))?;

        let total = markers.len();
        let mut downloaded = 0;

        log::info!("Reading images from Street View:");
        for (i, m) in markers.iter().enumerate() {
            log::info!("{} {}/{}", m.image_name(), i + 1, total);

            if !m.image_available {
                continue;
            }

            let image = self.provider.fetch(m.point.lon(), m.point.lat(),
                                            m.heading)?;
            let fname = images_dir.join(m.image_name());
            fs::write(&fname, &image).map_err(|e| Error::file(&fname, e))?;
            downloaded += 1;
        }

        Ok(downloaded)
    }
}
