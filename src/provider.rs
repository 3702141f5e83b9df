//! Street View imagery provider.
//!
//! The selector and the run only see the two traits below; the HTTP client
//! implementing them talks to the Google Street View Static API.

use crate::error::{Error, Result};
use crate::settings::{ImageSize, Settings};

use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;

/// Answers whether imagery exists at a coordinate.
pub trait ImageAvailability {
    fn exists(&self, lon: f64, lat: f64) -> Result<bool>;
}

/// Downloads the image seen from a coordinate looking towards `heading`.
pub trait ImageFetcher {
    fn fetch(&self, lon: f64, lat: f64, heading: u16) -> Result<Bytes>;
}

impl<T: ImageAvailability + ?Sized> ImageAvailability for &T {
    fn exists(&self, lon: f64, lat: f64) -> Result<bool> {
        (**self).exists(lon, lat)
    }
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    fn fetch(&self, lon: f64, lat: f64, heading: u16) -> Result<Bytes> {
        (**self).fetch(lon, lat, heading)
    }
}

#[derive(Deserialize)]
struct Metadata {
    status: String,
}

const STATUS_OK: &str = "OK";

/// Blocking client for the Street View metadata and image endpoints.
///
/// Requests run one at a time on an internal current-thread Tokio runtime.
pub struct StreetViewClient {
    rt: tokio::runtime::Runtime,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    size: ImageSize,
    fov: u32,
    pitch: i32,
}

impl StreetViewClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Provider(format!("failed to start runtime: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            rt: rt,
            client: client,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            size: settings.size,
            fov: settings.fov,
            pitch: settings.pitch,
        })
    }

    pub fn metadata_url(&self) -> String {
        format!("{}/metadata", self.base_url)
    }

    pub fn image_url(&self) -> String {
        self.base_url.clone()
    }

    async fn metadata_status(&self, lon: f64, lat: f64) -> Result<String> {
        let resp = self.client
            .get(self.metadata_url())
            .query(&[("location", location(lon, lat)),
                     ("key", self.api_key.clone())])
            .send()
            .await?
            .error_for_status()?;

        let metadata: Metadata = resp.json().await?;

        Ok(metadata.status)
    }

    async fn image(&self, lon: f64, lat: f64, heading: u16) -> Result<Bytes> {
        let resp = self.client
            .get(self.image_url())
            .query(&[("size", self.size.to_string()),
                     ("location", location(lon, lat)),
                     ("fov", self.fov.to_string()),
                     ("pitch", self.pitch.to_string()),
                     ("heading", heading.to_string()),
                     ("key", self.api_key.clone())])
            .send()
            .await?
            .error_for_status()?;

        let body = resp.bytes().await?;

        if body.is_empty() {
            return Err(Error::Provider(
                format!("empty image for {}", location(lon, lat))));
        }

        Ok(body)
    }
}

// The API takes "lat,lon"
fn location(lon: f64, lat: f64) -> String {
    format!("{},{}", lat, lon)
}

impl ImageAvailability for StreetViewClient {
    fn exists(&self, lon: f64, lat: f64) -> Result<bool> {
        let status = self.rt.block_on(self.metadata_status(lon, lat))?;

        if status != STATUS_OK {
            log::debug!("No image at {}: {}", location(lon, lat), status);
        }

        Ok(status == STATUS_OK)
    }
}

impl ImageFetcher for StreetViewClient {
    fn fetch(&self, lon: f64, lat: f64, heading: u16) -> Result<Bytes> {
        self.rt.block_on(self.image(lon, lat, heading))
    }
}
