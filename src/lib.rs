mod app;
mod config;
mod error;
mod export;
mod geometry;
mod provider;
mod route;
mod selector;
mod settings;

pub use crate::app::{App, RunOutputs, RunSummary};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::export::RouteExporter;
pub use crate::geometry::heading_angle;
pub use crate::provider::{ImageAvailability, ImageFetcher, StreetViewClient};
pub use crate::route::{decode_fixed_point, FeatureAnnotation, Location, Route,
                       TrackPoint};
pub use crate::selector::{select_markers, Marker, SelectionParams,
                          WaypointSelector};
pub use crate::settings::{ImageSize, Settings};
