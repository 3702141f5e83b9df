use crate::error::Result;
use crate::geometry::heading_angle;
use crate::provider::ImageAvailability;
use crate::route::{FeatureAnnotation, Location, Route, TrackPoint};
use crate::settings::Settings;

use std::fmt;

/// A point on the route that gets a Street View image (or a note that
/// there is none).
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: usize,
    pub point: TrackPoint,
    pub route_index: usize,
    pub heading: u16,
    pub image_available: bool,
    pub note: String,
    pub featured: bool,
}

impl Marker {
    pub fn image_name(&self) -> String {
        format!("image_{}.jpg", self.id)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} #{} {} heading {}{}{}", self.image_name(),
               self.route_index, self.point, self.heading,
               if self.featured { " featured" } else { "" },
               if self.image_available { "" } else { " (no image)" })
    }
}

/// Distance thresholds (metres) steering the selection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SelectionParams {
    // Features closer than this to the next one are ignored
    pub min_distance: i64,
    // Wanted spacing of intermediate markers
    pub marker_gap: i64,
    // Above this (and below marker_gap) a single centre marker is considered
    pub min_marker_gap: i64,
}

impl From<&Settings> for SelectionParams {
    fn from(settings: &Settings) -> Self {
        Self {
            min_distance: settings.min_distance,
            marker_gap: settings.marker_gap,
            min_marker_gap: settings.min_marker_gap,
        }
    }
}

// How the intermediate markers before a featured waypoint are placed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Infill {
    None,
    // Evenly spaced markers
    Spaced(usize),
    // One centre marker, only where imagery is missing
    CentreIfMissing,
}

impl Infill {
    fn for_distance(distance: i64, params: &SelectionParams) -> Self {
        let count = distance / params.marker_gap;

        if count > 0 {
            Infill::Spaced(count as usize)
        }
        else if distance > params.min_marker_gap {
            Infill::CentreIfMissing
        }
        else {
            Infill::None
        }
    }

    fn count(&self) -> usize {
        match *self {
            Infill::None => 0,
            Infill::Spaced(n) => n,
            Infill::CentreIfMissing => 1,
        }
    }
}

/// Walks the featured waypoints of a route and decides where markers go.
pub struct WaypointSelector<'a, A: ImageAvailability> {
    route: &'a Route,
    params: SelectionParams,
    oracle: A,
    markers: Vec<Marker>,
    previous_index: usize,
}

impl<'a, A: ImageAvailability> WaypointSelector<'a, A> {
    pub fn new(route: &'a Route, params: SelectionParams, oracle: A) -> Self {
        Self {
            route: route,
            params: params,
            oracle: oracle,
            markers: vec![],
            previous_index: 0,
        }
    }

    /// Run the selection. Markers come out in route order, numbered from 0.
    pub fn select(mut self) -> Result<Vec<Marker>> {
        let route = self.route;
        let features = route.features();
        let total = features.len() + 1;

        log::info!("Processing {} featured waypoints...", total);
        log::info!("Featured waypoint 1/{}", total);
        self.add_start()?;

        for (i, feature) in features.iter().enumerate() {
            log::info!("Featured waypoint {}/{}", i + 2, total);

            if feature.distance < self.params.min_distance {
                log::debug!("Skipping feature {}: {}m is below {}m", i + 1,
                            feature.distance, self.params.min_distance);
                continue;
            }

            self.add_feature(feature, &features[i + 1..])?;
        }

        log::info!("Number of generated Street View waypoints: {}",
                   self.markers.len());

        Ok(self.markers)
    }

    // Route start; its note describes the first leg.
    fn add_start(&mut self) -> Result<()> {
        let start = self.route.points()[0];
        let note = self.route.features().first()
            .map(FeatureAnnotation::note)
            .unwrap_or_default();
        let available = self.oracle.exists(start.lon(), start.lat())?;

        self.push(start, 0, available, note, true)?;
        self.previous_index = 0;

        Ok(())
    }

    fn add_feature(&mut self, feature: &FeatureAnnotation,
                   following: &[FeatureAnnotation]) -> Result<()> {
        let pos = feature.position()?;

        // The note describes the leg that starts here, i.e. the next
        // feature that is not skipped.
        let note = following.iter()
            .find(|f| f.distance >= self.params.min_distance)
            .map(FeatureAnnotation::note)
            .unwrap_or_default();

        let location = self.route.locate_index(pos.x, pos.y);
        if let Location::NearEnd(i) = location {
            log::debug!("({}, {}) is not on the route, using point {}",
                        pos.x, pos.y, i);
        }
        let index = location.index();

        let infill = Infill::for_distance(feature.distance, &self.params);
        self.add_intermediate(infill, index)?;
        self.previous_index = index;

        let point = TrackPoint::new(pos.x, pos.y, feature.elevation);
        let available = self.oracle.exists(point.lon(), point.lat())?;

        self.push(point, index, available, note, true)
    }

    // Step from the previous featured point towards `index`. Stops after the
    // first marker without imagery so a gap in coverage is marked once.
    fn add_intermediate(&mut self, infill: Infill, index: usize)
                        -> Result<()> {
        let count = infill.count();
        let gap = index.saturating_sub(self.previous_index) / (count + 1);

        if count == 0 || gap == 0 {
            return Ok(());
        }

        for _ in 0..count {
            self.previous_index += gap;

            let point = self.route.points()[self.previous_index];
            let available = self.oracle.exists(point.lon(), point.lat())?;

            if available && infill == Infill::CentreIfMissing {
                continue;
            }

            self.push(point, self.previous_index, available, String::new(),
                      false)?;

            if !available {
                break;
            }
        }

        Ok(())
    }

    fn push(&mut self, point: TrackPoint, route_index: usize,
            available: bool, note: String, featured: bool) -> Result<()> {
        let marker = Marker {
            id: self.markers.len(),
            point: point,
            route_index: route_index,
            heading: heading_angle(&point, self.route.points(), route_index)?,
            image_available: available,
            note: note,
            featured: featured,
        };

        log::debug!("{}", marker);
        self.markers.push(marker);

        Ok(())
    }
}

/// Convenience wrapper around [`WaypointSelector`].
pub fn select_markers<A: ImageAvailability>(route: &Route,
                                            params: SelectionParams,
                                            oracle: A) -> Result<Vec<Marker>> {
    WaypointSelector::new(route, params, oracle).select()
}
