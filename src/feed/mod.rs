mod entities;
mod load;
mod queries;
mod stops;

pub use entities::*;
pub use stops::StopCollection;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::tables::{self, Source};

#[derive(Error, Debug)]
pub enum Error {
    #[error("feed requires at least one agency")]
    NoAgency,
    #[error(transparent)]
    Table(#[from] tables::Error),
}

/// A fully loaded transit feed: every entity arena, the lookup maps, and
/// the derived caches. Read-only once built; [`Feed::reload`] replaces the
/// whole graph. Callers that share a feed across threads wrap it in an
/// `Arc` and swap the handle on reload.
pub struct Feed {
    source: Source,
    pub agencies: HashMap<Arc<str>, Agency>,
    pub routes: Box<[Route]>,
    pub trips: Box<[Trip]>,
    pub stop_times: Box<[StopTime]>,
    pub stops: StopCollection,
    pub calendars: HashMap<Arc<str>, Calendar>,
    pub calendar_dates: HashMap<Arc<str>, Vec<CalendarDate>>,
    pub shapes: HashMap<Arc<str>, Shape>,
    pub fare_attributes: HashMap<Arc<str>, FareAttribute>,
    route_lookup: HashMap<Arc<str>, u32>,
    trip_lookup: HashMap<Arc<str>, u32>,
}

impl Feed {
    /// Loads the feed at `path`: a `.zip` archive or a directory of tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_source(Source::open(path)?)
    }

    pub fn from_source(mut source: Source) -> Result<Self, Error> {
        let graph = load::build(&mut source)?;
        Ok(Self {
            source,
            agencies: graph.agencies,
            routes: graph.routes,
            trips: graph.trips,
            stop_times: graph.stop_times,
            stops: graph.stops,
            calendars: graph.calendars,
            calendar_dates: graph.calendar_dates,
            shapes: graph.shapes,
            fare_attributes: graph.fare_attributes,
            route_lookup: graph.route_lookup,
            trip_lookup: graph.trip_lookup,
        })
    }

    /// Discards the graph and rebuilds it from the same source. On failure
    /// the previous graph is left in place.
    pub fn reload(&mut self) -> Result<(), Error> {
        let graph = load::build(&mut self.source)?;
        self.agencies = graph.agencies;
        self.routes = graph.routes;
        self.trips = graph.trips;
        self.stop_times = graph.stop_times;
        self.stops = graph.stops;
        self.calendars = graph.calendars;
        self.calendar_dates = graph.calendar_dates;
        self.shapes = graph.shapes;
        self.fare_attributes = graph.fare_attributes;
        self.route_lookup = graph.route_lookup;
        self.trip_lookup = graph.trip_lookup;
        Ok(())
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        let index = self.route_lookup.get(id)?;
        Some(&self.routes[*index as usize])
    }

    pub fn trip(&self, id: &str) -> Option<&Trip> {
        let index = self.trip_lookup.get(id)?;
        Some(&self.trips[*index as usize])
    }

    pub fn stop(&self, id: &str) -> Option<&Stop> {
        self.stops.get(id)
    }

    /// The station a child stop belongs to, when it names one.
    pub fn parent_station(&self, stop: &Stop) -> Option<&Stop> {
        if stop.parent_station.is_empty() {
            return None;
        }
        self.stops.get(&stop.parent_station)
    }

    /// The agency a route belongs to; `None` when the reference dangles.
    pub fn agency_for(&self, route: &Route) -> Option<&Agency> {
        self.agencies.get(&route.agency_id)
    }

    /// The trip's stop times in stop-sequence order.
    pub fn trip_stop_times<'a>(&'a self, trip: &'a Trip) -> impl Iterator<Item = &'a StopTime> {
        trip.stop_times
            .iter()
            .map(|index| &self.stop_times[*index as usize])
    }
}
