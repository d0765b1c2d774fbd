use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::schedule::DayRange;
use crate::tables::{ParseError, Parser, Record, Source, read_record};

use super::Error;
use super::entities::{
    Agency, Calendar, CalendarDate, FareAttribute, Frequency, Route, Shape, ShapePoint, Stop,
    StopTime, Transfer, Trip,
};
use super::stops::StopCollection;

/// Table files in load order; later tables reference earlier ones.
const TABLE_FILES: [&str; 12] = [
    "agency.txt",
    "stops.txt",
    "routes.txt",
    "trips.txt",
    "stop_times.txt",
    "calendar.txt",
    "calendar_dates.txt",
    "fare_attributes.txt",
    "fare_rules.txt",
    "shapes.txt",
    "frequencies.txt",
    "transfers.txt",
];

/// Everything a [`super::Feed`] owns apart from its source.
pub(super) struct Graph {
    pub agencies: HashMap<Arc<str>, Agency>,
    pub routes: Box<[Route]>,
    pub trips: Box<[Trip]>,
    pub stop_times: Box<[StopTime]>,
    pub stops: StopCollection,
    pub calendars: HashMap<Arc<str>, Calendar>,
    pub calendar_dates: HashMap<Arc<str>, Vec<CalendarDate>>,
    pub shapes: HashMap<Arc<str>, Shape>,
    pub fare_attributes: HashMap<Arc<str>, FareAttribute>,
    pub route_lookup: HashMap<Arc<str>, u32>,
    pub trip_lookup: HashMap<Arc<str>, u32>,
}

pub(super) fn build(source: &mut Source) -> Result<Graph, Error> {
    let mut loader = Loader::default();
    for file in TABLE_FILES {
        let started = Instant::now();
        match source.with_table(file, |reader| loader.load_table(file, reader))? {
            Some(Ok(())) => debug!(file, elapsed = ?started.elapsed(), "table loaded"),
            Some(Err(error)) => warn!(file, %error, "table skipped"),
            None => debug!(file, "table absent"),
        }
    }
    loader.finish()
}

#[derive(Default)]
struct Loader {
    agencies: HashMap<Arc<str>, Agency>,
    routes: Vec<Route>,
    route_lookup: HashMap<Arc<str>, u32>,
    trips: Vec<Trip>,
    trip_lookup: HashMap<Arc<str>, u32>,
    stop_times: Vec<StopTime>,
    stops: StopCollection,
    calendars: HashMap<Arc<str>, Calendar>,
    calendar_dates: HashMap<Arc<str>, Vec<CalendarDate>>,
    shapes: HashMap<Arc<str>, Shape>,
    fare_attributes: HashMap<Arc<str>, FareAttribute>,
}

/// Reads one record, logging and dropping it when a typed setter rejects a
/// value.
fn read_logged<T: Record>(file: &str, keys: &[String], values: &[String]) -> Option<T> {
    match read_record::<T>(keys, values) {
        Ok(record) => Some(record),
        Err(error) => {
            warn!(file, %error, "dropping record");
            None
        }
    }
}

impl Loader {
    fn load_table(&mut self, file: &str, reader: &mut dyn BufRead) -> Result<(), ParseError> {
        let parser = Parser::new(file);
        match file {
            "agency.txt" => parser.parse(reader, |keys, values| {
                let Some(agency) = read_logged::<Agency>(file, keys, values) else {
                    return;
                };
                self.agencies.insert(agency.id.clone(), agency);
            }),
            "stops.txt" => parser.parse(reader, |keys, values| {
                let Some(stop) = read_logged::<Stop>(file, keys, values) else {
                    return;
                };
                self.stops.insert(stop);
            }),
            "routes.txt" => parser.parse(reader, |keys, values| {
                let Some(mut route) = read_logged::<Route>(file, keys, values) else {
                    return;
                };
                route.index = self.routes.len() as u32;
                self.route_lookup.insert(route.id.clone(), route.index);
                self.routes.push(route);
            }),
            "trips.txt" => parser.parse(reader, |keys, values| {
                let Some(mut trip) = read_logged::<Trip>(file, keys, values) else {
                    return;
                };
                let Some(route) = self.route_lookup.get(&trip.route_id).copied() else {
                    warn!(file, trip = %trip.id, "dropping trip with unknown route");
                    return;
                };
                trip.route = route;
                trip.index = self.trips.len() as u32;
                self.trip_lookup.insert(trip.id.clone(), trip.index);
                self.trips.push(trip);
            }),
            "stop_times.txt" => parser.parse(reader, |keys, values| {
                let Some(st) = read_logged::<StopTime>(file, keys, values) else {
                    return;
                };
                self.install_stop_time(file, st);
            }),
            "calendar.txt" => parser.parse(reader, |keys, values| {
                let Some(calendar) = read_logged::<Calendar>(file, keys, values) else {
                    return;
                };
                self.calendars.insert(calendar.service_id.clone(), calendar);
            }),
            "calendar_dates.txt" => parser.parse(reader, |keys, values| {
                let Some(exception) = read_logged::<CalendarDate>(file, keys, values) else {
                    return;
                };
                self.calendar_dates
                    .entry(exception.service_id.clone())
                    .or_default()
                    .push(exception);
            }),
            "fare_attributes.txt" => parser.parse(reader, |keys, values| {
                let Some(fare) = read_logged::<FareAttribute>(file, keys, values) else {
                    return;
                };
                self.fare_attributes.insert(fare.id.clone(), fare);
            }),
            // Parsed for syntax, carried by no entity.
            "fare_rules.txt" => parser.parse(reader, |_, _| {}),
            "shapes.txt" => parser.parse(reader, |keys, values| {
                let Some(point) = read_logged::<ShapePoint>(file, keys, values) else {
                    return;
                };
                let shape = self
                    .shapes
                    .entry(point.shape_id.clone())
                    .or_insert_with(|| Shape {
                        id: point.shape_id.clone(),
                        points: Vec::new(),
                        color: None,
                    });
                shape.points.push(point);
            }),
            "frequencies.txt" => parser.parse(reader, |keys, values| {
                let Some(frequency) = read_logged::<Frequency>(file, keys, values) else {
                    return;
                };
                let Some(trip) = self.trip_lookup.get(&frequency.trip_id).copied() else {
                    return;
                };
                self.trips[trip as usize].frequencies.push(frequency);
            }),
            "transfers.txt" => parser.parse(reader, |keys, values| {
                let Some(transfer) = read_logged::<Transfer>(file, keys, values) else {
                    return;
                };
                let Some(stop) = self.stops.index_of(&transfer.from_stop_id) else {
                    return;
                };
                self.stops.install_transfer(stop, transfer);
            }),
            _ => Ok(()),
        }
    }

    /// Resolves a stop-time's references and threads it into its trip and
    /// stop. A row with an unknown trip is dropped; one with an unknown
    /// stop stays on the trip only. Within a trip the list is kept in
    /// ascending stop-sequence order and the first row wins a sequence.
    fn install_stop_time(&mut self, file: &str, mut st: StopTime) {
        let Some(trip_index) = self.trip_lookup.get(&st.trip_id).copied() else {
            return;
        };
        st.trip = trip_index;
        st.stop = self.stops.index_of(&st.stop_id);

        let arena = &self.stop_times;
        let trip = &mut self.trips[trip_index as usize];
        let position = trip
            .stop_times
            .binary_search_by(|existing| arena[*existing as usize].sequence.cmp(&st.sequence));
        let position = match position {
            Ok(_) => {
                warn!(
                    file,
                    trip = %st.trip_id,
                    sequence = st.sequence,
                    "dropping duplicate stop sequence"
                );
                return;
            }
            Err(position) => position,
        };

        let index = self.stop_times.len() as u32;
        let stop = st.stop;
        self.stop_times.push(st);
        trip.stop_times.insert(position, index);
        if let Some(stop) = stop {
            self.stops.attach_stop_time(stop, index);
        }
    }

    fn finish(mut self) -> Result<Graph, Error> {
        let started = Instant::now();
        for trip in &mut self.trips {
            for frequency in &mut trip.frequencies {
                frequency.day_range = DayRange::new(frequency.start, frequency.end);
            }
            let range = derive_day_range(trip, &self.stop_times);
            trip.day_range = range;

            if !trip.shape_id.is_empty()
                && let Some(shape) = self.shapes.get_mut(&trip.shape_id)
                && shape.color.is_none()
            {
                let route = &self.routes[trip.route as usize];
                shape.color = Some(route.color.clone());
            }
        }
        debug!(elapsed = ?started.elapsed(), "derivations");

        if self.agencies.is_empty() {
            return Err(Error::NoAgency);
        }

        info!(
            agencies = self.agencies.len(),
            stops = self.stops.len(),
            routes = self.routes.len(),
            trips = self.trips.len(),
            stop_times = self.stop_times.len(),
            calendars = self.calendars.len(),
            calendar_exceptions = self.calendar_dates.values().map(Vec::len).sum::<usize>(),
            shapes = self.shapes.len(),
            fare_attributes = self.fare_attributes.len(),
            "feed loaded"
        );

        Ok(Graph {
            agencies: self.agencies,
            routes: self.routes.into(),
            trips: self.trips.into(),
            stop_times: self.stop_times.into(),
            stops: self.stops,
            calendars: self.calendars,
            calendar_dates: self.calendar_dates,
            shapes: self.shapes,
            fare_attributes: self.fare_attributes,
            route_lookup: self.route_lookup,
            trip_lookup: self.trip_lookup,
        })
    }
}

/// Earliest departure to latest arrival over the trip's stop times, clamped
/// to a non-empty interval, then widened over every frequency window. Trips
/// with no stop times get the empty range.
fn derive_day_range(trip: &Trip, arena: &[StopTime]) -> DayRange {
    let mut stop_times = trip.stop_times.iter().map(|index| &arena[*index as usize]);
    let Some(first) = stop_times.next() else {
        return DayRange::default();
    };
    let mut range = DayRange::new(first.departure, first.arrival.max(first.departure));
    for st in stop_times {
        if st.departure < range.from {
            range.from = st.departure;
        }
        if st.arrival > range.to {
            range.to = st.arrival;
        }
    }
    for frequency in &trip.frequencies {
        range.extend(&frequency.day_range);
    }
    range
}
