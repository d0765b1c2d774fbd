use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rayon::prelude::*;

use crate::schedule::{DayRange, Time, date_int};

use super::Feed;
use super::entities::{ExceptionType, Stop, StopTime, Trip};

impl Feed {
    /// Whether a service runs on `date`: the weekly calendar decides first,
    /// then dated exceptions override it, folded in file order.
    pub fn service_runs_on(&self, service_id: &str, date: NaiveDate) -> bool {
        let day = date_int(date);
        let mut runs = self
            .calendars
            .get(service_id)
            .is_some_and(|calendar| calendar.valid_on(day, date.weekday()));
        if let Some(exceptions) = self.calendar_dates.get(service_id) {
            for exception in exceptions {
                if exception.date == day {
                    runs = exception.exception == ExceptionType::Added;
                }
            }
        }
        runs
    }

    pub fn trip_runs_on(&self, trip: &Trip, date: NaiveDate) -> bool {
        self.service_runs_on(&trip.service_id, date)
    }

    pub fn trip_intersects(&self, trip: &Trip, range: &DayRange) -> bool {
        trip.day_range.intersects(range)
    }

    /// Whether the trip calls at the stop.
    pub fn runs_across(&self, trip: &Trip, stop: u32) -> bool {
        trip.stop_times
            .iter()
            .any(|index| self.stop_times[*index as usize].stop == Some(stop))
    }

    /// Scans the trip in stop-sequence order for a ride from `from` to
    /// `to`. The cost accumulates departure to departure starting at
    /// `from`, so dwell at intermediate stops is included. Returns the
    /// arrival stop-time's arena index and the cost in seconds; `None` when
    /// `from` is missing or `to` comes first.
    pub fn runs_from_to(&self, trip: &Trip, from: u32, to: u32) -> Option<(u32, u32)> {
        let mut found_from = false;
        let mut cost = 0u32;
        let mut previous_departure = Time::default();
        for &index in &trip.stop_times {
            let st = &self.stop_times[index as usize];
            if found_from {
                cost += st
                    .departure
                    .seconds_since(previous_departure)
                    .unwrap_or_default();
                previous_departure = st.departure;
            }
            let Some(stop) = st.stop else {
                continue;
            };
            if !found_from && stop == from {
                found_from = true;
                previous_departure = st.departure;
            }
            if stop == to {
                return found_from.then_some((index, cost));
            }
        }
        None
    }

    /// The first stop time strictly past `after` (or past `from` when
    /// `after` is none) whose stop serves more than one stop time — a
    /// candidate to change vehicles at. Cost is departure-to-departure from
    /// `from`, as in [`runs_from_to`](Self::runs_from_to).
    pub fn next_stop_time_with_transfer(
        &self,
        trip: &Trip,
        from: u32,
        after: Option<u32>,
    ) -> Option<(u32, u32)> {
        let barrier = after.unwrap_or(from);
        let mut found_from = false;
        let mut passed_barrier = false;
        let mut cost = 0u32;
        let mut previous_departure = Time::default();
        for &index in &trip.stop_times {
            let st = &self.stop_times[index as usize];
            if found_from {
                cost += st
                    .departure
                    .seconds_since(previous_departure)
                    .unwrap_or_default();
                previous_departure = st.departure;
            }
            let Some(stop) = st.stop else {
                continue;
            };
            if !found_from && stop == from {
                found_from = true;
                previous_departure = st.departure;
            }
            if found_from && passed_barrier && self.stops.by_index(stop).stop_times.len() > 1 {
                return Some((index, cost));
            }
            if !passed_barrier && stop == barrier {
                passed_barrier = true;
            }
        }
        None
    }

    /// Trips whose service runs on `date`, in feed order.
    pub fn trips_for_day(&self, date: NaiveDate) -> Vec<&Trip> {
        self.trips
            .par_iter()
            .filter(|trip| self.trip_runs_on(trip, date))
            .collect()
    }

    /// Trips running on `date` whose day range overlaps `range`.
    pub fn trips_for_day_and_range(&self, date: NaiveDate, range: &DayRange) -> Vec<&Trip> {
        self.trips
            .par_iter()
            .filter(|trip| self.trip_runs_on(trip, date) && self.trip_intersects(trip, range))
            .collect()
    }

    /// Trips running on `date`, overlapping `range`, and calling at the
    /// stop. Unknown stop ids match nothing.
    pub fn trips_for_day_and_range_and_stop(
        &self,
        date: NaiveDate,
        range: &DayRange,
        stop_id: &str,
    ) -> Vec<&Trip> {
        let Some(stop) = self.stops.index_of(stop_id) else {
            return Vec::new();
        };
        self.trips
            .par_iter()
            .filter(|trip| {
                self.trip_runs_on(trip, date)
                    && self.trip_intersects(trip, range)
                    && self.runs_across(trip, stop)
            })
            .collect()
    }

    /// Upcoming departures from the stop strictly after `at`'s time of day,
    /// restricted to trips running on `at`'s date, earliest first, at most
    /// `count` of them.
    pub fn next_stop_times(&self, stop_id: &str, at: NaiveDateTime, count: usize) -> Vec<&StopTime> {
        let Some(stop) = self.stops.get(stop_id) else {
            return Vec::new();
        };
        let time_of_day = Time::from(at.time());
        let mut results: Vec<&StopTime> = stop
            .stop_times
            .iter()
            .map(|index| &self.stop_times[*index as usize])
            .filter(|st| {
                st.departure > time_of_day
                    && self.trip_runs_on(&self.trips[st.trip as usize], at.date())
            })
            .collect();
        results.sort_by_key(|st| st.departure);
        results.truncate(count);
        results
    }

    pub fn stops_by_name(&self, name: &str) -> Vec<&Stop> {
        self.stops.by_name(name)
    }

    /// Stops inside the equirectangular bounding box of the radius.
    pub fn stops_by_proximity(&self, latitude: f64, longitude: f64, radius_m: f64) -> Vec<&Stop> {
        self.stops.by_proximity(latitude, longitude, radius_m)
    }

    /// Proximity result annotated with great-circle distances, closest
    /// first.
    pub fn stop_distances_by_proximity(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Vec<(&Stop, f64)> {
        self.stops
            .distances_by_proximity(latitude, longitude, radius_m)
    }
}
