mod itinerary;

pub use itinerary::{Itinerary, Leg};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::feed::Feed;
use crate::schedule::Time;

#[derive(Error, Debug)]
pub enum Error {
    #[error("origin stop id does not match any stop")]
    UnknownOrigin,
    #[error("destination stop id does not match any stop")]
    UnknownDestination,
    #[error("no routes found")]
    NoRoutesFound,
    #[error("search timed out before finding any route")]
    Timeout,
}

/// Hard limits pruning the search. Costs and waits are in seconds.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_transfers: u32,
    pub max_duration_secs: u32,
    pub max_wait_secs: u32,
    pub default_transfer_secs: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_transfers: 3,
            max_duration_secs: 10_800,
            max_wait_secs: 900,
            default_transfer_secs: 300,
        }
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The target number of itineraries was reached.
    Complete,
    /// The frontier ran dry.
    Exhausted,
    /// The deadline fired; itineraries found so far remain valid.
    Timeout,
}

/// The outcome of a solved search: itineraries in discovery order plus the
/// terminal event.
#[derive(Debug)]
pub struct Search {
    pub itineraries: Vec<Itinerary>,
    pub termination: Termination,
}

/// A frontier node: the stop time just boarded, the chain that led here,
/// and the accumulated cost.
#[derive(Debug)]
pub(crate) struct Step {
    pub stop_time: u32,
    pub previous: Option<Arc<Step>>,
    pub cost: u32,
    pub transfers: u32,
}

/// Cheapest-first frontier. Equal costs pop in insertion order.
#[derive(Default)]
struct Frontier {
    heap: BinaryHeap<Queued>,
    seq: u64,
}

struct Queued {
    cost: u32,
    seq: u64,
    step: Step,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the cheapest, oldest entry.
        (other.cost, other.seq).cmp(&(self.cost, self.seq))
    }
}

impl Frontier {
    fn push(&mut self, step: Step) {
        self.seq += 1;
        self.heap.push(Queued {
            cost: step.cost,
            seq: self.seq,
            step,
        });
    }

    fn pop(&mut self) -> Option<Step> {
        self.heap.pop().map(|queued| queued.step)
    }
}

/// A bounded branch-and-bound itinerary search between two stops.
///
/// Walk expansions run as tasks and report over bounded channels; a single
/// coordinator owns the frontier, so the feed is only ever read. The search
/// trades optimality for bounded work: the [`Limits`] prune the fanout and
/// re-boarding the same route is never admitted.
pub struct Planner {
    feed: Arc<Feed>,
    origin: String,
    destination: String,
    departure: NaiveDateTime,
    limits: Limits,
    max_results: usize,
    timeout: Duration,
}

impl Planner {
    pub fn new(
        feed: Arc<Feed>,
        origin: &str,
        destination: &str,
        departure: NaiveDateTime,
    ) -> Self {
        Self {
            feed,
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure,
            limits: Limits::default(),
            max_results: 10,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Stop after this many itineraries.
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the search to its terminal event and collects the itineraries.
    ///
    /// Fails with [`Error::NoRoutesFound`] (or [`Error::Timeout`]) when the
    /// terminal event arrives before any itinerary.
    pub async fn solve(self) -> Result<Search, Error> {
        let (sink, mut ready) = mpsc::channel(self.max_results);
        let drive = self.drive(sink);
        let collect = async {
            let mut itineraries = Vec::new();
            while let Some(itinerary) = ready.recv().await {
                itineraries.push(itinerary);
            }
            itineraries
        };
        let (termination, itineraries) = tokio::join!(drive, collect);
        let termination = termination?;
        if itineraries.is_empty() {
            return Err(match termination {
                Termination::Timeout => Error::Timeout,
                _ => Error::NoRoutesFound,
            });
        }
        Ok(Search {
            itineraries,
            termination,
        })
    }

    /// Streams itineraries in discovery order. The channel closes on the
    /// terminal event; dropping the receiver cancels the search.
    pub fn stream(self) -> mpsc::Receiver<Itinerary> {
        let (sink, stream) = mpsc::channel(self.max_results);
        tokio::spawn(async move {
            if let Err(error) = self.drive(sink).await {
                debug!(%error, "itinerary stream closed");
            }
        });
        stream
    }

    async fn drive(self, sink: mpsc::Sender<Itinerary>) -> Result<Termination, Error> {
        let origin = self
            .feed
            .stops
            .index_of(&self.origin)
            .ok_or(Error::UnknownOrigin)?;
        let destination = self
            .feed
            .stops
            .index_of(&self.destination)
            .ok_or(Error::UnknownDestination)?;
        let date = self.departure.date();
        let departure = Time::from(self.departure.time());
        debug!(
            origin = %self.origin,
            destination = %self.destination,
            %departure,
            "itinerary search"
        );

        let (stepped_tx, mut stepped) = mpsc::channel::<Step>(10);
        let (walked_tx, mut walked) = mpsc::channel::<()>(1);
        let (found_tx, mut found) = mpsc::channel::<Step>(1);

        let mut frontier = Frontier::default();
        for index in self.seeds(origin, date, departure) {
            frontier.push(Step {
                stop_time: index,
                previous: None,
                cost: 0,
                transfers: 0,
            });
        }

        let Some(step) = frontier.pop() else {
            return Ok(Termination::Exhausted);
        };
        self.spawn_walk(step, destination, date, &stepped_tx, &walked_tx, &found_tx);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut found_count = 0usize;
        loop {
            tokio::select! {
                Some(step) = stepped.recv() => {
                    frontier.push(step);
                }
                Some(step) = found.recv() => {
                    found_count += 1;
                    let itinerary = itinerary::reconstruct(&self.feed, &step);
                    if sink.send(itinerary).await.is_err() || found_count >= self.max_results {
                        return Ok(Termination::Complete);
                    }
                }
                Some(()) = walked.recv() => {
                    // The walk has finished; all of its sends precede the
                    // heartbeat, so drain both channels before touching the
                    // frontier.
                    while let Ok(step) = found.try_recv() {
                        found_count += 1;
                        let itinerary = itinerary::reconstruct(&self.feed, &step);
                        if sink.send(itinerary).await.is_err() || found_count >= self.max_results {
                            return Ok(Termination::Complete);
                        }
                    }
                    while let Ok(step) = stepped.try_recv() {
                        frontier.push(step);
                    }
                    match frontier.pop() {
                        Some(step) => self.spawn_walk(
                            step,
                            destination,
                            date,
                            &stepped_tx,
                            &walked_tx,
                            &found_tx,
                        ),
                        None => return Ok(Termination::Exhausted),
                    }
                }
                () = &mut deadline => {
                    debug!(found_count, "itinerary search deadline");
                    return Ok(Termination::Timeout);
                }
            }
        }
    }

    /// Departures from the origin within the wait window on a service that
    /// runs that day, earliest first.
    fn seeds(&self, origin: u32, date: NaiveDate, departure: Time) -> Vec<u32> {
        let mut seeds: Vec<u32> = self
            .feed
            .stops
            .by_index(origin)
            .stop_times
            .iter()
            .copied()
            .filter(|&index| {
                let st = &self.feed.stop_times[index as usize];
                let Some(wait) = st.departure.seconds_since(departure) else {
                    return false;
                };
                wait <= self.limits.max_wait_secs
                    && self
                        .feed
                        .trip_runs_on(&self.feed.trips[st.trip as usize], date)
            })
            .collect();
        seeds.sort_by_key(|&index| self.feed.stop_times[index as usize].departure);
        seeds
    }

    fn spawn_walk(
        &self,
        step: Step,
        destination: u32,
        date: NaiveDate,
        stepped: &mpsc::Sender<Step>,
        walked: &mpsc::Sender<()>,
        found: &mpsc::Sender<Step>,
    ) {
        let feed = Arc::clone(&self.feed);
        let limits = self.limits;
        let stepped = stepped.clone();
        let walked = walked.clone();
        let found = found.clone();
        tokio::spawn(async move {
            walk(feed, Arc::new(step), destination, date, limits, stepped, found).await;
            let _ = walked.send(()).await;
        });
    }
}

/// One expansion of a frontier step. Reports the destination when the
/// step's trip rides straight to it; otherwise posts a new frontier step
/// for every admissible change of vehicle along the trip, in stop-sequence
/// order.
async fn walk(
    feed: Arc<Feed>,
    step: Arc<Step>,
    destination: u32,
    date: NaiveDate,
    limits: Limits,
    stepped: mpsc::Sender<Step>,
    found: mpsc::Sender<Step>,
) {
    let boarded = &feed.stop_times[step.stop_time as usize];
    let trip = &feed.trips[boarded.trip as usize];
    let Some(stop) = boarded.stop else {
        return;
    };

    if let Some((arrival_index, cost)) = feed.runs_from_to(trip, stop, destination) {
        let done = Step {
            stop_time: arrival_index,
            previous: Some(Arc::clone(&step)),
            cost: step.cost + cost + limits.default_transfer_secs,
            transfers: step.transfers,
        };
        let _ = found.send(done).await;
        return;
    }

    let route = trip.route;
    let mut candidate = feed.next_stop_time_with_transfer(trip, stop, None);
    // A trip that loops through a stop could hand back the same candidate
    // forever; the stop-time count bounds the scan.
    let mut remaining = trip.stop_times.len();
    while let Some((candidate_index, cost)) = candidate {
        if remaining == 0 {
            break;
        }
        remaining -= 1;
        let at_change = &feed.stop_times[candidate_index as usize];
        let Some(change_stop) = at_change.stop else {
            return;
        };
        trace!(stop = %at_change.stop_id, cost, "transfer candidate");

        for &onward_index in &feed.stops.by_index(change_stop).stop_times {
            let onward = &feed.stop_times[onward_index as usize];
            let onward_trip = &feed.trips[onward.trip as usize];
            if onward_trip.route == route {
                continue;
            }
            if !feed.trip_runs_on(onward_trip, date) {
                continue;
            }
            let Some(wait) = onward.departure.seconds_since(at_change.arrival) else {
                continue;
            };
            let cost_so_far = step.cost + cost + wait + limits.default_transfer_secs;
            let admitted = wait <= limits.max_wait_secs
                && at_change.arrival.as_seconds() + limits.default_transfer_secs
                    <= onward.departure.as_seconds()
                && step.transfers + 1 <= limits.max_transfers
                && cost_so_far < limits.max_duration_secs;
            if admitted {
                let next = Step {
                    stop_time: onward_index,
                    previous: Some(Arc::clone(&step)),
                    cost: cost_so_far,
                    transfers: step.transfers + 1,
                };
                if stepped.send(next).await.is_err() {
                    return;
                }
            }
        }

        candidate = feed.next_stop_time_with_transfer(trip, stop, Some(change_stop));
    }
}
