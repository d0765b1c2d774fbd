use serde::Serialize;

use crate::feed::{Feed, Trip};
use crate::schedule::Time;

use super::Step;

/// One boarded vehicle within an itinerary.
#[derive(Debug, Clone, Serialize)]
pub struct Leg {
    pub trip_id: String,
    pub route_id: String,
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub departure: Time,
    pub arrival: Time,
}

/// A feasible ride from origin to destination: legs in travel order, the
/// accumulated cost (transfer penalties included), and the number of
/// changes.
#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub legs: Vec<Leg>,
    pub cost_secs: u32,
    pub transfers: u32,
}

/// Rebuilds the ride from the found step's predecessor chain. Each
/// consecutive pair of steps is one leg on the earlier step's trip.
pub(super) fn reconstruct(feed: &Feed, last: &Step) -> Itinerary {
    let mut chain: Vec<&Step> = Vec::new();
    let mut current = Some(last);
    while let Some(step) = current {
        chain.push(step);
        current = step.previous.as_deref();
    }
    chain.reverse();

    let mut legs = Vec::with_capacity(chain.len().saturating_sub(1));
    for pair in chain.windows(2) {
        let board_index = pair[0].stop_time;
        let board = &feed.stop_times[board_index as usize];
        let reached = &feed.stop_times[pair[1].stop_time as usize];
        let trip = &feed.trips[board.trip as usize];
        let route = &feed.routes[trip.route as usize];
        let arrival =
            arrival_on_trip(feed, trip, board_index, reached.stop).unwrap_or(reached.arrival);
        legs.push(Leg {
            trip_id: trip.id.to_string(),
            route_id: route.id.to_string(),
            from_stop_id: board.stop_id.to_string(),
            to_stop_id: reached.stop_id.to_string(),
            departure: board.departure,
            arrival,
        });
    }

    Itinerary {
        legs,
        cost_secs: last.cost,
        transfers: last.transfers,
    }
}

/// Arrival time at `stop` on the boarded trip, scanning past the boarding
/// stop time. The next step's own times belong to the trip boarded *there*,
/// which at a change of vehicle is not the trip that carried us in.
fn arrival_on_trip(feed: &Feed, trip: &Trip, board_index: u32, stop: Option<u32>) -> Option<Time> {
    let stop = stop?;
    let mut past_boarding = false;
    for &index in &trip.stop_times {
        if index == board_index {
            past_boarding = true;
            continue;
        }
        if !past_boarding {
            continue;
        }
        let st = &feed.stop_times[index as usize];
        if st.stop == Some(stop) {
            return Some(st.arrival);
        }
    }
    None
}
