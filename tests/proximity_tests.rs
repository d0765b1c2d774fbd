mod common;

use common::*;
use headway::geo::{Coordinate, radius_box};

/// Ten stops on a 0.01 degree lattice near the origin: two rows of five.
fn lattice_feed() -> headway::Feed {
    let mut stops = String::from("stop_id,stop_name,stop_lat,stop_lon\n");
    let mut index = 0;
    for row in 0..2 {
        for column in 0..5 {
            stops.push_str(&format!(
                "g{index},Grid,{},{}\n",
                row as f64 * 0.01,
                column as f64 * 0.01
            ));
            index += 1;
        }
    }
    let stops: &str = &stops;
    feed_from(&[
        ("agency.txt", AGENCY),
        ("stops.txt", stops),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
        ("stop_times.txt", "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n"),
        ("calendar.txt", CALENDAR),
    ])
}

#[test]
fn proximity_returns_the_bounding_box() {
    let feed = lattice_feed();
    let found = feed.stops_by_proximity(0.0, 0.0, 1_500.0);

    // every stop the equirectangular box covers, nothing else
    let area = radius_box(0.0, 0.0, 1_500.0);
    let expected: Vec<&str> = feed
        .stops
        .iter()
        .filter(|stop| area.contains(&stop.coordinate()))
        .map(|stop| &*stop.id)
        .collect();
    let mut got: Vec<&str> = found.iter().map(|stop| &*stop.id).collect();
    assert!(!expected.is_empty());
    assert_eq!(got.len(), expected.len());
    got.sort_unstable();
    let mut expected = expected;
    expected.sort_unstable();
    assert_eq!(got, expected);

    // 1500 m spans 0.0134 degrees at the equator: two columns of the
    // lattice on each axis
    assert_eq!(found.len(), 4);
}

#[test]
fn proximity_distances_sorted_ascending() {
    let feed = lattice_feed();
    let origin = Coordinate {
        latitude: 0.0,
        longitude: 0.0,
    };
    let found = feed.stop_distances_by_proximity(0.0, 0.0, 1_500.0);
    assert_eq!(found.len(), 4);
    assert_eq!(&*found[0].0.id, "g0");
    assert!(found[0].1 < 1.0);
    for pair in found.windows(2) {
        assert!(pair[0].1 <= pair[1].1);
    }
    for (stop, distance) in &found {
        let direct = stop.coordinate().distance_m(&origin);
        assert!((direct - distance).abs() < 1e-6);
    }
}

#[test]
fn quadtree_completeness_over_the_collection() {
    let feed = lattice_feed();
    // a box catching only the middle column pair
    let found = feed.stops_by_proximity(0.005, 0.02, 900.0);
    let mut ids: Vec<&str> = found.iter().map(|stop| &*stop.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["g2", "g7"]);
}

#[test]
fn extents_track_inserted_stops() {
    let feed = lattice_feed();
    let (min_lat, max_lat, min_lon, max_lon) = feed.stops.extents();
    assert_eq!(min_lat, 0.0);
    assert_eq!(max_lat, 0.01);
    assert_eq!(min_lon, 0.0);
    assert_eq!(max_lon, 0.04);
}

#[test]
fn stops_by_name_exact_match() {
    let feed = lattice_feed();
    assert_eq!(feed.stops_by_name("Grid").len(), 10);
    assert!(feed.stops_by_name("grid").is_empty());
    assert!(feed.stops_by_name("Elsewhere").is_empty());
}

#[test]
fn far_away_query_finds_nothing() {
    let feed = lattice_feed();
    assert!(feed.stops_by_proximity(50.0, 50.0, 1_000.0).is_empty());
}
