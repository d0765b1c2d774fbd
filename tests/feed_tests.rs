mod common;

use chrono::NaiveDate;
use common::*;
use headway::feed::{Error, ExceptionType, TransferType};
use headway::schedule::DayRange;
use headway::{Feed, Source};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

#[test]
fn trips_for_day_finds_the_trip() {
    let feed = minimal_feed();
    let trips = feed.trips_for_day(monday());
    assert_eq!(trips.len(), 1);
    assert_eq!(&*trips[0].id, "t1");
}

#[test]
fn trips_for_day_and_range() {
    let feed = minimal_feed();
    let hit = feed.trips_for_day_and_range(monday(), &DayRange::from_seconds(28_800, 30_000));
    assert_eq!(hit.len(), 1);
    let miss = feed.trips_for_day_and_range(monday(), &DayRange::from_seconds(0, 3_600));
    assert!(miss.is_empty());
}

#[test]
fn trips_for_day_and_range_and_stop() {
    let feed = minimal_feed();
    let range = DayRange::from_seconds(28_800, 30_000);
    assert_eq!(
        feed.trips_for_day_and_range_and_stop(monday(), &range, "s2")
            .len(),
        1
    );
    assert!(
        feed.trips_for_day_and_range_and_stop(monday(), &range, "nowhere")
            .is_empty()
    );
}

#[test]
fn removed_exception_cancels_service() {
    let mut tables = minimal_tables();
    tables.push((
        "calendar_dates.txt",
        "service_id,date,exception_type\nsvc,20240304,2\n",
    ));
    let feed = feed_from(&tables);
    assert!(feed.trips_for_day(monday()).is_empty());
    // the day after is untouched
    let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert_eq!(feed.trips_for_day(tuesday).len(), 1);
}

#[test]
fn added_exception_enables_service_outside_the_calendar() {
    let feed = feed_from(&[
        ("agency.txt", AGENCY),
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
        ("stop_times.txt", STOP_TIMES),
        (
            "calendar.txt",
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             svc,1,0,0,0,0,0,0,20200101,20301231\n",
        ),
        (
            "calendar_dates.txt",
            "service_id,date,exception_type\nsvc,20240305,1\n",
        ),
    ]);
    // Tuesday is off the weekly pattern but added by exception.
    let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert_eq!(feed.trips_for_day(tuesday).len(), 1);
    let wednesday = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    assert!(feed.trips_for_day(wednesday).is_empty());
}

#[test]
fn post_midnight_day_range() {
    let mut tables = minimal_tables();
    tables[4] = (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
         t1,23:50:00,23:50:00,s1,1\n\
         t1,25:15:00,25:15:00,s2,2\n",
    );
    let feed = feed_from(&tables);
    let trip = feed.trip("t1").unwrap();
    assert_eq!(trip.day_range, DayRange::from_seconds(85_800, 90_900));
    // the range lives on the service day's axis, so an early-morning query
    // window does not match
    assert!(
        feed.trips_for_day_and_range(monday(), &DayRange::from_seconds(0, 3_600))
            .is_empty()
    );
}

#[test]
fn quoted_agency_name() {
    let mut tables = minimal_tables();
    tables[0] = (
        "agency.txt",
        "agency_id,agency_name,agency_url,agency_timezone,agency_lang,agency_phone\n\
         a1,\"Acme, Inc.\",http://x,UTC,,\n",
    );
    let feed = feed_from(&tables);
    let agency = feed.agencies.get("a1").unwrap();
    assert_eq!(&*agency.name, "Acme, Inc.");
}

#[test]
fn stop_time_with_unknown_trip_is_dropped() {
    let mut tables = minimal_tables();
    tables[4] = (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
         t1,08:00:00,08:00:00,s1,1\n\
         ghost,08:05:00,08:05:00,s2,1\n",
    );
    let feed = feed_from(&tables);
    assert_eq!(feed.stop_times.len(), 1);
    assert_eq!(feed.trip("t1").unwrap().stop_times.len(), 1);
}

#[test]
fn stop_time_with_unknown_stop_stays_on_the_trip() {
    let mut tables = minimal_tables();
    tables[4] = (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
         t1,08:00:00,08:00:00,s1,1\n\
         t1,08:10:00,08:10:00,ghost,2\n",
    );
    let feed = feed_from(&tables);
    let trip = feed.trip("t1").unwrap();
    assert_eq!(trip.stop_times.len(), 2);
    let last = feed.trip_stop_times(trip).last().unwrap();
    assert_eq!(last.stop, None);
    // it hangs off no stop
    let attached: usize = feed.stops.iter().map(|stop| stop.stop_times.len()).sum();
    assert_eq!(attached, 1);
}

#[test]
fn duplicate_stop_sequence_first_seen_wins() {
    let mut tables = minimal_tables();
    tables[4] = (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
         t1,08:00:00,08:00:00,s1,1\n\
         t1,09:00:00,09:00:00,s2,1\n\
         t1,08:10:00,08:10:00,s2,2\n",
    );
    let feed = feed_from(&tables);
    let trip = feed.trip("t1").unwrap();
    let times: Vec<_> = feed.trip_stop_times(trip).collect();
    assert_eq!(times.len(), 2);
    assert_eq!(times[0].departure.as_seconds(), 28_800);
    assert_eq!(times[1].departure.as_seconds(), 29_400);
}

#[test]
fn stop_sequences_strictly_increase() {
    let feed = two_route_feed();
    for trip in feed.trips.iter() {
        let sequences: Vec<u32> = feed.trip_stop_times(trip).map(|st| st.sequence).collect();
        assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn out_of_order_rows_are_sorted_by_sequence() {
    let mut tables = minimal_tables();
    tables[4] = (
        "stop_times.txt",
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
         t1,08:10:00,08:10:00,s2,2\n\
         t1,08:00:00,08:00:00,s1,1\n",
    );
    let feed = feed_from(&tables);
    let trip = feed.trip("t1").unwrap();
    let stops: Vec<_> = feed
        .trip_stop_times(trip)
        .map(|st| st.stop_id.to_string())
        .collect();
    assert_eq!(stops, vec!["s1", "s2"]);
}

#[test]
fn trip_with_unknown_route_is_dropped() {
    let mut tables = minimal_tables();
    tables[3] = ("trips.txt", "route_id,service_id,trip_id\nghost,svc,t1\n");
    let feed = feed_from(&tables);
    assert!(feed.trips.is_empty());
    assert!(feed.trip("t1").is_none());
}

#[test]
fn feed_without_agencies_fails() {
    let tables = &minimal_tables()[1..];
    let result = Feed::from_source(Source::memory(tables));
    assert!(matches!(result, Err(Error::NoAgency)));
}

#[test]
fn transfers_install_on_the_from_stop() {
    let mut tables = minimal_tables();
    tables.push((
        "transfers.txt",
        "from_stop_id,to_stop_id,transfer_type,min_transfer_time\n\
         s1,s2,2,120\n\
         ghost,s2,0,\n",
    ));
    let feed = feed_from(&tables);
    let stop = feed.stop("s1").unwrap();
    let transfer = stop.transfers.get("s2").unwrap();
    assert_eq!(transfer.transfer_type, TransferType::RequiresMinTime);
    assert_eq!(transfer.min_transfer_secs, 120);
    assert!(feed.stop("s2").unwrap().transfers.is_empty());
}

#[test]
fn frequencies_widen_the_day_range() {
    let mut tables = minimal_tables();
    tables.push((
        "frequencies.txt",
        "trip_id,start_time,end_time,headway_secs\n\
         t1,06:00:00,10:00:00,600\n\
         ghost,06:00:00,10:00:00,600\n",
    ));
    let feed = feed_from(&tables);
    let trip = feed.trip("t1").unwrap();
    assert_eq!(trip.frequencies.len(), 1);
    assert_eq!(trip.day_range, DayRange::from_seconds(21_600, 36_000));
    assert_eq!(
        trip.frequencies[0].day_range,
        DayRange::from_seconds(21_600, 36_000)
    );
}

#[test]
fn day_range_covers_the_schedule() {
    let feed = two_route_feed();
    for trip in feed.trips.iter() {
        let min_departure = feed
            .trip_stop_times(trip)
            .map(|st| st.departure)
            .min()
            .unwrap();
        let max_arrival = feed
            .trip_stop_times(trip)
            .map(|st| st.arrival)
            .max()
            .unwrap();
        assert!(trip.day_range.from <= min_departure);
        assert!(trip.day_range.to >= max_arrival);
    }
}

#[test]
fn shape_color_comes_from_the_first_owning_route() {
    let feed = feed_from(&[
        ("agency.txt", AGENCY),
        ("stops.txt", STOPS),
        (
            "routes.txt",
            "route_id,route_type,route_color\nr1,3,FF0000\nr2,3,00FF00\n",
        ),
        (
            "trips.txt",
            "route_id,service_id,trip_id,shape_id\nr1,svc,t1,sh\nr2,svc,t2,sh\n",
        ),
        ("stop_times.txt", "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n"),
        ("calendar.txt", CALENDAR),
        (
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nsh,0,0,0\nsh,0,0.01,1\n",
        ),
    ]);
    let shape = feed.shapes.get("sh").unwrap();
    assert_eq!(shape.points.len(), 2);
    assert_eq!(shape.color.as_deref(), Some("FF0000"));
}

#[test]
fn referential_closure() {
    let feed = two_route_feed();
    for st in feed.stop_times.iter() {
        assert!((st.trip as usize) < feed.trips.len());
        if let Some(stop) = st.stop {
            assert!((stop as usize) < feed.stops.len());
        }
    }
    for trip in feed.trips.iter() {
        assert!((trip.route as usize) < feed.routes.len());
    }
}

#[test]
fn next_stop_times_sorted_and_truncated() {
    let feed = two_route_feed();
    let at = monday().and_hms_opt(8, 5, 0).unwrap();
    let upcoming = feed.next_stop_times("s2", at, 10);
    assert_eq!(upcoming.len(), 2);
    assert!(upcoming[0].departure <= upcoming[1].departure);
    assert_eq!(&*upcoming[0].trip_id, "t1");
    let only_one = feed.next_stop_times("s2", at, 1);
    assert_eq!(only_one.len(), 1);
    // past the last departure nothing is upcoming
    let late = monday().and_hms_opt(9, 0, 0).unwrap();
    assert!(feed.next_stop_times("s2", late, 10).is_empty());
}

#[test]
fn next_stop_times_skip_non_running_services() {
    let mut tables = minimal_tables();
    tables.push((
        "calendar_dates.txt",
        "service_id,date,exception_type\nsvc,20240304,2\n",
    ));
    let feed = feed_from(&tables);
    let at = monday().and_hms_opt(7, 0, 0).unwrap();
    assert!(feed.next_stop_times("s1", at, 10).is_empty());
}

#[test]
fn parent_station_back_lookup() {
    let mut tables = minimal_tables();
    tables[1] = (
        "stops.txt",
        "stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station\n\
         hub,Hub,0,0,1,\n\
         s1,First,0,0,0,hub\n\
         s2,Second,0,0.01,0,\n",
    );
    let feed = feed_from(&tables);
    let child = feed.stop("s1").unwrap();
    let parent = feed.parent_station(child).unwrap();
    assert_eq!(&*parent.id, "hub");
    assert!(feed.parent_station(feed.stop("s2").unwrap()).is_none());
}

#[test]
fn reload_rebuilds_the_graph() {
    let mut feed = minimal_feed();
    assert_eq!(feed.trips.len(), 1);
    feed.reload().unwrap();
    assert_eq!(feed.trips.len(), 1);
    assert_eq!(feed.stops.len(), 2);
    assert_eq!(feed.trips_for_day(monday()).len(), 1);
}

#[test]
fn fare_attributes_parse_structurally() {
    let mut tables = minimal_tables();
    tables.push((
        "fare_attributes.txt",
        "fare_id,price,currency_type,payment_method,transfers,transfer_duration\n\
         f1,2.50,USD,0,1,7200\n",
    ));
    tables.push(("fare_rules.txt", "fare_id,route_id\nf1,r1\n"));
    let feed = feed_from(&tables);
    let fare = feed.fare_attributes.get("f1").unwrap();
    assert_eq!(&*fare.currency, "USD");
    assert_eq!(fare.transfer_duration, 7_200);
}

#[test]
fn exceptions_never_leak_across_services() {
    let mut tables = minimal_tables();
    tables.push((
        "calendar_dates.txt",
        "service_id,date,exception_type\nother,20240304,2\n",
    ));
    let feed = feed_from(&tables);
    assert_eq!(feed.trips_for_day(monday()).len(), 1);
    let exception = &feed.calendar_dates.get("other").unwrap()[0];
    assert_eq!(exception.exception, ExceptionType::Removed);
}
