#![allow(dead_code)]

use headway::{Feed, Source};

pub const AGENCY: &str = "\
agency_id,agency_name,agency_url,agency_timezone,agency_lang,agency_phone
a1,A,http://a.example,UTC,,
";

pub const STOPS: &str = "\
stop_id,stop_name,stop_lat,stop_lon
s1,First,0,0
s2,Second,0,0.01
";

pub const ROUTES: &str = "\
route_id,route_short_name,route_long_name,route_type
r1,R1,Line One,3
";

pub const TRIPS: &str = "\
route_id,service_id,trip_id
r1,svc,t1
";

pub const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,08:00:00,08:00:00,s1,1
t1,08:10:00,08:10:00,s2,2
";

pub const CALENDAR: &str = "\
service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
svc,1,1,1,1,1,1,1,20200101,20301231
";

pub fn feed_from(tables: &[(&str, &str)]) -> Feed {
    Feed::from_source(Source::memory(tables)).expect("feed should load")
}

/// One agency, two stops, one bus trip from s1 (08:00) to s2 (08:10),
/// running every day of 2020-2030.
pub fn minimal_tables() -> Vec<(&'static str, &'static str)> {
    vec![
        ("agency.txt", AGENCY),
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
        ("stop_times.txt", STOP_TIMES),
        ("calendar.txt", CALENDAR),
    ]
}

pub fn minimal_feed() -> Feed {
    feed_from(&minimal_tables())
}

pub const TWO_ROUTE_STOPS: &str = "\
stop_id,stop_name,stop_lat,stop_lon
s1,First,0,0
s2,Second,0,0.01
s3,Third,0,0.02
";

pub const TWO_ROUTE_ROUTES: &str = "\
route_id,route_short_name,route_long_name,route_type
r1,R1,Line One,3
r2,R2,Line Two,3
";

pub const TWO_ROUTE_TRIPS: &str = "\
route_id,service_id,trip_id
r1,svc,t1
r2,svc,t2
";

pub const TWO_ROUTE_STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,08:00:00,08:00:00,s1,1
t1,08:10:00,08:10:00,s2,2
t2,08:15:00,08:15:00,s2,1
t2,08:25:00,08:25:00,s3,2
";

/// The minimal feed plus a second route departing s2 at 08:15 for s3,
/// so s1 to s3 takes one change at s2.
pub fn two_route_feed() -> Feed {
    feed_from(&[
        ("agency.txt", AGENCY),
        ("stops.txt", TWO_ROUTE_STOPS),
        ("routes.txt", TWO_ROUTE_ROUTES),
        ("trips.txt", TWO_ROUTE_TRIPS),
        ("stop_times.txt", TWO_ROUTE_STOP_TIMES),
        ("calendar.txt", CALENDAR),
    ])
}
