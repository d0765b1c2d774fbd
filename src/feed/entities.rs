use std::collections::HashMap;
use std::sync::Arc;

use chrono::Weekday;
use serde::Serialize;

use crate::geo::Coordinate;
use crate::schedule::{DayRange, Time};
use crate::tables::{FieldError, Record};

fn bad(field: &'static str, value: &str, reason: &'static str) -> FieldError {
    FieldError::new(field, value, reason)
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, FieldError> {
    value
        .parse()
        .map_err(|_| bad(field, value, "expected an unsigned integer"))
}

fn parse_f64(field: &'static str, value: &str) -> Result<f64, FieldError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| bad(field, value, "expected a number"))?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(bad(field, value, "expected a finite number"))
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<Time, FieldError> {
    Time::from_hms(value).ok_or_else(|| bad(field, value, "expected H:MM:SS or HH:MM:SS"))
}

/// "1" is true, anything else false.
fn flag(value: &str) -> bool {
    value == "1"
}

/// agency.txt row. The id may stay empty in single-agency feeds.
#[derive(Debug, Default, Clone)]
pub struct Agency {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub url: Arc<str>,
    pub timezone: Arc<str>,
    pub lang: Arc<str>,
    pub phone: Arc<str>,
}

impl Record for Agency {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "agency_id" => self.id = value.into(),
            "agency_name" => self.name = value.into(),
            "agency_url" => self.url = value.into(),
            "agency_timezone" => self.timezone = value.into(),
            "agency_lang" => self.lang = value.into(),
            "agency_phone" => self.phone = value.into(),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteType {
    #[default]
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
}

impl RouteType {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Tram),
            1 => Some(Self::Subway),
            2 => Some(Self::Rail),
            3 => Some(Self::Bus),
            4 => Some(Self::Ferry),
            5 => Some(Self::CableCar),
            6 => Some(Self::Gondola),
            7 => Some(Self::Funicular),
            _ => None,
        }
    }
}

/// routes.txt row. The agency back-reference stays an id; it is looked up
/// on demand and may dangle without invalidating the route.
#[derive(Debug, Clone)]
pub struct Route {
    pub index: u32,
    pub id: Arc<str>,
    pub agency_id: Arc<str>,
    pub short_name: Arc<str>,
    pub long_name: Arc<str>,
    pub desc: Arc<str>,
    pub route_type: RouteType,
    pub url: Arc<str>,
    pub color: Arc<str>,
    pub text_color: Arc<str>,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            index: 0,
            id: Arc::default(),
            agency_id: Arc::default(),
            short_name: Arc::default(),
            long_name: Arc::default(),
            desc: Arc::default(),
            route_type: RouteType::default(),
            url: Arc::default(),
            color: "FFFFFF".into(),
            text_color: "000000".into(),
        }
    }
}

impl Record for Route {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "route_id" => self.id = value.into(),
            "agency_id" => self.agency_id = value.into(),
            "route_short_name" => self.short_name = value.into(),
            "route_long_name" => self.long_name = value.into(),
            "route_desc" => self.desc = value.into(),
            "route_type" => {
                let code = parse_u32("route_type", value)?;
                if let Some(route_type) = RouteType::from_code(code) {
                    self.route_type = route_type;
                }
            }
            "route_url" => self.url = value.into(),
            "route_color" => self.color = value.into(),
            "route_text_color" => self.text_color = value.into(),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationType {
    #[default]
    Stop,
    Station,
}

/// stops.txt row plus everything the feed hangs off a stop afterwards:
/// outgoing transfer rules and the stop times that call here.
#[derive(Debug, Default, Clone)]
pub struct Stop {
    pub index: u32,
    pub id: Arc<str>,
    pub code: Arc<str>,
    pub name: Arc<str>,
    pub desc: Arc<str>,
    pub latitude: f64,
    pub longitude: f64,
    pub zone_id: Arc<str>,
    pub url: Arc<str>,
    pub location_type: LocationType,
    /// Parent station id; back-lookup only, meaningful for child stops.
    pub parent_station: Arc<str>,
    /// Transfer rules out of this stop, keyed by destination stop id.
    pub transfers: HashMap<Arc<str>, Transfer>,
    /// Stop-time arena indices in feed insertion order.
    pub stop_times: Vec<u32>,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl Record for Stop {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "stop_id" => self.id = value.into(),
            "stop_code" => self.code = value.into(),
            "stop_name" => self.name = value.into(),
            "stop_desc" => self.desc = value.into(),
            "stop_lat" => self.latitude = parse_f64("stop_lat", value)?,
            "stop_lon" => self.longitude = parse_f64("stop_lon", value)?,
            "zone_id" => self.zone_id = value.into(),
            "stop_url" => self.url = value.into(),
            "location_type" => {
                let code = parse_u32("location_type", value)?;
                self.location_type = match code {
                    1 => LocationType::Station,
                    _ => LocationType::Stop,
                };
            }
            "parent_station" => self.parent_station = value.into(),
            _ => {}
        }
        Ok(())
    }
}

/// calendar.txt row: a weekly service pattern over a date window. Dates are
/// YYYYMMDD integers so the window check is plain integer ordering.
#[derive(Debug, Default, Clone)]
pub struct Calendar {
    pub service_id: Arc<str>,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: u32,
    pub end_date: u32,
}

impl Calendar {
    /// Whether the weekly pattern covers `date` (YYYYMMDD) falling on
    /// `weekday`. Both window ends are inclusive.
    pub fn valid_on(&self, date: u32, weekday: Weekday) -> bool {
        if date < self.start_date || date > self.end_date {
            return false;
        }
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

impl Record for Calendar {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "service_id" => self.service_id = value.into(),
            "monday" => self.monday = flag(value),
            "tuesday" => self.tuesday = flag(value),
            "wednesday" => self.wednesday = flag(value),
            "thursday" => self.thursday = flag(value),
            "friday" => self.friday = flag(value),
            "saturday" => self.saturday = flag(value),
            "sunday" => self.sunday = flag(value),
            "start_date" => self.start_date = parse_u32("start_date", value)?,
            "end_date" => self.end_date = parse_u32("end_date", value)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExceptionType {
    Added,
    #[default]
    Removed,
}

/// calendar_dates.txt row: a dated exception overriding the weekly pattern.
#[derive(Debug, Default, Clone)]
pub struct CalendarDate {
    pub service_id: Arc<str>,
    pub date: u32,
    pub exception: ExceptionType,
}

impl Record for CalendarDate {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "service_id" => self.service_id = value.into(),
            "date" => self.date = parse_u32("date", value)?,
            "exception_type" => {
                self.exception = if flag(value) {
                    ExceptionType::Added
                } else {
                    ExceptionType::Removed
                };
            }
            _ => {}
        }
        Ok(())
    }
}

/// Shape points grouped by id, in file order, plus the color copied from
/// the first route that draws this shape.
#[derive(Debug, Default, Clone)]
pub struct Shape {
    pub id: Arc<str>,
    pub points: Vec<ShapePoint>,
    pub color: Option<Arc<str>>,
}

/// shapes.txt row.
#[derive(Debug, Default, Clone)]
pub struct ShapePoint {
    pub shape_id: Arc<str>,
    pub latitude: f64,
    pub longitude: f64,
    pub sequence: u32,
    pub distance_traveled: f64,
}

impl Record for ShapePoint {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "shape_id" => self.shape_id = value.into(),
            "shape_pt_lat" => self.latitude = parse_f64("shape_pt_lat", value)?,
            "shape_pt_lon" => self.longitude = parse_f64("shape_pt_lon", value)?,
            "shape_pt_sequence" => self.sequence = parse_u32("shape_pt_sequence", value)?,
            "shape_dist_traveled" => {
                self.distance_traveled = parse_f64("shape_dist_traveled", value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[default]
    Out,
    In,
}

/// trips.txt row plus the derived schedule attached at load time: the
/// ordered stop times, frequency windows, and the covering day range.
#[derive(Debug, Default, Clone)]
pub struct Trip {
    pub index: u32,
    pub id: Arc<str>,
    pub route_id: Arc<str>,
    /// Resolved route arena index; trips with an unknown route are dropped.
    pub route: u32,
    pub service_id: Arc<str>,
    pub headsign: Arc<str>,
    pub short_name: Arc<str>,
    pub direction: Direction,
    pub block_id: Arc<str>,
    pub shape_id: Arc<str>,
    /// Stop-time arena indices, ascending by stop sequence.
    pub stop_times: Vec<u32>,
    pub frequencies: Vec<Frequency>,
    /// Earliest departure to latest arrival, widened over every frequency
    /// window.
    pub day_range: DayRange,
}

impl Record for Trip {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "trip_id" => self.id = value.into(),
            "route_id" => self.route_id = value.into(),
            "service_id" => self.service_id = value.into(),
            "trip_headsign" => self.headsign = value.into(),
            "trip_short_name" => self.short_name = value.into(),
            "direction_id" => {
                let code = parse_u32("direction_id", value)?;
                self.direction = match code {
                    1 => Direction::In,
                    _ => Direction::Out,
                };
            }
            "block_id" => self.block_id = value.into(),
            "shape_id" => self.shape_id = value.into(),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopAccess {
    #[default]
    Regular,
    Unavailable,
    PhoneAgency,
    CoordinateWithDriver,
}

impl StopAccess {
    fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Unavailable,
            2 => Self::PhoneAgency,
            3 => Self::CoordinateWithDriver,
            _ => Self::Regular,
        }
    }
}

/// stop_times.txt row. Arrival and departure are service-day seconds and
/// may pass 86 400 on trips that run past midnight.
#[derive(Debug, Default, Clone)]
pub struct StopTime {
    pub trip_id: Arc<str>,
    /// Resolved trip arena index; rows with an unknown trip are dropped.
    pub trip: u32,
    pub stop_id: Arc<str>,
    /// `None` when the feed referenced an unknown stop; the row then lives
    /// on the trip only.
    pub stop: Option<u32>,
    pub arrival: Time,
    pub departure: Time,
    pub sequence: u32,
    pub headsign: Arc<str>,
    pub pickup: StopAccess,
    pub drop_off: StopAccess,
    pub distance_traveled: f64,
}

impl Record for StopTime {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "trip_id" => self.trip_id = value.into(),
            "arrival_time" => self.arrival = parse_time("arrival_time", value)?,
            "departure_time" => self.departure = parse_time("departure_time", value)?,
            "stop_id" => self.stop_id = value.into(),
            "stop_sequence" => self.sequence = parse_u32("stop_sequence", value)?,
            "stop_headsign" => self.headsign = value.into(),
            "pickup_type" => self.pickup = StopAccess::from_code(parse_u32("pickup_type", value)?),
            "drop_off_type" => {
                self.drop_off = StopAccess::from_code(parse_u32("drop_off_type", value)?);
            }
            "shape_dist_traveled" => {
                self.distance_traveled = parse_f64("shape_dist_traveled", value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// frequencies.txt row: a headway window standing in for absolute stop
/// times within [start, end].
#[derive(Debug, Default, Clone)]
pub struct Frequency {
    pub trip_id: Arc<str>,
    pub start: Time,
    pub end: Time,
    pub headway_secs: u32,
    /// Derived: [start, end].
    pub day_range: DayRange,
}

impl Record for Frequency {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "trip_id" => self.trip_id = value.into(),
            "start_time" => self.start = parse_time("start_time", value)?,
            "end_time" => self.end = parse_time("end_time", value)?,
            "headway_secs" => self.headway_secs = parse_u32("headway_secs", value)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferType {
    #[default]
    Recommended,
    DepartingWaitsForArriving,
    RequiresMinTime,
    Impossible,
}

impl TransferType {
    fn from_code(code: u32) -> Self {
        match code {
            1 => Self::DepartingWaitsForArriving,
            2 => Self::RequiresMinTime,
            3 => Self::Impossible,
            _ => Self::Recommended,
        }
    }
}

/// transfers.txt row: a rule for moving between two stops' services.
#[derive(Debug, Default, Clone)]
pub struct Transfer {
    pub from_stop_id: Arc<str>,
    pub to_stop_id: Arc<str>,
    pub transfer_type: TransferType,
    pub min_transfer_secs: u32,
}

impl Record for Transfer {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "from_stop_id" => self.from_stop_id = value.into(),
            "to_stop_id" => self.to_stop_id = value.into(),
            "transfer_type" => {
                self.transfer_type = TransferType::from_code(parse_u32("transfer_type", value)?);
            }
            "min_transfer_time" => {
                self.min_transfer_secs = parse_u32("min_transfer_time", value)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentMethod {
    #[default]
    OnBoard,
    BeforeBoarding,
}

/// Transfers permitted on one fare. Empty means unlimited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferPolicy {
    None,
    Once,
    Twice,
    #[default]
    Unlimited,
}

/// fare_attributes.txt row. Parsed structurally; nothing queries fares.
#[derive(Debug, Default, Clone)]
pub struct FareAttribute {
    pub id: Arc<str>,
    pub price: f64,
    pub currency: Arc<str>,
    pub payment_method: PaymentMethod,
    pub transfers: TransferPolicy,
    pub transfer_duration: u32,
}

impl Record for FareAttribute {
    fn absorb(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "fare_id" => self.id = value.into(),
            "price" => self.price = parse_f64("price", value)?,
            "currency_type" => self.currency = value.into(),
            "payment_method" => {
                self.payment_method = if flag(value) {
                    PaymentMethod::BeforeBoarding
                } else {
                    PaymentMethod::OnBoard
                };
            }
            "transfers" => {
                self.transfers = match parse_u32("transfers", value)? {
                    0 => TransferPolicy::None,
                    1 => TransferPolicy::Once,
                    2 => TransferPolicy::Twice,
                    _ => TransferPolicy::Unlimited,
                };
            }
            "transfer_duration" => {
                self.transfer_duration = parse_u32("transfer_duration", value)?;
            }
            _ => {}
        }
        Ok(())
    }
}
