//! The record types of a GTFS feed, one function per schema

use gtfs_mapping::{FeedScope, FieldDescriptor as F, Schema, SchemaConfigError};

/// A transit agency. See <https://gtfs.org/reference/static/#agencytxt>
pub fn agency() -> Result<Schema, SchemaConfigError> {
    Schema::builder("agency")
        .field(F::text("agency_id").blank())
        .field(F::text("name"))
        .field(F::text("url"))
        .field(F::text("timezone"))
        .field(F::text("lang").blank())
        .field(F::text("phone").blank())
        .field(F::text("fare_url").blank())
        .column("agency_id", "agency_id")
        .column("agency_name", "name")
        .column("agency_url", "url")
        .column("agency_timezone", "timezone")
        .column("agency_lang", "lang")
        .column("agency_phone", "phone")
        .column("agency_fare_url", "fare_url")
        .build()
}

/// A fare zone. There is no zone file: zones are created when a stop references them
pub fn zone() -> Result<Schema, SchemaConfigError> {
    Schema::builder("zone")
        .field(F::text("zone_id"))
        .column("zone_id", "zone_id")
        .build()
}

/// A physical stop, station or area. See <https://gtfs.org/reference/static/#stopstxt>
pub fn stop() -> Result<Schema, SchemaConfigError> {
    Schema::builder("stop")
        .field(F::text("stop_id"))
        .field(F::text("code").blank())
        .field(F::text("name"))
        .field(F::text("desc").blank())
        .field(F::scalar("lat"))
        .field(F::scalar("lon"))
        .field(F::relation("zone", "zone").null())
        .field(F::text("url").blank())
        .field(F::scalar("location_type").null())
        .field(F::relation("parent_station", "stop").null())
        .field(F::text("timezone").blank())
        .field(F::scalar("wheelchair_boarding").null())
        .column("stop_id", "stop_id")
        .column("stop_code", "code")
        .column("stop_name", "name")
        .column("stop_desc", "desc")
        .column("stop_lat", "lat")
        .column("stop_lon", "lon")
        .column("zone_id", "zone::zone_id")
        .column("stop_url", "url")
        .column("location_type", "location_type")
        .column("parent_station", "parent_station::stop_id")
        .column("stop_timezone", "timezone")
        .column("wheelchair_boarding", "wheelchair_boarding")
        .build()
}

/// A group of trips displayed to riders as a single service. See <https://gtfs.org/reference/static/#routestxt>
pub fn route() -> Result<Schema, SchemaConfigError> {
    Schema::builder("route")
        .field(F::text("route_id"))
        .field(F::relation("agency", "agency").null())
        .field(F::text("short_name"))
        .field(F::text("long_name"))
        .field(F::text("desc").blank())
        .field(F::scalar("route_type"))
        .field(F::text("url").blank())
        .field(F::text("color").blank())
        .field(F::text("text_color").blank())
        .column("route_id", "route_id")
        .column("agency_id", "agency::agency_id")
        .column("route_short_name", "short_name")
        .column("route_long_name", "long_name")
        .column("route_desc", "desc")
        .column("route_type", "route_type")
        .column("route_url", "url")
        .column("route_color", "color")
        .column("route_text_color", "text_color")
        .build()
}

/// Days of service of a set of trips. See <https://gtfs.org/reference/static/#calendartxt>
pub fn service() -> Result<Schema, SchemaConfigError> {
    let mut builder = Schema::builder("service").field(F::text("service_id"));
    for day in WEEKDAYS {
        builder = builder.field(F::boolean(day));
    }
    builder = builder
        .field(F::date("start_date"))
        .field(F::date("end_date"))
        .column("service_id", "service_id");
    for day in WEEKDAYS {
        builder = builder.column(day, day);
    }
    builder
        .column("start_date", "start_date")
        .column("end_date", "end_date")
        .build()
}

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// A date added to or removed from a [service]. See <https://gtfs.org/reference/static/#calendar_datestxt>
pub fn service_date() -> Result<Schema, SchemaConfigError> {
    Schema::builder("service_date")
        .field(F::relation("service", "service"))
        .field(F::date("date"))
        .field(F::scalar("exception_type"))
        .column("service_id", "service::service_id")
        .column("date", "date")
        .column("exception_type", "exception_type")
        .feed_scope(FeedScope::Inherited)
        .build()
}

/// A journey of a vehicle along a route.
///
/// A trip running on several services is written once per service in trips.txt; those rows are merged
/// into one trip. See <https://gtfs.org/reference/static/#tripstxt>
pub fn trip() -> Result<Schema, SchemaConfigError> {
    Schema::builder("trip")
        .field(F::relation("route", "route"))
        .field(F::many("services", "service").blank())
        .field(F::text("trip_id"))
        .field(F::text("headsign").blank())
        .field(F::text("short_name").blank())
        .field(F::scalar("direction").null())
        .field(F::text("block_id").blank())
        .field(F::text("shape_id").blank())
        .field(F::scalar("wheelchair_accessible").null())
        .column("route_id", "route::route_id")
        .column("service_id", "services::service_id")
        .column("trip_id", "trip_id")
        .column("trip_headsign", "headsign")
        .column("trip_short_name", "short_name")
        .column("direction_id", "direction")
        .column("block_id", "block_id")
        .column("shape_id", "shape_id")
        .column("wheelchair_accessible", "wheelchair_accessible")
        .feed_scope(FeedScope::Inherited)
        .build()
}

/// Time at which a vehicle arrives at and departs from a stop. See <https://gtfs.org/reference/static/#stop_timestxt>
pub fn stop_time() -> Result<Schema, SchemaConfigError> {
    Schema::builder("stop_time")
        .field(F::relation("trip", "trip"))
        .field(F::scalar("arrival_time").null())
        .field(F::scalar("departure_time").null())
        .field(F::relation("stop", "stop"))
        .field(F::scalar("stop_sequence"))
        .field(F::text("stop_headsign").blank())
        .field(F::scalar("pickup_type").null())
        .field(F::scalar("drop_off_type").null())
        .field(F::scalar("shape_dist_traveled").null())
        .column("trip_id", "trip::trip_id")
        .column("arrival_time", "arrival_time")
        .column("departure_time", "departure_time")
        .column("stop_id", "stop::stop_id")
        .column("stop_sequence", "stop_sequence")
        .column("stop_headsign", "stop_headsign")
        .column("pickup_type", "pickup_type")
        .column("drop_off_type", "drop_off_type")
        .column("shape_dist_traveled", "shape_dist_traveled")
        .feed_scope(FeedScope::Inherited)
        .build()
}

/// Information about the feed itself. See <https://gtfs.org/reference/static/#feed_infotxt>
pub fn feed_info() -> Result<Schema, SchemaConfigError> {
    Schema::builder("feed_info")
        .field(F::text("publisher_name"))
        .field(F::text("publisher_url"))
        .field(F::text("lang"))
        .field(F::date("start_date").null())
        .field(F::date("end_date").null())
        .field(F::text("version").blank())
        .column("feed_publisher_name", "publisher_name")
        .column("feed_publisher_url", "publisher_url")
        .column("feed_lang", "lang")
        .column("feed_start_date", "start_date")
        .column("feed_end_date", "end_date")
        .column("feed_version", "version")
        .build()
}
