#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the city pulse incident pipeline.
//!
//! Reads the feed configuration from the environment; without
//! `CITY_PULSE_DATABASE_URL` it serves demo data.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    city_pulse_server::run_server(city_pulse_server::backend_from_env()).await
}
