#[cfg(feature = "ssr")]
use contest_hub::{establish_connection, init_schema, reset_database};

#[cfg(feature = "ssr")]
fn main() {
    let mut conn = establish_connection().expect("Failed to connect to DATABASE_URL");
    init_schema(&mut conn).expect("Failed to create database schema");
    reset_database(&mut conn).expect("Failed to reset database");
    println!("All contests and admin sessions removed.");
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
