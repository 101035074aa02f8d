#[cfg(feature = "ssr")]
use contest_hub::{establish_connection, init_schema, seed_sample_contests};

#[cfg(feature = "ssr")]
fn main() {
    let mut conn = establish_connection().expect("Failed to connect to DATABASE_URL");
    init_schema(&mut conn).expect("Failed to create database schema");
    match seed_sample_contests(&mut conn).expect("Failed to seed contests") {
        0 => println!("Contests table is not empty, nothing seeded."),
        n => println!("Seeded {} sample contests.", n),
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
