//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `registrar_core` linkage and
//!   schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("registrar_core version={}", registrar_core::core_version());
    match registrar_core::db::open_db_in_memory() {
        Ok(_) => println!("registrar_core schema=ok"),
        Err(err) => println!("registrar_core schema=error {err}"),
    }
}
