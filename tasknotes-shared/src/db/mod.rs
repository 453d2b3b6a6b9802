/// Database layer for TaskNotes
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded migration runner
///
/// Row types and their queries are in the `models` module.

pub mod migrations;
pub mod pool;
