/// Middleware modules for the API server
///
/// Authentication lives in [`crate::app`] as a `from_fn` layer; this module
/// holds the tower layers.

pub mod security;
