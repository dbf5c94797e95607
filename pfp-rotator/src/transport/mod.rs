//! Network transports for the update triggers
//!
//! - [`http`]: The public and authenticated triggers over HTTP/JSON

pub mod http;
