//! Converter core: detection, rates and the overlay session.

pub mod clock;
pub mod detection;
pub mod format;
pub mod rates;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
