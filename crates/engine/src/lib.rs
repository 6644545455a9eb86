pub mod country;
#[cfg(test)]
pub(crate) mod testutil;
pub mod enrich;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod state;
pub mod transform;
