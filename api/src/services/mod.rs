pub mod alerts;
pub mod openweather;
pub mod scheduler;
pub mod store;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;
