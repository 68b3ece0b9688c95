pub mod arima;
pub mod config;
pub mod constants;
pub mod error;
pub mod forecast;
pub mod lstm;
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod calendar;
    pub mod feature_engineering;
    pub mod file_utils;
    pub mod metrics;
    pub mod pre_processor;
}
