/// # ARIMA Module
///
/// Non-seasonal ARIMA(p, d, q) with automatic order selection.
///
/// ## Module Structure:
///
/// 1. **step_1_differencing**: differencing, integration and KPSS-driven choice of d
/// 2. **step_2_estimation**: Hannan-Rissanen ARMA estimation and information criteria
/// 3. **step_3_order_search**: pluggable order search, stepwise by default
/// 4. **step_4_forecast**: the statistical forecaster entry point
///
/// The search is deterministic: candidates are compared on criterion value,
/// then total order, then p, q and the intercept flag.
pub mod step_1_differencing;
pub mod step_2_estimation;
pub mod step_3_order_search;
pub mod step_4_forecast;
