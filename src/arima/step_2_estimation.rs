// External imports
use nalgebra::{DMatrix, DVector};
use std::fmt;

// Internal imports
use crate::config::InformationCriterion;
use crate::constants::SIGMA2_FLOOR;
use crate::error::{ForecastError, ForecastResult};

/// ARIMA(p, d, q) order plus whether an intercept is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub with_constant: bool,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize, with_constant: bool) -> Self {
        Self { p, d, q, with_constant }
    }

    /// p + d + q, the tie-break between equally scoring candidates
    pub fn total_order(&self) -> usize {
        self.p + self.d + self.q
    }

    /// Estimated coefficients plus the innovation variance
    pub fn num_params(&self) -> usize {
        self.p + self.q + usize::from(self.with_constant) + 1
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.with_constant {
            write!(f, " with constant")?;
        }
        Ok(())
    }
}

/// ARMA model fitted to a differenced series
#[derive(Debug, Clone)]
pub struct ArmaFit {
    pub order: ArimaOrder,
    pub constant: f64,
    pub ar_coeffs: Vec<f64>,
    pub ma_coeffs: Vec<f64>,
    /// Conditional residuals aligned with the differenced series; zero before index p
    pub residuals: Vec<f64>,
    pub sigma2: f64,
    pub n_eff: usize,
    pub log_likelihood: f64,
}

impl ArmaFit {
    pub fn information_criterion(&self, criterion: InformationCriterion) -> f64 {
        let k = self.order.num_params() as f64;
        let n = self.n_eff as f64;
        let aic = -2.0 * self.log_likelihood + 2.0 * k;
        match criterion {
            InformationCriterion::Aic => aic,
            InformationCriterion::Aicc => {
                if n - k - 1.0 > 0.0 {
                    aic + 2.0 * k * (k + 1.0) / (n - k - 1.0)
                } else {
                    f64::INFINITY
                }
            }
            InformationCriterion::Bic => -2.0 * self.log_likelihood + k * n.ln(),
        }
    }

    /// Recursive forecasts on the differenced scale, future shocks set to zero
    pub fn forecast_differenced(&self, differenced: &[f64], horizon: usize) -> Vec<f64> {
        let mut history = differenced.to_vec();
        let mut shocks = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut value = self.constant;
            for (i, phi) in self.ar_coeffs.iter().enumerate() {
                value += phi * history[history.len() - 1 - i];
            }
            for (j, theta) in self.ma_coeffs.iter().enumerate() {
                value += theta * shocks[shocks.len() - 1 - j];
            }
            history.push(value);
            shocks.push(0.0);
            forecasts.push(value);
        }
        forecasts
    }
}

/// Ordinary least squares via SVD; `None` when the design is rank deficient
fn least_squares(rows: usize, cols: usize, x_data: &[f64], y: Vec<f64>) -> Option<Vec<f64>> {
    if rows <= cols {
        return None;
    }
    let x = DMatrix::from_row_slice(rows, cols, x_data);
    let y = DVector::from_vec(y);

    let svd = x.svd(true, true);
    let eps = svd.singular_values.max() * 1e-10;
    if eps <= 0.0 || svd.rank(eps) < cols {
        return None;
    }
    let beta = svd.solve(&y, eps).ok()?;
    let beta: Vec<f64> = beta.iter().copied().collect();
    beta.iter().all(|b| b.is_finite()).then_some(beta)
}

/// Regresses y_t on an optional intercept, p lags of y and q lags of `shocks`
fn regress_arma(
    y: &[f64],
    shocks: &[f64],
    p: usize,
    q: usize,
    with_constant: bool,
    start: usize,
) -> Option<(f64, Vec<f64>, Vec<f64>)> {
    let cols = usize::from(with_constant) + p + q;
    let rows = y.len().saturating_sub(start);
    let mut x_data = Vec::with_capacity(rows * cols);
    let mut targets = Vec::with_capacity(rows);

    for t in start..y.len() {
        targets.push(y[t]);
        if with_constant {
            x_data.push(1.0);
        }
        for i in 1..=p {
            x_data.push(y[t - i]);
        }
        for j in 1..=q {
            x_data.push(shocks[t - j]);
        }
    }

    let beta = least_squares(rows, cols, &x_data, targets)?;
    let offset = usize::from(with_constant);
    let constant = if with_constant { beta[0] } else { 0.0 };
    let ar = beta[offset..offset + p].to_vec();
    let ma = beta[offset + p..].to_vec();
    Some((constant, ar, ma))
}

/// Conditional-sum-of-squares residuals for fixed coefficients
pub fn conditional_residuals(y: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; y.len()];
    for t in p..y.len() {
        let mut fitted = constant;
        for (i, phi) in ar.iter().enumerate() {
            fitted += phi * y[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                fitted += theta * residuals[t - 1 - j];
            }
        }
        residuals[t] = y[t] - fitted;
    }
    residuals
}

/// Fits ARMA(p, q) to an already differenced series.
///
/// Pure AR terms come from one OLS regression. MA terms use the two-stage
/// Hannan-Rissanen procedure: a long autoregression supplies proxy shocks,
/// then y is regressed on its own lags and the lagged proxies.
pub fn fit_arma(differenced: &[f64], order: ArimaOrder) -> ForecastResult<ArmaFit> {
    let n = differenced.len();
    let (p, q) = (order.p, order.q);
    if n < p + q + usize::from(order.with_constant) + 2 {
        return Err(ForecastError::ModelFit(format!(
            "{} needs more than {} observations",
            order, n
        )));
    }

    let singular = || ForecastError::ModelFit(format!("{}: singular estimation", order));

    let (constant, ar_coeffs, ma_coeffs) = if p == 0 && q == 0 {
        let constant = if order.with_constant {
            differenced.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        (constant, Vec::new(), Vec::new())
    } else if q == 0 {
        let no_shocks = vec![0.0; n];
        regress_arma(differenced, &no_shocks, p, 0, order.with_constant, p).ok_or_else(singular)?
    } else {
        let long_order = (p + q).max(10.min(n / 4)).max(1);
        let no_shocks = vec![0.0; n];
        let (c_long, ar_long, _) =
            regress_arma(differenced, &no_shocks, long_order, 0, true, long_order)
                .ok_or_else(singular)?;
        let proxy = conditional_residuals(differenced, c_long, &ar_long, &[]);

        let start = p.max(long_order + q);
        regress_arma(differenced, &proxy, p, q, order.with_constant, start).ok_or_else(singular)?
    };

    let residuals = conditional_residuals(differenced, constant, &ar_coeffs, &ma_coeffs);
    let n_eff = n - p;
    let ssr: f64 = residuals[p..].iter().map(|e| e * e).sum();
    if !ssr.is_finite() {
        return Err(ForecastError::ModelFit(format!("{}: residuals diverged", order)));
    }
    let sigma2 = (ssr / n_eff as f64).max(SIGMA2_FLOOR);
    let log_likelihood =
        -0.5 * n_eff as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);

    Ok(ArmaFit {
        order,
        constant,
        ar_coeffs,
        ma_coeffs,
        residuals,
        sigma2,
        n_eff,
        log_likelihood,
    })
}
