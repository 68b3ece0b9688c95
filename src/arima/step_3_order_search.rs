// External imports
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;

// Internal imports
use super::step_1_differencing::{difference, select_differencing_order};
use super::step_2_estimation::{fit_arma, ArimaOrder, ArmaFit};
use crate::config::StatisticalConfig;
use crate::error::{ForecastError, ForecastResult};

/// A fitted candidate and its information criterion value
#[derive(Debug, Clone)]
pub struct ScoredFit {
    pub fit: ArmaFit,
    pub score: f64,
}

impl ScoredFit {
    pub fn order(&self) -> ArimaOrder {
        self.fit.order
    }

    /// Total ordering: criterion, then p+d+q, then p, q, and intercept last
    pub fn compare(&self, other: &ScoredFit) -> Ordering {
        let (a, b) = (self.order(), other.order());
        self.score
            .total_cmp(&other.score)
            .then(a.total_order().cmp(&b.total_order()))
            .then(a.p.cmp(&b.p))
            .then(a.q.cmp(&b.q))
            .then(a.with_constant.cmp(&b.with_constant))
    }
}

/// Strategy that picks an ARIMA order for a series.
///
/// Determinism is a property of the implementation: equal inputs and
/// configuration must give the same order.
pub trait OrderSearch: Send + Sync {
    fn search(&self, series: &[f64], config: &StatisticalConfig) -> ForecastResult<ScoredFit>;
}

/// Memoised candidate evaluation on one differenced series
struct CandidateCache<'a> {
    differenced: Vec<f64>,
    d: usize,
    config: &'a StatisticalConfig,
    fitted: HashMap<ArimaOrder, Option<ScoredFit>>,
}

impl<'a> CandidateCache<'a> {
    fn new(series: &[f64], config: &'a StatisticalConfig) -> Self {
        let d = select_differencing_order(series, config.max_d, config.kpss_critical_value);
        Self {
            differenced: difference(series, d),
            d,
            config,
            fitted: HashMap::new(),
        }
    }

    fn allows_constant(&self) -> bool {
        self.d < 2
    }

    fn evaluate(&mut self, p: usize, q: usize, with_constant: bool) -> Option<ScoredFit> {
        if p > self.config.max_p || q > self.config.max_q {
            return None;
        }
        let order = ArimaOrder::new(p, self.d, q, with_constant && self.allows_constant());
        if let Some(cached) = self.fitted.get(&order) {
            return cached.clone();
        }

        let scored = match fit_arma(&self.differenced, order) {
            Ok(fit) => {
                let score = fit.information_criterion(self.config.criterion);
                debug!("{}: criterion {:.4}", order, score);
                score.is_finite().then_some(ScoredFit { fit, score })
            }
            Err(e) => {
                debug!("{} skipped: {}", order, e);
                None
            }
        };
        self.fitted.insert(order, scored.clone());
        scored
    }
}

fn pick_best(candidates: impl IntoIterator<Item = ScoredFit>) -> Option<ScoredFit> {
    candidates.into_iter().min_by(|a, b| a.compare(b))
}

fn no_candidate(d: usize) -> ForecastError {
    ForecastError::ModelFit(format!("no ARIMA candidate could be estimated (d = {})", d))
}

/// Stepwise search over (p, q, intercept) with d fixed by KPSS tests.
///
/// Starts from a small set of orders and repeatedly moves to the best
/// neighbouring order until nothing improves.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepwiseSearch;

impl OrderSearch for StepwiseSearch {
    fn search(&self, series: &[f64], config: &StatisticalConfig) -> ForecastResult<ScoredFit> {
        let mut cache = CandidateCache::new(series, config);
        let with_constant = cache.allows_constant();

        let mut starts = vec![
            cache.evaluate(2, 2, with_constant),
            cache.evaluate(0, 0, with_constant),
            cache.evaluate(1, 0, with_constant),
            cache.evaluate(0, 1, with_constant),
        ];
        if with_constant {
            starts.push(cache.evaluate(0, 0, false));
        }
        let mut best = pick_best(starts.into_iter().flatten()).ok_or_else(|| no_candidate(cache.d))?;

        const MOVES: [(isize, isize); 8] = [
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (1, 1),
            (-1, 1),
            (1, -1),
        ];

        for _ in 0..config.max_steps {
            let current = best.order();
            let mut neighbours = Vec::new();
            for (dp, dq) in MOVES {
                let (Some(p), Some(q)) = (
                    current.p.checked_add_signed(dp),
                    current.q.checked_add_signed(dq),
                ) else {
                    continue;
                };
                neighbours.extend(cache.evaluate(p, q, current.with_constant));
            }
            if cache.allows_constant() {
                neighbours.extend(cache.evaluate(current.p, current.q, !current.with_constant));
            }

            match pick_best(neighbours) {
                Some(candidate) if candidate.compare(&best) == Ordering::Less => best = candidate,
                _ => break,
            }
        }

        Ok(best)
    }
}

/// Exhaustive search over every (p, q, intercept) within the bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSearch;

impl OrderSearch for GridSearch {
    fn search(&self, series: &[f64], config: &StatisticalConfig) -> ForecastResult<ScoredFit> {
        let mut cache = CandidateCache::new(series, config);
        let constants: &[bool] = if cache.allows_constant() { &[false, true] } else { &[false] };

        let mut candidates = Vec::new();
        for p in 0..=config.max_p {
            for q in 0..=config.max_q {
                for &with_constant in constants {
                    candidates.extend(cache.evaluate(p, q, with_constant));
                }
            }
        }
        pick_best(candidates).ok_or_else(|| no_candidate(cache.d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InformationCriterion;

    fn noisy_trend(len: usize) -> Vec<f64> {
        let mut level = 50.0;
        (0..len)
            .map(|i| {
                level += 0.2 + (((i * 7919) % 1000) as f64 / 1000.0 - 0.5);
                level
            })
            .collect()
    }

    #[test]
    fn test_stepwise_is_deterministic() {
        let series = noisy_trend(150);
        let config = StatisticalConfig::default();
        let a = StepwiseSearch.search(&series, &config).unwrap();
        let b = StepwiseSearch.search(&series, &config).unwrap();
        assert_eq!(a.order(), b.order());
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_stepwise_never_beats_grid() {
        let series = noisy_trend(120);
        let mut config = StatisticalConfig::default();
        config.max_p = 3;
        config.max_q = 3;
        config.criterion = InformationCriterion::Bic;

        let stepwise = StepwiseSearch.search(&series, &config).unwrap();
        let grid = GridSearch.search(&series, &config).unwrap();
        assert!(grid.compare(&stepwise) != Ordering::Greater);
    }

    #[test]
    fn test_linear_trend_selects_mean_model() {
        // differenced series is constant, so only mean models can be estimated
        let series: Vec<f64> = (0..30).map(|i| 10.0 + 2.0 * i as f64).collect();
        let best = GridSearch.search(&series, &StatisticalConfig::default()).unwrap();
        assert_eq!(best.order().p + best.order().q, 0);
    }

    fn scored(p: usize, d: usize, q: usize, with_constant: bool, score: f64) -> ScoredFit {
        ScoredFit {
            fit: ArmaFit {
                order: ArimaOrder::new(p, d, q, with_constant),
                constant: 0.0,
                ar_coeffs: vec![0.0; p],
                ma_coeffs: vec![0.0; q],
                residuals: Vec::new(),
                sigma2: 1.0,
                n_eff: 20,
                log_likelihood: 0.0,
            },
            score,
        }
    }

    fn best_order(candidates: Vec<ScoredFit>) -> ArimaOrder {
        pick_best(candidates).unwrap().order()
    }

    #[test]
    fn test_equal_scores_break_ties_by_order() {
        // fewer total terms wins
        assert_eq!(
            best_order(vec![scored(1, 1, 1, false, 5.0), scored(0, 1, 1, true, 5.0), scored(2, 0, 0, false, 5.0)]),
            ArimaOrder::new(0, 1, 1, true)
        );
        // then smaller p
        assert_eq!(
            best_order(vec![scored(1, 1, 0, false, 5.0), scored(0, 1, 1, false, 5.0)]),
            ArimaOrder::new(0, 1, 1, false)
        );
        // then smaller q
        assert_eq!(
            best_order(vec![scored(1, 0, 1, false, 5.0), scored(1, 1, 0, false, 5.0)]),
            ArimaOrder::new(1, 1, 0, false)
        );
        // intercept last
        assert_eq!(
            best_order(vec![scored(1, 1, 1, true, 5.0), scored(1, 1, 1, false, 5.0)]),
            ArimaOrder::new(1, 1, 1, false)
        );
        // the criterion outranks everything else
        assert_eq!(
            best_order(vec![scored(0, 0, 0, false, 5.0), scored(3, 1, 2, true, 4.9)]),
            ArimaOrder::new(3, 1, 2, true)
        );
        assert!(pick_best(Vec::<ScoredFit>::new()).is_none());
    }

    #[test]
    fn test_compare_is_antisymmetric_on_ties() {
        let a = scored(0, 1, 2, false, -3.0);
        let b = scored(2, 1, 0, false, -3.0);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&scored(0, 1, 2, false, -3.0)), Ordering::Equal);
    }
}
