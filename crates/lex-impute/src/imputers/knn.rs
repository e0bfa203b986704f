use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Aggregator, ImputerConfig, NeighborOverflow};
use crate::error::{ImputeError, Result};
use crate::index::{IndexFactory, NeighborIndex};
use crate::matrix;
use crate::stats::column_statistics;

/// A fitted nearest-neighbor imputation model.
///
/// Holds the neighbor index built over the fully-observed fit rows and those
/// rows themselves, in the order given to the index. Never modified after
/// [`FittedImputer::fit`] returns, so one model can serve concurrent
/// transforms.
#[derive(Debug)]
pub struct FittedImputer {
    config: ImputerConfig,
    factory: Arc<dyn IndexFactory>,
    index: Box<dyn NeighborIndex>,
    reference: Array2<f64>,
    n_neighbors: usize,
    aggregate: Aggregator,
}

/// Read-only state shared by every row of one transform call.
///
/// Columns with no observed value in the transformed matrix have no
/// placeholder. They take no part in the similarity computation: neighbors
/// are then searched in a projected index over the remaining columns, built
/// once per plan.
#[derive(Debug)]
pub struct TransformPlan {
    placeholders: Vec<Option<f64>>,
    /// Columns with a placeholder, ascending
    informative: Vec<usize>,
    /// Present only when some column is uninformative
    projected: Option<Box<dyn NeighborIndex>>,
}

impl TransformPlan {
    /// Per-column placeholder; `None` for columns with no observed value.
    pub fn placeholders(&self) -> &[Option<f64>] {
        &self.placeholders
    }

    /// Columns that take part in the similarity computation.
    pub fn informative_columns(&self) -> &[usize] {
        &self.informative
    }
}

impl FittedImputer {
    /// Fit a model using the index variant named in `config`.
    pub fn fit(config: &ImputerConfig, data: ArrayView2<'_, f64>) -> Result<Self> {
        Self::fit_with_factory(config, data, Arc::new(config.index_kind))
    }

    /// Fit a model, building the neighbor index with `factory`.
    pub fn fit_with_factory(
        config: &ImputerConfig,
        data: ArrayView2<'_, f64>,
        factory: Arc<dyn IndexFactory>,
    ) -> Result<Self> {
        matrix::validate(data)?;
        config.validate()?;

        let reference = matrix::complete_rows(data);
        let available = reference.nrows();
        if available == 0 {
            return Err(ImputeError::EmptyReference);
        }

        let n_neighbors = match config.neighbor_overflow {
            _ if config.n_neighbors <= available => config.n_neighbors,
            NeighborOverflow::Clamp => {
                warn!(
                    "Requested {} neighbors but only {} reference rows; clamping",
                    config.n_neighbors, available
                );
                available
            }
            NeighborOverflow::Error => {
                return Err(ImputeError::NeighborCountExceeded {
                    requested: config.n_neighbors,
                    available,
                });
            }
        };

        let index = build_checked(factory.as_ref(), reference.view(), config)?;

        info!(
            "Fitted KNN imputer: {} of {} rows complete, {} features, k={}, metric {:?}",
            available,
            data.nrows(),
            reference.ncols(),
            n_neighbors,
            index.metric()
        );

        Ok(Self {
            config: config.clone(),
            factory,
            index,
            reference,
            n_neighbors,
            aggregate: config.strategy.aggregator(),
        })
    }

    /// Configuration the model was fitted with.
    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Number of features seen at fit time.
    pub fn n_features(&self) -> usize {
        self.reference.ncols()
    }

    /// Number of fully-observed rows backing the index.
    pub fn n_reference_rows(&self) -> usize {
        self.reference.nrows()
    }

    /// Neighbors consulted per row after applying the overflow policy.
    pub fn effective_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// The fully-observed fit rows, in index order.
    pub fn reference(&self) -> ArrayView2<'_, f64> {
        self.reference.view()
    }

    /// The neighbor index.
    pub fn index(&self) -> &dyn NeighborIndex {
        self.index.as_ref()
    }

    /// Prepare the shared state for transforming `data`.
    ///
    /// Placeholders are the configured statistic over each column's observed
    /// values in `data`.
    pub fn plan(&self, data: ArrayView2<'_, f64>) -> Result<TransformPlan> {
        self.check_features(data.ncols())?;

        let placeholders = column_statistics(data, self.aggregate);
        let informative: Vec<usize> = placeholders
            .iter()
            .enumerate()
            .filter_map(|(col, stat)| stat.map(|_| col))
            .collect();

        let projected = if informative.len() == self.n_features() || informative.is_empty() {
            None
        } else {
            debug!(
                "{} of {} columns entirely missing; searching on columns {:?}",
                self.n_features() - informative.len(),
                self.n_features(),
                informative
            );
            let columns = self.reference.select(Axis(1), &informative);
            Some(build_checked(self.factory.as_ref(), columns.view(), &self.config)?)
        };

        Ok(TransformPlan {
            placeholders,
            informative,
            projected,
        })
    }

    /// Repair one row against a plan.
    ///
    /// Missing cells are seeded with the plan's placeholders to form the
    /// probe, the nearest reference rows are retrieved, and each missing cell
    /// becomes the aggregate of that column over those neighbors. Complete
    /// rows come back unchanged.
    pub fn repair_row(&self, row: ArrayView1<'_, f64>, plan: &TransformPlan) -> Result<Array1<f64>> {
        self.check_features(row.len())?;
        self.check_features(plan.placeholders.len())?;

        let missing = matrix::missing_columns(row);
        if missing.is_empty() {
            return Ok(row.to_owned());
        }

        let neighbors = self.neighbors(row, plan)?;
        if let Some(&bad) = neighbors.iter().find(|&&id| id >= self.reference.nrows()) {
            return Err(ImputeError::Index(format!(
                "index returned unknown reference row {bad}"
            )));
        }

        let mut repaired = row.to_owned();
        let mut values = Vec::with_capacity(neighbors.len());
        for &col in &missing {
            values.clear();
            values.extend(neighbors.iter().map(|&id| self.reference[[id, col]]));
            repaired[col] = (self.aggregate)(&values)
                .ok_or_else(|| ImputeError::Index("index returned no neighbors".to_string()))?;
        }

        Ok(repaired)
    }

    /// Impute every missing cell of `data` into a new matrix.
    ///
    /// `data` is left untouched; rows without missing cells are copied as-is.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        matrix::validate(data)?;
        let plan = self.plan(data)?;

        let mut output = data.to_owned();
        if self.config.parallel {
            output
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .try_for_each(|row| self.repair_in_place(row, &plan))?;
        } else {
            output
                .axis_iter_mut(Axis(0))
                .try_for_each(|row| self.repair_in_place(row, &plan))?;
        }

        debug!(
            "Imputed {} missing cells across {} rows",
            matrix::count_missing(data),
            data.nrows()
        );

        Ok(output)
    }

    /// Impute a single row.
    ///
    /// The row is its own placeholder source, so its missing columns are
    /// excluded from the similarity computation.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let data = ArrayView2::from_shape((1, row.len()), row)
            .map_err(|e| ImputeError::InvalidInput(e.to_string()))?;
        Ok(self.transform(data)?.iter().copied().collect())
    }

    fn repair_in_place(&self, mut row: ArrayViewMut1<'_, f64>, plan: &TransformPlan) -> Result<()> {
        if matrix::is_complete(row.view()) {
            return Ok(());
        }
        let repaired = self.repair_row(row.view(), plan)?;
        row.assign(&repaired);
        Ok(())
    }

    fn neighbors(&self, row: ArrayView1<'_, f64>, plan: &TransformPlan) -> Result<Vec<usize>> {
        let seeded = |col: usize| {
            let value = row[col];
            if matrix::is_missing(value) {
                plan.placeholders[col].unwrap_or(value)
            } else {
                value
            }
        };

        match &plan.projected {
            None if plan.informative.is_empty() => {
                // No column carries information: every reference row ties
                Ok((0..self.n_neighbors).collect())
            }
            None => {
                let probe: Vec<f64> = (0..row.len()).map(seeded).collect();
                self.index.search(&probe, self.n_neighbors)
            }
            Some(projected) => {
                let probe: Vec<f64> = plan.informative.iter().map(|&col| seeded(col)).collect();
                projected.search(&probe, self.n_neighbors)
            }
        }
    }

    fn check_features(&self, found: usize) -> Result<()> {
        if found != self.n_features() {
            return Err(ImputeError::DimensionMismatch {
                expected: self.n_features(),
                found,
            });
        }
        Ok(())
    }
}

/// Build an index and verify it covers exactly `vectors`.
fn build_checked(
    factory: &dyn IndexFactory,
    vectors: ArrayView2<'_, f64>,
    config: &ImputerConfig,
) -> Result<Box<dyn NeighborIndex>> {
    let index = factory.build(vectors, config.metric)?;
    if index.len() != vectors.nrows() || index.dim() != vectors.ncols() {
        return Err(ImputeError::Index(format!(
            "index holds {} vectors of dimension {}, expected {} of dimension {}",
            index.len(),
            index.dim(),
            vectors.nrows(),
            vectors.ncols()
        )));
    }
    if index.metric() != config.metric {
        return Err(ImputeError::Index(format!(
            "index ranks by {:?}, expected {:?}",
            index.metric(),
            config.metric
        )));
    }
    Ok(index)
}

/// Nearest-neighbor imputer with a stateful `fit`/`transform` lifecycle.
///
/// # Example
///
/// ```rust,ignore
/// use lex_impute::{ImputerConfig, KnnImputer};
/// use ndarray::array;
///
/// let mut imputer = KnnImputer::new(ImputerConfig::builder().n_neighbors(1).build()?);
/// let train = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [10.0, 10.0]];
///
/// let filled = imputer.fit(train.view())?.transform(array![[2.0, f64::NAN]].view())?;
/// assert_eq!(filled, array![[2.0, 2.0]]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KnnImputer {
    config: ImputerConfig,
    fitted: Option<Arc<FittedImputer>>,
}

impl KnnImputer {
    /// Create an unfitted imputer.
    pub fn new(config: ImputerConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Configuration used by the next `fit`.
    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Fit on `data`, replacing any previous model.
    ///
    /// On error the previously fitted model, if any, is kept.
    pub fn fit(&mut self, data: ArrayView2<'_, f64>) -> Result<&mut Self> {
        let model = FittedImputer::fit(&self.config, data)?;
        self.fitted = Some(Arc::new(model));
        Ok(self)
    }

    /// Fit on `data` with a caller-supplied index factory.
    pub fn fit_with_factory(
        &mut self,
        data: ArrayView2<'_, f64>,
        factory: Arc<dyn IndexFactory>,
    ) -> Result<&mut Self> {
        let model = FittedImputer::fit_with_factory(&self.config, data, factory)?;
        self.fitted = Some(Arc::new(model));
        Ok(self)
    }

    /// Impute missing cells of `data` with the fitted model.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.fitted
            .as_ref()
            .ok_or(ImputeError::NotFitted)?
            .transform(data)
    }

    /// Fit on `data`, then impute it.
    pub fn fit_transform(&mut self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.fit(data)?.transform(data)
    }

    /// Check whether a model is available.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Shared handle to the fitted model.
    pub fn fitted(&self) -> Option<Arc<FittedImputer>> {
        self.fitted.clone()
    }
}

static_assertions::assert_impl_all!(FittedImputer: Send, Sync);
static_assertions::assert_impl_all!(KnnImputer: Send, Sync);
