//! Derivative-free minimisation.

use anyhow::bail;

#[derive(Clone, Debug)]
pub struct UnivariateDescentConfig {
    pub init_value: f64,
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps: u64,
    pub acceptable_residual: f64,
}
impl UnivariateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.init_step == 0.0 {
            bail!("initial step cannot be zero")
        }
        if self.min_step <= 0.0 {
            bail!("min step must be positive")
        }
        if self.acceptable_residual.is_nan() {
            bail!("acceptable residual cannot be NaN")
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UnivariateDescentOutcome {
    pub steps: u64,
    pub optimal_value: f64,
    pub optimal_residual: f64,
}

/// Univariate, derivative-free search. Walks in the direction of the initial step, reversing
/// and halving the step each time the residual worsens, until the step falls below
/// `min_step`.
pub fn univariate_descent(
    config: &UnivariateDescentConfig,
    mut loss_f: impl FnMut(f64) -> f64,
) -> Result<UnivariateDescentOutcome, anyhow::Error> {
    config.validate()?;

    let mut steps = 0;
    let mut residual = loss_f(config.init_value);
    if residual <= config.acceptable_residual {
        return Ok(UnivariateDescentOutcome {
            steps: 0,
            optimal_value: config.init_value,
            optimal_residual: residual,
        });
    }

    let (mut value, mut step) = (config.init_value, config.init_step);
    let (mut optimal_value, mut optimal_residual) = (value, residual);
    while steps < config.max_steps {
        steps += 1;
        let new_value = value + step;
        let new_residual = loss_f(new_value);

        // a NaN residual is treated as a worsening
        if !(new_residual <= residual) {
            step = -step * 0.5;
            if step.abs() < config.min_step {
                break;
            }
            continue;
        }

        if new_residual < optimal_residual {
            optimal_residual = new_residual;
            optimal_value = new_value;

            if optimal_residual <= config.acceptable_residual {
                break;
            }
        }
        residual = new_residual;
        value = new_value;
    }
    Ok(UnivariateDescentOutcome {
        steps,
        optimal_value,
        optimal_residual,
    })
}

#[derive(Clone, Debug)]
pub struct CoordinateDescentConfig {
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps_per_coordinate: u64,
    pub max_sweeps: u64,
    /// Sweeping stops once a full sweep improves the residual by less than this amount.
    pub min_improvement: f64,
}
impl CoordinateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_sweeps == 0 {
            bail!("at least one sweep must be specified")
        }
        if self.min_improvement < 0.0 {
            bail!("min improvement must be non-negative")
        }
        UnivariateDescentConfig {
            init_value: 0.0,
            init_step: self.init_step,
            min_step: self.min_step,
            max_steps: self.max_steps_per_coordinate,
            acceptable_residual: f64::NEG_INFINITY,
        }
        .validate()
    }
}

impl Default for CoordinateDescentConfig {
    fn default() -> Self {
        Self {
            init_step: 0.1,
            min_step: 1e-6,
            max_steps_per_coordinate: 100,
            max_sweeps: 200,
            min_improvement: 1e-9,
        }
    }
}

#[derive(Debug)]
pub struct CoordinateDescentOutcome {
    pub sweeps: u64,
    pub optimal_values: Vec<f64>,
    pub optimal_residual: f64,
}

/// Cyclic coordinate descent: each sweep runs a [`univariate_descent`] along every dimension in
/// turn, holding the others fixed. `max_steps_per_coordinate` bounds how far any one coordinate
/// can travel in a single sweep.
pub fn coordinate_descent(
    config: &CoordinateDescentConfig,
    init_values: Vec<f64>,
    mut loss_f: impl FnMut(&[f64]) -> f64,
) -> Result<CoordinateDescentOutcome, anyhow::Error> {
    config.validate()?;
    if init_values.is_empty() {
        bail!("at least one search dimension must be specified")
    }

    let mut values = init_values;
    let mut residual = loss_f(&values);
    let mut sweeps = 0;
    while sweeps < config.max_sweeps {
        sweeps += 1;
        let sweep_start_residual = residual;
        for dimension in 0..values.len() {
            let univariate_config = UnivariateDescentConfig {
                init_value: values[dimension],
                init_step: config.init_step,
                min_step: config.min_step,
                max_steps: config.max_steps_per_coordinate,
                acceptable_residual: f64::NEG_INFINITY,
            };
            let outcome = univariate_descent(&univariate_config, |value| {
                values[dimension] = value;
                loss_f(&values)
            })?;
            values[dimension] = outcome.optimal_value;
            residual = outcome.optimal_residual;
        }

        if !(sweep_start_residual - residual >= config.min_improvement) {
            break;
        }
    }

    Ok(CoordinateDescentOutcome {
        sweeps,
        optimal_values: values,
        optimal_residual: residual,
    })
}
