//! Controls how the simulation time is advanced

use std::collections::BTreeSet;

use kdam::BarExt;
use serde::{Deserialize, Serialize};

use braincell_concepts::TimeError;

/// A [TimeEvent] describes that a certain action is to be executed after the next iteration step.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum TimeEvent {
    /// Records potentials and external currents of all neurons.
    Record,
}

/// Represents the next time point which is returned by the [TimeStepper::advance] method.
#[derive(Clone, Debug)]
pub struct NextTimePoint<F> {
    /// Time increment $dt$
    pub increment: F,
    /// Time value $t$ after the step was performed
    pub time: F,
    /// Current iteration
    pub iteration: usize,
    /// Event at this iteration, or None
    pub event: Option<TimeEvent>,
}

/// Increments time of the simulation
pub trait TimeStepper<F> {
    /// Advances the time stepper to the next time point. Also returns if there is an event
    /// scheduled to take place and the next time value and iteration number
    #[must_use]
    fn advance(&mut self) -> Result<Option<NextTimePoint<F>>, TimeError>;

    /// The time $t_0$ and event at iteration 0 before any step was performed.
    fn initial_time_point(&self) -> NextTimePoint<F>;

    /// Total number of iterations
    fn n_steps(&self) -> usize;

    /// Creates a bar that tracks the simulation progress
    fn initialize_bar(&self) -> Result<kdam::Bar, TimeError>;

    /// Update a given bar to show the current simulation state
    fn update_bar(&self, bar: &mut kdam::Bar) -> Result<(), std::io::Error>;
}

/// Creates a progress bar which counts up to `total` iterations.
pub fn progress_bar(total: usize) -> Result<kdam::Bar, TimeError> {
    let bar_format = "\
    {desc}{percentage:3.0}%|{animation}| \
    {count}/{total} \
    [{elapsed}, \
    {rate:.2}{unit}/s{postfix}]";
    Ok(kdam::BarBuilder::default()
        .total(total)
        .bar_format(bar_format)
        .dynamic_ncols(true)
        .build()?)
}

/// Time stepping with a fixed time length
///
/// This time-stepper increments the time variable by the same length.
/// ```
/// # use braincell_core::time::{FixedStepsize, TimeStepper};
/// let t0 = 1.0;
/// let dt = 0.2;
/// let save_points = vec![3.0, 5.0, 11.0, 20.0];
/// let time_stepper = FixedStepsize::from_save_points(t0, dt, save_points).unwrap();
/// assert_eq!(time_stepper.n_steps(), 95);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FixedStepsize<F> {
    // The stepsize which was fixed
    dt: F,
    t0: F,
    record_iterations: BTreeSet<usize>,
    current_time: F,
    current_iteration: usize,
    maximum_iterations: usize,
}

impl<F> FixedStepsize<F>
where
    F: num::Float + num::ToPrimitive + num::FromPrimitive,
{
    fn to_iteration(t0: F, dt: F, t: F) -> Result<usize, TimeError> {
        ((t - t0) / dt).round().to_usize().ok_or(TimeError(
            "An error in casting of float type to usize occurred".to_owned(),
        ))
    }

    /// Construct the stepper from initial time, increment,
    /// number of steps and save interval given in steps.
    ///
    /// The initial state and the final state are always recorded.
    pub fn from_save_steps(
        t0: F,
        dt: F,
        n_steps: usize,
        save_interval: usize,
    ) -> Result<Self, TimeError> {
        if save_interval == 0 {
            return Err(TimeError("save interval needs to be at least 1".to_owned()));
        }
        Self::check_increment(dt)?;
        let mut record_iterations: BTreeSet<_> = (0..=n_steps).step_by(save_interval).collect();
        record_iterations.insert(n_steps);
        Ok(Self {
            dt,
            t0,
            record_iterations,
            current_time: t0,
            current_iteration: 0,
            maximum_iterations: n_steps,
        })
    }

    /// Similar to [Self::from_save_points] but specify the time step between every save
    /// point together with the integration step.
    pub fn from_save_interval(
        t0: F,
        dt: F,
        t_max: F,
        save_interval: F,
    ) -> Result<Self, TimeError> {
        if save_interval <= F::zero() {
            return Err(TimeError(
                "save interval needs to be a positive time span".to_owned(),
            ));
        }
        let mut save_points = vec![];
        let mut n = 0;
        loop {
            let t = t0
                + save_interval
                    * F::from_usize(n).ok_or(TimeError(format!(
                        "Could not convert usize {n} to type {}",
                        std::any::type_name::<F>()
                    )))?;
            if t > t_max {
                break;
            }
            save_points.push(t);
            n += 1;
        }
        Self::from_save_points(t0, dt, save_points)
    }

    /// Constructs the stepper from an initial time point, the time increment and
    /// the time points at which the simulation should be recorded.
    ///
    /// The simulation runs until the last save point is reached.
    pub fn from_save_points(t0: F, dt: F, save_points: Vec<F>) -> Result<Self, TimeError> {
        Self::check_increment(dt)?;
        if save_points.iter().any(|x| x.is_nan()) {
            return Err(TimeError("Save points must not be NaN".to_owned()));
        }
        if save_points.iter().any(|x| t0 > *x) {
            return Err(TimeError(
                "Invalid time configuration! Evaluation time point is before starting time point."
                    .to_owned(),
            ));
        }
        let last_save_point = save_points
            .iter()
            .copied()
            .reduce(F::max)
            .ok_or(TimeError(
                "No savepoints specified. Simulation will not save any results.".to_owned(),
            ))?;
        let maximum_iterations = Self::to_iteration(t0, dt, last_save_point)?;
        let record_iterations = save_points
            .into_iter()
            .map(|t_save| Self::to_iteration(t0, dt, t_save))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            dt,
            t0,
            record_iterations,
            current_time: t0,
            current_iteration: 0,
            maximum_iterations,
        })
    }

    fn check_increment(dt: F) -> Result<(), TimeError> {
        if dt > F::zero() && dt.is_finite() {
            Ok(())
        } else {
            Err(TimeError("Time increment needs to be positive and finite".to_owned()))
        }
    }

    /// The fixed time increment $dt$
    pub fn dt(&self) -> F {
        self.dt
    }

    /// Iterations at which results are recorded
    pub fn record_iterations(&self) -> impl Iterator<Item = &usize> {
        self.record_iterations.iter()
    }

    fn event_at(&self, iteration: usize) -> Option<TimeEvent> {
        self.record_iterations
            .contains(&iteration)
            .then_some(TimeEvent::Record)
    }
}

impl<F> TimeStepper<F> for FixedStepsize<F>
where
    F: num::Float + num::FromPrimitive + num::ToPrimitive,
{
    fn advance(&mut self) -> Result<Option<NextTimePoint<F>>, TimeError> {
        if self.current_iteration >= self.maximum_iterations {
            return Ok(None);
        }
        self.current_iteration += 1;
        self.current_time = F::from_usize(self.current_iteration).ok_or(TimeError(
            "Error when casting from usize to floating point value".to_owned(),
        ))? * self.dt
            + self.t0;
        Ok(Some(NextTimePoint {
            increment: self.dt,
            time: self.current_time,
            iteration: self.current_iteration,
            event: self.event_at(self.current_iteration),
        }))
    }

    fn initial_time_point(&self) -> NextTimePoint<F> {
        NextTimePoint {
            increment: self.dt,
            time: self.t0,
            iteration: 0,
            event: self.event_at(0),
        }
    }

    fn n_steps(&self) -> usize {
        self.maximum_iterations
    }

    fn initialize_bar(&self) -> Result<kdam::Bar, TimeError> {
        progress_bar(self.maximum_iterations)
    }

    fn update_bar(&self, bar: &mut kdam::Bar) -> Result<(), std::io::Error> {
        bar.update(1)?;
        Ok(())
    }
}

#[cfg(test)]
mod test_time_stepper {
    use rand::Rng;
    use rand::SeedableRng;

    use super::*;

    fn generate_new_fixed_stepper(rng_seed: u64) -> FixedStepsize<f64> {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed);
        let t0 = rng.gen_range(0.0..1.0);
        let dt = rng.gen_range(0.1..2.0);
        let save_points = vec![
            rng.gen_range(1.01..1.8),
            rng.gen_range(2.01..3.8),
            rng.gen_range(4.01..5.8),
            rng.gen_range(6.01..7.8),
        ];
        FixedStepsize::from_save_points(t0, dt, save_points).unwrap()
    }

    #[test]
    fn initialization() {
        let time_stepper = FixedStepsize::from_save_points(1.0, 0.2, vec![3.0, 5.0, 11.0]).unwrap();
        assert_eq!(1.0, time_stepper.current_time);
        assert_eq!(0.2, time_stepper.dt());
        assert_eq!(0, time_stepper.current_iteration);
        assert_eq!(None, time_stepper.initial_time_point().event);
        assert_eq!(
            time_stepper.record_iterations().copied().collect::<Vec<_>>(),
            vec![10, 20, 50]
        );
    }

    #[test]
    fn reject_wrong_save_points() {
        // t0 is larger than the first two save points
        assert!(FixedStepsize::from_save_points(10.0, 0.2, vec![3.0, 5.0, 11.0, 20.0]).is_err());
        assert!(FixedStepsize::from_save_points(0.0, 0.2, vec![]).is_err());
        assert!(FixedStepsize::from_save_points(0.0, -0.2, vec![1.0]).is_err());
        assert!(FixedStepsize::from_save_steps(0.0, 0.2, 10, 0).is_err());
    }

    #[test]
    fn stepping() {
        let t0 = 1.0;
        let dt = 0.2;
        let mut time_stepper =
            FixedStepsize::from_save_points(t0, dt, vec![3.0, 5.0, 11.0, 20.0]).unwrap();
        for i in 1..11 {
            let next = time_stepper.advance().unwrap().unwrap();
            assert_eq!(dt, next.increment);
            assert_eq!(t0 + i as f64 * dt, next.time);
            assert_eq!(i, next.iteration);
            if i == 10 {
                assert_eq!(Some(TimeEvent::Record), next.event);
            } else {
                assert_eq!(None, next.event);
            }
        }
    }

    #[test]
    fn save_steps_include_start_and_end() {
        let mut stepper = FixedStepsize::from_save_steps(0.0, 0.1, 10, 4).unwrap();
        assert_eq!(Some(TimeEvent::Record), stepper.initial_time_point().event);
        let events: Vec<_> = std::iter::from_fn(|| stepper.advance().unwrap())
            .filter(|next| next.event.is_some())
            .map(|next| next.iteration)
            .collect();
        assert_eq!(events, vec![4, 8, 10]);
    }

    #[test]
    fn stepping_ends() {
        for seed in 0..4 {
            let mut time_stepper = generate_new_fixed_stepper(seed);
            let mut n = 0;
            while time_stepper.advance().unwrap().is_some() {
                n += 1;
                assert!(n < 100, "The time stepper should have reached the end by now");
            }
            assert_eq!(n, time_stepper.n_steps());
        }
    }

    #[test]
    fn produce_correct_increments() {
        let t0 = 10.0;
        let dt = 0.1;
        let save_interval = 0.25;
        let mut stepper = FixedStepsize::from_save_interval(t0, dt, 11.0, save_interval).unwrap();
        let all_times = Vec::from_iter(std::iter::from_fn(move || stepper.advance().unwrap()));
        assert_eq!(all_times.len(), 10);
        for time in all_times {
            assert_eq!(time.increment, 0.1);
            if time.event.is_some() {
                assert!((time.time - t0) % save_interval < dt);
            }
        }
    }
}
