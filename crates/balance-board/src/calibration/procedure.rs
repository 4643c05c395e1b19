use super::CalibrationModel;
use crate::{BoardError, Result};
use balance_board_sys::{Channel, RawSample, CHANNEL_COUNT};
use std::{thread::sleep, time::Duration};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_SAMPLE_COUNT: usize = 30;
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Source of samples during calibration.
pub trait Sampler {
    fn sample(&mut self) -> Result<RawSample>;
}

impl<F: FnMut() -> Result<RawSample>> Sampler for F {
    fn sample(&mut self) -> Result<RawSample> {
        self()
    }
}

/// The person placing the loads on the board.
pub trait Operator {
    /// Returns once the board is empty.
    fn confirm_unloaded(&mut self) -> Result<()>;
    /// Raw answer to `prompt`, validated by the procedure.
    fn ask_known_weight(&mut self, prompt: &str) -> Result<String>;
    /// Called when the last answer was rejected, before asking again.
    fn reject_known_weight(&mut self, reason: &BoardError);
    /// Returns once `weight` is on the board.
    fn confirm_loaded(&mut self, weight: KnownWeight) -> Result<()>;
}

/// A strictly positive reference weight.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct KnownWeight(f64);

impl KnownWeight {
    pub fn new(weight: f64) -> Result<KnownWeight> {
        if weight.is_finite() && weight > 0. {
            Ok(KnownWeight(weight))
        } else {
            Err(BoardError::InvalidCalibrationInput(
                "weight must be positive".to_string(),
            ))
        }
    }

    pub fn parse(input: &str) -> Result<KnownWeight> {
        let weight = input.trim().parse::<f64>().map_err(|_| {
            BoardError::InvalidCalibrationInput(format!("`{}` is not a number", input.trim()))
        })?;
        KnownWeight::new(weight)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SamplingConfig {
    /// Samples averaged per phase, at least 1.
    pub count: usize,
    pub interval: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            count: DEFAULT_SAMPLE_COUNT,
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    AwaitingZeroLoad,
    SamplingZero,
    AwaitingKnownLoad,
    SamplingKnown,
    Computed,
}

/// Zero-load then known-load sampling sequence producing a
/// [`CalibrationModel`].
///
/// The model only leaves the procedure once it is computed, so nothing can
/// convert with half-written parameters.
#[derive(Debug)]
pub struct CalibrationProcedure {
    config: SamplingConfig,
    phase: Phase,
}

impl CalibrationProcedure {
    pub fn new(config: SamplingConfig) -> Self {
        CalibrationProcedure {
            config,
            phase: Phase::AwaitingZeroLoad,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Unattended two-point calibration.
    #[instrument(level = "info", skip(self, sampler), err)]
    pub fn run<S: Sampler + ?Sized>(
        &mut self,
        sampler: &mut S,
        known_weight: KnownWeight,
    ) -> Result<CalibrationModel> {
        self.enter(Phase::AwaitingZeroLoad);
        let zero = self.sample_phase(sampler, Phase::SamplingZero)?;
        self.enter(Phase::AwaitingKnownLoad);
        let known = self.sample_phase(sampler, Phase::SamplingKnown)?;
        Ok(self.compute(CalibrationModel::linear(&zero, &known, known_weight.get())))
    }

    /// Two-point calibration driven by `operator`.
    #[instrument(level = "info", skip(self, sampler, operator), err)]
    pub fn run_interactive<S: Sampler + ?Sized, O: Operator + ?Sized>(
        &mut self,
        sampler: &mut S,
        operator: &mut O,
    ) -> Result<CalibrationModel> {
        self.enter(Phase::AwaitingZeroLoad);
        operator.confirm_unloaded()?;
        let zero = self.sample_phase(sampler, Phase::SamplingZero)?;

        let known_weight = self.ask_weight(operator, "Known weight", None)?;
        let known = self.sample_phase(sampler, Phase::SamplingKnown)?;

        Ok(self.compute(CalibrationModel::linear(&zero, &known, known_weight.get())))
    }

    /// Zero, light and heavy load calibration producing a piecewise-linear
    /// model. The heavy weight must exceed the light one.
    #[instrument(level = "info", skip(self, sampler, operator), err)]
    pub fn run_three_point<S: Sampler + ?Sized, O: Operator + ?Sized>(
        &mut self,
        sampler: &mut S,
        operator: &mut O,
    ) -> Result<CalibrationModel> {
        self.enter(Phase::AwaitingZeroLoad);
        operator.confirm_unloaded()?;
        let zero = self.sample_phase(sampler, Phase::SamplingZero)?;

        let low_weight = self.ask_weight(operator, "Light known weight", None)?;
        let low = self.sample_phase(sampler, Phase::SamplingKnown)?;

        let high_weight = self.ask_weight(operator, "Heavy known weight", Some(low_weight))?;
        let high = self.sample_phase(sampler, Phase::SamplingKnown)?;

        Ok(self.compute(CalibrationModel::three_point(
            &zero,
            &low,
            &high,
            low_weight.get(),
            high_weight.get(),
        )))
    }

    fn enter(&mut self, phase: Phase) {
        info!(?phase, "calibration phase");
        self.phase = phase;
    }

    /// Asks until the answer is a valid weight above `above`, then waits for
    /// the load to be placed.
    fn ask_weight<O: Operator + ?Sized>(
        &mut self,
        operator: &mut O,
        prompt: &str,
        above: Option<KnownWeight>,
    ) -> Result<KnownWeight> {
        self.enter(Phase::AwaitingKnownLoad);
        let weight = loop {
            let answer = operator.ask_known_weight(prompt)?;
            let parsed = KnownWeight::parse(&answer).and_then(|w| match above {
                Some(min) if w <= min => Err(BoardError::InvalidCalibrationInput(format!(
                    "weight must be greater than {}",
                    min.get()
                ))),
                _ => Ok(w),
            });
            match parsed {
                Ok(weight) => break weight,
                Err(e) => {
                    warn!(%e, "rejected calibration input");
                    operator.reject_known_weight(&e);
                }
            }
        };
        operator.confirm_loaded(weight)?;
        Ok(weight)
    }

    fn sample_phase<S: Sampler + ?Sized>(
        &mut self,
        sampler: &mut S,
        phase: Phase,
    ) -> Result<RawSample> {
        self.enter(phase);
        let count = self.config.count.max(1);
        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            let sample = sampler.sample()?;
            debug!(n = i + 1, ?sample, "calibration sample");
            samples.push(sample);
            sleep(self.config.interval);
        }
        let average = average(&samples);
        info!(?phase, ?average, "averaged readings");
        Ok(average)
    }

    fn compute(&mut self, model: CalibrationModel) -> CalibrationModel {
        for channel in model.degenerate_channels() {
            warn!(%channel, "degenerate calibration, channel will always read 0");
        }
        self.enter(Phase::Computed);
        model
    }
}

impl Default for CalibrationProcedure {
    fn default() -> Self {
        CalibrationProcedure::new(SamplingConfig::default())
    }
}

/// Per-channel mean of `samples`.
pub fn average(samples: &[RawSample]) -> RawSample {
    if samples.is_empty() {
        return RawSample::zero();
    }
    let mut sums = [0.; CHANNEL_COUNT];
    for sample in samples {
        for (channel, value) in sample.iter() {
            sums[channel.index()] += value;
        }
    }
    let len = samples.len() as f64;
    let mut mean = RawSample::zero();
    for channel in Channel::ALL {
        // Means of finite values are finite.
        mean = mean.with(channel, sums[channel.index()] / len).unwrap_or(mean);
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn no_delay(count: usize) -> CalibrationProcedure {
        CalibrationProcedure::new(SamplingConfig {
            count,
            interval: Duration::from_millis(0),
        })
    }

    fn sample(v: [f64; 4]) -> RawSample {
        RawSample::new(v).unwrap()
    }

    /// Answers from a script and records what it was told.
    #[derive(Default)]
    struct Script {
        answers: VecDeque<&'static str>,
        rejected: usize,
        unloaded: usize,
        loaded: Vec<f64>,
    }

    impl Operator for Script {
        fn confirm_unloaded(&mut self) -> Result<()> {
            self.unloaded += 1;
            Ok(())
        }

        fn ask_known_weight(&mut self, _prompt: &str) -> Result<String> {
            self.answers
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("script exhausted").into())
        }

        fn reject_known_weight(&mut self, reason: &BoardError) {
            assert!(matches!(reason, BoardError::InvalidCalibrationInput(_)));
            self.rejected += 1;
        }

        fn confirm_loaded(&mut self, weight: KnownWeight) -> Result<()> {
            self.loaded.push(weight.get());
            Ok(())
        }
    }

    #[test]
    fn known_weight_validation() {
        assert_eq!(KnownWeight::parse(" 20.5\n").unwrap().get(), 20.5);
        assert!(KnownWeight::parse("abc").is_err());
        assert!(KnownWeight::parse("").is_err());
        assert!(KnownWeight::parse("0").is_err());
        assert!(KnownWeight::parse("-3").is_err());
        assert!(KnownWeight::parse("inf").is_err());
        assert!(KnownWeight::new(f64::NAN).is_err());
    }

    #[test]
    fn average_per_channel() {
        let avg = average(&[sample([1., 2., 3., 4.]), sample([3., 4., 5., 6.])]);
        assert_eq!(avg.as_array(), [2., 3., 4., 5.]);
        assert_eq!(average(&[]), RawSample::zero());
    }

    #[test]
    fn unattended_run() {
        let mut n = 0;
        let mut sampler = || {
            n += 1;
            Ok(if n <= 3 {
                sample([100.; 4])
            } else {
                sample([200.; 4])
            })
        };
        let mut procedure = no_delay(3);
        assert_eq!(procedure.phase(), Phase::AwaitingZeroLoad);
        let model = procedure
            .run(&mut sampler, KnownWeight::new(20.).unwrap())
            .unwrap();
        assert_eq!(procedure.phase(), Phase::Computed);
        for c in Channel::ALL {
            assert!((model.convert(c, 200.) - 20.).abs() < 1e-9);
        }
    }

    #[test]
    fn interactive_reprompts_until_valid() {
        let mut n = 0;
        let mut sampler = || {
            n += 1;
            Ok(if n <= 2 {
                sample([50.; 4])
            } else {
                sample([150.; 4])
            })
        };
        let mut operator = Script {
            answers: vec!["ten", "-5", "0", "10"].into(),
            ..Default::default()
        };
        let model = no_delay(2)
            .run_interactive(&mut sampler, &mut operator)
            .unwrap();
        assert_eq!(operator.rejected, 3);
        assert_eq!(operator.unloaded, 1);
        assert_eq!(operator.loaded, vec![10.]);
        assert!((model.convert(Channel::BottomLeft, 150.) - 10.).abs() < 1e-9);
    }

    #[test]
    fn sampler_failure_stops_in_phase() {
        let mut sampler = || -> Result<RawSample> { Err(anyhow::anyhow!("unplugged").into()) };
        let mut procedure = no_delay(1);
        assert!(procedure
            .run(&mut sampler, KnownWeight::new(1.).unwrap())
            .is_err());
        assert_eq!(procedure.phase(), Phase::SamplingZero);
    }

    #[test]
    fn three_point_requires_increasing_weights() {
        let mut n = 0;
        let mut sampler = || {
            n += 1;
            Ok(match n {
                1 => sample([0.; 4]),
                2 => sample([100.; 4]),
                _ => sample([300.; 4]),
            })
        };
        let mut operator = Script {
            answers: vec!["17", "12", "17", "34"].into(),
            ..Default::default()
        };
        let model = no_delay(1)
            .run_three_point(&mut sampler, &mut operator)
            .unwrap();
        assert_eq!(operator.rejected, 2);
        assert_eq!(operator.loaded, vec![17., 34.]);
        assert!((model.convert(Channel::TopLeft, 50.) - 8.5).abs() < 1e-9);
        assert!((model.convert(Channel::TopLeft, 200.) - 25.5).abs() < 1e-9);
    }
}
