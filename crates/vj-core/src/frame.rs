use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Named audio-derived signal carried in a [`Frame`].
///
/// Values are `0..1` by convention; detectors may overshoot at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSignal {
    FreqAll,
    FreqHigh,
    FreqLow,
    SustainedLow,
    SustainedHigh,
    Strobe,
    Pulse,
    BigPulse,
    SmallPulse,
    BigBlinder,
    SmallBlinder,
    Dampen,
    Hype,
    Twinkle,
}

impl FrameSignal {
    pub const ALL: [FrameSignal; 14] = [
        FrameSignal::FreqAll,
        FrameSignal::FreqHigh,
        FrameSignal::FreqLow,
        FrameSignal::SustainedLow,
        FrameSignal::SustainedHigh,
        FrameSignal::Strobe,
        FrameSignal::Pulse,
        FrameSignal::BigPulse,
        FrameSignal::SmallPulse,
        FrameSignal::BigBlinder,
        FrameSignal::SmallBlinder,
        FrameSignal::Dampen,
        FrameSignal::Hype,
        FrameSignal::Twinkle,
    ];

    /// Signals an effect may listen to when it re-rolls its parameters.
    pub const REACTIVE: [FrameSignal; 10] = [
        FrameSignal::FreqAll,
        FrameSignal::FreqHigh,
        FrameSignal::FreqLow,
        FrameSignal::SustainedLow,
        FrameSignal::SustainedHigh,
        FrameSignal::Strobe,
        FrameSignal::BigBlinder,
        FrameSignal::SmallBlinder,
        FrameSignal::Pulse,
        FrameSignal::Dampen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FrameSignal::FreqAll => "freq_all",
            FrameSignal::FreqHigh => "freq_high",
            FrameSignal::FreqLow => "freq_low",
            FrameSignal::SustainedLow => "sustained_low",
            FrameSignal::SustainedHigh => "sustained_high",
            FrameSignal::Strobe => "strobe",
            FrameSignal::Pulse => "pulse",
            FrameSignal::BigPulse => "big_pulse",
            FrameSignal::SmallPulse => "small_pulse",
            FrameSignal::BigBlinder => "big_blinder",
            FrameSignal::SmallBlinder => "small_blinder",
            FrameSignal::Dampen => "dampen",
            FrameSignal::Hype => "hype",
            FrameSignal::Twinkle => "twinkle",
        }
    }

    /// Pick one of [`FrameSignal::REACTIVE`] uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> FrameSignal {
        Self::REACTIVE[rng.random_range(0..Self::REACTIVE.len())]
    }
}

impl fmt::Display for FrameSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameSignal {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|sig| sig.name() == s)
            .ok_or_else(|| EngineError::UnknownSignal(s.to_string()))
    }
}

static SILENT: f32 = 0.0;

/// Immutable per-tick bag of audio signals.
///
/// Nodes must not keep a `Frame` across ticks; anything that needs history copies values out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Seconds since the show started. Drives time-based animation.
    pub time: f32,
    values: HashMap<FrameSignal, f32>,
}

impl Frame {
    pub fn new(time: f32, values: HashMap<FrameSignal, f32>) -> Self {
        Self { time, values }
    }

    /// A frame with every signal at zero.
    pub fn silent(time: f32) -> Self {
        Self {
            time,
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, signal: FrameSignal, value: f32) -> Self {
        self.values.insert(signal, value);
        self
    }

    /// Missing signals read as `0.0`.
    pub fn get(&self, signal: FrameSignal) -> f32 {
        self.values.get(&signal).copied().unwrap_or(0.0)
    }

    pub fn signals(&self) -> impl Iterator<Item = (FrameSignal, f32)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Every signal multiplied by `factor`; time is kept.
    pub fn scaled(&self, factor: f32) -> Frame {
        Frame {
            time: self.time,
            values: self.values.iter().map(|(k, v)| (*k, v * factor)).collect(),
        }
    }
}

impl Index<FrameSignal> for Frame {
    type Output = f32;

    fn index(&self, signal: FrameSignal) -> &f32 {
        self.values.get(&signal).unwrap_or(&SILENT)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(all={}, drums={}, bass={})",
            (self.get(FrameSignal::FreqAll) * 100.0) as i32,
            (self.get(FrameSignal::FreqHigh) * 100.0) as i32,
            (self.get(FrameSignal::FreqLow) * 100.0) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn missing_signals_read_as_zero() {
        let frame = Frame::silent(1.5).with(FrameSignal::FreqLow, 0.75);
        assert_eq!(frame.get(FrameSignal::FreqLow), 0.75);
        assert_eq!(frame.get(FrameSignal::Strobe), 0.0);
        assert_eq!(frame[FrameSignal::Hype], 0.0);
    }

    #[test]
    fn scaled_multiplies_signals_and_keeps_time() {
        let frame = Frame::silent(2.0)
            .with(FrameSignal::FreqAll, 0.5)
            .with(FrameSignal::Pulse, 1.0);
        let half = frame.scaled(0.5);
        assert_eq!(half.time, 2.0);
        assert_eq!(half.get(FrameSignal::FreqAll), 0.25);
        assert_eq!(half.get(FrameSignal::Pulse), 0.5);
    }

    #[test]
    fn signal_names_round_trip_through_from_str() {
        for sig in FrameSignal::ALL {
            assert_eq!(sig.name().parse::<FrameSignal>().unwrap(), sig);
        }
        assert!(matches!(
            "bogus".parse::<FrameSignal>(),
            Err(EngineError::UnknownSignal(_))
        ));
    }

    #[test]
    fn random_signal_is_reactive() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            assert!(FrameSignal::REACTIVE.contains(&FrameSignal::random(&mut rng)));
        }
    }

    #[test]
    fn display_reports_percentages() {
        let frame = Frame::silent(0.0)
            .with(FrameSignal::FreqAll, 0.5)
            .with(FrameSignal::FreqLow, 0.25);
        assert_eq!(frame.to_string(), "Frame(all=50, drums=0, bass=25)");
    }
}
