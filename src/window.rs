//! Rolling reading windows
//!
//! This module keeps the most recent samples of each decoded series for a device
//! and summarizes them. Windows serialize to JSON so a caller can persist them
//! between sessions.

use crate::config::DEFAULT_WINDOW_SIZE;
use crate::stats::{self, Correlation};
use crate::types::Reading;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Rolling window of samples for a single device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Heart rate samples (bpm)
    heart_rate: VecDeque<f64>,
    /// RR-intervals (ms)
    rr_intervals: VecDeque<f64>,
    /// Cadence samples (steps/min)
    cadence: VecDeque<f64>,
    /// Speed samples (m/s)
    speed: VecDeque<f64>,
    /// Heart rate at the time of each cadence sample
    paired_heart_rate: VecDeque<f64>,
    /// Cadence paired with `paired_heart_rate`
    paired_cadence: VecDeque<f64>,
    /// Most recent heart rate, used for pairing
    last_heart_rate: Option<f64>,
    /// Maximum samples per series
    window_size: usize,
}

/// Snapshot statistics of a rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub heart_rate_samples: usize,
    pub heart_rate_mean: f64,
    pub heart_rate_std_dev: f64,
    pub rr_interval_samples: usize,
    /// RMSSD over the retained RR-intervals (ms)
    pub hrv_rmssd_ms: f64,
    pub activity_samples: usize,
    pub cadence_mean: f64,
    pub speed_mean_mps: f64,
    /// Heart rate vs. cadence, once enough pairs exist
    pub hr_cadence_correlation: Option<Correlation>,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl RollingWindow {
    /// Create a window retaining at most `window_size` samples per series
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            heart_rate: VecDeque::with_capacity(window_size),
            rr_intervals: VecDeque::with_capacity(window_size),
            cadence: VecDeque::with_capacity(window_size),
            speed: VecDeque::with_capacity(window_size),
            paired_heart_rate: VecDeque::with_capacity(window_size),
            paired_cadence: VecDeque::with_capacity(window_size),
            last_heart_rate: None,
            window_size,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Change the retention limit, dropping the oldest samples that no longer fit
    pub fn resize(&mut self, window_size: usize) {
        let window_size = window_size.max(1);
        self.window_size = window_size;
        for queue in [
            &mut self.heart_rate,
            &mut self.rr_intervals,
            &mut self.cadence,
            &mut self.speed,
            &mut self.paired_heart_rate,
            &mut self.paired_cadence,
        ] {
            while queue.len() > window_size {
                queue.pop_front();
            }
        }
    }

    /// Add a decoded reading to the window
    pub fn push(&mut self, reading: &Reading) {
        match reading {
            Reading::HeartRate(r) => {
                let hr = f64::from(r.heart_rate);
                Self::push_bounded(&mut self.heart_rate, hr, self.window_size);
                for rr in r.rr_intervals_ms.iter().flatten() {
                    Self::push_bounded(&mut self.rr_intervals, *rr, self.window_size);
                }
                self.last_heart_rate = Some(hr);
            }
            Reading::Activity(r) => {
                let cadence = f64::from(r.cadence_spm);
                Self::push_bounded(&mut self.cadence, cadence, self.window_size);
                Self::push_bounded(&mut self.speed, r.speed_mps, self.window_size);

                if let Some(hr) = self.last_heart_rate {
                    Self::push_bounded(&mut self.paired_heart_rate, hr, self.window_size);
                    Self::push_bounded(&mut self.paired_cadence, cadence, self.window_size);
                }
            }
            Reading::Battery(_) => {}
        }
    }

    /// Summarize the window
    pub fn summary(
        &self,
        significance_threshold: f64,
        min_correlation_samples: usize,
    ) -> WindowSummary {
        let heart_rate: Vec<f64> = self.heart_rate.iter().copied().collect();
        let rr: Vec<f64> = self.rr_intervals.iter().copied().collect();
        let cadence: Vec<f64> = self.cadence.iter().copied().collect();
        let speed: Vec<f64> = self.speed.iter().copied().collect();

        let hr_cadence_correlation = if self.paired_cadence.len() >= min_correlation_samples {
            let x: Vec<f64> = self.paired_heart_rate.iter().copied().collect();
            let y: Vec<f64> = self.paired_cadence.iter().copied().collect();
            Some(Correlation::compute(&x, &y, significance_threshold))
        } else {
            None
        };

        WindowSummary {
            heart_rate_samples: heart_rate.len(),
            heart_rate_mean: stats::average(&heart_rate),
            heart_rate_std_dev: stats::standard_deviation(&heart_rate),
            rr_interval_samples: rr.len(),
            hrv_rmssd_ms: stats::rmssd(&rr),
            activity_samples: speed.len(),
            cadence_mean: stats::average(&cadence),
            speed_mean_mps: stats::average(&speed),
            hr_cadence_correlation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_empty() && self.speed.is_empty()
    }

    fn push_bounded(queue: &mut VecDeque<f64>, value: f64, window_size: usize) {
        queue.push_back(value);
        while queue.len() > window_size {
            queue.pop_front();
        }
    }

    /// Load a window from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the window to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
