//! Simulated progress timeline shown while a chat turn is in flight.
//!
//! This is a cosmetic simulation and is not authoritative. The timeline runs
//! on fixed timers and does not depend on anything the server reports. The
//! chat controller forces it to completion when the real answer lands.
//!
//! [`ProgressSimulator`] is a pure state machine. Something else owns the
//! clock: it waits for [`ProgressSimulator::next_delay`], then calls
//! [`ProgressSimulator::advance`], until the machine reports no further delay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Interval between percent increments inside a stage.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between reaching a stage target and starting the next stage.
pub const STAGE_PAUSE: Duration = Duration::from_millis(200);

/// Delay between the real response arriving and the indicator being torn
/// down, so the bar is seen at 100%.
pub const COMPLETION_DELAY: Duration = Duration::from_millis(500);

/// One phase of the simulated timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyzing,
    SearchingDocs,
    SearchingWeb,
    ProcessingExamples,
    Generating,
    Finalizing,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Analyzing,
        Stage::SearchingDocs,
        Stage::SearchingWeb,
        Stage::ProcessingExamples,
        Stage::Generating,
        Stage::Finalizing,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Stage::Analyzing => "analyzing",
            Stage::SearchingDocs => "searching_docs",
            Stage::SearchingWeb => "searching_web",
            Stage::ProcessingExamples => "processing_examples",
            Stage::Generating => "generating",
            Stage::Finalizing => "finalizing",
        }
    }

    /// User-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Analyzing => "Analizando consulta...",
            Stage::SearchingDocs => "Buscando en documentos...",
            Stage::SearchingWeb => "Consultando información web...",
            Stage::ProcessingExamples => "Procesando ejemplos...",
            Stage::Generating => "Generando asiento contable...",
            Stage::Finalizing => "Finalizando respuesta...",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Stage::Analyzing => "🔍",
            Stage::SearchingDocs => "📄",
            Stage::SearchingWeb => "🌐",
            Stage::ProcessingExamples => "📚",
            Stage::Generating => "⚡",
            Stage::Finalizing => "✅",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Stage::Analyzing => 0,
            Stage::SearchingDocs => 1,
            Stage::SearchingWeb => 2,
            Stage::ProcessingExamples => 3,
            Stage::Generating => 4,
            Stage::Finalizing => 5,
        }
    }

    pub fn spec(self) -> StageSpec {
        STAGES[self.index()]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Wall-clock duration and target percentage of a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSpec {
    pub stage: Stage,
    pub duration: Duration,
    pub target: f64,
}

impl StageSpec {
    /// Number of ticks the stage takes to climb to its target.
    pub fn ticks(&self) -> u32 {
        let ticks = self.duration.as_millis() / TICK_INTERVAL.as_millis();
        (ticks as u32).max(1)
    }
}

pub const STAGES: [StageSpec; 6] = [
    StageSpec {
        stage: Stage::Analyzing,
        duration: Duration::from_millis(2000),
        target: 15.0,
    },
    StageSpec {
        stage: Stage::SearchingDocs,
        duration: Duration::from_millis(3000),
        target: 35.0,
    },
    StageSpec {
        stage: Stage::SearchingWeb,
        duration: Duration::from_millis(2500),
        target: 55.0,
    },
    StageSpec {
        stage: Stage::ProcessingExamples,
        duration: Duration::from_millis(2000),
        target: 75.0,
    },
    StageSpec {
        stage: Stage::Generating,
        duration: Duration::from_millis(4000),
        target: 95.0,
    },
    StageSpec {
        stage: Stage::Finalizing,
        duration: Duration::from_millis(1000),
        target: 100.0,
    },
];

/// Total time the timeline takes to reach 100% if nothing forces it.
pub fn full_timeline_duration() -> Duration {
    let stages: Duration = STAGES.iter().map(|s| s.duration).sum();
    stages + STAGE_PAUSE * (STAGES.len() as u32 - 1)
}

/// Snapshot published to the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub percent: f64,
    pub stage: Stage,
    pub visible: bool,
}

impl ProgressState {
    /// Hidden indicator at 0% / analyzing.
    pub const fn initial() -> Self {
        Self {
            percent: 0.0,
            stage: Stage::Analyzing,
            visible: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }

    /// Percent rounded for display.
    pub fn rounded_percent(&self) -> u8 {
        self.percent.round().clamp(0.0, 100.0) as u8
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ticking,
    Paused,
    Finished,
}

/// Pure state machine behind the simulated progress timeline.
#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    stage_index: usize,
    tick: u32,
    stage_start: f64,
    percent: f64,
    phase: Phase,
}

impl ProgressSimulator {
    /// Starts a fresh timeline at 0% / analyzing.
    pub fn new() -> Self {
        Self {
            stage_index: 0,
            tick: 0,
            stage_start: 0.0,
            percent: 0.0,
            phase: Phase::Ticking,
        }
    }

    pub fn stage(&self) -> Stage {
        STAGES[self.stage_index].stage
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Visible snapshot of the current position.
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            percent: self.percent,
            stage: self.stage(),
            visible: true,
        }
    }

    /// How long to wait before the next [`advance`](Self::advance), or
    /// `None` once the timeline is over.
    pub fn next_delay(&self) -> Option<Duration> {
        match self.phase {
            Phase::Ticking => Some(TICK_INTERVAL),
            Phase::Paused => Some(STAGE_PAUSE),
            Phase::Finished => None,
        }
    }

    /// Applies one scheduled event: a tick inside a stage or the end of an
    /// inter-stage pause.
    pub fn advance(&mut self) {
        match self.phase {
            Phase::Ticking => {
                let spec = STAGES[self.stage_index];
                let ticks = spec.ticks();
                self.tick += 1;

                let step = (spec.target - self.stage_start) / f64::from(ticks);
                let next = (self.stage_start + step * f64::from(self.tick)).min(spec.target);
                self.percent = self.percent.max(next);

                if self.tick >= ticks {
                    self.percent = spec.target;
                    self.phase = if self.stage_index + 1 < STAGES.len() {
                        Phase::Paused
                    } else {
                        Phase::Finished
                    };
                }
            }
            Phase::Paused => {
                self.stage_index += 1;
                self.tick = 0;
                self.stage_start = self.percent;
                self.phase = Phase::Ticking;
            }
            Phase::Finished => {}
        }
    }

    /// Jumps straight to 100% / finalizing. Further advances are no-ops.
    pub fn force_complete(&mut self) {
        self.stage_index = STAGES.len() - 1;
        self.percent = 100.0;
        self.phase = Phase::Finished;
    }

    /// Runs the timeline to its end, returning the simulated time consumed.
    pub fn run_to_end(&mut self) -> Duration {
        let mut elapsed = Duration::ZERO;
        while let Some(delay) = self.next_delay() {
            elapsed += delay;
            self.advance();
        }
        elapsed
    }
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_analyzing() {
        let sim = ProgressSimulator::new();
        assert_eq!(sim.percent(), 0.0);
        assert_eq!(sim.stage(), Stage::Analyzing);
        assert_eq!(sim.next_delay(), Some(TICK_INTERVAL));
    }

    #[test]
    fn full_run_ends_finalizing_at_100() {
        let mut sim = ProgressSimulator::new();
        let elapsed = sim.run_to_end();

        assert_eq!(sim.stage(), Stage::Finalizing);
        assert_eq!(sim.percent(), 100.0);
        assert!(sim.is_finished());
        assert_eq!(elapsed, full_timeline_duration());
        assert_eq!(elapsed, Duration::from_millis(14_500 + 5 * 200));
    }

    #[test]
    fn first_stage_climbs_linearly() {
        let mut sim = ProgressSimulator::new();
        sim.advance();
        assert!((sim.percent() - 0.75).abs() < 1e-9);

        for _ in 1..10 {
            sim.advance();
        }
        assert!((sim.percent() - 7.5).abs() < 1e-9);
        assert_eq!(sim.stage(), Stage::Analyzing);
    }

    #[test]
    fn stage_targets_are_hit_exactly_then_pause() {
        let mut sim = ProgressSimulator::new();
        for spec in STAGES.iter().take(STAGES.len() - 1) {
            for _ in 0..spec.ticks() {
                assert_eq!(sim.next_delay(), Some(TICK_INTERVAL));
                sim.advance();
            }
            assert_eq!(sim.percent(), spec.target);
            assert_eq!(sim.stage(), spec.stage);
            assert_eq!(sim.next_delay(), Some(STAGE_PAUSE));
            sim.advance();
        }
        assert_eq!(sim.stage(), Stage::Finalizing);
    }

    #[test]
    fn percent_never_decreases_and_never_exceeds_target() {
        let mut sim = ProgressSimulator::new();
        let mut last = sim.percent();
        while sim.next_delay().is_some() {
            sim.advance();
            assert!(sim.percent() >= last);
            assert!(sim.percent() <= sim.stage().spec().target);
            last = sim.percent();
        }
    }

    #[test]
    fn force_complete_short_circuits() {
        let mut sim = ProgressSimulator::new();
        for _ in 0..25 {
            sim.advance();
        }
        sim.force_complete();
        assert_eq!(sim.percent(), 100.0);
        assert_eq!(sim.stage(), Stage::Finalizing);
        assert_eq!(sim.next_delay(), None);

        sim.advance();
        assert_eq!(sim.percent(), 100.0);
    }

    #[test]
    fn stage_keys_round_trip_through_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.key()));
            assert_eq!(STAGES[stage.index()].stage, stage);
        }
    }

    #[test]
    fn initial_state_is_hidden() {
        let state = ProgressState::initial();
        assert!(!state.visible);
        assert_eq!(state.rounded_percent(), 0);
        assert_eq!(state.stage, Stage::Analyzing);
    }
}
