//! The Evolutionary Loop: population initialization, tournament selection,
//! BLX-α crossover, Gaussian mutation, elitism and the generation loop that
//! ties the Sequencer and Fitness Function together.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rf_slot_lab::config::SlotMachineConfig;
use rf_slot_lab::simulator::{self, SimulatorError};
use rf_slot_lab::symbols::{SymbolClasses, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::fitness::{self, FitnessBreakdown, SimulationTargets};
use crate::genome::{blend_crossover, gaussian_mutate, stacks_to_strip, GenomeError, Individual, ReelBox};
use crate::sequencer::{sequence_reel, DEFAULT_MAX_ATTEMPTS};

fn default_max_generate_attempts() -> u32 {
    250
}

/// Worker count for the parallel fitness path: one rayon thread per core.
fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Error, PartialEq)]
pub enum GaConfigError {
    #[error("popSize must be at least 1")]
    ZeroPopSize,
    #[error("elitism ({elitism}) cannot exceed popSize ({pop_size})")]
    ElitismExceedsPopSize { elitism: u32, pop_size: u32 },
    #[error("tournamentK must be at least 1")]
    ZeroTournamentK,
    #[error("{field} must be in [0, 1], got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },
    #[error("mutationSigma must be non-negative, got {0}")]
    NegativeMutationSigma(f64),
}

#[derive(Debug, Error)]
pub enum GaError {
    #[error("invalid GA configuration: {0}")]
    Config(#[from] GaConfigError),
    #[error("invalid reel box: {0}")]
    Genome(#[from] GenomeError),
    #[error("invalid simulation targets: {0}")]
    Targets(#[from] fitness::TargetsError),
    #[error("reel sequencing exhausted its retry cap for reel {reel}")]
    SequencingExhausted { reel: usize },
    #[error("simulator rejected the candidate: {0}")]
    Simulator(#[from] SimulatorError),
    #[error("progress sink write failed: {0}")]
    Sink(String),
}

/// GA hyperparameters (spec.md §6 `gaConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaConfig {
    pub pop_size: u32,
    pub generations: u32,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elitism: u32,
    pub tournament_k: u32,
    pub seed: u64,
    pub crossover_alpha: f64,
    pub mutation_sigma: f64,
    #[serde(default)]
    pub verbose_progress: bool,
    #[serde(default = "default_max_generate_attempts")]
    pub max_generate_attempts_per_reel: u32,
    /// Not part of the distilled external-interface schema's per-call knobs;
    /// opts into the rayon fitness path of spec.md §5's permitted
    /// parallelism. Defaults to sequential evaluation.
    #[serde(default)]
    pub parallel_fitness: bool,
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), GaConfigError> {
        if self.pop_size == 0 {
            return Err(GaConfigError::ZeroPopSize);
        }
        if self.elitism > self.pop_size {
            return Err(GaConfigError::ElitismExceedsPopSize {
                elitism: self.elitism,
                pop_size: self.pop_size,
            });
        }
        if self.tournament_k == 0 {
            return Err(GaConfigError::ZeroTournamentK);
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(GaConfigError::RateOutOfRange { field: "crossoverRate", value: self.crossover_rate });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GaConfigError::RateOutOfRange { field: "mutationRate", value: self.mutation_rate });
        }
        if self.mutation_sigma < 0.0 {
            return Err(GaConfigError::NegativeMutationSigma(self.mutation_sigma));
        }
        Ok(())
    }
}

/// Line-oriented text receiver a host implements to observe GA progress.
/// Line formats are host-defined; this core only guarantees one call per
/// logical event (not part of the contract itself per spec.md §6).
pub trait ProgressSink {
    fn write_line(&mut self, line: &str) -> Result<(), String>;
}

/// A sink that discards everything, for callers that don't want progress text.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn write_line(&mut self, _line: &str) -> Result<(), String> {
        Ok(())
    }
}

pub struct GaResult {
    pub best_individual: Individual,
    pub best_fitness: FitnessBreakdown,
    pub history: Vec<f64>,
}

/// Drives the generation loop over a fixed set of per-reel boxes.
pub struct GaRunner {
    config: GaConfig,
    reel_boxes: Vec<ReelBox>,
    classes: SymbolClasses,
    slot_config: SlotMachineConfig,
    targets: SimulationTargets,
    spin_count: u64,
    sim_seed: u64,
    rng: ChaCha8Rng,
    population: Vec<Individual>,
    pool: Option<rayon::ThreadPool>,
}

impl GaRunner {
    pub fn new(
        config: GaConfig,
        reel_boxes: Vec<ReelBox>,
        slot_config: SlotMachineConfig,
        targets: SimulationTargets,
        spin_count: u64,
    ) -> Result<Self, GaError> {
        config.validate()?;
        targets.validate()?;
        if spin_count == 0 {
            return Err(GaError::Simulator(SimulatorError::ZeroSpinCount));
        }
        let high: HashSet<SymbolId> = slot_config.high().clone();
        let classes = SymbolClasses::new(slot_config.wild(), slot_config.scatter(), &high);
        let sim_seed = config.seed;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let pool = if config.parallel_fitness {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(default_worker_count())
                    .build()
                    .expect("rayon thread pool must build"),
            )
        } else {
            None
        };
        Ok(Self {
            config,
            reel_boxes,
            classes,
            slot_config,
            targets,
            spin_count,
            sim_seed,
            rng,
            population: Vec::new(),
            pool,
        })
    }

    fn generate_individual(&mut self) -> Result<Individual, GaError> {
        let mut histograms = Vec::with_capacity(self.reel_boxes.len());
        let mut strips = Vec::with_capacity(self.reel_boxes.len());
        for (idx, reel_box) in self.reel_boxes.iter().enumerate() {
            let mut sequenced = None;
            for _ in 0..self.config.max_generate_attempts_per_reel {
                let histogram = reel_box.sample(&mut self.rng);
                if let Ok(stacks) = sequence_reel(&histogram, &self.classes, reel_box.radius, reel_box.seed, DEFAULT_MAX_ATTEMPTS) {
                    sequenced = Some((histogram, stacks_to_strip(stacks)));
                    break;
                }
            }
            match sequenced {
                Some((histogram, strip)) => {
                    histograms.push(histogram);
                    strips.push(strip);
                }
                None => return Err(GaError::SequencingExhausted { reel: idx }),
            }
        }
        Ok(Individual::new(histograms, strips))
    }

    fn crossover_reel(
        &mut self,
        reel_idx: usize,
        parent_a: &rf_slot_lab::symbols::StackHistogram,
        parent_b: &rf_slot_lab::symbols::StackHistogram,
    ) -> Result<
        (
            (rf_slot_lab::symbols::StackHistogram, rf_slot_lab::symbols::ReelStrip),
            (rf_slot_lab::symbols::StackHistogram, rf_slot_lab::symbols::ReelStrip),
        ),
        GaError,
    > {
        let reel_box = &self.reel_boxes[reel_idx];
        for _ in 0..self.config.max_generate_attempts_per_reel {
            let (ha, hb) = blend_crossover(reel_box, parent_a, parent_b, self.config.crossover_alpha, &mut self.rng);
            let sa = sequence_reel(&ha, &self.classes, reel_box.radius, reel_box.seed, DEFAULT_MAX_ATTEMPTS);
            let sb = sequence_reel(&hb, &self.classes, reel_box.radius, reel_box.seed, DEFAULT_MAX_ATTEMPTS);
            if let (Ok(sa), Ok(sb)) = (sa, sb) {
                return Ok(((ha, stacks_to_strip(sa)), (hb, stacks_to_strip(sb))));
            }
        }
        Err(GaError::SequencingExhausted { reel: reel_idx })
    }

    fn crossover(&mut self, a: &Individual, b: &Individual) -> Result<(Individual, Individual), GaError> {
        let mut histograms_a = Vec::with_capacity(self.reel_boxes.len());
        let mut strips_a = Vec::with_capacity(self.reel_boxes.len());
        let mut histograms_b = Vec::with_capacity(self.reel_boxes.len());
        let mut strips_b = Vec::with_capacity(self.reel_boxes.len());

        for reel_idx in 0..self.reel_boxes.len() {
            let ((ha, sa), (hb, sb)) = self.crossover_reel(reel_idx, &a.histograms[reel_idx], &b.histograms[reel_idx])?;
            histograms_a.push(ha);
            strips_a.push(sa);
            histograms_b.push(hb);
            strips_b.push(sb);
        }
        Ok((Individual::new(histograms_a, strips_a), Individual::new(histograms_b, strips_b)))
    }

    fn mutate(&mut self, individual: Individual) -> Result<Individual, GaError> {
        let mut histograms = Vec::with_capacity(self.reel_boxes.len());
        let mut strips = Vec::with_capacity(self.reel_boxes.len());

        for (reel_idx, reel_box) in self.reel_boxes.iter().enumerate() {
            let original = &individual.histograms[reel_idx];
            let mut sequenced = None;
            for _ in 0..self.config.max_generate_attempts_per_reel {
                let mutated = gaussian_mutate(reel_box, original, self.config.mutation_rate, self.config.mutation_sigma, &mut self.rng);
                if let Ok(stacks) = sequence_reel(&mutated, &self.classes, reel_box.radius, reel_box.seed, DEFAULT_MAX_ATTEMPTS) {
                    sequenced = Some((mutated, stacks_to_strip(stacks)));
                    break;
                }
            }
            match sequenced {
                Some((histogram, strip)) => {
                    histograms.push(histogram);
                    strips.push(strip);
                }
                None => return Err(GaError::SequencingExhausted { reel: reel_idx }),
            }
        }
        Ok(Individual::new(histograms, strips))
    }

    fn tournament_select(&mut self, fitness: &[FitnessBreakdown]) -> usize {
        let mut best = self.rng.random_range(0..self.population.len());
        for _ in 1..self.config.tournament_k {
            let candidate = self.rng.random_range(0..self.population.len());
            if fitness[candidate].total < fitness[best].total {
                best = candidate;
            }
        }
        best
    }

    fn evaluate_one(&self, individual: &Individual) -> Result<FitnessBreakdown, GaError> {
        let report = simulator::run_simulation(
            individual.strips.clone(),
            self.slot_config.clone(),
            self.spin_count,
            self.sim_seed,
        )?;
        Ok(fitness::evaluate(&report.to_breakdown(), &self.targets))
    }

    fn evaluate_population(&self) -> Result<Vec<FitnessBreakdown>, GaError> {
        match &self.pool {
            Some(pool) => pool.install(|| self.population.par_iter().map(|ind| self.evaluate_one(ind)).collect()),
            None => self.population.iter().map(|ind| self.evaluate_one(ind)).collect(),
        }
    }

    fn argmin(fitness: &[FitnessBreakdown]) -> usize {
        fitness
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total.partial_cmp(&b.1.total).expect("fitness totals must not be NaN"))
            .map(|(idx, _)| idx)
            .expect("population must be non-empty")
    }

    pub fn run(&mut self, sink: &mut dyn ProgressSink) -> Result<GaResult, GaError> {
        self.population = (0..self.config.pop_size)
            .map(|_| self.generate_individual())
            .collect::<Result<Vec<_>, _>>()?;

        let mut fitness = self.evaluate_population()?;
        let best_idx = Self::argmin(&fitness);
        let mut best = (self.population[best_idx].clone(), fitness[best_idx].clone());
        let mut history = vec![best.1.total];

        sink.write_line(&format!("generation 0: best total = {:.6}", best.1.total))
            .map_err(GaError::Sink)?;

        for generation in 1..=self.config.generations {
            let pop_size = self.config.pop_size as usize;
            let mut order: Vec<usize> = (0..self.population.len()).collect();
            order.sort_by(|&a, &b| fitness[a].total.partial_cmp(&fitness[b].total).unwrap());

            let mut next_pop = Vec::with_capacity(pop_size);
            for &idx in order.iter().take(self.config.elitism as usize) {
                next_pop.push(self.population[idx].clone());
            }

            while next_pop.len() < pop_size {
                let i1 = self.tournament_select(&fitness);
                let i2 = self.tournament_select(&fitness);
                let parent_a = self.population[i1].clone();
                let parent_b = self.population[i2].clone();
                let roll: f64 = self.rng.random_range(0.0..1.0);
                let (child_a, child_b) = if roll < self.config.crossover_rate {
                    self.crossover(&parent_a, &parent_b)?
                } else {
                    (parent_a, parent_b)
                };
                let child_a = self.mutate(child_a)?;
                next_pop.push(child_a);
                if next_pop.len() < pop_size {
                    let child_b = self.mutate(child_b)?;
                    next_pop.push(child_b);
                }
            }

            self.population = next_pop;
            fitness = self.evaluate_population()?;
            let gen_best_idx = Self::argmin(&fitness);
            if fitness[gen_best_idx].total < best.1.total {
                best = (self.population[gen_best_idx].clone(), fitness[gen_best_idx].clone());
            }
            history.push(best.1.total);

            if self.config.verbose_progress {
                sink.write_line(&format!(
                    "generation {generation}: gen best = {:.6}, global best = {:.6}",
                    fitness[gen_best_idx].total, best.1.total
                ))
                .map_err(GaError::Sink)?;
            }
        }

        Ok(GaResult { best_individual: best.0, best_fitness: best.1, history })
    }
}

/// `runGeneticSearch` (spec.md §6): wires a GA config, per-reel boxes,
/// simulation targets and a slot configuration into a finished search.
pub fn run_genetic_search(
    config: GaConfig,
    reel_boxes: Vec<ReelBox>,
    targets: SimulationTargets,
    spin_count: u64,
    slot_config: SlotMachineConfig,
    sink: &mut dyn ProgressSink,
) -> Result<GaResult, GaError> {
    let mut runner = GaRunner::new(config, reel_boxes, slot_config, targets, spin_count)?;
    runner.run(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn small_config() -> GaConfig {
        GaConfig {
            pop_size: 6,
            generations: 5,
            crossover_rate: 0.7,
            mutation_rate: 0.2,
            elitism: 1,
            tournament_k: 3,
            seed: 99,
            crossover_alpha: 0.3,
            mutation_sigma: 1.0,
            verbose_progress: false,
            max_generate_attempts_per_reel: 250,
            parallel_fitness: false,
        }
    }

    fn single_low_reel_box() -> ReelBox {
        let mut low = BTreeMap::new();
        let mut high = BTreeMap::new();
        low.insert(5, vec![1]);
        high.insert(5, vec![4]);
        ReelBox::new(1, 11, low, high).unwrap()
    }

    fn flat_slot_config() -> SlotMachineConfig {
        use std::collections::{HashMap, HashSet};
        SlotMachineConfig::new(
            vec![1],
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            HashMap::from([(5, vec![1, 2, 3, 4])]),
            vec![vec![0]],
        )
        .unwrap()
    }

    fn targets() -> SimulationTargets {
        SimulationTargets {
            target_rtp: 0.5,
            target_hit_frequency: 0.8,
            target_bonus_frequency: 0.0,
            symbol_rtp_targets: Default::default(),
            symbol_rtp_unevenness_weight: 0.0,
        }
    }

    #[test]
    fn rejects_elitism_over_pop_size() {
        let mut config = small_config();
        config.elitism = 99;
        let err = config.validate().unwrap_err();
        assert_eq!(err, GaConfigError::ElitismExceedsPopSize { elitism: 99, pop_size: 6 });
    }

    /// S7 — history of the global best is monotonically non-increasing.
    #[test]
    fn s7_history_is_monotonically_non_increasing() {
        let mut runner = GaRunner::new(small_config(), vec![single_low_reel_box()], flat_slot_config(), targets(), 200).unwrap();
        let result = runner.run(&mut NullSink).unwrap();
        assert_eq!(result.history.len(), small_config().generations as usize + 1);
        for w in result.history.windows(2) {
            assert!(w[1] <= w[0] + 1e-9);
        }
    }

    #[test]
    fn fixed_seed_reproduces_identical_run() {
        let mut runner_a = GaRunner::new(small_config(), vec![single_low_reel_box()], flat_slot_config(), targets(), 200).unwrap();
        let mut runner_b = GaRunner::new(small_config(), vec![single_low_reel_box()], flat_slot_config(), targets(), 200).unwrap();
        let result_a = runner_a.run(&mut NullSink).unwrap();
        let result_b = runner_b.run(&mut NullSink).unwrap();
        assert_eq!(result_a.history, result_b.history);
        assert_eq!(result_a.best_fitness, result_b.best_fitness);
    }

    #[test]
    fn elitism_equal_to_pop_size_keeps_history_constant() {
        let mut config = small_config();
        config.elitism = config.pop_size;
        let mut runner = GaRunner::new(config, vec![single_low_reel_box()], flat_slot_config(), targets(), 200).unwrap();
        let result = runner.run(&mut NullSink).unwrap();
        for v in &result.history {
            assert!((*v - result.history[0]).abs() < 1e-9);
        }
    }
}
