//! The GA loop and the in-process [`Planner`] implementation.

use std::cmp::Ordering;

use fleet_core::{FleetConfig, SimRng};

use crate::fitness::evaluate_chromosome;
use crate::operators::{crossover, initialize_population, mutate, tournament_select};
use crate::plan::{
    canonical_job_order, PlanAssignment, PlanMeta, PlanRequest, PlanResponse, PlanResult, Planner,
};

/// Run the GA for one request.
///
/// Pure and deterministic: inputs are sorted into canonical order on entry,
/// the seeded RNG is the only randomness, and generation survivors are
/// ordered by `(fitness, chromosome lex)` with a stable sort so ties cannot
/// depend on float ordering quirks.
pub fn optimize(config: &FleetConfig, request: &PlanRequest) -> PlanResponse {
    let mut robots = request.robots.clone();
    robots.sort_by_key(|r| r.id);
    let mut jobs = request.pending_jobs.clone();
    canonical_job_order(&mut jobs);

    let population_size = config.ga_population_size.max(1);
    if jobs.is_empty() || robots.is_empty() {
        return PlanResponse {
            assignments: Vec::new(),
            meta: PlanMeta {
                best_score: 0.0,
                generations: 0,
                population_size,
                seed: request.seed,
            },
        };
    }

    let service_time_s = config.service_time_s as f64;
    let drain = config.battery_drain_per_s;
    let evaluate = |chromosome: &[usize]| {
        evaluate_chromosome(
            chromosome,
            &robots,
            &jobs,
            request.sim_time_s,
            service_time_s,
            drain,
        )
    };

    let mut rng = SimRng::new(request.seed);
    let mut population = initialize_population(population_size, jobs.len(), robots.len(), &mut rng);

    let mut best_chromosome: Option<Vec<usize>> = None;
    let mut best_score = f64::INFINITY;

    for _ in 0..config.ga_generations {
        let mut evaluated: Vec<(f64, Vec<usize>)> = population
            .iter()
            .map(|chromosome| (evaluate(chromosome), chromosome.clone()))
            .collect();
        for (score, chromosome) in &evaluated {
            if *score < best_score {
                best_score = *score;
                best_chromosome = Some(chromosome.clone());
            }
        }

        // Stable sort: fitness, then chromosome lexicographic order.
        evaluated.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        let fitnesses: Vec<f64> = evaluated.iter().map(|e| e.0).collect();
        let sorted_population: Vec<Vec<usize>> = evaluated.into_iter().map(|e| e.1).collect();

        let mut next_population: Vec<Vec<usize>> = sorted_population
            .iter()
            .take(config.ga_elite_size.min(population_size))
            .cloned()
            .collect();

        while next_population.len() < population_size {
            let parent_a = tournament_select(&sorted_population, &fitnesses, &mut rng);
            let parent_b = tournament_select(&sorted_population, &fitnesses, &mut rng);

            let (child_a, child_b) = if rng.chance(config.ga_crossover_rate) {
                crossover(&parent_a, &parent_b, &mut rng)
            } else {
                (parent_a, parent_b)
            };

            next_population.push(mutate(child_a, robots.len(), config.ga_mutation_rate, &mut rng));
            if next_population.len() < population_size {
                next_population.push(mutate(
                    child_b,
                    robots.len(),
                    config.ga_mutation_rate,
                    &mut rng,
                ));
            }
        }
        population = next_population;
    }

    // Zero generations: fall back to the round-robin seed individual.
    let best_chromosome = match best_chromosome {
        Some(c) => c,
        None => {
            let seed_individual = population[0].clone();
            best_score = evaluate(&seed_individual);
            seed_individual
        }
    };

    let assignments = jobs
        .iter()
        .enumerate()
        .map(|(k, job)| PlanAssignment {
            job_id: job.id.clone(),
            robot_id: robots[best_chromosome[k] % robots.len()].id,
            score: best_score,
        })
        .collect();

    PlanResponse {
        assignments,
        meta: PlanMeta {
            best_score,
            generations: config.ga_generations,
            population_size,
            seed: request.seed,
        },
    }
}

// ── GaPlanner ─────────────────────────────────────────────────────────────────

/// In-process [`Planner`] backed by [`optimize`].
pub struct GaPlanner {
    config: FleetConfig,
}

impl GaPlanner {
    pub fn new(config: FleetConfig) -> Self {
        Self { config }
    }
}

impl Planner for GaPlanner {
    fn plan(&self, request: &PlanRequest) -> PlanResult<PlanResponse> {
        Ok(optimize(&self.config, request))
    }
}
