//! Genetic operators.
//!
//! RNG draw order is part of the determinism contract: population init draws
//! genes row-major for individuals `1..population_size`; each tournament
//! draws exactly 3 indices; each pairing draws one crossover-rate check and,
//! on success, one cut point; mutation draws one rate check per gene plus
//! one replacement gene when it fires.

use fleet_core::SimRng;

/// Tournament size.
const TOURNAMENT_K: usize = 3;

/// Build the initial population.
///
/// Individual 0 is the greedy round-robin seed (`g[k] = k % robot_count`);
/// the rest are uniform random gene draws.
pub fn initialize_population(
    population_size: usize,
    chromosome_len: usize,
    robot_count: usize,
    rng: &mut SimRng,
) -> Vec<Vec<usize>> {
    if chromosome_len == 0 {
        return vec![vec![]];
    }
    let mut population = Vec::with_capacity(population_size);
    population.push((0..chromosome_len).map(|k| k % robot_count).collect());
    while population.len() < population_size {
        population.push(
            (0..chromosome_len)
                .map(|_| rng.gen_range(0..robot_count))
                .collect(),
        );
    }
    population
}

/// Tournament selection: draw `TOURNAMENT_K` indices, keep the fittest;
/// fitness ties break on the ascending index.
pub fn tournament_select(
    population: &[Vec<usize>],
    fitnesses: &[f64],
    rng: &mut SimRng,
) -> Vec<usize> {
    let mut best: Option<usize> = None;
    for _ in 0..TOURNAMENT_K {
        let idx = rng.gen_range(0..population.len());
        best = Some(match best {
            None => idx,
            Some(current) => {
                if fitnesses[idx] < fitnesses[current]
                    || (fitnesses[idx] == fitnesses[current] && idx < current)
                {
                    idx
                } else {
                    current
                }
            }
        });
    }
    population[best.unwrap_or(0)].clone()
}

/// One-point crossover.  Chromosomes of length ≤ 1 pass through unchanged
/// (no cut draw is consumed).
pub fn crossover(
    parent_a: &[usize],
    parent_b: &[usize],
    rng: &mut SimRng,
) -> (Vec<usize>, Vec<usize>) {
    if parent_a.len() <= 1 {
        return (parent_a.to_vec(), parent_b.to_vec());
    }
    let point = rng.gen_range(1..parent_a.len());
    let child_a = [&parent_a[..point], &parent_b[point..]].concat();
    let child_b = [&parent_b[..point], &parent_a[point..]].concat();
    (child_a, child_b)
}

/// Point-wise mutation: each gene is redrawn uniformly with probability
/// `mutation_rate`.
pub fn mutate(
    mut chromosome: Vec<usize>,
    robot_count: usize,
    mutation_rate: f64,
    rng: &mut SimRng,
) -> Vec<usize> {
    for gene in chromosome.iter_mut() {
        if rng.chance(mutation_rate) {
            *gene = rng.gen_range(0..robot_count);
        }
    }
    chromosome
}
