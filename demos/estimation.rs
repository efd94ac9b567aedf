//! Provides an example of how to use belief to estimate the factors of the student network of
//! Koller & Friedman from samples of the true distribution.

use belief as b;
use b::init::Initialization;
use b::FactorGraph;

use ndarray::array;
use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Variable order of the data columns
const D: usize = 0;
const I: usize = 1;
const G: usize = 2;
const S: usize = 3;
const L: usize = 4;

fn main() -> b::Result<()> {
    ////////////////////////////////////////////////////////////////////////////
    // Step 1:  Build Truth and Target graphs
    //
    // Note:    the target graph is initialized with uniform factors
    let truth = build_graph(ModelType::Truth)?;
    let mut target = build_graph(ModelType::Target)?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 2:  Build dataset from truth by ancestral sampling
    let num_samples = 10_000;
    let dataset = sample(&mut StdRng::seed_from_u64(42), num_samples)?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 3:  Estimate the factors, one batch at a time
    let before = target.probability(dataset.view())?;
    for batch in dataset.axis_chunks_iter(ndarray::Axis(0), 1_000) {
        target.summarize(batch, None)?;
    }
    target.from_summaries()?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 4:  Compare the probability each graph assigns to the data
    let p_truth = truth.log_probability(dataset.view())?.sum();
    let p_prior = before.mapv(f64::ln).sum();
    let p_posterior = target.log_probability(dataset.view())?.sum();

    println!("                    | Truth         | Before        | Estimated");
    println!("---------------------------------------------------------------------");
    println!("log likelihood      |\t{:.2}\t|\t{:.2}\t|\t{:.2}", p_truth, p_prior, p_posterior);

    // the estimated factors are joint tables; the CPT of G is the table conditioned on (I, D)
    let grade = target.factor(2).map(|f| f.table().clone());
    if let Some(table) = grade {
        println!("\nestimated P(I, D, G):\n{:.3}", table);
    }

    Ok(())
}

enum ModelType {
    Truth,
    Target
}

/// Draw samples of (D, I, G, S, L) from the true conditional distributions
fn sample(rng: &mut StdRng, num_samples: usize) -> b::Result<ndarray::Array2<usize>> {
    let weighted = |p: &[f64]| WeightedIndex::new(p)
        .map_err(|e| b::BeliefError::InvalidProbabilities(e.to_string()));

    let p_d = weighted(&[0.6, 0.4])?;
    let p_i = weighted(&[0.7, 0.3])?;
    let p_g = [
        [weighted(&[0.3, 0.4, 0.3])?, weighted(&[0.05, 0.25, 0.7])?],
        [weighted(&[0.9, 0.08, 0.02])?, weighted(&[0.5, 0.3, 0.2])?]
    ];
    let p_s = [weighted(&[0.95, 0.05])?, weighted(&[0.2, 0.8])?];
    let p_l = [weighted(&[0.1, 0.9])?, weighted(&[0.4, 0.6])?, weighted(&[0.99, 0.01])?];

    let mut data = ndarray::Array2::zeros((num_samples, 5));
    for mut row in data.outer_iter_mut() {
        let d = p_d.sample(rng);
        let i = p_i.sample(rng);
        let g = p_g[i][d].sample(rng);

        row[D] = d;
        row[I] = i;
        row[G] = g;
        row[S] = p_s[i].sample(rng);
        row[L] = p_l[g].sample(rng);
    }

    Ok(data)
}

fn build_graph(mtype: ModelType) -> b::Result<FactorGraph> {
    let (p_d, p_i, p_g, p_s, p_l) = match mtype {
        ModelType::Truth => (
            Initialization::Probabilities(&[0.6, 0.4]).build_factor(&[2])?,
            Initialization::Probabilities(&[0.7, 0.3]).build_factor(&[2])?,
            Initialization::Table(array![
                [[0.3, 0.4, 0.3], [0.05, 0.25, 0.7]],
                [[0.9, 0.08, 0.02], [0.5, 0.3, 0.2]]
            ].into_dyn()).build_factor(&[2, 2, 3])?,
            Initialization::Table(array![[0.95, 0.05], [0.2, 0.8]].into_dyn()).build_factor(&[2, 2])?,
            Initialization::Table(array![[0.1, 0.9], [0.4, 0.6], [0.99, 0.01]].into_dyn()).build_factor(&[3, 2])?
        ),
        ModelType::Target => (
            Initialization::Uniform.build_factor(&[2])?,
            Initialization::Uniform.build_factor(&[2])?,
            Initialization::Uniform.build_factor(&[2, 2, 3])?,
            Initialization::Uniform.build_factor(&[2, 2])?,
            Initialization::Uniform.build_factor(&[3, 2])?
        )
    };

    let marginals = vec![
        Initialization::Uniform.build_marginal(2)?,
        Initialization::Uniform.build_marginal(2)?,
        Initialization::Uniform.build_marginal(3)?,
        Initialization::Uniform.build_marginal(2)?,
        Initialization::Uniform.build_marginal(2)?
    ];

    FactorGraph::from_parts(
        vec![p_d, p_i, p_g, p_s, p_l],
        marginals,
        &[(D, 0), (I, 1), (I, 2), (D, 2), (G, 2), (I, 3), (S, 3), (G, 4), (L, 4)]
    )
}
