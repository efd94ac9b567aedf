//! Provides an example of how to use belief to perform inference on the student network of
//! Koller & Friedman, written as a factor graph.

use belief as b;
use b::{FactorGraph, MarginalInference, Observation};

use ndarray::array;

fn main() -> b::Result<()> {
    /////////////////////////////////////////////////////
    // Step 1: Build the graph
    let graph = build_graph()?;

    /////////////////////////////////////////////////////
    // Step 2: Compile some evidence
    let d = lookup(&graph, "D")?;
    let i = lookup(&graph, "I")?;
    let s = lookup(&graph, "S")?;
    let l = lookup(&graph, "L")?;

    let mut row = vec![Observation::Unknown; graph.n_variables()];
    row[d] = Observation::Observed(0);
    row[l] = Observation::Observed(1);
    row[s] = Observation::Observed(0);

    /////////////////////////////////////////////////////
    // Step 3: Build the inference engines
    let bp = b::BeliefPropagation::new(&graph, b::BeliefPropagationConfig::default())?;
    let exact = b::Enumeration::new(&graph)?;

    /////////////////////////////////////////////////////
    // Step 4: Run the query
    let (beliefs, diagnostics) = bp.infer_with_diagnostics(&row)?;
    let expected = exact.infer(&row)?;

    println!(
        "belief propagation: {} rounds, converged = {}, final delta = {:e}",
        diagnostics.iterations_run,
        diagnostics.converged,
        diagnostics.final_delta
    );

    for v in 0..beliefs[i].len() {
        println!(
            "P(I = {} | D = 0, S = 0, L = 1) = {:.4} (exact {:.4})",
            v,
            beliefs[i][v],
            expected[i][v]
        );
    }

    /////////////////////////////////////////////////////
    // Step 5: Most likely completion of the row
    let observations = ndarray::Array2::from_shape_vec((1, row.len()), row)
                                        .map_err(|_| b::BeliefError::InvalidInitialization)?;
    let predicted = graph.predict(observations.view())?;

    for var in 0..graph.n_variables() {
        let name = graph.lookup_name(var).cloned().unwrap_or_default();
        println!("{} = {}", name, predicted[[0, var]]);
    }

    Ok(())
}

fn lookup(graph: &FactorGraph, name: &str) -> b::Result<usize> {
    graph.lookup_variable(name)
         .ok_or_else(|| b::BeliefError::InvalidConfig(format!("no variable named {}", name)))
}

fn build_graph() -> b::Result<FactorGraph> {
    let mut graph = FactorGraph::new();

    ///////////////////////////////////////////////////
    // Step 1: one marginal per variable
    let d = graph.add_named_marginal("D", b::Categorical::uniform(2)?)?;
    let i = graph.add_named_marginal("I", b::Categorical::uniform(2)?)?;
    let g = graph.add_named_marginal("G", b::Categorical::uniform(3)?)?;
    let s = graph.add_named_marginal("S", b::Categorical::uniform(2)?)?;
    let l = graph.add_named_marginal("L", b::Categorical::uniform(2)?)?;

    ///////////////////////////////////////////////////
    // Step 2: one factor per conditional probability table
    let p_d = graph.add_factor(b::JointCategorical::new(array![0.6, 0.4].into_dyn())?)?;
    let p_i = graph.add_factor(b::JointCategorical::new(array![0.7, 0.3].into_dyn())?)?;

    // P(G | I, D), dimensions (I, D, G)
    let p_g = graph.add_factor(b::JointCategorical::new(
        array![
            [[0.3, 0.4, 0.3], [0.05, 0.25, 0.7]],
            [[0.9, 0.08, 0.02], [0.5, 0.3, 0.2]]
        ].into_dyn()
    )?)?;

    // P(S | I), dimensions (I, S)
    let p_s = graph.add_factor(b::JointCategorical::new(
        array![
            [0.95, 0.05],
            [0.2, 0.8]
        ].into_dyn()
    )?)?;

    // P(L | G), dimensions (G, L)
    let p_l = graph.add_factor(b::JointCategorical::new(
        array![
            [0.1, 0.9],
            [0.4, 0.6],
            [0.99, 0.01]
        ].into_dyn()
    )?)?;

    ///////////////////////////////////////////////////
    // Step 3: edges, in the dimension order of each table
    graph.add_edge(d, p_d)?;
    graph.add_edge(i, p_i)?;

    graph.add_edge(i, p_g)?;
    graph.add_edge(d, p_g)?;
    graph.add_edge(g, p_g)?;

    graph.add_edge(i, p_s)?;
    graph.add_edge(s, p_s)?;

    graph.add_edge(g, p_l)?;
    graph.add_edge(l, p_l)?;

    Ok(graph)
}
