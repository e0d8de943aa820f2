//! Example: modal analysis of a 2D portal frame

use anyhow::Result;
use fea_eigen::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    println!("FEA Eigen - Portal Frame Modal Analysis\n");

    // Steel frame: 4m tall columns, 6m span
    let height = 4.0;
    let span = 6.0;
    let e = 200e9;
    let (col_a, col_i) = (4.94e-3, 8.49e-5);
    let (beam_a, beam_i) = (6.64e-3, 1.42e-4);
    let rho = 7850.0;

    let mut domain = Domain::new();
    domain.add_node(Node::new(1, 3, &[0.0, 0.0]))?;
    domain.add_node(Node::new(2, 3, &[span, 0.0]))?;
    domain.add_node(Node::new(3, 3, &[0.0, height]))?;
    domain.add_node(Node::new(4, 3, &[span, height]))?;

    // Roof slab carried as lumped mass at the beam ends
    let roof = 0.5 * span * 2000.0;
    domain.add_node(Node::new(5, 3, &[0.5 * span, height]).with_mass(&[roof, roof, 0.0])?)?;

    domain.add_element(ElasticBeamColumn2d::new(1, [1, 3], e, col_a, col_i).with_rho(rho * col_a))?;
    domain.add_element(ElasticBeamColumn2d::new(2, [2, 4], e, col_a, col_i).with_rho(rho * col_a))?;
    domain.add_element(
        ElasticBeamColumn2d::new(3, [3, 5], e, beam_a, beam_i)
            .with_rho(rho * beam_a)
            .with_integration(BeamIntegration::legendre(), 3),
    )?;
    domain.add_element(
        ElasticBeamColumn2d::new(4, [5, 4], e, beam_a, beam_i)
            .with_rho(rho * beam_a)
            .with_integration(BeamIntegration::legendre(), 3),
    )?;

    // Fixed bases
    for node in [1, 2] {
        for sp in SpConstraint::fix_all(node, &[0, 1, 2]) {
            domain.add_sp_constraint(sp)?;
        }
    }

    let options = EigenOptions::new(3).with_logging();
    let (model, results) = EigenAnalysis::new(options).analyze(domain)?;

    println!(
        "{} equations, {} DOF groups, {} FE elements\n",
        model.num_eqn(),
        model.num_dof_groups(),
        model.num_fe_elements()
    );

    println!("Mode  Eigenvalue      Frequency (Hz)  Period (s)");
    for mode in &results.modes {
        let period = mode
            .period
            .map(|t| format!("{:.4}", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<14.6e}  {:<14.4}  {}",
            mode.mode, mode.eigenvalue, mode.frequency, period
        );
    }

    println!("\nFirst mode shape:");
    for shape in &results.mode(1)?.shapes {
        println!(
            "  Node {}: {}",
            shape.node,
            shape
                .values
                .iter()
                .map(|v| format!("{:>10.4e}", v))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    println!("\n{}", results.to_json()?);
    Ok(())
}
