use approx::assert_relative_eq;
use fea_eigen::integration::ChebyshevKind;
use fea_eigen::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn weights_sum_to_one() {
    let families = [
        BeamIntegration::legendre(),
        BeamIntegration::lobatto(),
        BeamIntegration::radau(),
        BeamIntegration::chebyshev(ChebyshevKind::EqualWeight),
        BeamIntegration::chebyshev(ChebyshevKind::Roots),
        BeamIntegration::chebyshev(ChebyshevKind::Extrema),
        BeamIntegration::trapezoidal(),
    ];
    for integration in &families {
        for n in 2..=6 {
            let rule = integration.rule(n, 4.0).unwrap();
            assert_eq!(rule.len(), n);
            assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(rule.xi.iter().all(|x| (0.0..=1.0).contains(x)));
        }
    }
}

#[test]
fn lobatto_includes_member_ends() {
    let xi = BeamIntegration::lobatto().section_locations(4, 3.0).unwrap();
    assert_relative_eq!(xi[0], 0.0);
    assert_relative_eq!(xi[3], 1.0);
    assert!(xi.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn integration_names_parse() {
    let radau = BeamIntegration::from_name("Radau").unwrap();
    assert_eq!(radau, BeamIntegration::radau());
    let hinge = BeamIntegration::from_name("HingeRadau").unwrap();
    assert!(hinge.hinge.is_some());
    let err = BeamIntegration::from_name("Simpson").unwrap_err();
    assert!(matches!(err, FEAError::UnknownIntegration(_)));
}

#[test]
fn user_defined_points_are_kept() {
    init_logging();
    let integration = BeamIntegration::user_defined(vec![0.0, 0.5, 1.0], vec![0.25, 0.5, 0.25]).unwrap();
    assert!(integration.out_of_range_points().is_empty());
    let rule = integration.rule(3, 2.0).unwrap();
    assert_eq!(rule.xi, vec![0.0, 0.5, 1.0]);
    assert_eq!(rule.wt, vec![0.25, 0.5, 0.25]);

    let outside = BeamIntegration::user_defined(vec![-0.1, 0.5, 1.2], vec![0.2, 0.6, 0.2]).unwrap();
    assert_eq!(outside.out_of_range_points(), vec![0, 2]);
    assert!(outside.rule(2, 2.0).is_err());
}

#[test]
fn hinge_rule_covers_element_length() {
    let integration = BeamIntegration::legendre().with_hinge(HingeScheme::Radau, 0.2, 0.3);
    let rule = integration.rule(6, 5.0).unwrap();
    assert_eq!(rule.len(), 6);
    assert_relative_eq!(rule.wt.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(rule.xi[0], 0.0);
    assert!(integration.rule(3, 5.0).is_err());
}

/// Single element with a tip mass. Only the translations carry mass, so the
/// rotation is condensed and `lambda = 3EI / (m L^3)` transversely and
/// `EA / (m L)` axially.
#[test]
fn tip_mass_cantilever() {
    init_logging();
    let (e, a, iz, l, m) = (200.0, 30.0, 4.0, 2.0, 1.0);
    for integration in [BeamIntegration::lobatto(), BeamIntegration::legendre()] {
        let mut domain = Domain::new();
        domain.add_node(Node::new(1, 3, &[0.0, 0.0])).unwrap();
        domain
            .add_node(Node::new(2, 3, &[l, 0.0]).with_mass(&[m, m, 0.0]).unwrap())
            .unwrap();
        domain
            .add_element(ElasticBeamColumn2d::new(1, [1, 2], e, a, iz).with_integration(integration, 3))
            .unwrap();
        for sp in SpConstraint::fix_all(1, &[0, 1, 2]) {
            domain.add_sp_constraint(sp).unwrap();
        }

        let (_, results) = EigenAnalysis::new(EigenOptions::new(2)).analyze(domain).unwrap();
        assert_eq!(results.num_equations, 3);
        assert_relative_eq!(results.eigenvalues()[0], 3.0 * e * iz / (m * l * l * l), max_relative = 1e-8);
        assert_relative_eq!(results.eigenvalues()[1], e * a / (m * l), max_relative = 1e-8);

        // Transverse mode: tip rotation follows the condensed static shape
        let tip = results.mode(1).unwrap().shape(2).unwrap().to_vec();
        assert_relative_eq!(tip[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(tip[1].abs(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(tip[2], 1.5 * tip[1] / l, max_relative = 1e-8);
    }
}

/// Lumped-mass cantilever against the Euler-Bernoulli frequencies
/// `lambda_k = (beta_k L)^4 EI / (m L^4)`
#[test]
fn distributed_mass_cantilever() {
    init_logging();
    let (e, a, iz, rho, l) = (1.0e4, 1.0e-2, 1.0e-5, 1.0, 10.0);
    let num_elements = 10;
    let build = |integration: BeamIntegration, sections: usize| {
        let mut domain = Domain::new();
        for i in 0..=num_elements {
            let x = l * i as f64 / num_elements as f64;
            domain.add_node(Node::new(i + 1, 3, &[x, 0.0])).unwrap();
        }
        for i in 0..num_elements {
            let beam = ElasticBeamColumn2d::new(i + 1, [i + 1, i + 2], e, a, iz)
                .with_rho(rho)
                .with_integration(integration.clone(), sections);
            domain.add_element(beam).unwrap();
        }
        for sp in SpConstraint::fix_all(1, &[0, 1, 2]) {
            domain.add_sp_constraint(sp).unwrap();
        }
        domain
    };

    let scale = e * iz / (rho * l.powi(4));
    let exact = [1.875104_f64.powi(4) * scale, 4.694091_f64.powi(4) * scale];

    let (_, lobatto) = EigenAnalysis::new(EigenOptions::new(2))
        .analyze(build(BeamIntegration::lobatto(), 5))
        .unwrap();
    assert_relative_eq!(lobatto.eigenvalues()[0], exact[0], max_relative = 0.02);
    assert_relative_eq!(lobatto.eigenvalues()[1], exact[1], max_relative = 0.05);

    // Both rules integrate the elastic flexibility exactly
    let options = EigenOptions::new(2).with_handler(HandlerKind::Plain).with_block_size(4);
    let (_, legendre) = EigenAnalysis::new(options)
        .analyze(build(BeamIntegration::legendre(), 2))
        .unwrap();
    for (x, y) in lobatto.eigenvalues().iter().zip(legendre.eigenvalues()) {
        assert_relative_eq!(*x, y, max_relative = 1e-8);
    }
}
