//! Benchmarks for the eigen solver

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fea_eigen::prelude::*;

fn create_spring_chain(n: usize) -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(0, 1, &[0.0])).unwrap();
    for i in 1..=n {
        domain
            .add_node(Node::new(i, 1, &[i as f64]).with_mass(&[1.0]).unwrap())
            .unwrap();
        domain.add_element(Spring::new(i, [i - 1, i], 1, 0, 1000.0)).unwrap();
    }
    domain.add_sp_constraint(SpConstraint::fixed(0, 0)).unwrap();
    domain
}

fn create_multi_story_frame(stories: usize, bays: usize) -> Domain {
    let mut domain = Domain::new();
    let story_height = 3.5;
    let bay_width = 6.0;
    let e = 30e9;
    let (col_a, col_i) = (0.16, 0.4_f64.powi(4) / 12.0);
    let (beam_a, beam_i) = (0.18, 0.3 * 0.6 * 0.6 * 0.6 / 12.0);
    let rho = 2500.0;

    let tag = |story: usize, bay: usize| story * (bays + 1) + bay + 1;

    for story in 0..=stories {
        for bay in 0..=bays {
            let x = bay as f64 * bay_width;
            let y = story as f64 * story_height;
            domain.add_node(Node::new(tag(story, bay), 3, &[x, y])).unwrap();
        }
    }

    let mut element = 0;
    for story in 0..stories {
        for bay in 0..=bays {
            element += 1;
            let column = ElasticBeamColumn2d::new(element, [tag(story, bay), tag(story + 1, bay)], e, col_a, col_i)
                .with_rho(rho * col_a);
            domain.add_element(column).unwrap();
        }
    }
    for story in 1..=stories {
        for bay in 0..bays {
            element += 1;
            let beam = ElasticBeamColumn2d::new(element, [tag(story, bay), tag(story, bay + 1)], e, beam_a, beam_i)
                .with_rho(rho * beam_a);
            domain.add_element(beam).unwrap();
        }
    }

    for bay in 0..=bays {
        for sp in SpConstraint::fix_all(tag(0, bay), &[0, 1, 2]) {
            domain.add_sp_constraint(sp).unwrap();
        }
    }
    domain
}

fn benchmark_spring_chain(c: &mut Criterion) {
    c.bench_function("spring_chain_200_10modes", |b| {
        b.iter(|| {
            let analysis = EigenAnalysis::new(EigenOptions::new(10));
            let results = analysis.analyze(create_spring_chain(200)).unwrap();
            black_box(&results);
        })
    });
}

fn benchmark_small_frame(c: &mut Criterion) {
    c.bench_function("frame_3story_2bay_3modes", |b| {
        b.iter(|| {
            let analysis = EigenAnalysis::new(EigenOptions::new(3));
            let results = analysis.analyze(create_multi_story_frame(3, 2)).unwrap();
            black_box(&results);
        })
    });
}

fn benchmark_medium_frame(c: &mut Criterion) {
    c.bench_function("frame_10story_5bay_6modes", |b| {
        b.iter(|| {
            let analysis = EigenAnalysis::new(EigenOptions::new(6));
            let results = analysis.analyze(create_multi_story_frame(10, 5)).unwrap();
            black_box(&results);
        })
    });
}

fn benchmark_natural_ordering(c: &mut Criterion) {
    c.bench_function("frame_10story_5bay_natural_ordering", |b| {
        b.iter(|| {
            let options = EigenOptions::new(6).with_ordering(Ordering::Natural);
            let results = EigenAnalysis::new(options)
                .analyze(create_multi_story_frame(10, 5))
                .unwrap();
            black_box(&results);
        })
    });
}

criterion_group!(
    benches,
    benchmark_spring_chain,
    benchmark_small_frame,
    benchmark_medium_frame,
    benchmark_natural_ordering,
);

criterion_main!(benches);
