use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use braincell::prelude::*;
use nalgebra::DVector;

fn single_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("HodgkinHuxley-SingleStep");
    let mut neuron = SingleCompartment::hodgkin_huxley().unwrap();
    neuron.set_external_current(10.0);
    let state = neuron.get_state();
    for solver in Solver::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(solver), &solver, |b, solver| {
            b.iter(|| {
                solver
                    .integrate::<_, DVector<f64>>(&neuron, 0.0, 0.01, &state)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn dendrite(n_compartments: usize) -> MultiCompartment<ChannelModel, IonModel> {
    let hh = Membrane::new(
        vec![
            SodiumFixed::with_reversal(50.0).into(),
            PotassiumFixed::with_reversal(-77.0).into(),
        ],
        vec![
            NaHH1952::default().into(),
            KHH1952::default().into(),
            Leak {
                g_max: 0.3,
                reversal: -54.387,
            }
            .into(),
        ],
    )
    .unwrap();
    let passive = Membrane::new(vec![], vec![Leak::default().into()]).unwrap();
    let mut morphology = Morphology::new();
    morphology
        .add_section("soma", Section::new(20.0, 20.0, 1))
        .unwrap();
    morphology
        .add_section("dend", Section::new(500.0, 2.0, n_compartments))
        .unwrap();
    morphology.connect("dend", "soma", 1.0).unwrap();
    let membranes = std::collections::BTreeMap::from([
        ("soma".to_owned(), hh),
        ("dend".to_owned(), passive),
    ]);
    MultiCompartment::new(&morphology, &membranes).unwrap()
}

fn multi_compartment(c: &mut Criterion) {
    let mut group = c.benchmark_group("MultiCompartment-100Steps");
    group.sample_size(20);
    for n_compartments in [4, 16, 64] {
        for solver in [Solver::Rk4, Solver::IndExpEuler, Solver::ExpEuler] {
            let cell = dendrite(n_compartments);
            group.bench_function(format!("{solver} {n_compartments} Compartments"), |b| {
                b.iter_batched(
                    || cell.clone(),
                    |mut cell| {
                        for i in 0..100 {
                            solver
                                .step::<_, DVector<f64>>(&mut cell, i as f64 * 0.01, 0.01)
                                .unwrap();
                        }
                        cell
                    },
                    criterion::BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn network(c: &mut Criterion) {
    let mut group = c.benchmark_group("Network-Step");
    group.measurement_time(std::time::Duration::from_secs_f64(10.));
    for n_neurons in [10, 100, 1000] {
        let mut network =
            Network::new(vec![SingleCompartment::hodgkin_huxley().unwrap(); n_neurons], 0.025)
                .unwrap();
        network
            .add_projection(
                Projection::fixed_probability(
                    n_neurons,
                    n_neurons,
                    (10.0 / n_neurons as f64).min(1.0),
                    0.05,
                    1.0,
                    Synapse::Conductance {
                        tau: 5.0,
                        e_rev: 0.0,
                    },
                    1,
                )
                .unwrap(),
            )
            .unwrap();
        group.bench_function(format!("{n_neurons} Neurons"), |b| {
            b.iter(|| {
                network
                    .step::<DVector<f64>, _>(Solver::IndExpEuler, 0.0, &|_: f64, _: usize| 8.0)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, single_step, multi_compartment, network);
criterion_main!(benches);
