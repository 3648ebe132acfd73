use std::collections::BTreeMap;

use braincell::prelude::*;
use StorageOption::*;

fn simulate(
    storage_options: impl IntoIterator<Item = StorageOption>,
    location: &std::path::Path,
) -> Result<SimulationResult<SingleCompartment>, Box<dyn std::error::Error>> {
    let network = Network::new(vec![SingleCompartment::hodgkin_huxley()?; 3], 0.025)?;
    let mut settings = Settings::new(FixedStepsize::from_save_interval(0.0, 0.025, 20.0, 1.0)?);
    settings.storage = StorageBuilder::new()
        .location(location)
        .priority(storage_options)
        .add_date(false);
    Ok(run_simulation(network, |_, i| 4.0 * i as f64, &settings)?)
}

fn histories(
    result: &SimulationResult<SingleCompartment>,
) -> Result<Vec<BTreeMap<u64, NeuronRecord>>, StorageError> {
    (0..3).map(|i| result.trace(i)).collect()
}

fn assert_same_records(
    left: &[BTreeMap<u64, NeuronRecord>],
    right: &[BTreeMap<u64, NeuronRecord>],
) {
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right.iter()) {
        assert_eq!(l.keys().collect::<Vec<_>>(), r.keys().collect::<Vec<_>>());
        for (a, b) in l.values().zip(r.values()) {
            approx::assert_relative_eq!(a.time, b.time, max_relative = 1e-14);
            approx::assert_relative_eq!(a.potential, b.potential, max_relative = 1e-14);
            assert_eq!(a.external_current, b.external_current);
        }
    }
}

#[test]
fn file_storage_matches_memory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let reference = histories(&simulate([Memory], dir.path())?)?;
    assert_eq!(reference[0].len(), 21);
    approx::assert_relative_eq!(reference[0][&40].time, 1.0, max_relative = 1e-12);

    for option in [SerdeJson, Ron] {
        let result = simulate([option], dir.path())?;
        assert_same_records(&histories(&result)?, &reference);
    }
    assert!(dir.path().join("json").is_dir());
    assert!(dir.path().join("ron").is_dir());
    Ok(())
}

#[test]
fn stored_records_can_be_reopened() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let result = simulate([Ron, SerdeJson], dir.path())?;
    let expected = histories(&result)?;

    let builder = result.storage.extract_builder();
    for option in [SerdeJson, Ron] {
        let manager = StorageManager::<usize, NeuronRecord>::open_or_create(
            builder.clone().priority([option]),
            1,
        )?;
        let iterations = manager.get_all_iterations()?;
        assert_eq!(iterations.len(), 21);
        assert_eq!(iterations.last(), Some(&800));
        let loaded = (0..3)
            .map(|i| manager.load_element_history(&i))
            .collect::<Result<Vec<_>, _>>()?;
        assert_same_records(&loaded, &expected);

        // External currents follow the stimulus
        let last = manager.load_all_elements_at_iteration(800)?;
        for (neuron, record) in last {
            assert_eq!(record.external_current, 4.0 * neuron as f64);
        }
    }
    Ok(())
}
