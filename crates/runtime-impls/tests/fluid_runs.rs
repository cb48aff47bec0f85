use congrid_core::cc::CcVariant;
use congrid_core::run::{run_grid, run_once};
use congrid_core::scenario::Scenario;
use congrid_core::stats::{MetricsRow, SENTINEL};
use congrid_core::units::Mbps;
use runtime_impls::FluidRuntime;

fn fresh_runtime() -> FluidRuntime {
    FluidRuntime::builder().seed(0).build()
}

fn row_is_sane(row: &MetricsRow) {
    assert!(row.throughput_mbps >= 0.0);
    assert!(row.avg_rtt_ms > 0.0 || row.avg_rtt_ms == SENTINEL);
    assert!(
        (0.0..=1.0).contains(&row.drop_rate) || row.drop_rate == SENTINEL,
        "drop rate out of range: {}",
        row.drop_rate
    );
}

#[test]
fn suite_emits_one_row_per_combination() -> anyhow::Result<()> {
    let variants = [CcVariant::Vegas, CcVariant::Bbr];
    let loads = [Mbps::new(1), Mbps::new(5), Mbps::new(10)];
    let mut rows = Vec::new();
    run_grid(&Scenario::SUITE, &variants, &loads, fresh_runtime, |row| {
        rows.push(row);
        Ok(())
    })?;
    assert_eq!(rows.len(), Scenario::SUITE.len() * variants.len() * loads.len());
    for row in &rows {
        row_is_sane(row);
    }
    Ok(())
}

#[test]
fn fat_tree_run_matches_the_study_contract() -> anyhow::Result<()> {
    // Fat-tree(k=4), BBR, 3 Mbps background, 20-second window with 1 second
    // of warm-up.
    let rows = run_once(
        Scenario::FatTree,
        CcVariant::Bbr,
        Mbps::new(3),
        fresh_runtime(),
    )?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.scenario, "Scenario3");
    assert_eq!(row.variant, "TcpBbr");
    row_is_sane(row);
    // The measured path is made of 1 Mbps links; sustained throughput cannot
    // exceed the bottleneck.
    assert!(row.throughput_mbps <= 1.0 + 1e-9, "throughput was {}", row.throughput_mbps);
    Ok(())
}

#[test]
fn dumbbell_drop_rate_grows_with_background_load() -> anyhow::Result<()> {
    // Qualitative monotonicity across the load sweep: the average drop rate
    // over the upper half of the grid must not fall below the lower half.
    let mut drops = Vec::new();
    for rate in 1..=10 {
        let rows = run_once(
            Scenario::DumbbellCbr,
            CcVariant::Cubic,
            Mbps::new(rate),
            fresh_runtime(),
        )?;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].drop_rate >= 0.0);
        drops.push(rows[0].drop_rate);
    }
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    assert!(
        mean(&drops[5..]) >= mean(&drops[..5]),
        "drop rates were {drops:?}"
    );
    Ok(())
}

#[test]
fn throughput_falls_as_background_load_grows() -> anyhow::Result<()> {
    let at = |rate| -> anyhow::Result<f64> {
        let rows = run_once(
            Scenario::SingleFlowStar,
            CcVariant::Cubic,
            Mbps::new(rate),
            fresh_runtime(),
        )?;
        Ok(rows[0].throughput_mbps)
    };
    assert!(at(1)? > at(9)?);
    Ok(())
}

#[test]
fn repeated_combinations_are_isolated() -> anyhow::Result<()> {
    // Two sequential runs of the same combination must produce identical
    // rows; nothing may leak from one run into the next.
    for scenario in [Scenario::DualFlowDiamond, Scenario::DumbbellBursty] {
        let first = run_once(scenario, CcVariant::WestwoodPlus, Mbps::new(4), fresh_runtime())?;
        let second = run_once(scenario, CcVariant::WestwoodPlus, Mbps::new(4), fresh_runtime())?;
        assert_eq!(first, second);
    }
    Ok(())
}

#[test]
fn dual_flow_diamond_reports_a_single_row() -> anyhow::Result<()> {
    // The Vegas-pinned companion flow and the background flow must not leak
    // into the report.
    let rows = run_once(
        Scenario::DualFlowDiamond,
        CcVariant::Cubic,
        Mbps::new(5),
        fresh_runtime(),
    )?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].variant, "TcpCubic");
    Ok(())
}
