//! The built-in scenario catalog: which topology each scenario builds, and
//! which flows it schedules for a given variant and background load.

use crate::cc::CcVariant;
use crate::plan::{FlowId, FlowKind, FlowSpec, OnOffPattern, TrafficPlan};
use crate::topo::{Blueprint, DiamondSpec, DumbbellSpec, FatTreeSpec, LinkParams, TopoSpec};
use crate::units::{Bytes, Mbps, Millisecs, Nanosecs, Packets, Secs};

const MEASURED_PORT: u16 = 8080;
const SECOND_BULK_PORT: u16 = 8081;
const FAT_TREE_MEASURED_PORT: u16 = 5000;
const UDP_PORT_BASE: u16 = 9000;

const UDP_PACKET: Bytes = Bytes::new(950);
const FAT_TREE_UDP_PACKET: Bytes = Bytes::new(200);

const FAT_TREE_K: usize = 4;
const NR_FAT_TREE_BACKGROUND: usize = 6;
const NR_DUMBBELL_PAIRS: usize = 4;

/// One entry of the parameter grid's scenario axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Scenario {
    /// Two senders through a two-hop star; one measured flow plus constant-
    /// rate cross traffic.
    SingleFlowStar,
    /// Three-path diamond carrying the variant under test beside a second,
    /// Vegas-pinned bulk flow.
    DualFlowDiamond,
    /// Shared-bottleneck dumbbell with constant-rate background load.
    DumbbellCbr,
    /// Shared-bottleneck dumbbell with bursty background load.
    DumbbellBursty,
    /// Fat-tree with relay-stretched endpoints and constant-rate cross
    /// traffic; runs in its own study binary.
    FatTree,
}

impl Scenario {
    /// The congestion-control suite, in declared order.
    pub const SUITE: [Scenario; 4] = [
        Scenario::SingleFlowStar,
        Scenario::DualFlowDiamond,
        Scenario::DumbbellCbr,
        Scenario::DumbbellBursty,
    ];

    /// The row label. The fat-tree study runs in its own binary and reuses
    /// the `Scenario3` label there.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::SingleFlowStar => "Scenario1",
            Scenario::DualFlowDiamond => "Scenario2",
            Scenario::DumbbellCbr => "Scenario3",
            Scenario::DumbbellBursty => "Scenario4",
            Scenario::FatTree => "Scenario3",
        }
    }

    /// The simulated stop time bounding every flow in the run.
    pub fn stop(&self) -> Nanosecs {
        match self {
            Scenario::SingleFlowStar => Secs::new(50).into(),
            Scenario::DualFlowDiamond | Scenario::DumbbellCbr | Scenario::DumbbellBursty => {
                Secs::new(100).into()
            }
            Scenario::FatTree => Secs::new(20).into(),
        }
    }

    pub fn topo(&self) -> TopoSpec {
        let star_link = LinkParams::builder()
            .bandwidth(Mbps::new(10))
            .delay(Millisecs::new(10))
            .build();
        match self {
            Scenario::SingleFlowStar => TopoSpec::Diamond(
                DiamondSpec::builder()
                    .nr_senders(2)
                    .nr_receivers(1)
                    .nr_paths(1)
                    .link(star_link)
                    .build(),
            ),
            Scenario::DualFlowDiamond => TopoSpec::Diamond(
                DiamondSpec::builder()
                    .nr_senders(2)
                    .nr_receivers(2)
                    .nr_paths(3)
                    .link(star_link)
                    .build(),
            ),
            Scenario::DumbbellCbr | Scenario::DumbbellBursty => TopoSpec::Dumbbell(
                DumbbellSpec::builder()
                    .nr_pairs(NR_DUMBBELL_PAIRS)
                    .access(
                        LinkParams::builder()
                            .bandwidth(Mbps::new(100))
                            .delay(Millisecs::new(2))
                            .build(),
                    )
                    .bottleneck(
                        LinkParams::builder()
                            .bandwidth(Mbps::new(10))
                            .delay(Millisecs::new(10))
                            .build(),
                    )
                    .build(),
            ),
            Scenario::FatTree => TopoSpec::FatTree(
                FatTreeSpec::builder()
                    .k(FAT_TREE_K)
                    .link(
                        LinkParams::builder()
                            .bandwidth(Mbps::ONE)
                            .delay(Millisecs::new(2))
                            .queue(Packets::new(5))
                            .build(),
                    )
                    .build(),
            ),
        }
    }

    /// The scenario's flows for one (variant, load) combination. Background
    /// starts are staggered against the measured flow to avoid simultaneous
    /// slow-start artifacts.
    pub fn traffic(&self, bp: &Blueprint, variant: CcVariant, load: Mbps) -> TrafficPlan {
        let stop = self.stop();
        let measured = |id: usize, src, dst, port: u16| {
            FlowSpec::builder()
                .id(FlowId::new(id))
                .kind(FlowKind::Bulk {
                    max_bytes: None,
                    cc: variant,
                })
                .src(src)
                .dst(dst)
                .dst_port(port)
                .start(Secs::ONE)
                .stop(stop)
                .measured(true)
                .build()
        };
        let background = |id: usize, src, dst, port: u16, packet: Bytes, start: Nanosecs| {
            let (on, off) = match self {
                Scenario::DumbbellBursty => (
                    OnOffPattern::Uniform {
                        lo: Millisecs::new(500).into(),
                        hi: Millisecs::new(1500).into(),
                    },
                    OnOffPattern::Uniform {
                        lo: Millisecs::new(500).into(),
                        hi: Millisecs::new(1500).into(),
                    },
                ),
                _ => (
                    OnOffPattern::Constant(Secs::ONE.into()),
                    OnOffPattern::Constant(Nanosecs::ZERO),
                ),
            };
            FlowSpec::builder()
                .id(FlowId::new(id))
                .kind(FlowKind::OnOff {
                    rate: load.into(),
                    packet_size: packet,
                    on,
                    off,
                })
                .src(src)
                .dst(dst)
                .dst_port(port)
                .start(start)
                .stop(stop)
                .build()
        };

        let flows = match self {
            Scenario::SingleFlowStar => vec![
                measured(0, bp.senders[0], bp.receivers[0], MEASURED_PORT),
                background(
                    1,
                    bp.senders[1],
                    bp.receivers[0],
                    UDP_PORT_BASE,
                    UDP_PACKET,
                    Secs::ONE.into(),
                ),
            ],
            Scenario::DualFlowDiamond => {
                // The second bulk flow is pinned to Vegas regardless of the
                // variant under test; only the first flow is reported.
                let mut second = measured(1, bp.senders[1], bp.receivers[1], SECOND_BULK_PORT);
                second.measured = false;
                second.kind = FlowKind::Bulk {
                    max_bytes: None,
                    cc: CcVariant::Vegas,
                };
                vec![
                    measured(0, bp.senders[0], bp.receivers[0], MEASURED_PORT),
                    second,
                    background(
                        2,
                        bp.senders[1],
                        bp.receivers[0],
                        UDP_PORT_BASE,
                        UDP_PACKET,
                        Secs::ONE.into(),
                    ),
                ]
            }
            Scenario::DumbbellCbr | Scenario::DumbbellBursty => {
                let mut flows = vec![measured(0, bp.senders[0], bp.receivers[0], MEASURED_PORT)];
                for i in 1..NR_DUMBBELL_PAIRS {
                    flows.push(background(
                        i,
                        bp.senders[i],
                        bp.receivers[i],
                        UDP_PORT_BASE + i as u16,
                        UDP_PACKET,
                        Secs::ONE.into(),
                    ));
                }
                flows
            }
            Scenario::FatTree => {
                let mut flows = vec![measured(
                    0,
                    bp.senders[0],
                    bp.receivers[0],
                    FAT_TREE_MEASURED_PORT,
                )];
                // Cross traffic from rotating edge groups, skipping the
                // endpoints' own groups. Starts half a second before the
                // measured flow.
                let groups = bp.tier("hosts").chunks(FAT_TREE_K / 2).collect::<Vec<_>>();
                for i in 0..NR_FAT_TREE_BACKGROUND {
                    let group = groups[(i + 1) % groups.len()];
                    flows.push(background(
                        i + 1,
                        group[0],
                        bp.receivers[0],
                        UDP_PORT_BASE + i as u16,
                        FAT_TREE_UDP_PACKET,
                        Millisecs::new(500).into(),
                    ));
                }
                flows
            }
        };
        TrafficPlan::new(flows)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use crate::network::Network;

    use super::*;

    #[test]
    fn suite_labels_are_unique() {
        let labels = Scenario::SUITE.map(|s| s.label());
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn every_scenario_plan_validates() -> anyhow::Result<()> {
        let all = [
            Scenario::SingleFlowStar,
            Scenario::DualFlowDiamond,
            Scenario::DumbbellCbr,
            Scenario::DumbbellBursty,
            Scenario::FatTree,
        ];
        for scenario in all {
            let bp = scenario.topo().build()?;
            let network = Network::new(&bp.nodes, &bp.links)
                .with_context(|| format!("{} topology is invalid", scenario.label()))?;
            let plan = scenario
                .traffic(&bp, CcVariant::Cubic, Mbps::new(5))
                .validate(&network)
                .with_context(|| format!("{} plan is invalid", scenario.label()))?;
            assert_eq!(plan.earliest_measured_start(), Secs::ONE.into());
        }
        Ok(())
    }

    #[test]
    fn measured_ports_are_scenario_specific() -> anyhow::Result<()> {
        for (scenario, port) in [
            (Scenario::SingleFlowStar, MEASURED_PORT),
            (Scenario::FatTree, FAT_TREE_MEASURED_PORT),
        ] {
            let bp = scenario.topo().build()?;
            let network = Network::new(&bp.nodes, &bp.links)?;
            let plan = scenario
                .traffic(&bp, CcVariant::Bbr, Mbps::new(3))
                .validate(&network)?;
            assert_eq!(plan.measured_ports(), vec![port]);
        }
        Ok(())
    }

    #[test]
    fn dual_flow_diamond_reports_only_the_variant_under_test() -> anyhow::Result<()> {
        let scenario = Scenario::DualFlowDiamond;
        let bp = scenario.topo().build()?;
        let plan = scenario.traffic(&bp, CcVariant::Bbr, Mbps::ONE);
        let network = Network::new(&bp.nodes, &bp.links)?;
        let plan = plan.validate(&network)?;
        assert_eq!(plan.measured_ports(), vec![MEASURED_PORT]);
        let vegas_flows = plan
            .flows()
            .iter()
            .filter(|f| matches!(f.kind, FlowKind::Bulk { cc: CcVariant::Vegas, .. }))
            .count();
        assert_eq!(vegas_flows, 1);
        Ok(())
    }

    #[test]
    fn fat_tree_background_avoids_the_measured_path_endpoints() -> anyhow::Result<()> {
        let scenario = Scenario::FatTree;
        let bp = scenario.topo().build()?;
        let plan = scenario.traffic(&bp, CcVariant::Bbr, Mbps::new(3));
        let network = Network::new(&bp.nodes, &bp.links)?;
        let plan = plan.validate(&network)?;
        for flow in plan.flows().iter().filter(|f| !f.measured) {
            assert_ne!(flow.src, bp.senders[0]);
            assert_ne!(flow.src, bp.receivers[0]);
            // Background flows start half a second before the measured flow.
            assert_eq!(flow.start, Millisecs::new(500).into());
        }
        Ok(())
    }
}
