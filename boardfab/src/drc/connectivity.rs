//! Net connectivity: which pads of a net are joined by copper.
//!
//! Copper items of the same net that share a layer and touch are merged
//! with a union-find. Pads that end up in different clusters are missing
//! connections; the shortest set of links joining all clusters of a net is
//! found with a minimum spanning tree, like the air wires of a layout editor.

use petgraph::algo::min_spanning_tree;
use petgraph::data::Element;
use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use uuid::Uuid;

use super::items::CopperItem;
use super::message::{ApprovalKey, ItemRef, RuleCheckMessage, Severity};
use super::rules::Rule;
use super::{DrcError, DrcOptions, MessageSink, RuleContext};
use crate::board::Board;
use crate::geometry::{Path, Point};

/// Shortest link between two pad clusters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Link {
    distance: f64,
    from: usize,
    to: usize,
}

/// A connection a net needs but the copper does not provide.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingConnection {
    pub net: Uuid,
    pub from: ItemRef,
    pub to: ItemRef,
    pub from_position: Point,
    pub to_position: Point,
}

fn pad_position(board: &Board, item: &ItemRef) -> Option<Point> {
    let ItemRef::Pad { device, pad } = item else {
        return None;
    };
    let device = board.device(device)?;
    let pad = device.pad(pad)?;
    Some(device.pad_transform(pad).map(Point::origin()))
}

/// Clusters of copper item indices per connected piece of copper.
fn clusters(items: &[CopperItem], members: &[usize]) -> UnionFind<usize> {
    let mut union = UnionFind::new(items.len());
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            let (ia, ib) = (&items[a], &items[b]);
            if ia.shares_layer_with(ib)
                && ia.shape.clearance_lower_bound(&ib.shape) <= 0.0
                && ia.shape.overlaps(&ib.shape)
            {
                union.union(a, b);
            }
        }
    }
    union
}

/// Find the connections missing in every net of the board, ordered by net
/// and then by the spanning tree's edge order.
pub fn missing_connections(board: &Board, items: &[CopperItem]) -> Vec<MissingConnection> {
    let mut nets: Vec<Uuid> = Vec::new();
    for item in items {
        if let (ItemRef::Pad { .. }, Some(net)) = (&item.item, item.net) {
            if !nets.contains(&net) {
                nets.push(net);
            }
        }
    }

    let mut missing = Vec::new();
    for net in nets {
        let members: Vec<usize> = (0..items.len())
            .filter(|&i| items[i].net == Some(net))
            .collect();
        let union = clusters(items, &members);

        // pads grouped by cluster, in item order
        let mut groups: Vec<(usize, Vec<(ItemRef, Point)>)> = Vec::new();
        for &i in &members {
            let Some(position) = pad_position(board, &items[i].item) else {
                continue;
            };
            let root = union.find(i);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, pads)) => pads.push((items[i].item, position)),
                None => groups.push((root, vec![(items[i].item, position)])),
            }
        }
        if groups.len() < 2 {
            continue;
        }
        tracing::debug!("net {} has {} unconnected pad groups", net, groups.len());

        let mut graph = UnGraph::<usize, Link>::with_capacity(groups.len(), 0);
        let nodes: Vec<_> = (0..groups.len()).map(|g| graph.add_node(g)).collect();
        for a in 0..groups.len() {
            for b in a + 1..groups.len() {
                let mut best: Option<Link> = None;
                for (i, (_, pa)) in groups[a].1.iter().enumerate() {
                    for (j, (_, pb)) in groups[b].1.iter().enumerate() {
                        let link = Link {
                            distance: pa.distance_to(*pb),
                            from: i,
                            to: j,
                        };
                        if best.map_or(true, |l| link.distance < l.distance) {
                            best = Some(link);
                        }
                    }
                }
                if let Some(link) = best {
                    graph.add_edge(nodes[a], nodes[b], link);
                }
            }
        }

        for element in min_spanning_tree(&graph) {
            if let Element::Edge {
                source,
                target,
                weight,
                ..
            } = element
            {
                let (from, from_position) = groups[source].1[weight.from];
                let (to, to_position) = groups[target].1[weight.to];
                missing.push(MissingConnection {
                    net,
                    from,
                    to,
                    from_position,
                    to_position,
                });
            }
        }
    }
    missing
}

pub struct MissingConnectionRule;

impl Rule for MissingConnectionRule {
    fn id(&self) -> &'static str {
        "missing_connection"
    }

    fn name(&self) -> &str {
        "Checking for missing connections..."
    }

    fn enabled(&self, options: &DrcOptions) -> bool {
        options.check_missing_connections
    }

    fn check(&self, ctx: &RuleContext<'_>, sink: &mut MessageSink<'_>) -> Result<(), DrcError> {
        let label = |item: &ItemRef| {
            ctx.copper
                .iter()
                .find(|c| c.item == *item)
                .map(|c| c.label.clone())
                .unwrap_or_default()
        };

        for connection in missing_connections(ctx.board, &ctx.copper) {
            sink.emit(RuleCheckMessage::new(
                Severity::Error,
                format!(
                    "Missing connection in net '{}': {} to {}",
                    ctx.board.net_name(Some(&connection.net)),
                    label(&connection.from),
                    label(&connection.to)
                ),
                "The pads belong to the same net but are not connected by copper.",
                ApprovalKey::new(self.id())
                    .item(connection.from)
                    .item(connection.to),
                vec![Path::line(connection.from_position, connection.to_position)],
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Device, Layer, Net, Pad, Trace};
    use crate::drc::items::copper_items;
    use crate::geometry::{Angle, Length, PositiveLength};

    fn board_with_pads(positions: &[f64]) -> (Board, Uuid) {
        let mut board = Board::new("test");
        let net = Uuid::new_v4();
        board.nets.push(Net {
            uuid: net,
            name: "SIG".to_string(),
        });
        for (i, x) in positions.iter().enumerate() {
            let mut pad =
                Pad::smt("1", Point::origin(), Length::from_mm(1.0), Length::from_mm(1.0)).unwrap();
            pad.net = Some(net);
            board.devices.push(Device {
                uuid: Uuid::new_v4(),
                name: format!("R{}", i + 1),
                value: String::new(),
                device_name: String::new(),
                package_name: String::new(),
                position: Point::from_mm(*x, 0.0),
                rotation: Angle::deg0(),
                mirrored: false,
                assembly_type: Default::default(),
                pads: vec![pad],
                holes: vec![],
                courtyard: vec![],
            });
        }
        (board, net)
    }

    fn connect(board: &mut Board, net: Uuid, from: f64, to: f64) {
        board.traces.push(Trace {
            uuid: Uuid::new_v4(),
            net: Some(net),
            layer: Layer::TopCopper,
            start: Point::from_mm(from, 0.0),
            end: Point::from_mm(to, 0.0),
            width: PositiveLength::from_mm(0.2).unwrap(),
            start_anchor: None,
            end_anchor: None,
        });
    }

    #[test]
    fn test_spanning_tree_of_unconnected_pads() {
        let (board, _) = board_with_pads(&[0.0, 10.0, 3.0]);
        let items = copper_items(&board).unwrap();
        let missing = missing_connections(&board, &items);
        assert_eq!(missing.len(), 2);
        // R1-R3 (3mm) and R3-R2 (7mm), never the 10mm link
        let mut lengths: Vec<f64> = missing
            .iter()
            .map(|m| m.from_position.distance_to(m.to_position).round())
            .collect();
        lengths.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(lengths, vec![3_000_000.0, 7_000_000.0]);
    }

    #[test]
    fn test_traces_join_pads() {
        let (mut board, net) = board_with_pads(&[0.0, 10.0, 20.0]);
        connect(&mut board, net, 0.0, 10.0);
        let items = copper_items(&board).unwrap();
        let missing = missing_connections(&board, &items);
        assert_eq!(missing.len(), 1);
        let mut ends = [missing[0].from_position, missing[0].to_position];
        ends.sort_by_key(|p| p.x);
        assert_eq!(ends, [Point::from_mm(10.0, 0.0), Point::from_mm(20.0, 0.0)]);

        connect(&mut board, net, 10.0, 20.0);
        let items = copper_items(&board).unwrap();
        assert!(missing_connections(&board, &items).is_empty());
    }

    #[test]
    fn test_copper_on_other_layer_does_not_join() {
        let (mut board, net) = board_with_pads(&[0.0, 10.0]);
        connect(&mut board, net, 0.0, 10.0);
        board.traces[0].layer = Layer::BottomCopper;
        let items = copper_items(&board).unwrap();
        assert_eq!(missing_connections(&board, &items).len(), 1);
    }
}
