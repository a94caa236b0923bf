//! Helpers shared by the command-line tools: loading problem files into
//! the partitioner's models and parsing algorithm specifications.

use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context as _, Result};
use itertools::Itertools as _;

use scission::algorithms::fm::{FmConfig, StopInner, StopOuter, TieBreak};
use scission::algorithms::iterators::VertexOrder;
use scission::algorithms::vn_best::VnBestConfig;
use scission::algorithms::vn_first::VnFirstConfig;
use scission::multilevel::{
    CoarsenConfig, EdgeWeighting, Forbid, Matcher, Order, WeightRestriction,
};
use scission::runner::{
    Comparison, Condition, CountReference, Expr, InitialAlgo, Phase, RefineAlgo, SeedPhase,
};
use scission::{Geometry, Graph, ModelSet, Weights};

/// Reads a graph file into a model set; the format is picked from the
/// extension (`.grf` or `.mtx`).
pub fn read_graph(path: &Path) -> Result<ModelSet> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = io::BufReader::new(file);
    match path.extension().and_then(|e| e.to_str()) {
        Some("grf") => {
            let graph = topo_io::grf::read(reader).context("failed to read grf file")?;
            let topology = Graph::from_edges(graph.vertex_count, graph.edges)?;
            let vertex_weights = graph.vertex_weights.map(Weights::from_rows).transpose()?;
            let edge_weights = graph
                .edge_weights
                .map(|weights| Weights::from_rows(weights.into_iter().map(|w| vec![w]).collect()))
                .transpose()?;
            Ok(ModelSet::new(topology, vertex_weights, edge_weights, None)?)
        }
        Some("mtx") => {
            let graph = topo_io::matrix_market::read(reader).context("failed to read mtx file")?;
            let topology = Graph::from_edges(graph.vertex_count, graph.edges)?;
            Ok(ModelSet::new(topology, None, None, None)?)
        }
        other => bail!("unknown graph format {other:?}"),
    }
}

/// Reads a partition file; `.map` files carry labels, anything else is
/// read as a MeTiS-style part list.
pub fn read_partition(path: &Path) -> Result<Vec<usize>> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = io::BufReader::new(file);
    let parts = match path.extension().and_then(|e| e.to_str()) {
        Some("map") => topo_io::partition::read_map(reader)?,
        _ => topo_io::partition::read_metis(reader)?,
    };
    Ok(parts)
}

/// Builds the dual graph of a mesh: cells of the highest dimension are
/// vertices, and two cells sharing a face (an edge in 2D) are neighbors.
/// Cell barycenters are carried as geometry.
pub fn dual(mesh: &topo_io::medit::Mesh) -> Result<ModelSet> {
    let Some(cell_dimension) = mesh
        .elements
        .iter()
        .map(|(element_type, _, _)| element_type.dimension())
        .max()
    else {
        bail!("the mesh holds no element");
    };
    // A face in 3D is at least 3 shared vertices, an edge in 2D exactly 2.
    let shares_interface = |shared: usize| match cell_dimension - 1 {
        0 => shared == 1,
        1 => shared == 2,
        _ => shared > 2,
    };

    let cells: Vec<&[usize]> = mesh
        .elements
        .iter()
        .filter(|(element_type, _, _)| element_type.dimension() == cell_dimension)
        .flat_map(|(element_type, nodes, _)| nodes.chunks(element_type.node_count()))
        .collect();

    // For every mesh vertex, the cells it belongs to.
    let mut cells_of_vertex = vec![Vec::new(); mesh.coordinates.len()];
    for (cell, nodes) in cells.iter().enumerate() {
        for &node in *nodes {
            cells_of_vertex
                .get_mut(node)
                .with_context(|| format!("cell vertex {node} out of range"))?
                .push(cell);
        }
    }

    let mut edges = Vec::new();
    for (cell, nodes) in cells.iter().enumerate() {
        let touching = nodes
            .iter()
            .flat_map(|&node| cells_of_vertex[node].iter().copied())
            .filter(|&other| other > cell)
            .counts();
        for (other, shared) in touching.into_iter().sorted() {
            if shares_interface(shared) {
                edges.push([cell, other]);
            }
        }
    }

    let geometry = Geometry {
        dimension: mesh.dimension,
        coordinates: cells
            .iter()
            .map(|nodes| {
                let mut barycenter = vec![0.0; mesh.dimension];
                for &node in *nodes {
                    for (sum, coordinate) in barycenter.iter_mut().zip(&mesh.coordinates[node]) {
                        *sum += coordinate;
                    }
                }
                for sum in &mut barycenter {
                    *sum /= nodes.len() as f64;
                }
                barycenter
            })
            .collect(),
    };
    let topology = Graph::from_edges(cells.len(), edges)?;
    Ok(ModelSet::new(topology, None, None, Some(geometry))?)
}

/// A parsed `name,key=value,...` specification.
struct Spec<'a> {
    name: &'a str,
    arguments: Vec<(&'a str, &'a str)>,
}

impl<'a> Spec<'a> {
    fn new(spec: &'a str) -> Result<Spec<'a>> {
        let mut words = spec.split(',');
        let name = words.next().unwrap_or_default();
        let mut arguments = Vec::new();
        for word in words {
            let (key, value) = word
                .split_once('=')
                .with_context(|| format!("argument {word:?} is not of the form key=value"))?;
            arguments.push((key, value));
        }
        Ok(Spec { name, arguments })
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.arguments
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid value {value:?} for {key:?}"))
            })
            .transpose()
    }

    fn require<T: FromStr>(&self, key: &str) -> Result<T> {
        self.parse(key)?
            .with_context(|| format!("missing argument {key:?}"))
    }

    /// Every value given for `key`, in order.
    fn all<T: FromStr>(&self, key: &str) -> Result<Vec<T>> {
        self.arguments
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, value)| {
                value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid value {value:?} for {key:?}"))
            })
            .collect()
    }
}

/// Parses an algorithm specification of the form `name,key=value,...`
/// into a runner phase.
///
/// Supported names: `random`, `all-in-one`, `fm`, `vn-first`, `vn-best`,
/// `coarsen`, `coarsen-until`, `prolong`, `seed`, `pass`.
pub fn parse_algorithm(spec: &str) -> Result<Phase> {
    let spec = Spec::new(spec)?;
    let phase = match spec.name {
        "random" => Phase::Initial {
            part_count: spec.require("parts")?,
            algo: InitialAlgo::Random,
        },
        "all-in-one" => Phase::Initial {
            part_count: spec.require("parts")?,
            algo: InitialAlgo::AllInOne {
                part: spec.parse("part")?.unwrap_or(0),
            },
        },
        "fm" => {
            let defaults = FmConfig::default();
            let tolerances: Vec<f64> = spec.all("tol")?;
            let tie_break = match spec.get("ties") {
                None => defaults.tie_break,
                Some("first") => TieBreak::First,
                Some("last") => TieBreak::Last,
                Some("random") => TieBreak::Random,
                Some(other) => bail!("unknown tie break {other:?}"),
            };
            let stop_inner = if let Some(max) = spec.parse("neg")? {
                StopInner::NegativeMoves(max)
            } else if let Some(max) = spec.parse("cneg")? {
                StopInner::ConsecutiveNegativeMoves(max)
            } else {
                defaults.stop_inner
            };
            let stop_outer = match spec.parse("passes")? {
                Some(max) => StopOuter::Passes(max),
                None => defaults.stop_outer,
            };
            Phase::Refine(RefineAlgo::Fm(FmConfig {
                tolerances: if tolerances.is_empty() {
                    defaults.tolerances
                } else {
                    tolerances
                },
                targets: None,
                tie_break,
                stop_inner,
                stop_outer,
                criterion: spec.parse("crit")?.unwrap_or(0),
            }))
        }
        "vn-first" => Phase::Refine(RefineAlgo::VnFirst(VnFirstConfig {
            order: match spec.get("order") {
                None | Some("cycle") => VertexOrder::Cycle,
                Some("random") => VertexOrder::Random,
                Some(other) => bail!("unknown vertex order {other:?}"),
            },
            stop_after: spec.parse("stop-after")?,
            targets: None,
        })),
        "vn-best" => Phase::Refine(RefineAlgo::VnBest(VnBestConfig { targets: None })),
        "coarsen" => Phase::Coarsen(parse_coarsen(&spec)?),
        "coarsen-until" => Phase::CoarsenUntil {
            config: parse_coarsen(&spec)?,
            conditions: vec![Condition::NodeCount {
                cmp: Comparison::LessEqual,
                factor: spec.require("threshold")?,
                reference: CountReference::Fixed,
            }],
            expr: Some(Expr::Cond(0)),
        },
        "prolong" => Phase::Prolong,
        "seed" => Phase::SetRandomSeed(match spec.get("value") {
            None => SeedPhase::Fixed(1),
            Some("random") => SeedPhase::FreshRandom,
            Some("increasing") => SeedPhase::Increasing,
            Some(value) => SeedPhase::Fixed(
                value
                    .parse()
                    .with_context(|| format!("invalid seed {value:?}"))?,
            ),
        }),
        "pass" => Phase::Pass,
        other => bail!("unknown algorithm {other:?}"),
    };
    Ok(phase)
}

fn parse_coarsen(spec: &Spec<'_>) -> Result<CoarsenConfig> {
    let matcher = match spec.get("matcher") {
        None | Some("hem") => Matcher::HeavyEdge(EdgeWeighting::Original),
        Some("hem-unit") => Matcher::HeavyEdge(EdgeWeighting::Unit),
        Some("first") => Matcher::First,
        Some("random") => Matcher::Random,
        Some(other) => bail!("unknown matcher {other:?}"),
    };
    let order = match spec.get("order") {
        None | Some("identity") => Order::Identity,
        Some("random") => Order::Random,
        Some(other) => bail!("unknown order {other:?}"),
    };
    let restrictions = match spec.parse("wmax")? {
        None => Vec::new(),
        Some(threshold) => {
            let forbid = match spec.get("forbid") {
                None | Some("above-any") => Forbid::AboveAny,
                Some("above-all") => Forbid::AboveAll,
                Some("under-any") => Forbid::UnderAny,
                Some("under-all") => Forbid::UnderAll,
                Some(other) => bail!("unknown restriction flavor {other:?}"),
            };
            vec![WeightRestriction { threshold, forbid }]
        }
    };
    Ok(CoarsenConfig {
        matcher,
        order,
        restrictions,
    })
}
