//! The Scotch `.grf` graph format.
//!
//! Layout of a file:
//!
//! ```text
//! 0                          version
//! nbr_n 2*nbr_e              counts; edges appear in both directions
//! base fmt                   fmt = "ijk": labels, edge weights, vertex weights
//! [nbr_c]                    only when the vertex-weight flag is 2
//! one line per vertex: [label] [weights] degree [[ewgt] ngbr]...
//! ```

use std::io::{BufRead, Write};

use crate::{Error, Result};

/// A graph read from or written to a `.grf` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub vertex_count: usize,
    /// Each edge once, with `edge[0] < edge[1]`.
    pub edges: Vec<[usize; 2]>,
    /// One row of `criterion_count` weights per vertex, when the file
    /// carries vertex weights.
    pub vertex_weights: Option<Vec<Vec<i64>>>,
    /// One weight per edge, when the file carries edge weights.
    pub edge_weights: Option<Vec<i64>>,
}

pub fn read<R: BufRead>(reader: R) -> Result<Graph> {
    let mut lines = reader.lines();
    let mut next_line = move || -> Result<String> {
        for line in lines.by_ref() {
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
        Err(Error::parse("unexpected end of file"))
    };

    let version: i64 = parse_token(next_line()?.trim())?;
    if version != 0 {
        return Err(Error::UnsupportedFormat(format!(
            "grf version {version}, expected 0",
        )));
    }
    let header = integers(&next_line()?)?;
    let [vertex_count, double_edge_count] = header[..] else {
        return Err(Error::parse("expected 'nbr_n 2*nbr_e' on the second line"));
    };
    let vertex_count = usize::try_from(vertex_count)
        .map_err(|_| Error::parse("negative vertex count"))?;
    let edge_count = usize::try_from(double_edge_count)
        .map_err(|_| Error::parse("negative edge count"))?
        / 2;

    let options_line = next_line()?;
    let mut options = options_line.split_whitespace();
    let base: i64 = parse_token(options.next().unwrap_or_default())?;
    let fmt = options
        .next()
        .ok_or_else(|| Error::parse("missing format word"))?;
    let digits: Vec<u32> = fmt.chars().filter_map(|c| c.to_digit(10)).collect();
    let [labels, has_edge_weights, vertex_weight_flag] = digits[..] else {
        return Err(Error::UnsupportedFormat(format!("format word {fmt:?}")));
    };
    if labels > 1 || has_edge_weights > 1 || vertex_weight_flag > 2 {
        return Err(Error::UnsupportedFormat(format!("format word {fmt:?}")));
    }
    let criterion_count = match vertex_weight_flag {
        0 => 0,
        1 => 1,
        _ => usize::try_from(parse_token::<i64>(next_line()?.trim())?)
            .map_err(|_| Error::parse("negative criterion count"))?,
    };

    let mut vertex_weights = (vertex_weight_flag > 0)
        .then(|| vec![Vec::new(); vertex_count]);
    let mut edge_weights = (has_edge_weights > 0).then(Vec::new);
    let mut edges = Vec::with_capacity(edge_count);

    let to_vertex = |token: i64| -> Result<usize> {
        usize::try_from(token - base)
            .ok()
            .filter(|&v| v < vertex_count)
            .ok_or_else(|| Error::parse(format!("vertex id {token} out of range")))
    };

    for line_index in 0..vertex_count {
        let tokens = integers(&next_line()?)?;
        let mut cursor = tokens.into_iter();
        let vertex = if labels == 1 {
            to_vertex(cursor.next().ok_or_else(|| Error::parse("missing label"))?)?
        } else {
            line_index
        };
        if let Some(rows) = vertex_weights.as_mut() {
            let weights: Vec<i64> = cursor.by_ref().take(criterion_count.max(1)).collect();
            if weights.len() < criterion_count.max(1) {
                return Err(Error::parse(format!("vertex {vertex}: missing weights")));
            }
            rows[vertex] = weights;
        }
        let degree = cursor
            .next()
            .ok_or_else(|| Error::parse(format!("vertex {vertex}: missing degree")))?;
        let degree =
            usize::try_from(degree).map_err(|_| Error::parse("negative vertex degree"))?;
        for _ in 0..degree {
            let weight = match &mut edge_weights {
                Some(_) => Some(
                    cursor
                        .next()
                        .ok_or_else(|| Error::parse(format!("vertex {vertex}: missing edge weight")))?,
                ),
                None => None,
            };
            let neighbor = to_vertex(
                cursor
                    .next()
                    .ok_or_else(|| Error::parse(format!("vertex {vertex}: missing neighbor")))?,
            )?;
            // The other direction creates the edge.
            if vertex < neighbor {
                edges.push([vertex, neighbor]);
                if let (Some(weights), Some(weight)) = (&mut edge_weights, weight) {
                    weights.push(weight);
                }
            }
        }
    }
    if edges.len() != edge_count {
        return Err(Error::parse(format!(
            "read {} edges, the header announced {edge_count}",
            edges.len(),
        )));
    }
    Ok(Graph {
        vertex_count,
        edges,
        vertex_weights,
        edge_weights,
    })
}

pub fn write<W: Write>(mut writer: W, graph: &Graph) -> Result<()> {
    let mut adjacency = vec![Vec::new(); graph.vertex_count];
    for (e, &[u, v]) in graph.edges.iter().enumerate() {
        adjacency[u].push((v, e));
        adjacency[v].push((u, e));
    }
    let criterion_count = graph
        .vertex_weights
        .as_ref()
        .map_or(0, |rows| rows.first().map_or(0, Vec::len));
    // fmt = "ijk": no labels, edge weights, vertex weight flavor; multiple
    // criteria need the flavor-2 header.
    let vertex_weight_flag = match criterion_count {
        0 => 0,
        1 => 1,
        _ => 2,
    };
    writeln!(writer, "0")?;
    writeln!(writer, "{} {}", graph.vertex_count, 2 * graph.edges.len())?;
    writeln!(
        writer,
        "0 0{}{}",
        u8::from(graph.edge_weights.is_some()),
        vertex_weight_flag,
    )?;
    if vertex_weight_flag == 2 {
        writeln!(writer, "{criterion_count}")?;
    }
    for (vertex, incident) in adjacency.iter().enumerate() {
        let mut line = String::new();
        if let Some(rows) = &graph.vertex_weights {
            for weight in &rows[vertex] {
                line.push_str(&format!("{weight} "));
            }
        }
        line.push_str(&format!("{}", incident.len()));
        for &(neighbor, edge) in incident {
            match &graph.edge_weights {
                Some(weights) => {
                    if weights[edge] == 0 {
                        return Err(Error::parse(format!("edge {edge} has a zero weight")));
                    }
                    line.push_str(&format!(" {} {neighbor}", weights[edge]));
                }
                None => line.push_str(&format!(" {neighbor}")),
            }
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

fn integers(line: &str) -> Result<Vec<i64>> {
    line.split_whitespace().map(parse_token).collect()
}

fn parse_token<T: std::str::FromStr>(token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::parse(format!("invalid number {token:?}")))
}
