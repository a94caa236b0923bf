//! The Medit `.mesh` format (ASCII flavor).
//!
//! Keyword-driven: `MeshVersionFormatted`, `Dimension`, `Vertices`, one
//! block per element kind, `End`. Indices are 1-based and every vertex or
//! element line ends with a reference tag.

use std::fmt;
use std::io::BufRead;

use crate::{Error, Result};

/// The element kinds the partitioning tools care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Edge,
    Triangle,
    Quadrilateral,
    Tetrahedron,
}

impl ElementType {
    pub fn node_count(self) -> usize {
        match self {
            ElementType::Edge => 2,
            ElementType::Triangle => 3,
            ElementType::Quadrilateral => 4,
            ElementType::Tetrahedron => 4,
        }
    }

    /// The geometric dimension of the element kind.
    pub fn dimension(self) -> usize {
        match self {
            ElementType::Edge => 1,
            ElementType::Triangle | ElementType::Quadrilateral => 2,
            ElementType::Tetrahedron => 3,
        }
    }

    fn from_keyword(keyword: &str) -> Option<ElementType> {
        match keyword {
            "Edges" => Some(ElementType::Edge),
            "Triangles" => Some(ElementType::Triangle),
            "Quadrilaterals" | "Quadrangles" => Some(ElementType::Quadrilateral),
            "Tetrahedra" => Some(ElementType::Tetrahedron),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Edge => write!(f, "Edges"),
            ElementType::Triangle => write!(f, "Triangles"),
            ElementType::Quadrilateral => write!(f, "Quadrilaterals"),
            ElementType::Tetrahedron => write!(f, "Tetrahedra"),
        }
    }
}

/// An ASCII Medit mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub dimension: usize,
    /// One coordinate row per vertex.
    pub coordinates: Vec<Vec<f64>>,
    pub vertex_refs: Vec<i64>,
    /// Element blocks: kind, flattened vertex ids (0-based), one reference
    /// per element.
    pub elements: Vec<(ElementType, Vec<usize>, Vec<i64>)>,
}

impl Mesh {
    pub fn element_count(&self) -> usize {
        self.elements.iter().map(|(_, _, refs)| refs.len()).sum()
    }
}

pub fn read<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut lines = reader.lines();
    let mut next_line = move || -> Result<Option<String>> {
        for line in lines.by_ref() {
            let line = line?;
            let trimmed = line.trim().to_string();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return Ok(Some(trimmed));
            }
        }
        Ok(None)
    };

    let mut dimension = 0;
    let mut coordinates = Vec::new();
    let mut vertex_refs = Vec::new();
    let mut elements = Vec::new();

    while let Some(line) = next_line()? {
        let mut words = line.split_whitespace();
        let keyword = words.next().expect("blank lines are skipped").to_string();
        let argument = words.next().map(str::to_string);
        match keyword.as_str() {
            "MeshVersionFormatted" => {
                keyword_value(argument, &mut next_line, &keyword)?;
            }
            "Dimension" => {
                dimension = parse(&keyword_value(argument, &mut next_line, &keyword)?)?;
            }
            "Vertices" => {
                if dimension == 0 {
                    return Err(Error::parse("Vertices block before Dimension"));
                }
                let count: usize =
                    parse(&keyword_value(argument, &mut next_line, &keyword)?)?;
                for _ in 0..count {
                    let line = next_line()?
                        .ok_or_else(|| Error::parse("truncated Vertices block"))?;
                    let numbers: Vec<f64> = line
                        .split_whitespace()
                        .map(parse)
                        .collect::<Result<Vec<f64>>>()?;
                    if numbers.len() != dimension + 1 {
                        return Err(Error::parse(format!(
                            "vertex line holds {} numbers, expected {}",
                            numbers.len(),
                            dimension + 1,
                        )));
                    }
                    coordinates.push(numbers[..dimension].to_vec());
                    vertex_refs.push(numbers[dimension] as i64);
                }
            }
            "End" => break,
            other => match ElementType::from_keyword(other) {
                Some(element_type) => {
                    let count: usize =
                        parse(&keyword_value(argument, &mut next_line, other)?)?;
                    let node_count = element_type.node_count();
                    let mut nodes = Vec::with_capacity(count * node_count);
                    let mut refs = Vec::with_capacity(count);
                    for _ in 0..count {
                        let line = next_line()?
                            .ok_or_else(|| Error::parse("truncated element block"))?;
                        let numbers: Vec<i64> = line
                            .split_whitespace()
                            .map(parse)
                            .collect::<Result<Vec<i64>>>()?;
                        if numbers.len() != node_count + 1 {
                            return Err(Error::parse(format!(
                                "{element_type} line holds {} numbers, expected {}",
                                numbers.len(),
                                node_count + 1,
                            )));
                        }
                        for &node in &numbers[..node_count] {
                            let node = usize::try_from(node - 1).map_err(|_| {
                                Error::parse(format!("vertex id {node} is not positive"))
                            })?;
                            nodes.push(node);
                        }
                        refs.push(numbers[node_count]);
                    }
                    elements.push((element_type, nodes, refs));
                }
                None => {
                    return Err(Error::UnsupportedFormat(format!(
                        "unknown mesh keyword {other:?}",
                    )))
                }
            },
        }
    }
    if dimension == 0 {
        return Err(Error::parse("missing Dimension block"));
    }
    Ok(Mesh {
        dimension,
        coordinates,
        vertex_refs,
        elements,
    })
}

impl fmt::Display for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshVersionFormatted 2\nDimension {}\n\nVertices\n\t{}\n",
            self.dimension,
            self.coordinates.len(),
        )?;
        for (coordinates, vertex_ref) in self.coordinates.iter().zip(&self.vertex_refs) {
            for coordinate in coordinates {
                write!(f, " {coordinate}")?;
            }
            writeln!(f, " {vertex_ref}")?;
        }
        for (element_type, nodes, refs) in &self.elements {
            write!(f, "\n{element_type}\n\t{}\n", refs.len())?;
            for (element, element_ref) in nodes.chunks(element_type.node_count()).zip(refs) {
                for node in element {
                    write!(f, " {}", node + 1)?;
                }
                writeln!(f, " {element_ref}")?;
            }
        }
        write!(f, "\nEnd")
    }
}

fn parse<T: std::str::FromStr>(token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::parse(format!("invalid number {token:?}")))
}

/// The value of a keyword may share its line or sit on the next one.
fn keyword_value<F>(argument: Option<String>, next_line: &mut F, keyword: &str) -> Result<String>
where
    F: FnMut() -> Result<Option<String>>,
{
    match argument {
        Some(value) => Ok(value),
        None => next_line()?
            .ok_or_else(|| Error::parse(format!("missing value after keyword {keyword:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "\
MeshVersionFormatted 2
Dimension 2

Vertices
4
0.0 0.0 0
1.0 0.0 0
1.0 1.0 0
0.0 1.0 0

Triangles
2
1 2 3 0
1 3 4 0

End
";

    #[test]
    fn reads_a_triangulated_square() {
        let mesh = read(SQUARE.as_bytes()).unwrap();
        assert_eq!(mesh.dimension, 2);
        assert_eq!(mesh.coordinates.len(), 4);
        assert_eq!(mesh.element_count(), 2);
        let (element_type, nodes, refs) = &mesh.elements[0];
        assert_eq!(*element_type, ElementType::Triangle);
        assert_eq!(nodes, &[0, 1, 2, 0, 2, 3]);
        assert_eq!(refs, &[0, 0]);
    }

    #[test]
    fn reads_keyword_values_on_their_own_line() {
        let content = "\
MeshVersionFormatted
2
Dimension
3
Vertices
1
0.5 0.5 0.5 1
End
";
        let mesh = read(content.as_bytes()).unwrap();
        assert_eq!(mesh.dimension, 3);
        assert_eq!(mesh.coordinates, vec![vec![0.5, 0.5, 0.5]]);
        assert_eq!(mesh.vertex_refs, vec![1]);
    }

    #[test]
    fn display_round_trips() {
        let mesh = read(SQUARE.as_bytes()).unwrap();
        let rendered = mesh.to_string();
        let reread = read(rendered.as_bytes()).unwrap();
        assert_eq!(reread, mesh);
    }

    #[test]
    fn unknown_keywords_are_rejected() {
        let content = "MeshVersionFormatted 2\nDimension 2\nRidges\n1\n1\nEnd\n";
        assert!(matches!(
            read(content.as_bytes()),
            Err(Error::UnsupportedFormat(_)),
        ));
    }
}
