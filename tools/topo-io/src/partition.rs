//! Partition files: Scotch `.map`, MeTiS and PaToH part files.

use std::io::{BufRead, Write};

use crate::{Error, Result};

/// Reads a Scotch `.map` file: the vertex count, then one `label part`
/// pair per line.
pub fn read_map<R: BufRead>(reader: R) -> Result<Vec<usize>> {
    let mut lines = reader.lines();
    let count_line = lines
        .next()
        .transpose()?
        .ok_or_else(|| Error::parse("empty map file"))?;
    let count: usize = parse(count_line.trim())?;
    let mut parts = vec![0; count];
    let mut seen = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();
        let (Some(label), Some(part)) = (words.next(), words.next()) else {
            return Err(Error::parse(format!("malformed map line {line:?}")));
        };
        let label: usize = parse(label)?;
        if label >= count {
            return Err(Error::parse(format!(
                "label {label} out of range for {count} vertices",
            )));
        }
        parts[label] = parse(part)?;
        seen += 1;
    }
    if seen != count {
        return Err(Error::parse(format!(
            "map file holds {seen} assignments for {count} vertices",
        )));
    }
    Ok(parts)
}

/// Writes a Scotch `.map` file.
pub fn write_map<W: Write>(mut writer: W, parts: &[usize]) -> Result<()> {
    writeln!(writer, "{}", parts.len())?;
    for (label, part) in parts.iter().enumerate() {
        writeln!(writer, "{label}\t{part}")?;
    }
    Ok(())
}

/// Reads a MeTiS part file: one part per line, in vertex order.
pub fn read_metis<R: BufRead>(reader: R) -> Result<Vec<usize>> {
    let mut parts = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            parts.push(parse(line)?);
        }
    }
    Ok(parts)
}

/// Reads a PaToH part file: whitespace-separated parts, in vertex order.
pub fn read_patoh<R: BufRead>(reader: R) -> Result<Vec<usize>> {
    let mut parts = Vec::new();
    for line in reader.lines() {
        for token in line?.split_whitespace() {
            parts.push(parse(token)?);
        }
    }
    Ok(parts)
}

fn parse(token: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| Error::parse(format!("invalid number {token:?}")))
}
