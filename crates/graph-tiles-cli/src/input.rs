//! Loading graphs from disk.
//!
//! Two formats are accepted:
//! - JSON: either a node array plus a link array in two files, or a single
//!   `{ "nodes": [...], "links": [...] }` document.
//! - Edge lists: one `source,target` pair of integer ids per line. Nodes are
//!   created in order of first appearance with group 0; lines that do not
//!   parse (headers, blanks, comments) are skipped.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use graph_tiles_core::{GraphLink, GraphNode};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Raw nodes and links as read from disk.
#[derive(Debug, Default, Deserialize)]
pub struct GraphInput {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

/// Where to read the graph from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// JSON node array, or a `{nodes, links}` document when LINKS is omitted.
    #[arg(required_unless_present = "edges")]
    pub nodes: Option<PathBuf>,

    /// JSON link array.
    pub links: Option<PathBuf>,

    /// Comma-separated edge list (`source,target` per line).
    #[arg(long, conflicts_with_all = ["nodes", "links"])]
    pub edges: Option<PathBuf>,
}

impl InputArgs {
    pub fn load(&self) -> Result<GraphInput> {
        let input = match (&self.nodes, &self.links, &self.edges) {
            (_, _, Some(edges)) => read_edge_list(edges)?,
            (Some(nodes), Some(links), None) => GraphInput {
                nodes: read_json(nodes)?,
                links: read_json(links)?,
            },
            (Some(document), None, None) => read_json(document)?,
            (None, _, None) => bail!("No graph input given. Pass NODES [LINKS] or --edges FILE"),
        };
        info!(
            nodes = input.nodes.len(),
            links = input.links.len(),
            "Loaded graph"
        );
        Ok(input)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_edge_list(path: &Path) -> Result<GraphInput> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    parse_edge_list(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse an edge list.
pub fn parse_edge_list(reader: impl BufRead) -> Result<GraphInput> {
    let mut input = GraphInput::default();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((source, target)) = parse_edge(line) else {
            warn!(line = lineno + 1, content = line, "Skipping malformed edge");
            skipped += 1;
            continue;
        };

        for (id, text) in [source, target] {
            if seen.insert(id) {
                input.nodes.push(GraphNode::new(id, 0).with_name(text));
            }
        }
        input.links.push(GraphLink::new(source.0, target.0));
    }

    debug!(skipped, "Parsed edge list");
    Ok(input)
}

fn parse_edge(line: &str) -> Option<((u64, &str), (u64, &str))> {
    let mut fields = line.split(',').map(str::trim);
    let source = fields.next()?;
    let target = fields.next()?;
    Some(((source.parse().ok()?, source), (target.parse().ok()?, target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_list_creates_nodes_in_first_seen_order() {
        let csv = "node_1,node_2\n3,1\n1,2\n\n# comment\n2,3\n";
        let input = parse_edge_list(csv.as_bytes()).unwrap();

        let ids: Vec<u64> = input.nodes.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(input.nodes.iter().all(|n| n.group == 0));
        assert_eq!(input.nodes[0].name.as_deref(), Some("3"));
        assert_eq!(input.links.len(), 3);
        assert_eq!(input.links[0], GraphLink::new(3, 1));
    }

    #[test]
    fn malformed_edges_are_skipped() {
        let input = parse_edge_list("1\n1,x\n-1,2\n 4 , 5 \n".as_bytes()).unwrap();
        assert_eq!(input.links, vec![GraphLink::new(4, 5)]);
    }

    #[test]
    fn combined_document_defaults_links() {
        let input: GraphInput = serde_json::from_str(r#"{"nodes": [{"id": 1}]}"#).unwrap();
        assert_eq!(input.nodes.len(), 1);
        assert!(input.links.is_empty());
    }
}
