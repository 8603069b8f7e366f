// Lineage Visualization - directed graph of an audit log
//
// Inputs and outputs become nodes, the log's step descriptions label the
// edges connecting them. HTML export is always available and dependency-free;
// SVG needs the optional `svg` feature (layout-rs) and fails loudly without
// it rather than silently degrading to HTML.

use crate::audit::AuditLog;
use crate::error::Result;
use serde::Serialize;

#[cfg(not(feature = "svg"))]
use crate::error::UnitsError;

// ============================================================================
// GRAPH MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Input,
    Output,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Input => "input",
            NodeRole::Output => "output",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineageNode {
    pub name: String,
    pub unit: String,
    pub role: NodeRole,
}

/// Directed edge between node indices, labelled with step descriptions.
#[derive(Debug, Clone, Serialize)]
pub struct LineageEdge {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

/// Directed graph derived from one audit log.
#[derive(Debug, Clone, Serialize)]
pub struct LineageGraph {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageGraph {
    /// Build the graph: every input feeds every output, each edge carrying
    /// the log's step descriptions joined with "; ".
    pub fn from_audit_log(log: &AuditLog) -> Self {
        let mut nodes = Vec::new();
        let mut input_indices = Vec::new();
        for (name, quantity) in log.inputs() {
            input_indices.push(nodes.len());
            nodes.push(LineageNode {
                name: name.to_string(),
                unit: quantity.unit().to_string(),
                role: NodeRole::Input,
            });
        }

        let label = log
            .steps()
            .iter()
            .map(|s| s.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        let mut edges = Vec::new();
        for (name, quantity) in log.outputs() {
            let output_index = nodes.len();
            nodes.push(LineageNode {
                name: name.to_string(),
                unit: quantity.unit().to_string(),
                role: NodeRole::Output,
            });
            for &input_index in &input_indices {
                edges.push(LineageEdge {
                    from: input_index,
                    to: output_index,
                    label: label.clone(),
                });
            }
        }

        LineageGraph { nodes, edges }
    }

    // ========================================================================
    // HTML EXPORT (always available)
    // ========================================================================

    /// Standalone HTML document: input column, output column, edge table.
    pub fn to_html(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Calculation lineage</title>\n<style>\n\
             body { font-family: sans-serif; margin: 2em; }\n\
             .columns { display: flex; gap: 4em; }\n\
             .node { border: 1px solid #888; border-radius: 6px; padding: 0.5em 1em;\n\
                     margin: 0.5em 0; background: #f4f8fb; }\n\
             .node.output { background: #f0fbf0; }\n\
             .role { color: #666; font-size: 0.8em; text-transform: uppercase; }\n\
             .unit { color: #333; font-size: 0.9em; }\n\
             table { border-collapse: collapse; margin-top: 2em; }\n\
             th, td { border: 1px solid #aaa; padding: 0.3em 0.8em; text-align: left; }\n\
             </style>\n</head>\n<body>\n<h1>Calculation lineage</h1>\n",
        );

        html.push_str("<div class=\"columns\">\n<div>\n<h2>Inputs</h2>\n");
        for node in self.nodes.iter().filter(|n| n.role == NodeRole::Input) {
            html.push_str(&Self::node_card(node));
        }
        html.push_str("</div>\n<div>\n<h2>Outputs</h2>\n");
        for node in self.nodes.iter().filter(|n| n.role == NodeRole::Output) {
            html.push_str(&Self::node_card(node));
        }
        html.push_str("</div>\n</div>\n");

        html.push_str(
            "<table>\n<tr><th>From</th><th>Steps</th><th>To</th></tr>\n",
        );
        for edge in &self.edges {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&self.nodes[edge.from].name),
                escape(&edge.label),
                escape(&self.nodes[edge.to].name),
            ));
        }
        html.push_str("</table>\n</body>\n</html>\n");
        html
    }

    fn node_card(node: &LineageNode) -> String {
        format!(
            "<div class=\"node {}\"><span class=\"role\">{}</span><br>\
             <strong>{}</strong><br><span class=\"unit\">{}</span></div>\n",
            node.role.as_str(),
            node.role.as_str(),
            escape(&node.name),
            escape(&node.unit),
        )
    }

    // ========================================================================
    // SVG EXPORT (optional feature)
    // ========================================================================

    /// Layout the graph and render SVG. Requires the `svg` cargo feature.
    #[cfg(feature = "svg")]
    pub fn to_svg(&self) -> Result<String> {
        use layout::backends::svg::SVGWriter;
        use layout::core::base::Orientation;
        use layout::core::geometry::Point;
        use layout::core::style::StyleAttr;
        use layout::std_shapes::shapes::{Arrow, Element, ShapeKind};
        use layout::topo::layout::VisualGraph;

        let mut graph = VisualGraph::new(Orientation::LeftToRight);
        let mut handles = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let label = format!("{}\n{}", node.name, node.unit);
            let shape = ShapeKind::new_box(&label);
            let size = Point::new(140., 50.);
            let element = Element::create(
                shape,
                StyleAttr::simple(),
                Orientation::LeftToRight,
                size,
            );
            handles.push(graph.add_node(element));
        }
        for edge in &self.edges {
            graph.add_edge(
                Arrow::simple(&edge.label),
                handles[edge.from],
                handles[edge.to],
            );
        }

        let mut writer = SVGWriter::new();
        graph.do_it(false, false, false, &mut writer);
        Ok(writer.finalize())
    }

    /// Without the `svg` feature this always fails, naming the missing
    /// dependency. Callers wanting HTML must ask for HTML.
    #[cfg(not(feature = "svg"))]
    pub fn to_svg(&self) -> Result<String> {
        Err(UnitsError::MissingDependency(
            "SVG lineage rendering".to_string(),
            "layout-rs".to_string(),
        ))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::TrackedQuantity;

    fn sample_log() -> AuditLog {
        let mut log = AuditLog::new();
        log.add_input(
            "thickness",
            TrackedQuantity::new(25.0, "mm", "config").unwrap(),
        );
        log.add_input(
            "yield_strength",
            TrackedQuantity::new(450.0, "MPa", "config").unwrap(),
        );
        log.add_step("burst check");
        log.add_output(
            "utilisation",
            TrackedQuantity::new(0.82, "dimensionless", "calculated:burst").unwrap(),
        );
        log
    }

    #[test]
    fn test_graph_shape() {
        let graph = LineageGraph::from_audit_log(&sample_log());
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2, "every input feeds the output");
        assert!(graph
            .edges
            .iter()
            .all(|e| e.label == "burst check"));
        assert_eq!(graph.nodes[graph.edges[0].to].role, NodeRole::Output);
    }

    #[test]
    fn test_html_is_standalone_and_complete() {
        let html = LineageGraph::from_audit_log(&sample_log()).to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("thickness"));
        assert!(html.contains("MPa"));
        assert!(html.contains("utilisation"));
        assert!(html.contains("burst check"));
        assert!(html.contains("</html>"));
        // Roles visible for reviewers
        assert!(html.contains("input") && html.contains("output"));
    }

    #[test]
    fn test_html_escapes_labels() {
        let mut log = AuditLog::new();
        log.add_input(
            "a<b",
            TrackedQuantity::new(1.0, "m", "config").unwrap(),
        );
        let html = LineageGraph::from_audit_log(&log).to_html();
        assert!(html.contains("a&lt;b"));
        assert!(!html.contains("<b\""));
    }

    #[cfg(not(feature = "svg"))]
    #[test]
    fn test_svg_without_feature_names_dependency() {
        let graph = LineageGraph::from_audit_log(&sample_log());
        let err = graph.to_svg().unwrap_err();
        assert!(err.to_string().contains("layout-rs"));
    }

    #[cfg(feature = "svg")]
    #[test]
    fn test_svg_renders_nodes() {
        let graph = LineageGraph::from_audit_log(&sample_log());
        let svg = graph.to_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("thickness"));
    }
}
