//! Connectivity report: which images a network ties together, and how well.
//!
//! ```text
//! ControlNet → graph_report() → GraphReport { images, edges, islands }
//!   → write_graph_report_json() for tooling, write_graph_report_text() for people
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::net::ControlNet;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub serial: String,
    /// Points with any measure on this image.
    pub points: usize,
    pub measures: usize,
    pub valid_measures: usize,
    pub neighbours: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeReport {
    pub from: String,
    pub to: String,
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    pub network_id: String,
    pub points: usize,
    pub valid_points: usize,
    pub images: Vec<ImageReport>,
    pub edges: Vec<EdgeReport>,
    pub islands: Vec<Vec<String>>,
}

impl GraphReport {
    /// Images that share no valid point with any other image.
    pub fn isolated_images(&self) -> impl Iterator<Item = &str> + '_ {
        self.images.iter().filter(|i| i.neighbours == 0).map(|i| i.serial.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.islands.len() <= 1
    }
}

/// Snapshot the adjacency graph of `net`.
pub fn graph_report(net: &ControlNet) -> GraphReport {
    let graph = net.graph();
    let images = graph
        .serials()
        .map(|serial| ImageReport {
            serial: serial.to_string(),
            points: graph.points_in(serial).len(),
            measures: net.measures_in_cube(serial).len(),
            valid_measures: net.valid_measures_in_cube(serial).len(),
            neighbours: graph.adjacent(serial).len(),
        })
        .collect();
    let edges = graph
        .edges()
        .into_iter()
        .map(|(u, v, strength)| EdgeReport { from: u.to_string(), to: v.to_string(), strength })
        .collect();

    GraphReport {
        network_id: net.network_id().to_string(),
        points: net.num_points(),
        valid_points: net.num_valid_points(),
        images,
        edges,
        islands: graph.connected_components(),
    }
}

pub fn write_graph_report_json(net: &ControlNet, writer: &mut dyn Write) -> Result<()> {
    let report = graph_report(net);
    serde_json::to_writer_pretty(&mut *writer, &report)
        .map_err(|e| crate::Error::unknown("Unable to write graph report", e))?;
    writeln!(writer)?;
    Ok(())
}

/// Plain-text form: one line per image with its neighbours, then islands.
pub fn write_graph_report_text(net: &ControlNet, writer: &mut dyn Write) -> Result<()> {
    let report = graph_report(net);
    writeln!(writer, "# Network: {}", report.network_id)?;
    writeln!(writer, "# Points: {} ({} valid)", report.points, report.valid_points)?;
    writeln!(writer, "# Images: {}", report.images.len())?;
    writeln!(writer, "# Edges: {}", report.edges.len())?;
    writeln!(writer)?;

    let graph = net.graph();
    for image in &report.images {
        let neighbours: Vec<String> = graph
            .adjacent(&image.serial)
            .into_iter()
            .map(|n| format!("{n}({})", graph.edge_strength(&image.serial, n)))
            .collect();
        writeln!(
            writer,
            "{} [{}/{} valid] -> {}",
            image.serial,
            image.valid_measures,
            image.measures,
            if neighbours.is_empty() { "(none)".to_string() } else { neighbours.join(", ") }
        )?;
    }

    writeln!(writer)?;
    for (i, island) in report.islands.iter().enumerate() {
        writeln!(writer, "Island {}: {}", i + 1, island.join(", "))?;
    }
    Ok(())
}
