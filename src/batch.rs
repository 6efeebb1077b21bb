use std::io::{Read, Write};

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord, Writer};
use tracing::*;

use crate::{GraphSignature, SignatureConfig, SimpleGraph};

/// A named graph read from a CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRecord {
    pub name: String,
    pub graph: SimpleGraph,
}

fn parse_record(record: &StringRecord) -> Option<GraphRecord> {
    let (Some(name), Some(vertices), Some(edges)) = (record.get(0), record.get(1), record.get(2))
    else {
        warn!("Skipping record with missing columns: {:?}", record);
        return None;
    };
    let symbols: Vec<&str> = vertices.split_whitespace().collect();
    match SimpleGraph::from_symbols(&symbols, edges) {
        Ok(graph) => Some(GraphRecord {
            name: name.trim().to_string(),
            graph,
        }),
        Err(e) => {
            warn!("Skipping record {}: {}", name, e);
            None
        }
    }
}

/// Read `name,vertices,edges` rows after a header row.
///
/// `vertices` lists one symbol per vertex separated by whitespace and `edges` is an edge
/// string such as `"0:1,1:2:="`. Rows that cannot be read or describe a malformed graph
/// are logged and skipped.
pub fn read_graph_records(reader: impl Read) -> Vec<GraphRecord> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => records.extend(parse_record(&record)),
            Err(e) => warn!("Skipping unreadable record: {}", e),
        }
    }
    debug!("Read {} graph records", records.len());
    records
}

/// Write the canonical string, full string and symmetry class count of every record.
pub fn write_signatures(
    records: &[GraphRecord],
    config: &SignatureConfig,
    writer: impl Write,
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["name", "canonical", "full", "class_count"])?;
    for record in records {
        let summary = GraphSignature::with_config(&record.graph, config.clone()).summarize();
        wtr.write_record([
            record.name.clone(),
            summary.canonical,
            summary.full,
            summary.classes.len().to_string(),
        ])?;
        info!("Canonized {}", record.name);
    }
    wtr.flush()?;
    Ok(())
}
