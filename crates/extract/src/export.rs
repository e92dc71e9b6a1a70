use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::normalizer::AliasSet;
use crate::schema::{Edge, Entity, Extraction};

pub const ENTITIES_CSV: &str = "entities.csv";
pub const EDGES_CSV: &str = "edges.csv";
pub const ALIASES_JSON: &str = "aliases.json";

const ENTITY_COLUMNS: [&str; 3] = ["id", "name", "section_id"];
const LABELLED_ENTITY_COLUMNS: [&str; 4] = ["id", "name", "label", "section_id"];
const EDGE_COLUMNS: [&str; 3] = ["source", "target", "section_id"];

fn headerless_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(format!("Failed to create {:?}", path))
}

/// The header is always written, so an empty slice yields a header-only file.
pub fn write_entities_csv(path: &Path, entities: &[Entity], with_label: bool) -> Result<()> {
    let mut writer = headerless_writer(path)?;

    if with_label {
        writer.write_record(LABELLED_ENTITY_COLUMNS)?;
    } else {
        writer.write_record(ENTITY_COLUMNS)?;
    }

    for entity in entities {
        if with_label {
            writer.write_record([
                entity.id.as_str(),
                entity.name.as_str(),
                entity.label.as_deref().unwrap_or(""),
                entity.section_id.as_str(),
            ])?;
        } else {
            writer.write_record([
                entity.id.as_str(),
                entity.name.as_str(),
                entity.section_id.as_str(),
            ])?;
        }
    }

    writer.flush().context("Failed to flush entities csv")?;
    Ok(())
}

pub fn write_edges_csv(path: &Path, edges: &[Edge]) -> Result<()> {
    let mut writer = headerless_writer(path)?;
    writer.write_record(EDGE_COLUMNS)?;

    for edge in edges {
        writer.serialize(edge)?;
    }

    writer.flush().context("Failed to flush edges csv")?;
    Ok(())
}

pub fn read_entities_csv(path: &Path) -> Result<Vec<Entity>> {
    let mut reader =
        csv::Reader::from_path(path).context(format!("Failed to open {:?}", path))?;

    reader
        .deserialize()
        .collect::<Result<Vec<Entity>, _>>()
        .context("Failed to parse entities csv")
}

pub fn read_edges_csv(path: &Path) -> Result<Vec<Edge>> {
    let mut reader =
        csv::Reader::from_path(path).context(format!("Failed to open {:?}", path))?;

    reader
        .deserialize()
        .collect::<Result<Vec<Edge>, _>>()
        .context("Failed to parse edges csv")
}

pub fn write_aliases_json(path: &Path, aliases: &AliasSet) -> Result<()> {
    let file = File::create(path).context(format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), aliases)
        .context("Failed to write aliases json")
}

pub fn read_aliases_json(path: &Path) -> Result<AliasSet> {
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    serde_json::from_reader(std::io::BufReader::new(file)).context("Failed to parse aliases json")
}

#[derive(Debug, Clone)]
pub struct ExtractionArtifacts {
    pub entities: PathBuf,
    pub edges: PathBuf,
    pub aliases: PathBuf,
}

impl ExtractionArtifacts {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            entities: dir.join(ENTITIES_CSV),
            edges: dir.join(EDGES_CSV),
            aliases: dir.join(ALIASES_JSON),
        }
    }
}

impl Extraction {
    /// Write `entities.csv`, `edges.csv` and `aliases.json` into `dir`.
    pub fn persist(&self, dir: &Path) -> Result<ExtractionArtifacts> {
        std::fs::create_dir_all(dir).context(format!("Failed to create {:?}", dir))?;
        let artifacts = ExtractionArtifacts::in_dir(dir);

        write_entities_csv(&artifacts.entities, &self.entities, self.labelled)?;
        write_edges_csv(&artifacts.edges, &self.edges)?;
        write_aliases_json(&artifacts.aliases, &self.aliases)?;

        info!(
            dir = %dir.display(),
            entities = self.entities.len(),
            edges = self.edges.len(),
            aliases = self.aliases.len(),
            "Extraction artifacts written"
        );

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, label: Option<&str>) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_uppercase(),
            label: label.map(str::to_string),
            section_id: "s-1".to_string(),
        }
    }

    #[test]
    fn test_empty_exports_write_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let entities_path = dir.path().join(ENTITIES_CSV);
        let edges_path = dir.path().join(EDGES_CSV);

        write_entities_csv(&entities_path, &[], false).unwrap();
        write_edges_csv(&edges_path, &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&entities_path).unwrap(), "id,name,section_id\n");
        assert_eq!(std::fs::read_to_string(&edges_path).unwrap(), "source,target,section_id\n");
        assert!(read_entities_csv(&entities_path).unwrap().is_empty());
        assert!(read_edges_csv(&edges_path).unwrap().is_empty());
    }

    #[test]
    fn test_entities_roundtrip_with_and_without_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENTITIES_CSV);

        let plain = vec![entity("alpha", None), entity("gamma, delta", None)];
        write_entities_csv(&path, &plain, false).unwrap();
        assert_eq!(read_entities_csv(&path).unwrap(), plain);

        let labelled = vec![entity("dopamine_CHEMICAL", Some("CHEMICAL"))];
        write_entities_csv(&path, &labelled, true).unwrap();
        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("id,name,label,section_id\n"));
        assert_eq!(read_entities_csv(&path).unwrap(), labelled);
    }

    #[test]
    fn test_edges_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EDGES_CSV);
        let edges = vec![
            Edge { source: "alpha".into(), target: "gamma".into(), section_id: "s-1".into() },
            Edge { source: "gamma".into(), target: "delta".into(), section_id: "s-1".into() },
        ];

        write_edges_csv(&path, &edges).unwrap();

        assert_eq!(read_edges_csv(&path).unwrap(), edges);
    }

    #[test]
    fn test_aliases_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ALIASES_JSON);
        let mut aliases = AliasSet::new();
        aliases.record("Cortex");
        aliases.record("cortex");

        write_aliases_json(&path, &aliases).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["cortex"], serde_json::json!(["Cortex", "cortex"]));
        assert_eq!(read_aliases_json(&path).unwrap(), aliases);
    }
}
