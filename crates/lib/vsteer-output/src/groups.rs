use std::fs;
use std::path::PathBuf;

use csv::WriterBuilder;
use log::{debug, info};

use vsteer_models::partition::{Group, GroupSink};

/// Writes one headerless `clusterN.csv` per group, N counting from one, with rows of
/// `x,y,speed,agent_id`. Files of an earlier run in the same directory are replaced.
#[derive(Debug, Clone)]
pub struct GroupCsvWriter {
    directory: PathBuf,
}

impl GroupCsvWriter {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn file_of(&self, label: usize) -> PathBuf {
        self.directory.join(format!("cluster{}.csv", label + 1))
    }

    /// Removes every group file in the directory, including those of a run with more groups.
    fn clear(&self) -> std::io::Result<()> {
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_group_file(name) && entry.file_type()?.is_file() {
                debug!("Removing stale group file {}", name);
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn is_group_file(name: &str) -> bool {
    name.strip_prefix("cluster")
        .and_then(|rest| rest.strip_suffix(".csv"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

impl GroupSink for GroupCsvWriter {
    fn persist(&mut self, groups: &[Group]) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        self.clear()?;
        for group in groups {
            let path = self.file_of(group.label);
            let mut writer = WriterBuilder::new().has_headers(false).from_path(&path)?;
            for record in group.records.iter() {
                writer.serialize((
                    record.position_x,
                    record.position_y,
                    record.speed,
                    record.agent_id.as_u32(),
                ))?;
            }
            writer.flush()?;
            info!(
                "Wrote {} records of group {} to {}",
                group.records.len(),
                group.label + 1,
                path.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_numbered_cluster_files_are_group_files() {
        assert!(is_group_file("cluster1.csv"));
        assert!(is_group_file("cluster12.csv"));
        assert!(!is_group_file("cluster.csv"));
        assert!(!is_group_file("clusterA.csv"));
        assert!(!is_group_file("cluster1.parquet"));
        assert!(!is_group_file("rx_trace.csv"));
    }
}
