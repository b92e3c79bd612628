//! HDF5 backend: one 1-D dataset per entry in the root group.

use std::path::{Path, PathBuf};

use embedplot_shared::{EmbedplotError, Result};
use tracing::debug;

use crate::EmbeddingArchive;

/// An open HDF5 embedding file.
pub struct Hdf5Archive {
    file: hdf5::File,
    path: PathBuf,
}

impl Hdf5Archive {
    pub fn open(path: &Path) -> Result<Self> {
        let file = hdf5::File::open(path)
            .map_err(|e| EmbedplotError::Archive(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "opened HDF5 archive");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl EmbeddingArchive for Hdf5Archive {
    fn keys(&self) -> Result<Vec<String>> {
        self.file
            .member_names()
            .map_err(|e| EmbedplotError::Archive(format!("{}: {e}", self.path.display())))
    }

    fn read_vector(&self, key: &str) -> Result<Vec<f32>> {
        let dataset = self.file.dataset(key).map_err(|e| {
            EmbedplotError::Archive(format!("{}: dataset '{key}': {e}", self.path.display()))
        })?;

        let shape = dataset.shape();
        if shape.len() != 1 {
            return Err(EmbedplotError::schema(format!(
                "dataset '{key}' has shape {shape:?}, expected a 1-D vector"
            )));
        }

        dataset.read_raw::<f32>().map_err(|e| {
            EmbedplotError::Archive(format!("{}: reading '{key}': {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract_records;

    fn write_fixture(path: &Path, records: &[(&str, Vec<f32>)]) {
        let file = hdf5::File::create(path).unwrap();
        for (name, vector) in records {
            let dataset = file
                .new_dataset::<f32>()
                .shape(vector.len())
                .create(*name)
                .unwrap();
            dataset.write_raw(vector.as_slice()).unwrap();
        }
    }

    #[test]
    fn reads_synthetic_hdf5_file() {
        let dir = std::env::temp_dir().join(format!("embedplot-h5-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mock-per-protein.h5");

        write_fixture(
            &path,
            &[
                ("p1", vec![0.1, 0.2, 0.3, 0.4]),
                ("p2", vec![1.0, 2.0, 3.0, 4.0]),
                ("p3", vec![-1.0, 0.0, 1.0, 2.0]),
            ],
        );

        let archive = Hdf5Archive::open(&path).unwrap();
        let extracted = extract_records(&archive, &path).unwrap();

        assert_eq!(extracted.entry_ids, vec!["p1", "p2", "p3"]);
        assert_eq!(extracted.matrix.width(), 4);
        assert_eq!(extracted.matrix.row(1).unwrap().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_hdf5_file_is_empty_dataset() {
        let dir = std::env::temp_dir().join(format!("embedplot-h5-empty-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.h5");
        write_fixture(&path, &[]);

        let archive = Hdf5Archive::open(&path).unwrap();
        let err = extract_records(&archive, &path).unwrap_err();
        assert!(matches!(err, EmbedplotError::EmptyDataset { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
