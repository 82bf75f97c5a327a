//! Parameter lists of a maximum-likelihood fit.

use super::error::{Error, Result};
use super::stats::Uncertainty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A single fitted parameter.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Parameter {
    /// Name of the parameter, for instance the bin it describes.
    pub name: String,
    /// Best-fit value.
    pub value: f64,
    /// Upper asymmetric error, non-negative.
    pub error_hi: f64,
    /// Lower asymmetric error as written by the fitter, non-positive.
    pub error_lo: f64,
}

impl Parameter {
    /// Magnitude of the upward error.
    #[must_use]
    pub const fn up(&self) -> f64 {
        self.error_hi.abs()
    }

    /// Magnitude of the downward error.
    #[must_use]
    pub const fn down(&self) -> f64 {
        self.error_lo.abs()
    }

    /// Both errors as an [`Uncertainty`].
    #[must_use]
    pub const fn uncertainty(&self) -> Uncertainty {
        Uncertainty::new(self.up(), self.down())
    }
}

/// The parameter lists of one fit-result file, indexed by list name. Each list keeps the order
/// in which the fitter wrote its parameters.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultFile {
    lists: BTreeMap<String, Vec<Parameter>>,
}

impl ResultFile {
    /// Reads a result file from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read or is not a valid YAML map of parameter
    /// lists.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(Error::io(path))?;

        serde_yaml::from_str(&contents).map_err(Error::yaml(path))
    }

    /// Writes this file as YAML to `path`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directories can not be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self).map_err(Error::yaml(path))?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(Error::io(parent))?;
        }

        fs::write(path, contents).map_err(Error::io(path))
    }

    /// Inserts or replaces the list with name `name`.
    pub fn insert(&mut self, name: &str, parameters: Vec<Parameter>) {
        self.lists.insert(name.to_owned(), parameters);
    }

    /// Returns the list `name`, if present.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&[Parameter]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Names of all lists in this file.
    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Returns the parameter at position `index` of list `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if either the list or the position does not exist.
    pub fn parameter(&self, name: &str, index: usize) -> Result<&Parameter> {
        self.list(name)
            .and_then(|list| list.get(index))
            .ok_or_else(|| Error::MissingParameter {
                list: name.to_owned(),
                index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    const YAML: &str = "\
fit_mdf:
  - name: r
    value: 1.0
    error_hi: 0.5
    error_lo: -0.4
  - name: n_exp_bin0
    value: 12.5
    error_hi: 2.25
    error_lo: -1.75
prefit: []
";

    #[test]
    fn parse_lists() {
        let file: ResultFile = serde_yaml::from_str(YAML).unwrap();

        assert_eq!(file.list_names().collect::<Vec<_>>(), ["fit_mdf", "prefit"]);
        assert_eq!(file.list("prefit"), Some(&[][..]));
        assert_eq!(file.list("postfit"), None);

        let parameter = file.parameter("fit_mdf", 1).unwrap();

        assert_eq!(parameter.name, "n_exp_bin0");
        assert_eq!(parameter.value, 12.5);
        assert_eq!(parameter.uncertainty(), Uncertainty::new(2.25, 1.75));
    }

    #[test]
    fn missing_parameters() {
        let file: ResultFile = serde_yaml::from_str(YAML).unwrap();

        assert!(matches!(
            file.parameter("fit_mdf", 2),
            Err(Error::MissingParameter { index: 2, .. })
        ));
        assert_eq!(
            file.parameter("postfit", 0).unwrap_err().to_string(),
            "parameter list `postfit` has no entry at position 0"
        );
    }

    #[test]
    fn insert_replaces_list() {
        let mut file = ResultFile::default();
        let parameter = Parameter {
            name: "a".to_owned(),
            value: 3.0,
            error_hi: 1.0,
            error_lo: -1.0,
        };

        file.insert("prefit", vec![parameter.clone(), parameter.clone()]);
        file.insert("prefit", vec![parameter]);

        assert_eq!(file.list("prefit").map(<[_]>::len), Some(1));
    }

    #[test]
    fn write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("summary.yaml");
        let file: ResultFile = serde_yaml::from_str(YAML).unwrap();

        file.write(&path).unwrap();

        assert_eq!(ResultFile::read(&path).unwrap(), file);
    }

    #[test]
    fn malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "fit_mdf: [1, 2]\n").unwrap();

        assert!(matches!(ResultFile::read(&path), Err(Error::Yaml { .. })));
        assert!(matches!(
            ResultFile::read(&dir.path().join("does-not-exist.yaml")),
            Err(Error::Io { .. })
        ));
    }
}
