use assert_fs::prelude::*;
use assert_fs::TempDir;

fn parameters(count: usize) -> String {
    (0..count)
        .map(|index| {
            format!("  - name: n_exp_bin{index}\n    value: 10.0\n    error_hi: 1.5\n    error_lo: -1.0\n")
        })
        .collect()
}

/// Writes the default inputs: 65 fit parameters, six boosted bins and a datacard with 61 bins
/// named `ch0` to `ch60`.
pub fn inputs() -> TempDir {
    let dir = TempDir::new().unwrap();
    let bins: Vec<_> = (0..61).map(|column| format!("ch{column}")).collect();
    let counts: Vec<_> = (0..61).map(|column| (column % 7 * 3).to_string()).collect();

    dir.child("multidimfit_prefit.yaml")
        .write_str(&format!("fit_mdf:\n{}", parameters(65)))
        .unwrap();
    dir.child("multidimfit_postfit.yaml")
        .write_str(&format!("fit_mdf:\n{}", parameters(65)))
        .unwrap();
    dir.child("boosted_results.yaml")
        .write_str(&format!("prefit:\n{0}postfit:\n{0}", parameters(6)))
        .unwrap();
    dir.child("datacard_500.txt")
        .write_str(&format!(
            "# observed counts\nimax 61\n----\nbin {}\nobservation {}\n",
            bins.join(" "),
            counts.join(" ")
        ))
        .unwrap();

    dir
}
