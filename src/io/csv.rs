/*!
# CSV export of fit results

Writes the tables a plotting layer consumes: the density record, the
cluster summary and the per-iteration stick weights. Enable via the `csv`
feature.
*/

use ndarray::{Array2, Axis};
use std::error::Error;
use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::density::DensityRecord;
use crate::summary::ClusterSummary;

/**
Saves a density record as CSV with columns `x`, `mean`, `lower`, `upper`,
one row per grid point.

# Examples

```rust
use subclonal_dpmm::density::DensityRecord;
use subclonal_dpmm::io::csv::save_density_csv;
use ndarray::arr1;

let record = DensityRecord {
    grid: arr1(&[0.0, 0.5, 1.0]),
    mean: arr1(&[0.1, 1.5, 0.2]),
    lower: arr1(&[0.0, 1.0, 0.1]),
    upper: arr1(&[0.2, 2.0, 0.3]),
};
save_density_csv(&record, "/tmp/density.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_density_csv<P: AsRef<Path>>(
    record: &DensityRecord,
    filename: P,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["x", "mean", "lower", "upper"])?;
    for i in 0..record.len() {
        wtr.write_record(&[
            record.grid[i].to_string(),
            record.mean[i].to_string(),
            record.lower[i].to_string(),
            record.upper[i].to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves every cluster slot with columns `slot`, `weight`, `frequency`,
/// `supported`, ascending by frequency.
pub fn save_clusters_csv<P: AsRef<Path>>(
    summary: &ClusterSummary,
    filename: P,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["slot", "weight", "frequency", "supported"])?;
    for cluster in &summary.all {
        let supported = cluster.weight > summary.cutoff_weight;
        wtr.write_record(&[
            cluster.slot.to_string(),
            cluster.weight.to_string(),
            cluster.frequency.to_string(),
            supported.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves an `iterations × clusters` matrix (e.g. the stick weights) with an
/// `iteration` column followed by `cluster_0`, `cluster_1`, ...
pub fn save_iteration_matrix_csv<P: AsRef<Path>>(
    data: &Array2<f64>,
    filename: P,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    let mut header = vec!["iteration".to_string()];
    header.extend((0..data.ncols()).map(|i| format!("cluster_{}", i)));
    wtr.write_record(&header)?;

    for (i, row) in data.axis_iter(Axis(0)).enumerate() {
        let mut record = vec![(i + 1).to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
