//! A small demo fitting the Dirichlet process mixture to a synthetic tumor
//! with a clonal population at VAF 0.5 and a subclone at VAF 0.25.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution};
use std::error::Error;
use subclonal_dpmm::{fit, Config};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    const MUTATIONS_PER_CLUSTER: usize = 100;
    const DEPTH: u64 = 100;
    const SEED: u64 = 42;

    let mut rng = SmallRng::seed_from_u64(SEED);
    let mut reads = Vec::with_capacity(2 * MUTATIONS_PER_CLUSTER);
    let mut depths = Vec::with_capacity(2 * MUTATIONS_PER_CLUSTER);
    for vaf in [0.25, 0.5] {
        let binomial = Binomial::new(DEPTH, vaf)?;
        for _ in 0..MUTATIONS_PER_CLUSTER {
            // Mutations without mutant reads would not have been called.
            let y = binomial.sample(&mut rng).max(1);
            reads.push(u32::try_from(y)?);
            depths.push(u32::try_from(DEPTH)?);
        }
    }

    let config = Config::default()
        .set_iterations(4_000)
        .set_burn_in(1_000)
        .set_seed(SEED)
        .set_verbose(true);
    let result = fit(&reads, &depths, &config)?;

    println!("{} supported clusters:", result.clusters.n_supported());
    for cluster in &result.clusters.supported {
        println!(
            "  slot {:>2}: weight {:.3}, frequency {:.3}",
            cluster.slot, cluster.weight, cluster.frequency
        );
    }
    if let Some(mode) = result.density.mode() {
        println!("Posterior density mode: {:.3}", mode);
    }

    #[cfg(feature = "csv")]
    {
        use subclonal_dpmm::io::csv::{save_clusters_csv, save_density_csv};
        save_density_csv(&result.density, "density.csv")?;
        save_clusters_csv(&result.clusters, "clusters.csv")?;
        println!("Saved density.csv and clusters.csv");
    }

    Ok(())
}
