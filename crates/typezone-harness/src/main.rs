//! CLI entrypoint for the typezone inspection harness.
//!
//! Drives an injected manager over a logical backend so bucket placement
//! can be inspected offline: register synthetic types and dump the
//! registry, or measure how placement shifts across simulated seeds.

use clap::{Parser, Subcommand};
use serde_json::json;

use typezone_core::selector::bucket_index;
use typezone_core::{
    BucketPolicy, EntropySource, LogicalBackend, SEED_LEN, SeedMaterial, TypeDescriptor,
    ZoneHeapManager,
};

/// Inspection tooling for the typezone bucketing manager.
#[derive(Debug, Parser)]
#[command(name = "typezone-harness")]
#[command(about = "Inspection harness for the typezone bucketing manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register synthetic types and print the registry dump and metrics.
    Simulate {
        /// Number of synthetic types to register.
        #[arg(long, default_value_t = 64)]
        types: usize,
        /// Bucket policy as <small>:<large>:<limit>.
        #[arg(long)]
        policy: Option<String>,
        /// Simulated boot timestamp (microseconds) for the seed.
        #[arg(long, default_value_t = 0x5EED)]
        boot_micros: u64,
        /// Also print the metrics snapshot as JSON.
        #[arg(long)]
        metrics: bool,
    },
    /// Measure bucket spread of a type sample across simulated seeds.
    Distribution {
        /// Number of synthetic types in the sample.
        #[arg(long, default_value_t = 256)]
        types: usize,
        /// Number of distinct seeds to compare.
        #[arg(long, default_value_t = 8)]
        seeds: u64,
        /// Buckets per size class.
        #[arg(long, default_value_t = 4)]
        buckets: u32,
    },
}

/// Entropy source reporting a chosen boot timestamp.
struct SimulatedBoot {
    micros: u64,
}

impl EntropySource for SimulatedBoot {
    fn boot_timestamp_micros(&self) -> Option<u64> {
        Some(self.micros)
    }

    fn process_name(&self) -> String {
        "typezone-harness".to_string()
    }
}

fn leaked_name(i: usize) -> &'static str {
    Box::leak(format!("SimType{i:04}").into_boxed_str())
}

fn run_simulate(types: usize, policy: Option<String>, boot_micros: u64, metrics: bool) -> i32 {
    let policy = match policy.as_deref().map(BucketPolicy::parse) {
        Some(Ok(parsed)) => parsed,
        Some(Err(err)) => {
            eprintln!("invalid --policy: {err}");
            return 2;
        }
        None => BucketPolicy::default(),
    };

    let manager = ZoneHeapManager::new(Box::new(LogicalBackend::new()));
    manager.set_bucket_policy(policy);
    manager.ensure_initialized_with(&SimulatedBoot { micros: boot_micros });

    for i in 0..types {
        // Sizes cycle through a few classes on both sides of the limit.
        let size = [16, 32, 48, 64, 128, 1024, 4096][i % 7];
        let desc = TypeDescriptor::new(leaked_name(i), size, 8);
        manager.heap_ref_for_type(&desc);
    }

    print!("{}", manager.dump_registered_types());

    if metrics {
        match serde_json::to_string_pretty(&manager.metrics().snapshot()) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("failed to render metrics: {err}");
                return 1;
            }
        }
    }
    0
}

fn run_distribution(types: usize, seeds: u64, buckets: u32) -> i32 {
    if buckets == 0 {
        eprintln!("--buckets must be non-zero");
        return 2;
    }

    let descs: Vec<TypeDescriptor> = (0..types)
        .map(|i| TypeDescriptor::new(leaked_name(i), 32, 8))
        .collect();

    let mut per_seed = Vec::new();
    let mut previous: Option<Vec<u32>> = None;

    for seed_index in 0..seeds {
        let mut bytes = [0u8; SEED_LEN];
        bytes[..8].copy_from_slice(&seed_index.wrapping_mul(0x9E37_79B9_7F4A_7C15).to_le_bytes());
        let seed = SeedMaterial::from_bytes(bytes);

        let indices: Vec<u32> = descs
            .iter()
            .map(|desc| bucket_index(&seed, desc, buckets))
            .collect();

        let mut histogram = vec![0u32; buckets as usize];
        for &index in &indices {
            histogram[index as usize] += 1;
        }

        let moved = previous
            .as_ref()
            .map(|prev| prev.iter().zip(&indices).filter(|(a, b)| a != b).count());

        per_seed.push(json!({
            "seed": seed_index,
            "histogram": histogram,
            "moved_from_previous_seed": moved,
        }));
        previous = Some(indices);
    }

    let report = json!({
        "types": types,
        "buckets": buckets,
        "seeds": per_seed,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(rendered) => {
            println!("{rendered}");
            0
        }
        Err(err) => {
            eprintln!("failed to render report: {err}");
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Simulate {
            types,
            policy,
            boot_micros,
            metrics,
        } => run_simulate(types, policy, boot_micros, metrics),
        Command::Distribution {
            types,
            seeds,
            buckets,
        } => run_distribution(types, seeds, buckets),
    };
    std::process::exit(code);
}
