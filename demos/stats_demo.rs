use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use chain_hash::HashTable;
use chain_hash::hash_table::Entry;
use clap::Parser;
use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KeyHash {
    /// SipHash via the standard library's DefaultHasher
    Sip,
    /// The key itself, truncated to 32 bits
    Identity,
    /// The key shifted into the upper 16 bits
    HighBits,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "initial_capacity", default_value_t = 16)]
    initial_capacity: usize,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,

    #[arg(short = 'n', long = "count", default_value_t = 10_000)]
    count: u64,

    #[arg(long = "hash", value_enum, default_value_t = KeyHash::Sip)]
    hash: KeyHash,
}

fn hash_u64(value: u64, kind: KeyHash) -> u32 {
    match kind {
        KeyHash::Sip => {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish() as u32
        }
        KeyHash::Identity => value as u32,
        KeyHash::HighBits => (value as u32) << 16,
    }
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with initial capacity {} and load factor {}",
        args.initial_capacity, args.load_factor
    );

    let mut table: HashTable<u64, u64> =
        HashTable::with_capacity_and_load_factor(args.initial_capacity, args.load_factor);

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table with {} keys ({:?} hash)...", args.count, args.hash);

    let mut resizes = 0;
    for key in 0..args.count {
        let before = table.capacity();
        match table.entry(hash_u64(key, args.hash), |&k| k == key) {
            Entry::Vacant(entry) => {
                entry.insert(key, key * 2);
            }
            Entry::Occupied(_) => {
                panic!("Key already exists in table: {}", key);
            }
        }
        if table.capacity() != before {
            resizes += 1;
        }
    }

    println!("Inserted {} keys into table", table.len());
    println!("Resized {} times to {} buckets", resizes, table.capacity());
    println!(
        "Final load: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.chain_histogram().print();
    table.debug_stats().print();
}
