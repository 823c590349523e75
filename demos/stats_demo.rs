use std::hash::BuildHasher;

use clap::Parser;
use lin_hash::DefaultHashBuilder;
use lin_hash::HashTable;
use lin_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    /// Number of distinct values to insert.
    #[arg(short = 'n', long = "values", default_value_t = 1000)]
    values: usize,

    /// Percentage of the inserted values to erase afterwards, leaving
    /// tombstones behind.
    #[arg(short = 'e', long = "erase_percent", default_value_t = 0)]
    erase_percent: usize,

    /// Size the table for all values up front instead of growing it.
    #[arg(short = 'p', long = "preallocate")]
    preallocate: bool,

    /// Print the slot map after filling the table.
    #[arg(long = "slots")]
    slots: bool,
}

fn main() {
    let args = Args::parse();
    let hasher = DefaultHashBuilder::default();

    let mut table: HashTable<u64> = if args.preallocate {
        HashTable::with_capacity(args.values)
    } else {
        HashTable::new()
    };
    println!("Initial capacity: {} slots", table.capacity());

    let mut rehashes = 0;
    for value in 0..args.values as u64 {
        let before = table.capacity();
        let hash = hasher.hash_one(value);

        match table.try_entry(hash, |&v| v == value) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => panic!("Value already exists in table: {value}"),
            Err(err) => {
                eprintln!("Failed to insert {value}: {err}");
                break;
            }
        }

        if table.capacity() != before {
            rehashes += 1;
        }
    }
    println!(
        "Inserted {} values with {} rehashes; capacity now {} slots",
        table.len(),
        rehashes,
        table.capacity()
    );

    let to_erase = args.values * args.erase_percent.min(100) / 100;
    for value in 0..to_erase as u64 {
        table.remove(hasher.hash_one(value), |&v| v == value);
    }
    if to_erase > 0 {
        println!("Erased {to_erase} values");
    }

    if args.slots {
        println!("{table:#?}");
    }

    table.print_probe_histogram();
    table.debug_stats().print();

    if to_erase > 0 {
        table.shrink_to_fit();
        println!();
        println!("After shrink_to_fit:");
        table.debug_stats().print();
    }
}
