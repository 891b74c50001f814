pub mod alignment;
pub mod alphabet;
pub mod context;
pub mod defaults;
pub mod errors;
pub mod index; // Subset suffix arrays and reference volumes
pub mod io; // FASTA/FASTQ input and tabular output
pub mod scan_opt;
pub mod scheduler; // Worker pool over reference volumes
pub mod scoring;
pub mod sequence;
