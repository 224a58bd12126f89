pub mod csv_file;
pub mod in_memory;

pub use csv_file::{render_csv, CsvFileSink};
pub use in_memory::InMemorySink;
