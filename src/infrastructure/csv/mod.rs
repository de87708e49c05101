// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV uploads with delimiter and encoding detection

mod csv_parser;

pub use csv_parser::CsvParser;
