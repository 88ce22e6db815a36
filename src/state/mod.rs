pub mod reference_lines;
pub mod series_store;
pub mod workspace;
