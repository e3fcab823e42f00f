pub mod size_format;
