//! different utility modules used throughout the project
/// settings of the analysis, read from a task document
pub mod config;
/// logger setup
pub mod logger;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
/// sample data for plotting f
pub mod plot_data;
///
mod task_parser_tests;
