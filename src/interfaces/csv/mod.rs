pub mod input_reader;
pub mod state_writer;
