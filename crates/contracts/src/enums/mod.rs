pub mod output_mode;

pub use output_mode::OutputMode;
