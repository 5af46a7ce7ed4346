//! Report rendering.

pub mod generator;

pub use generator::{
    generate_class_markdown, generate_json, generate_roster_markdown, generate_stats_markdown,
    generate_student_markdown, write_output,
};
