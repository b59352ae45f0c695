pub mod output;

pub use output::{Output, render_result};
