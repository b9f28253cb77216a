pub mod utils;

mod plans;
