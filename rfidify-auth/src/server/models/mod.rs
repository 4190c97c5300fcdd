mod requests;

pub use requests::*;
