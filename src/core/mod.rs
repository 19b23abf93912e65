pub mod dataset;
pub mod table;

pub use dataset::{Dataset, DatasetError, Window};
pub use table::SampleTable;
