pub mod pipeline;

pub use pipeline::{Downloader, FetchReport};
