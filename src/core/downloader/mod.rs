pub mod client;

pub use client::{DownloadEvent, DownloadReport, Downloader};
