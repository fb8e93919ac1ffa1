mod client;
pub mod types;

pub use client::AzureDevOpsClient;

#[cfg(test)]
pub(crate) use client::testing;
