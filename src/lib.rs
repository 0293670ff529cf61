//! # paperbot
//!
//! Slack bot that watches channels for links to academic papers, fetches
//! bibliographic metadata for each link and posts formatted summaries back
//! into the conversation, including a same-thread machine translation of
//! the abstract. A daily job announces the trending papers on arXiv into
//! a dedicated channel.
//!
//! Delivery of the rich attachment replies is correlated with the original
//! messages through a FIFO destination queue; see [`queue`] and [`dispatch`].

pub mod dispatch;
pub mod error;
pub mod paper;
pub mod queue;
pub mod slack;
pub mod translate;
pub mod trending;
pub mod urls;

pub use error::{Error, Result};
