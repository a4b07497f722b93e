use super::test_helpers::*;
use super::*;
use crate::types::{CrawlEnd, CrawlStart, SourceStatus};
use std::time::Duration;

mod bulk;
mod lifecycle;
